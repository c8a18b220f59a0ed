use crate::config::Config;
use common::logging::LogError;
use log::LevelFilter;

pub const LOG_FILE_TITLE: &str = "sniffer";

/// Stdout always, plus a dated file in the data directory when enabled.
pub fn setup(config: &Config) -> Result<(), LogError> {
    if config.log_level.eq(&LevelFilter::Off) {
        return Ok(());
    }

    let log_format = config.log_format.clone();
    let mut dispatch = fern::Dispatch::new()
        .level(config.log_level)
        .format(move |out, message, record| {
            let formatted = common::logging::parse_format(&log_format, message, record);

            out.finish(format_args!("{}", formatted))
        })
        .chain(std::io::stdout());

    if config.log_to_file {
        let file_name = common::logging::generate_file_name(LOG_FILE_TITLE);
        let path = common::io::get_storage_file_path(&file_name)?;
        common::io::create_parent_directories(&path)?;

        let file = fern::log_file(path).map_err(LogError::IOError)?;
        dispatch = dispatch.chain(file);
    }

    dispatch.apply().map_err(LogError::SetLoggerError)
}
