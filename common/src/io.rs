use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use std::{env, fs};

pub const QUALIFIER: &str = "dev";
pub const ORGANIZATION: &str = "xairaven";
pub const APPLICATION: &str = "sniffer";

/// Per-user data directory, or the working directory when the platform has none.
pub fn get_storage_file_path(file_name: &str) -> Result<PathBuf, std::io::Error> {
    match ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION) {
        Some(dirs) => Ok(dirs.data_dir().join(file_name)),
        None => Ok(env::current_dir()?.join(file_name)),
    }
}

pub fn create_parent_directories(path: &Path) -> Result<(), std::io::Error> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}
