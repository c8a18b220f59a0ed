// Project lints
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(unsafe_code)]

use crate::config::Config;
use crate::context::{Context, ContextError};
use bytes::BytesMut;
use capture::output::pcapng::PcapNgWriter;
use capture::{Sniffer, State};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

const POLL_DELAY: Duration = Duration::from_millis(50);
// Block framing and EPB fields on top of the largest datagram.
const SCRATCH_HEADROOM: usize = 64;

fn main() {
    let config = match Config::from_file() {
        Ok(value) => value,
        Err(err) => {
            let mut message = format!("Config initialization failed. Error: {err}.");
            if let Some(additional_info) = err.additional_info() {
                message.push_str(&format!(" Additional_info: {additional_info}"));
            }
            eprintln!("{}", message);
            std::process::exit(1);
        },
    };

    logging::setup(&config).unwrap_or_else(|err| {
        let mut message = format!("Logger initialization failed. Error: {err}.");
        if let Some(additional_info) = err.additional_info() {
            message.push_str(&format!(" Additional_info: {additional_info}"));
        }
        eprintln!("{}", message);
        std::process::exit(1);
    });

    log::info!("Starting...");
    log::debug!("Config loaded: {:#?}", config);

    let context = match Context::new(config) {
        Ok(value) => value,
        Err(ContextError::InterfaceNotSet(available)) => {
            let err = ContextError::InterfaceNotSet(available);
            log::info!("{} Set `interface` in config.toml.", err);
            if let Some(additional_info) = err.additional_info() {
                log::info!("{}", additional_info);
            }
            std::process::exit(0);
        },
        Err(err) => {
            let mut message = format!("Context initialization failed. Error: {err}.");
            if let Some(additional_info) = err.additional_info() {
                message.push_str(&format!(" Additional_info: {additional_info}"));
            }
            log::error!("{}", message);
            std::process::exit(1);
        },
    };

    let shutdown_flag = Arc::new(AtomicBool::new(false));
    let shutdown_flag_copy = Arc::clone(&shutdown_flag);
    if let Err(err) = ctrlc::set_handler(move || {
        shutdown_flag_copy.store(true, Ordering::Release);
    }) {
        log::error!("Failed to set Ctrl+C handler: {}", err);
        std::process::exit(1);
    }

    if let Err(message) = run(&context, &shutdown_flag) {
        log::error!("{}", message);
        std::process::exit(1);
    }
}

fn run(context: &Context, shutdown_flag: &AtomicBool) -> Result<(), String> {
    let describe = |title: &str, err: &dyn std::fmt::Display, info: Option<String>| {
        let mut message = format!("{title} Error: {err}.");
        if let Some(additional_info) = info {
            message.push_str(&format!(" Additional_info: {additional_info}"));
        }
        message
    };

    let scratch = BytesMut::with_capacity(context.config.receive_buffer_size + SCRATCH_HEADROOM);
    let writer = PcapNgWriter::create(&context.config.output, scratch, &context.metadata())
        .map_err(|err| describe("Failed to create capture file.", &err, err.additional_info()))?;
    log::info!("Writing to {}.", context.config.output.display());

    let filters = context.config.filter.to_filters();
    log::info!("Filter: {}.", filters);

    let mut sniffer = Sniffer::new(context.interface.clone(), context.settings(), filters);
    sniffer
        .set_output(Box::new(writer))
        .map_err(|err| describe("Failed to set output.", &err, err.additional_info()))?;

    if context.config.log_packets {
        sniffer
            .subscribe(|packet| {
                log::trace!("{}", summary::summary(packet));
                Ok(())
            })
            .map_err(|err| describe("Failed to subscribe.", &err, err.additional_info()))?;
    }

    sniffer
        .start()
        .map_err(|err| describe("Failed to start capture.", &err, err.additional_info()))?;
    log::info!("Capturing on {}. Press Ctrl+C to stop.", context.interface);

    let mut last_report = Instant::now();
    while !shutdown_flag.load(Ordering::Acquire) && sniffer.state() == State::Running {
        thread::sleep(POLL_DELAY);

        if last_report.elapsed() >= context.config.statistics_interval {
            log::info!("{}", sniffer.statistics());
            last_report = Instant::now();
        }
    }

    sniffer.stop();
    sniffer
        .join()
        .map_err(|err| describe("Capture failed.", &err, err.additional_info()))
}

mod config;
mod context;
mod logging;
mod summary;
