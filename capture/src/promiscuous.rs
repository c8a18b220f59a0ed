use serde::{Deserialize, Serialize};
use std::fmt;
use strum_macros::Display;

#[derive(Clone, Copy, Debug, Default, Display, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromiscuousMode {
    #[strum(to_string = "off")]
    Off,

    #[default]
    #[strum(to_string = "best effort")]
    BestEffort,

    #[strum(to_string = "required")]
    Required,
}

impl PromiscuousMode {
    /// Calls `open` with the promiscuous flag to use.
    /// `BestEffort` logs a failed promiscuous attempt and retries without it. `Required` fails.
    pub fn open<T, E: fmt::Display>(
        self, mut open: impl FnMut(bool) -> Result<T, E>,
    ) -> Result<T, E> {
        match self {
            PromiscuousMode::Off => open(false),
            PromiscuousMode::Required => open(true),
            PromiscuousMode::BestEffort => open(true).or_else(|err| {
                log::warn!(
                    "Promiscuous mode is not available. {} Capturing traffic addressed to this host only.",
                    err
                );
                open(false)
            }),
        }
    }
}
