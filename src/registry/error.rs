#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("plugin name cannot be empty")]
    EmptyPluginName,
    #[error("plugin `{0}` already registered")]
    DuplicatePlugin(String),
    #[error("plugin `{0}` must provide at least one monitor")]
    NoMonitors(String),
    #[error("monitor name cannot be empty")]
    EmptyMonitorName,
    #[error("monitor {index} validation failed")]
    Monitor {
        index: usize,
        #[source]
        source: Box<Error>,
    },
    #[error("condition {index} validation failed")]
    Condition {
        index: usize,
        #[source]
        source: Box<Error>,
    },
    #[error("condition reason cannot be empty")]
    EmptyReason,
    #[error("min occurrences cannot be negative, got {0}")]
    NegativeMinOccurrences(i64),
    #[error("plugin validation failed")]
    Validation(#[source] Box<Error>),
}

pub type Result<T> = std::result::Result<T, Error>;
