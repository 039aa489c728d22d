use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuildlinkError {
    #[error("Malformed stream: {0}")]
    MalformedStream(String),
    #[error("Internal invariant violated: {0}")]
    InvariantViolation(String),
    #[error("No model identifier is known for model type '{0}'")]
    UnknownModelType(String),
    #[error("No model of type '{model}' is available in this build{}", reason_suffix(.reason))]
    UnknownModel { model: String, reason: Option<String> },
    #[error("Capability '{capability}' is not supported by view '{view}'")]
    UnsupportedCapability { view: String, capability: String },
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Request cancelled")]
    Cancelled,
    #[error("Config error: {0}")]
    Config(String),
    #[error("Lock poisoned: {0}")]
    Lock(String),
    #[error("I/O error: {0}")]
    Io(std::io::Error),
}

fn reason_suffix(reason: &Option<String>) -> String {
    reason.as_deref().map(|r| format!(": {r}")).unwrap_or_default()
}

pub type Result<T> = std::result::Result<T, BuildlinkError>;

// Helper conversions
impl From<std::io::Error> for BuildlinkError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::UnexpectedEof => Self::MalformedStream(format!("truncated stream ({e})")),
            _ => Self::Io(e),
        }
    }
}
impl From<config::ConfigError> for BuildlinkError {
    fn from(e: config::ConfigError) -> Self { Self::Config(e.to_string()) }
}
impl<T> From<std::sync::PoisonError<T>> for BuildlinkError {
    fn from(e: std::sync::PoisonError<T>) -> Self { Self::Lock(e.to_string()) }
}
