use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The payload could not be turned into a `BuildEvent`. The event is dropped.
    #[error("Malformed event: {0}")]
    MalformedEvent(String),

    /// Invalid bootstrap parameters. Only raised at startup.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Cannot load config file: {0}")]
    ConfigFile(#[from] config_file::ConfigFileError),

    #[error("MQTT error: {0}")]
    Mqtt(#[from] paho_mqtt::Error),

    #[error("Cannot install signal handler: {0}")]
    Signal(#[from] ctrlc::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
