use flexi_logger::FlexiLoggerError;
use glib::BoolError;
use std::io;
use thiserror::Error;
use tokio::sync::mpsc::error::SendError;
use zbus::Error as ZbusError;

#[derive(Error, Debug, Clone)]
pub enum App {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Config parsing error: {0}")]
    TomlParsing(String),

    #[error("Logger initialization error: {0}")]
    Logger(String),

    #[error("Channel send error: {0}")]
    Send(String),

    #[error("GStreamer initialization error: {0}")]
    Init(String),

    #[error("GStreamer element error: {0}")]
    Element(String),

    #[error("GStreamer pipeline error: {0}")]
    Pipeline(String),

    #[error("GStreamer state error: {0}")]
    State(String),

    #[error("Track load error: {0}")]
    TrackLoad(String),

    #[error("ZBus error: {0}")]
    ZBus(String),
}

impl From<io::Error> for App {
    fn from(error: io::Error) -> Self {
        App::Io(error.to_string())
    }
}

impl From<toml::de::Error> for App {
    fn from(error: toml::de::Error) -> Self {
        App::TomlParsing(error.to_string())
    }
}

impl From<FlexiLoggerError> for App {
    fn from(error: FlexiLoggerError) -> Self {
        App::Logger(error.to_string())
    }
}

impl<T> From<SendError<T>> for App {
    fn from(error: SendError<T>) -> Self {
        App::Send(error.to_string())
    }
}

impl From<BoolError> for App {
    fn from(error: BoolError) -> Self {
        App::Element(error.to_string())
    }
}

impl From<ZbusError> for App {
    fn from(error: ZbusError) -> Self {
        App::ZBus(error.to_string())
    }
}
