use std::io::Error as IoError;
use thiserror::Error;
use zbus::Error as ZbusError;

#[derive(Error, Debug)]
pub enum App {
    #[error("I/O operation failed")]
    Io(#[from] IoError),
    #[error("Service startup failed: {0}")]
    Startup(String),
    #[error("Zbus error")]
    Zbus(#[from] ZbusError),
}
