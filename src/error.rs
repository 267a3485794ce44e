use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Could not bind listener on {addr}, error: {source}")]
    Bind { addr: String, source: std::io::Error },

    #[error("Could not open log file {}, error: {source}", path.display())]
    OpenLogFile { path: PathBuf, source: std::io::Error },

    #[error("Logger is already initialized")]
    InitLogger(#[from] log::SetLoggerError),
}

pub type Result<T> = std::result::Result<T, Error>;
