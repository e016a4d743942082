//! error type of the library.
//!
//! Configuration and external tool failures are fatal for a run, data anomalies
//! (zero shared kmers for a pair) never reach this type, they are absorbed in the regression.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StrainError {
    /// io failure with the file concerned
    #[error("io error on {path:?} : {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// inconsistent parameters or database content, always fatal
    #[error("configuration error : {0}")]
    Config(String),

    /// the external sketching/distance program failed
    #[error("external tool error, command `{command}` : {msg}")]
    Tool { command: String, msg: String },

    /// a malformed line in some input table
    #[error("parse error in {origin} line {line} : {msg}")]
    Parse {
        origin: String,
        line: usize,
        msg: String,
    },

    #[error("csv error : {0}")]
    Csv(#[from] csv::Error),

    #[error("json error : {0}")]
    Json(#[from] serde_json::Error),
} // end of StrainError

impl StrainError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StrainError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        StrainError::Config(msg.into())
    }

    /// returns true for errors the user must fix in its parameters or database
    pub fn is_config(&self) -> bool {
        matches!(self, StrainError::Config(_))
    }
} // end of impl StrainError

pub type Result<T> = std::result::Result<T, StrainError>;
