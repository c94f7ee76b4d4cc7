//! Errors raised by the simulation engine.

use std::fmt;

#[derive(Clone, Debug, PartialEq)]
pub enum EngineError {
    /// Resistance queried for a drug the virus does not track.
    UnknownDrug(String),
    /// Parameter outside of its valid range.
    InvalidParameter(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EngineError::UnknownDrug(drug) => write!(f, "unknown drug {drug:?}"),
            EngineError::InvalidParameter(message) => write!(f, "invalid parameter: {message}"),
        }
    }
}

impl std::error::Error for EngineError {}
