//! Errors for parsing shared types.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypesError {
    #[error("invalid control spec {0:?}: expected \"key,joy1,joy2,dev,rsrc\"")]
    ControlSpecFormat(String),

    #[error("invalid value {value} for control element {element}")]
    ControlSpecValue { element: &'static str, value: char },

    #[error("unknown session mode ordinal {0}")]
    UnknownMode(i32),
}
