use thiserror::Error;

/// Errors produced while parsing or constructing identifiers.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid base identifier {base:?}: {reason}")]
    InvalidBase { base: String, reason: String },

    #[error("invalid version token {token:?} in {key:?}")]
    InvalidVersionToken { key: String, token: String },

    #[error("identifier {value:?} is not handled by locator {expected:?}")]
    InvalidLocator { value: String, expected: String },

    #[error("unknown feature {name:?}")]
    UnknownFeature { name: String },
}

pub type Result<T> = std::result::Result<T, TypeError>;
