use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid id: {0}")]
    InvalidId(String),
    #[error("unknown {kind}: {value}")]
    UnknownValue { kind: &'static str, value: String },
    #[error("a justification comment is required to {0}")]
    JustificationRequired(&'static str),
    #[error("analysis_note is required when status is {0}")]
    NoteRequired(&'static str),
    #[error("Incident must be CONFIRMED before SHIELD dispatch")]
    NotDispatchable,
    #[error("Dispatch does not match incident")]
    DispatchMismatch,
    #[error("operator cannot report status {0}")]
    InvalidOperatorStatus(&'static str),
    #[error("{field} {message}")]
    InvalidField {
        field: &'static str,
        message: String,
    },
}

impl DomainError {
    pub fn invalid_field(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            message: message.into(),
        }
    }
}
