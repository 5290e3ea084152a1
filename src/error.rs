//! Admission errors

use thiserror::Error;

use crate::validation::{ErrorList, RegistryConflict};

pub type Result<T, E = AdmissionError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum AdmissionError {
    /// One or more fields failed validation
    #[error("{0}")]
    Invalid(ErrorList),

    /// The spec of a spec-immutable kind changed on update
    #[error("Cannot update chaos spec")]
    CannotUpdateChaos,

    #[error("failed to decode object: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("unknown kind: {0}")]
    UnknownKind(String),

    #[error("missing object in {0} request")]
    MissingObject(&'static str),

    #[error(transparent)]
    Registry(#[from] RegistryConflict),
}

impl AdmissionError {
    /// `status.reason` reported to the API server
    pub fn reason(&self) -> &'static str {
        match self {
            AdmissionError::Invalid(_) => "Invalid",
            AdmissionError::CannotUpdateChaos => "Forbidden",
            AdmissionError::Decode(_)
            | AdmissionError::UnknownKind(_)
            | AdmissionError::MissingObject(_) => "BadRequest",
            AdmissionError::Registry(_) => "InternalError",
        }
    }
}

impl From<ErrorList> for AdmissionError {
    fn from(errors: ErrorList) -> Self {
        AdmissionError::Invalid(errors)
    }
}
