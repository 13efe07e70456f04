//! Classification of errors into the categories the HTTP surface exposes.

/// The kind of failure an operation ended with. The HTTP layer maps each
/// class onto exactly one status code.
#[derive(Clone, Copy, Debug, Eq, PartialEq, strum::Display)]
pub enum ErrorClass {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    Internal,
}

impl ErrorClass {
    /// The HTTP status code for this class.
    pub fn status_code(self) -> u16 {
        match self {
            Self::BadRequest => 400,
            Self::Unauthorized => 401,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::Conflict => 409,
            Self::Internal => 500,
        }
    }
}

/// Implemented by every engine error so callers can decide how to surface it
/// without matching on individual variants.
pub trait Classify {
    fn class(&self) -> ErrorClass;
}
