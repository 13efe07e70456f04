//! The JSON error envelope every failing request answers with.
use axum::{
    Json,
    response::{IntoResponse, Response},
};
use http::StatusCode;
use kkp_dashboard::error::{Classify, ErrorClass};
use serde::Serialize;

/// A classified error ready to be rendered as
/// `{"error": {"code": …, "message": …, "details": […]}}`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ApiError {
    class: ErrorClass,
    message: String,
    details: Vec<String>,
}

impl ApiError {
    pub fn new(class: ErrorClass, message: impl Into<String>) -> Self {
        Self {
            class,
            message: message.into(),
            details: Vec::new(),
        }
    }

    pub fn class(&self) -> ErrorClass {
        self.class
    }

    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.class.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

/// Every classified error converts into an [`ApiError`]. The message is the error itself,
/// the details list its sources outermost first.
impl<E> From<E> for ApiError
where
    E: Classify + std::error::Error,
{
    fn from(err: E) -> Self {
        let mut details = Vec::new();
        let mut source = err.source();
        while let Some(err) = source {
            details.push(err.to_string());
            source = err.source();
        }

        Self {
            class: err.class(),
            message: err.to_string(),
            details,
        }
    }
}

#[derive(Serialize)]
struct Envelope<'a> {
    error: EnvelopeBody<'a>,
}

#[derive(Serialize)]
struct EnvelopeBody<'a> {
    code: u16,
    message: &'a str,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    details: &'a [String],
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self.message, details = ?self.details, "request failed");
        } else {
            tracing::debug!(%status, error = %self.message, "request rejected");
        }

        let envelope = Envelope {
            error: EnvelopeBody {
                code: status.as_u16(),
                message: &self.message,
                details: &self.details,
            },
        };
        (status, Json(envelope)).into_response()
    }
}
