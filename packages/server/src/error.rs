//! HTTP error mapping.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use sof_events_extract::ExtractError;
use sof_events_intake::IntakeError;
use sof_events_report::ReportError;
use sof_events_server_models::ApiErrorBody;

/// Errors surfaced by request handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The multipart body carried no file.
    #[error("no file was uploaded")]
    MissingFile,

    /// The request body could not be read.
    #[error("malformed upload: {0}")]
    BadRequest(String),

    /// No stored report matches the requested id.
    #[error("no report found for '{0}'")]
    NotFound(String),

    /// File conversion failed.
    #[error(transparent)]
    Intake(#[from] IntakeError),

    /// Field extraction failed.
    #[error(transparent)]
    Extract(#[from] ExtractError),

    /// Report rendering or writing failed.
    #[error(transparent)]
    Report(#[from] ReportError),

    /// Any other server-side failure.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// Message shown to the client. Internal details are logged instead.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Intake(IntakeError::UnsupportedFormat(_) | IntakeError::TooLarge { .. })
            | Self::Extract(ExtractError::EmptyDocument)
            | Self::MissingFile
            | Self::BadRequest(_)
            | Self::NotFound(_) => self.to_string(),
            _ => "internal server error".to_owned(),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingFile | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Intake(IntakeError::UnsupportedFormat(_)) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::Intake(IntakeError::TooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Extract(ExtractError::EmptyDocument) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Intake(IntakeError::Io(_))
            | Self::Extract(_)
            | Self::Report(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("Request failed: {self}");
        } else {
            log::warn!("Request rejected ({status}): {self}");
        }

        HttpResponse::build(status).json(ApiErrorBody {
            error: self.public_message(),
        })
    }
}
