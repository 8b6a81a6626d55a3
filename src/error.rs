// error.rs — Blueprint error taxonomy and HTTP mapping.
//
// Host callback failures are wrapped in the variant for the step that
// failed; no retries or recovery happen inside the blueprint. The numeric
// codes are stable and exposed to clients in every error body:
//
//   { "error": "<message>", "error_code": <code> }

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{error, warn};

/// Errors surfaced by the blueprint routes and configuration.
#[derive(Debug, thiserror::Error)]
pub enum BlueprintError {
    /// Missing or invalid blueprint configuration. Raised at construction
    /// time; a handler never produces this under a validated config.
    #[error("invalid blueprint configuration: {0}")]
    Configuration(String),

    /// The confirmation token is malformed, has a bad signature, has
    /// expired, or was minted for a different template.
    #[error("the confirmation token is invalid or has expired")]
    InvalidToken(#[source] anyhow::Error),

    /// The authentication callback rejected the request.
    #[error("authentication failed")]
    Unauthorized(#[source] anyhow::Error),

    /// The save callback failed. Whether anything was partially written is
    /// host-defined.
    #[error("an error occurred while saving the notebook")]
    StorageFailure(#[source] anyhow::Error),

    /// The template file could not be read, parsed, or rendered.
    #[error("an error occurred while creating the notebook")]
    RenderFailed(#[source] anyhow::Error),

    /// The requested template is not in the configured list.
    #[error("the requested template does not exist")]
    NotFound,

    /// The notebook was saved, but the URL callback failed afterwards.
    #[error("the notebook was created successfully, but there was an error determining its JupyterHub URL")]
    UrlFailed(#[source] anyhow::Error),

    /// A `{placeholder}` in the template path has no matching parameter.
    #[error("the parameter \"{0}\" is missing")]
    MissingParameter(String),

    /// The destination-resolution callback failed.
    #[error("unable to determine the notebook destination")]
    DestinationFailed(#[source] anyhow::Error),

    /// The `params` argument is not a JSON object.
    #[error("the params argument must be a JSON object")]
    InvalidParameters,
}

impl BlueprintError {
    /// Stable numeric code included in error bodies.
    pub fn error_code(&self) -> i32 {
        match self {
            Self::Configuration(_) => 1,
            Self::InvalidToken(_) => 2,
            Self::Unauthorized(_) => 3,
            Self::StorageFailure(_) | Self::RenderFailed(_) => 11,
            Self::NotFound => 13,
            Self::UrlFailed(_) => 14,
            Self::MissingParameter(_) => 15,
            Self::DestinationFailed(_) => 16,
            Self::InvalidParameters => 17,
        }
    }

    /// HTTP status the error maps to.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::InvalidToken(_)
            | Self::MissingParameter(_)
            | Self::DestinationFailed(_)
            | Self::InvalidParameters => StatusCode::BAD_REQUEST,
            Self::Configuration(_)
            | Self::StorageFailure(_)
            | Self::RenderFailed(_)
            | Self::UrlFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for BlueprintError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(code = self.error_code(), error = ?self, "request failed");
        } else {
            warn!(code = self.error_code(), error = ?self, "request rejected");
        }
        (
            status,
            Json(json!({
                "error": self.to_string(),
                "error_code": self.error_code(),
            })),
        )
            .into_response()
    }
}
