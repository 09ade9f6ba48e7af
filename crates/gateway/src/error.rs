use {
    axum::{
        http::StatusCode,
        response::{IntoResponse, Response},
    },
    tracing::{debug, warn},
};

use crate::hub::HubError;

/// Request failures. Every variant renders as a bare status with an empty
/// body.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("missing required parameter '{0}'")]
    MissingParameter(&'static str),

    #[error("malformed request body: {0}")]
    MalformedBody(String),

    #[error(transparent)]
    Hub(#[from] HubError),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingParameter(_) | Self::MalformedBody(_) => StatusCode::BAD_REQUEST,
            Self::Hub(HubError::UnknownMedia(_)) => StatusCode::NOT_FOUND,
            Self::Hub(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(status = status.as_u16(), error = %self, "request failed");
        } else {
            debug!(status = status.as_u16(), error = %self, "request rejected");
        }
        status.into_response()
    }
}
