use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json
};
use anyhow;
use log::{error, warn};
use serde_json::json;

use crate::core::LedgerError;

#[derive(Debug)]
pub enum ServerError {
    InternalError(anyhow::Error)
}

impl ServerError {
    fn status(&self) -> StatusCode {
        match self {
            Self::InternalError(err) => match err.downcast_ref::<LedgerError>() {
                Some(LedgerError::InvalidAmount) => StatusCode::BAD_REQUEST,
                Some(LedgerError::StoreUnavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
                None => StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let Self::InternalError(err) = self;
        let message = match status {
            StatusCode::SERVICE_UNAVAILABLE => "Store unavailable".to_owned(),
            status if status.is_server_error() => "Internal error".to_owned(),
            _ => err.to_string()
        };
        if status.is_server_error() {
            error!("request failed: {:#}", err);
        } else {
            warn!("request rejected: {}", err);
        }
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl<E> From<E> for ServerError
where
    E: Into<anyhow::Error>
{
    fn from(err: E) -> Self {
        Self::InternalError(err.into())
    }
}
