//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use common::IdError;
use domain::DomainError;
use saga::SagaError;
use store::StoreError;
use wire::ChannelError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// A store operation failed.
    Store(StoreError),
    /// Bad request from the client.
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, code) = match self {
            ApiError::Store(err) => {
                let status = store_error_status(&err);
                if status.is_server_error() {
                    tracing::error!(error = %err, "store operation failed");
                }
                (status, err.to_string(), err.code().to_string())
            }
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, "BAD_REQUEST".to_string()),
        };

        let body = serde_json::json!({ "error": message, "code": code });
        (status, axum::Json(body)).into_response()
    }
}

fn store_error_status(err: &StoreError) -> StatusCode {
    if let StoreError::Domain(DomainError::InvalidManager { .. }) = err {
        return StatusCode::FORBIDDEN;
    }
    if err.is_validation() {
        return StatusCode::BAD_REQUEST;
    }
    match err {
        StoreError::Domain(
            DomainError::ItemNotFound(_) | DomainError::PurchaseNotFound(_),
        ) => StatusCode::NOT_FOUND,
        StoreError::Domain(_) | StoreError::PeerRejected { .. } => StatusCode::CONFLICT,
        StoreError::Channel(ChannelError::Timeout { .. })
        | StoreError::Exchange(SagaError::Transport {
            source: ChannelError::Timeout { .. },
            ..
        }) => StatusCode::GATEWAY_TIMEOUT,
        StoreError::Channel(_) | StoreError::Exchange(SagaError::Transport { .. }) => {
            StatusCode::BAD_GATEWAY
        }
        StoreError::Exchange(SagaError::StepFailed { .. }) => StatusCode::CONFLICT,
        StoreError::Exchange(SagaError::CompensationFailed { .. }) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        StoreError::MissingField(_) => StatusCode::BAD_REQUEST,
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Store(err)
    }
}

impl From<IdError> for ApiError {
    fn from(err: IdError) -> Self {
        ApiError::Store(err.into())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use common::{ItemId, StoreCode};

    use super::*;

    fn status(err: StoreError) -> StatusCode {
        ApiError::from(err).into_response().status()
    }

    #[test]
    fn test_status_mapping() {
        let item = ItemId::new("QC1001").unwrap();
        assert_eq!(
            status(DomainError::InvalidQuantity { quantity: 0 }.into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(DomainError::ItemNotFound(item.clone()).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status(DomainError::OutOfStock(item).into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status(
                ChannelError::Timeout {
                    store: StoreCode::new("ON").unwrap(),
                    after: Duration::from_secs(5),
                }
                .into()
            ),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            status(ChannelError::UnknownStore(StoreCode::new("XX").unwrap()).into()),
            StatusCode::BAD_GATEWAY
        );
    }
}
