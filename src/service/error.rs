use axum::http::StatusCode;
use thiserror::Error;

use crate::{
    db::document::StoreError,
    error::{ErrorMessage, HttpError},
    models::{engagementmodel::EngagementStatus, usermodel::UserRole},
    service::{identity::AuthError, storage::StorageError},
};

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Profile not found for user {0}")]
    ProfileNotFound(String),

    #[error("Listing {0} not found")]
    ListingNotFound(String),

    #[error("Listing {0} is no longer open")]
    ListingClosed(String),

    #[error("Engagement {0} not found")]
    EngagementNotFound(String),

    #[error("Product {0} not found")]
    ProductNotFound(String),

    #[error("Worker {worker_id} has already applied to job {job_id}")]
    DuplicateApplication { worker_id: String, job_id: String },

    #[error("Role cannot be changed from {from:?} to {to:?}")]
    RoleImmutable { from: UserRole, to: UserRole },

    #[error("User {0} is not authorized to perform this action on {1}")]
    Unauthorized(String, String),

    #[error("Cannot move engagement from {from:?} to {to:?}")]
    InvalidStatusTransition {
        from: EngagementStatus,
        to: EngagementStatus,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::ProfileNotFound(_)
            | ServiceError::ListingNotFound(_)
            | ServiceError::EngagementNotFound(_)
            | ServiceError::ProductNotFound(_)
            | ServiceError::Store(StoreError::NotFound { .. }) => StatusCode::NOT_FOUND,

            ServiceError::DuplicateApplication { .. }
            | ServiceError::Store(StoreError::AlreadyExists { .. }) => StatusCode::CONFLICT,

            ServiceError::ListingClosed(_)
            | ServiceError::RoleImmutable { .. }
            | ServiceError::InvalidStatusTransition { .. }
            | ServiceError::Validation(_) => StatusCode::BAD_REQUEST,

            ServiceError::Unauthorized(_, _) => StatusCode::FORBIDDEN,

            ServiceError::Auth(err) => match err {
                AuthError::EmailAlreadyInUse => StatusCode::CONFLICT,
                AuthError::InvalidEmail | AuthError::WeakPassword => StatusCode::BAD_REQUEST,
                AuthError::WrongCredentials | AuthError::UserNotFound | AuthError::UserDisabled => {
                    StatusCode::UNAUTHORIZED
                }
                AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },

            ServiceError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,

            ServiceError::Storage(StorageError::EmptyUpload) => StatusCode::BAD_REQUEST,
            ServiceError::Storage(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<ServiceError> for HttpError {
    fn from(error: ServiceError) -> Self {
        let status = error.status_code();
        match &error {
            ServiceError::Auth(err) => {
                if let AuthError::Internal(reason) = err {
                    tracing::error!("Identity provider fault: {}", reason);
                }
                HttpError::new(err.user_message(), status)
            }
            ServiceError::Store(_) | ServiceError::Storage(_) if status.is_server_error() => {
                tracing::error!("{}", error);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            }
            _ => HttpError::new(error.to_string(), status),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_errors_are_distinguishable_from_faults() {
        let duplicate = ServiceError::DuplicateApplication {
            worker_id: "w1".to_string(),
            job_id: "j1".to_string(),
        };
        assert_eq!(duplicate.status_code(), StatusCode::CONFLICT);

        let fault = ServiceError::from(StoreError::InvalidDocument("bad".to_string()));
        assert_eq!(fault.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let missing = ServiceError::from(StoreError::not_found("jobs", "j1"));
        assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_auth_errors_surface_the_human_message() {
        let http: HttpError = ServiceError::Auth(AuthError::WrongCredentials).into();
        assert_eq!(http.status, StatusCode::UNAUTHORIZED);
        assert_eq!(http.message, "Incorrect email or password.");

        let http: HttpError = ServiceError::Auth(AuthError::Internal("socket reset".to_string())).into();
        assert_eq!(http.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!http.message.contains("socket"));
    }

    #[test]
    fn test_store_faults_are_not_leaked() {
        let http: HttpError = ServiceError::from(StoreError::InvalidDocument("row 7".to_string())).into();
        assert_eq!(http.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!http.message.contains("row 7"));
        assert_eq!(http.message, ErrorMessage::ServerError.to_string());
    }
}
