use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;
use thiserror::Error;

/// AppError
///
/// The closed set of failures any endpoint can produce. Handlers return
/// `Result<_, AppError>` and the status code is derived by `status()`, so the
/// mapping lives in exactly one place.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid request, please consult the documentation")]
    InvalidRequest,
    #[error("Invalid types in the request")]
    InvalidTypes,
    #[error("Invalid mail address, use the format : xxx@yyy.zz")]
    InvalidMailFormat,
    #[error("Invalid password, use between 6 and 32 characters")]
    InvalidPasswordFormat,
    #[error("Invalid dates in the request")]
    InvalidDate,
    #[error("Incoherent dates, the ending date must follow the starting date")]
    IncoherentDates,
    #[error("Invalid birthdate, you must be between 18 and 120 years old")]
    InvalidAge,
    #[error("Invalid role, use 'user' or 'admin'")]
    InvalidRole,
    #[error("No updatable attribute")]
    NothingToUpdate,
    #[error("{0}")]
    Conflict(Conflict),
    #[error("Can not register user if you are logged in")]
    AlreadyLoggedIn,
    #[error("You cannot delete yourself !")]
    CannotDeleteSelf,
    #[error(transparent)]
    Authentication(#[from] AuthFailure),
    #[error("You do not have permission to use this method !")]
    AccessDenied,
    #[error("{0} not found")]
    NotFound(Entity),
    #[error("File too large, the limit is 50 KB")]
    PayloadTooLarge,
    #[error("Unsupported file type")]
    UnsupportedMediaType,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("internal error: {0}")]
    Internal(String),
}

/// Reasons a credential (bearer token or login) is refused. All of them map to 401.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthFailure {
    #[error("Missing token")]
    MissingCredential,
    #[error("Unvalid token data")]
    MalformedCredential,
    #[error("Expired token")]
    ExpiredCredential,
    #[error("This token is not valid : user deleted or server reboot")]
    RevokedCredential,
    #[error("Please enter your login/password")]
    MissingLogin,
    #[error("Invalid password")]
    WrongPassword,
    #[error("Incorrect current password")]
    WrongCurrentPassword,
}

/// Uniqueness rules that a request would break.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conflict {
    AlreadyRegistered,
    ParticipationExists,
    ObjectExists,
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Conflict::AlreadyRegistered => "Address mail already registered",
            Conflict::ParticipationExists => "Participation already registered for this event",
            Conflict::ObjectExists => "Object already registered for this stand",
        })
    }
}

/// The kind of row a lookup failed to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Event,
    Stand,
    Product,
    Object,
    Participation,
    User,
    Creator,
    MailAddress,
    ProfilePicture,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Entity::Event => "Event",
            Entity::Stand => "Stand",
            Entity::Product => "Product",
            Entity::Object => "Object",
            Entity::Participation => "Participation",
            Entity::User => "User",
            Entity::Creator => "Creator",
            Entity::MailAddress => "Mail address",
            Entity::ProfilePicture => "Profile picture",
        })
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidRequest
            | AppError::InvalidTypes
            | AppError::InvalidMailFormat
            | AppError::InvalidPasswordFormat
            | AppError::InvalidDate
            | AppError::IncoherentDates
            | AppError::InvalidAge
            | AppError::InvalidRole
            | AppError::NothingToUpdate
            | AppError::Conflict(_)
            | AppError::AlreadyLoggedIn
            | AppError::CannotDeleteSelf => StatusCode::BAD_REQUEST,
            AppError::Authentication(_) => StatusCode::UNAUTHORIZED,
            AppError::AccessDenied => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        AppError::Internal(message.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        // Unanticipated failures keep their detail in the logs only.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = ?self, "request failed");
            "Server error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
