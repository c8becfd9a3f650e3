use axum::{
    extract::{FromRef, FromRequestParts, Request},
    http::{HeaderMap, header, request::Parts},
    middleware::Next,
    response::Response,
};
use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::Utc;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    config::AppConfig,
    error::{AppError, AuthFailure},
    models::{Role, User},
    tokens::TokenRegistry,
};

/// Lifetime of an issued session token.
pub const TOKEN_LIFETIME_SECS: i64 = 12 * 60 * 60;

/// Identity
///
/// The caller identity embedded in every token under the `data` claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub mail_address: String,
    pub name: String,
    pub role: Role,
}

impl From<&User> for Identity {
    fn from(user: &User) -> Self {
        Self {
            mail_address: user.mail_address.clone(),
            name: user.name.clone(),
            role: user.role,
        }
    }
}

/// Claims
///
/// The JWT payload, signed with HS256 and the server's `TOKEN_KEY`.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub data: Identity,
    /// Issued At (iat), seconds since the epoch.
    pub iat: i64,
    /// Expiration Time (exp). Validated on every request.
    pub exp: i64,
}

/// AuthUser Extractor Result
///
/// The resolved identity of an authenticated request. Serialized as-is by
/// `GET /user/account`.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub mail_address: String,
    pub name: String,
    pub role: Role,
    #[serde(skip)]
    pub token: String,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// issue_token
///
/// Signs a fresh 12 hour token for `identity`. The caller is responsible for
/// registering it in the `TokenRegistry`.
pub fn issue_token(identity: Identity, secret: &str) -> Result<String, AppError> {
    sign(identity, secret).map(|(token, _)| token)
}

/// issue_session
///
/// Signs a token for `identity` and registers it until its expiry.
pub fn issue_session(
    identity: Identity,
    secret: &str,
    registry: &TokenRegistry,
) -> Result<String, AppError> {
    let mail_address = identity.mail_address.clone();
    let (token, exp) = sign(identity, secret)?;
    registry.insert_expiring(&mail_address, &token, exp);
    Ok(token)
}

fn sign(identity: Identity, secret: &str) -> Result<(String, i64), AppError> {
    let iat = Utc::now().timestamp();
    let exp = iat + TOKEN_LIFETIME_SECS;
    let claims = Claims {
        data: identity,
        iat,
        exp,
    };
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::internal(format!("token signing failed: {}", e)))?;
    Ok((token, exp))
}

/// authenticate
///
/// The per-request authentication state machine:
/// 1. Extract the bearer credential (`MissingCredential`).
/// 2. Verify signature and structure (`MalformedCredential`) and expiry (`ExpiredCredential`).
/// 3. Read the embedded identity.
/// 4. Require the exact `(mail address, token)` pair in the registry (`RevokedCredential`).
pub fn authenticate(
    headers: &HeaderMap,
    secret: &str,
    registry: &TokenRegistry,
) -> Result<AuthUser, AuthFailure> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthFailure::MissingCredential)?;

    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AuthFailure::ExpiredCredential,
        _ => AuthFailure::MalformedCredential,
    })?;

    let identity = token_data.claims.data;
    if !registry.is_valid(&identity.mail_address, token) {
        tracing::debug!(mail_address = %identity.mail_address, "token not in registry");
        return Err(AuthFailure::RevokedCredential);
    }

    Ok(AuthUser {
        mail_address: identity.mail_address,
        name: identity.name,
        role: identity.role,
        token: token.to_string(),
    })
}

/// AuthUser Extractor Implementation
///
/// Reuses the identity attached by `auth_middleware` when present, otherwise
/// runs `authenticate` against the configured secret and the token registry.
///
/// Rejection: an `AppError::Authentication` (401) naming the failed step.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    TokenRegistry: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }
        let registry = TokenRegistry::from_ref(state);
        let config = AppConfig::from_ref(state);
        Ok(authenticate(&parts.headers, &config.token_key, &registry)?)
    }
}

/// Single role check of the authorization gate.
pub fn authorize_admin(user: &AuthUser) -> Result<(), AppError> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(AppError::AccessDenied)
    }
}

/// auth_middleware
///
/// Enforces authentication for a route tier. On success the identity is stored
/// in the request extensions so downstream extractors skip re-verification.
pub async fn auth_middleware(auth_user: AuthUser, mut request: Request, next: Next) -> Response {
    request.extensions_mut().insert(auth_user);
    next.run(request).await
}

/// admin_middleware
///
/// Authorization gate for the admin tier. Layered inside `auth_middleware`.
pub async fn admin_middleware(
    auth_user: AuthUser,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Err(e) = authorize_admin(&auth_user) {
        tracing::warn!(mail_address = %auth_user.mail_address, "admin route refused");
        return Err(e);
    }
    Ok(next.run(request).await)
}

/// basic_credentials
///
/// Reads `Authorization: Basic base64(mail:password)`. The password may itself
/// contain `:`; only the first one separates the fields.
pub fn basic_credentials(headers: &HeaderMap) -> Result<(String, String), AppError> {
    let encoded = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Basic "))
        .ok_or(AuthFailure::MissingLogin)?;
    let decoded = STANDARD
        .decode(encoded.trim())
        .map_err(|_| AuthFailure::MissingLogin)?;
    let decoded = String::from_utf8(decoded).map_err(|_| AuthFailure::MissingLogin)?;
    let (mail_address, password) = decoded
        .split_once(':')
        .ok_or(AuthFailure::MissingLogin)?;
    if mail_address.is_empty() || password.is_empty() {
        return Err(AuthFailure::MissingLogin.into());
    }
    Ok((mail_address.to_string(), password.to_string()))
}

/// Hashes on the blocking pool; bcrypt is deliberately slow.
pub async fn hash_password(password: String, cost: u32) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AppError::internal(format!("hashing task failed: {}", e)))?
        .map_err(|e| AppError::internal(format!("hashing failed: {}", e)))
}

pub async fn verify_password(password: String, hash: String) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AppError::internal(format!("verification task failed: {}", e)))?
        .map_err(|e| AppError::internal(format!("verification failed: {}", e)))
}
