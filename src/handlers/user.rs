use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use chrono::Utc;
use serde_json::json;

use super::{ApiJson, ApiQuery};
use crate::{
    auth::{self, AuthUser, Identity},
    config::AppConfig,
    error::{AppError, AuthFailure, Conflict, Entity},
    models::{
        AdminUpdateUserRequest, MailAddressRequest, MailAddressUserQuery, RegisterRequest, Role,
        UpdatePasswordRequest, User, UserPatch, UserSummary,
    },
    picture,
    repository::RepositoryState,
    tokens::TokenRegistry,
    validation::{
        optional_text, required_text, validate_birthdate, validate_mail_address,
        validate_password, validate_role,
    },
    workflows,
};

/// Validates a registration body and stores the new account, then issues and
/// registers its first token.
async fn register_account(
    repo: &RepositoryState,
    tokens: &TokenRegistry,
    config: &AppConfig,
    body: RegisterRequest,
    role: Role,
) -> Result<String, AppError> {
    let mail_address = required_text(body.mail_address)?;
    let password = required_text(body.password)?;
    let name = required_text(body.name)?;
    let birthdate = required_text(body.birthdate)?;
    validate_mail_address(&mail_address)?;
    validate_password(&password)?;
    let birthdate = validate_birthdate(&birthdate, Utc::now().date_naive())?;

    let password = auth::hash_password(password, config.salt_rounds).await?;
    let mut uow = repo.begin().await?;
    if uow.user_exists(&mail_address).await? {
        return Err(AppError::Conflict(Conflict::AlreadyRegistered));
    }
    let user = uow
        .insert_user(&User {
            mail_address,
            password,
            name,
            birthdate,
            role,
        })
        .await?;
    uow.commit().await?;

    let token = auth::issue_session(Identity::from(&user), &config.token_key, &tokens)?;
    tracing::info!(mail_address = %user.mail_address, role = %user.role, "user registered");
    Ok(token)
}

/// login
///
/// [Public Route] Exchanges `Authorization: Basic` credentials for a bearer
/// token valid 12 hours.
#[utoipa::path(
    post,
    path = "/v1/user/login",
    responses(
        (status = 201, description = "Token issued"),
        (status = 400, description = "Invalid mail address or password format"),
        (status = 401, description = "Missing login or wrong password"),
        (status = 404, description = "Mail address not found")
    ),
    tag = "user"
)]
pub async fn login(
    State(repo): State<RepositoryState>,
    State(tokens): State<TokenRegistry>,
    State(config): State<AppConfig>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let (mail_address, password) = auth::basic_credentials(&headers)?;
    validate_mail_address(&mail_address)?;
    validate_password(&password)?;

    let mut uow = repo.begin().await?;
    let user = uow
        .get_user(&mail_address)
        .await?
        .ok_or(AppError::NotFound(Entity::MailAddress))?;
    drop(uow);

    if !auth::verify_password(password, user.password.clone()).await? {
        tracing::debug!(mail_address = %mail_address, "wrong password");
        return Err(AuthFailure::WrongPassword.into());
    }
    let token = auth::issue_session(Identity::from(&user), &config.token_key, &tokens)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Successfully logged in", "token": token })),
    ))
}

/// register
///
/// [Public Route] Self-service registration. The account always gets the
/// `user` role. A caller already holding a valid token is refused.
#[utoipa::path(
    post,
    path = "/v1/user/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User inserted, token issued"),
        (status = 400, description = "Invalid body, already registered or already logged in")
    ),
    tag = "user"
)]
pub async fn register(
    State(repo): State<RepositoryState>,
    State(tokens): State<TokenRegistry>,
    State(config): State<AppConfig>,
    headers: HeaderMap,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    if auth::authenticate(&headers, &config.token_key, &tokens).is_ok() {
        return Err(AppError::AlreadyLoggedIn);
    }
    let token = register_account(&repo, &tokens, &config, body, Role::User).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "User inserted", "token": token })),
    ))
}

/// admin_register
///
/// [Admin Route] Registration with an optional `role` (default `user`).
#[utoipa::path(
    post,
    path = "/v1/user/admin/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User inserted, token issued"),
        (status = 400, description = "Invalid body, role or already registered")
    ),
    tag = "user"
)]
pub async fn admin_register(
    State(repo): State<RepositoryState>,
    State(tokens): State<TokenRegistry>,
    State(config): State<AppConfig>,
    ApiJson(mut body): ApiJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let role = match body.role.take() {
        Some(role) => validate_role(&role)?,
        None => Role::User,
    };
    let token = register_account(&repo, &tokens, &config, body, role).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "User inserted", "token": token })),
    ))
}

#[utoipa::path(
    get,
    path = "/v1/user",
    params(MailAddressUserQuery),
    responses(
        (status = 200, description = "User found", body = UserSummary),
        (status = 404, description = "User not found")
    ),
    tag = "user"
)]
pub async fn get_user(
    State(repo): State<RepositoryState>,
    ApiQuery(query): ApiQuery<MailAddressUserQuery>,
) -> Result<impl IntoResponse, AppError> {
    let mail_address = required_text(query.mail_address_user)?;
    validate_mail_address(&mail_address)?;
    let mut uow = repo.begin().await?;
    let user = uow
        .get_user(&mail_address)
        .await?
        .ok_or(AppError::NotFound(Entity::User))?;
    Ok(Json(json!({ "user": UserSummary::from(user) })))
}

#[utoipa::path(
    get,
    path = "/v1/user/all",
    responses((status = 200, description = "Every account", body = [UserSummary])),
    tag = "user"
)]
pub async fn get_all_users(
    State(repo): State<RepositoryState>,
) -> Result<impl IntoResponse, AppError> {
    let mut uow = repo.begin().await?;
    let users = uow.get_all_users().await?;
    Ok(Json(json!({ "users": users })))
}

/// get_account
///
/// [Authenticated Route] The identity carried by the caller's token.
#[utoipa::path(
    get,
    path = "/v1/user/account",
    responses((status = 200, description = "Caller identity", body = AuthUser)),
    tag = "user"
)]
pub async fn get_account(caller: AuthUser) -> impl IntoResponse {
    Json(json!({ "user": caller }))
}

#[utoipa::path(
    get,
    path = "/v1/user/account/picture",
    responses(
        (status = 200, description = "Profile picture as a data URI"),
        (status = 404, description = "No profile picture")
    ),
    tag = "user"
)]
pub async fn get_profile_picture(
    caller: AuthUser,
    State(repo): State<RepositoryState>,
) -> Result<impl IntoResponse, AppError> {
    let mut uow = repo.begin().await?;
    let picture = uow
        .get_profile_picture(&caller.mail_address)
        .await?
        .ok_or(AppError::NotFound(Entity::ProfilePicture))?;
    Ok(Json(json!({ "profilePicture": picture })))
}

/// update_password
///
/// [Authenticated Route] Changes the caller's password after checking the current one.
#[utoipa::path(
    patch,
    path = "/v1/user/account/update",
    request_body = UpdatePasswordRequest,
    responses(
        (status = 200, description = "Password updated"),
        (status = 400, description = "Invalid body or password format"),
        (status = 401, description = "Wrong current password")
    ),
    tag = "user"
)]
pub async fn update_password(
    caller: AuthUser,
    State(repo): State<RepositoryState>,
    State(config): State<AppConfig>,
    ApiJson(body): ApiJson<UpdatePasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    let current_password = required_text(body.current_password)?;
    let new_password = required_text(body.new_password)?;
    validate_password(&new_password)?;

    let mut uow = repo.begin().await?;
    let user = uow
        .get_user(&caller.mail_address)
        .await?
        .ok_or(AppError::NotFound(Entity::User))?;
    if !auth::verify_password(current_password, user.password.clone()).await? {
        return Err(AuthFailure::WrongCurrentPassword.into());
    }
    let password = auth::hash_password(new_password, config.salt_rounds).await?;
    let user = uow
        .update_user(&caller.mail_address, &User { password, ..user })
        .await?
        .ok_or(AppError::NotFound(Entity::User))?;
    uow.commit().await?;

    Ok(Json(json!({ "message": "User updated", "user": user })))
}

/// update_profile_picture
///
/// [Authenticated Route] The raw request body is the image. It is cropped to a
/// square thumbnail and stored as a JPEG data URI.
#[utoipa::path(
    patch,
    path = "/v1/user/account/profilePicture",
    request_body(content = String, content_type = "application/octet-stream"),
    responses(
        (status = 200, description = "Profile picture updated"),
        (status = 413, description = "Picture larger than 50 KB"),
        (status = 415, description = "Body is not a decodable image")
    ),
    tag = "user"
)]
pub async fn update_profile_picture(
    caller: AuthUser,
    State(repo): State<RepositoryState>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let picture = picture::process_profile_picture(body.to_vec()).await?;
    let mut uow = repo.begin().await?;
    if !uow
        .update_profile_picture(&caller.mail_address, &picture)
        .await?
    {
        return Err(AppError::NotFound(Entity::User));
    }
    uow.commit().await?;
    Ok(Json(json!({ "message": "User updated", "profilePicture": picture })))
}

/// admin_update_user
///
/// [Admin Route] Partial update of any account. A `newUserMailAddress` renames
/// the account and carries its participations and events along.
#[utoipa::path(
    patch,
    path = "/v1/user/account/admin/update",
    request_body = AdminUpdateUserRequest,
    responses(
        (status = 200, description = "User updated"),
        (status = 400, description = "Invalid body, nothing to update or new mail already registered"),
        (status = 404, description = "User not found")
    ),
    tag = "user"
)]
pub async fn admin_update_user(
    State(repo): State<RepositoryState>,
    State(tokens): State<TokenRegistry>,
    State(config): State<AppConfig>,
    ApiJson(body): ApiJson<AdminUpdateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let target = required_text(body.user_mail_address)?;
    validate_mail_address(&target)?;
    if let Some(new_address) = &body.new_user_mail_address {
        validate_mail_address(new_address)?;
    }
    if let Some(password) = &body.password {
        validate_password(password)?;
    }
    let today = Utc::now().date_naive();
    let patch = UserPatch {
        mail_address: body.new_user_mail_address,
        name: optional_text(body.name)?,
        password: None,
        birthdate: body
            .birthdate
            .as_deref()
            .map(|birthdate| validate_birthdate(birthdate, today))
            .transpose()?,
        role: body.role.as_deref().map(validate_role).transpose()?,
    };
    let patch = match body.password {
        Some(password) => UserPatch {
            password: Some(auth::hash_password(password, config.salt_rounds).await?),
            ..patch
        },
        None => patch,
    };

    let user = workflows::update_user(repo.as_ref(), &tokens, &target, patch).await?;
    Ok(Json(json!({ "message": "User updated", "user": UserSummary::from(user) })))
}

/// delete_user
///
/// [Admin Route] Deletes an account other than the caller's. Its events are
/// handed over to the caller and its tokens stop working immediately.
#[utoipa::path(
    delete,
    path = "/v1/user/delete",
    request_body = MailAddressRequest,
    responses(
        (status = 200, description = "User deleted"),
        (status = 400, description = "Admins cannot delete themselves"),
        (status = 404, description = "User not found")
    ),
    tag = "user"
)]
pub async fn delete_user(
    caller: AuthUser,
    State(repo): State<RepositoryState>,
    State(tokens): State<TokenRegistry>,
    ApiJson(body): ApiJson<MailAddressRequest>,
) -> Result<impl IntoResponse, AppError> {
    let target = required_text(body.mail_address)?;
    validate_mail_address(&target)?;
    workflows::delete_user(repo.as_ref(), &tokens, &caller.mail_address, &target).await?;
    Ok(Json(json!({ "message": "User deleted" })))
}
