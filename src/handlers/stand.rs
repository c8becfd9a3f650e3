use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;

use super::{ApiJson, ApiQuery};
use crate::{
    error::{AppError, Entity},
    models::{
        EventIdQuery, EventIdRequest, NewStand, Stand, StandIdQuery, StandIdRequest, StandPatch,
        StandRequest,
    },
    repository::RepositoryState,
    validation::{optional_text, required, required_text},
    workflows,
};

fn check_area(area_size: f64) -> Result<(), AppError> {
    if area_size > 0.0 {
        Ok(())
    } else {
        Err(AppError::InvalidRequest)
    }
}

#[utoipa::path(
    get,
    path = "/v1/event/stand/get",
    params(StandIdQuery),
    responses(
        (status = 200, description = "Stand found", body = Stand),
        (status = 404, description = "Stand not found")
    ),
    tag = "stand"
)]
pub async fn get_stand(
    State(repo): State<RepositoryState>,
    ApiQuery(query): ApiQuery<StandIdQuery>,
) -> Result<impl IntoResponse, AppError> {
    let id_stand = required(query.id_stand)?;
    let mut uow = repo.begin().await?;
    let stand = uow
        .get_stand(id_stand)
        .await?
        .ok_or(AppError::NotFound(Entity::Stand))?;
    Ok(Json(json!({ "stand": stand })))
}

#[utoipa::path(
    get,
    path = "/v1/event/stand/all",
    responses((status = 200, description = "Every stand", body = [Stand])),
    tag = "stand"
)]
pub async fn get_all_stands(
    State(repo): State<RepositoryState>,
) -> Result<impl IntoResponse, AppError> {
    let mut uow = repo.begin().await?;
    let stands = uow.get_all_stands().await?;
    Ok(Json(json!({ "stands": stands })))
}

#[utoipa::path(
    get,
    path = "/v1/event/stand/get/all",
    params(EventIdQuery),
    responses(
        (status = 200, description = "Stands of the event", body = [Stand]),
        (status = 404, description = "Event not found")
    ),
    tag = "stand"
)]
pub async fn get_stands_for_event(
    State(repo): State<RepositoryState>,
    ApiQuery(query): ApiQuery<EventIdQuery>,
) -> Result<impl IntoResponse, AppError> {
    let id_event = required(query.id_event)?;
    let mut uow = repo.begin().await?;
    if !uow.event_exists(id_event).await? {
        return Err(AppError::NotFound(Entity::Event));
    }
    let stands = uow.get_stands_for_event(id_event).await?;
    Ok(Json(json!({ "stands": stands })))
}

/// add_stand
///
/// [Admin Route] Adds a stand to an existing event. The area must be positive.
#[utoipa::path(
    post,
    path = "/v1/event/stand/add",
    request_body = StandRequest,
    responses(
        (status = 201, description = "Stand created"),
        (status = 400, description = "Invalid body"),
        (status = 404, description = "Event not found")
    ),
    tag = "stand"
)]
pub async fn add_stand(
    State(repo): State<RepositoryState>,
    ApiJson(body): ApiJson<StandRequest>,
) -> Result<impl IntoResponse, AppError> {
    let stand = NewStand {
        stand_type: required_text(body.stand_type)?,
        manager_name: required_text(body.manager_name)?,
        area_size: required(body.area_size)?,
        id_event: required(body.id_event)?,
    };
    check_area(stand.area_size)?;

    let mut uow = repo.begin().await?;
    if !uow.event_exists(stand.id_event).await? {
        return Err(AppError::NotFound(Entity::Event));
    }
    let stand = uow.insert_stand(&stand).await?;
    uow.commit().await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Stand created", "stand": stand })),
    ))
}

/// update_stand
///
/// [Admin Route] Partial update; moving the stand requires the target event to exist.
#[utoipa::path(
    patch,
    path = "/v1/event/stand/update",
    request_body = StandRequest,
    responses(
        (status = 200, description = "Stand updated"),
        (status = 400, description = "Invalid body or nothing to update"),
        (status = 404, description = "Stand or event not found")
    ),
    tag = "stand"
)]
pub async fn update_stand(
    State(repo): State<RepositoryState>,
    ApiJson(body): ApiJson<StandRequest>,
) -> Result<impl IntoResponse, AppError> {
    let id_stand = required(body.id_stand)?;
    let patch = StandPatch {
        stand_type: optional_text(body.stand_type)?,
        manager_name: optional_text(body.manager_name)?,
        area_size: body.area_size,
        id_event: body.id_event,
    };
    if patch.is_empty() {
        return Err(AppError::NothingToUpdate);
    }
    if let Some(area_size) = patch.area_size {
        check_area(area_size)?;
    }

    let mut uow = repo.begin().await?;
    if let Some(id_event) = patch.id_event {
        if !uow.event_exists(id_event).await? {
            return Err(AppError::NotFound(Entity::Event));
        }
    }
    let current = uow
        .get_stand(id_stand)
        .await?
        .ok_or(AppError::NotFound(Entity::Stand))?;
    let stand = uow
        .update_stand(id_stand, &patch.apply(current))
        .await?
        .ok_or(AppError::NotFound(Entity::Stand))?;
    uow.commit().await?;

    Ok(Json(json!({ "message": "Stand updated", "stand": stand })))
}

#[utoipa::path(
    delete,
    path = "/v1/event/stand/delete",
    request_body = StandIdRequest,
    responses(
        (status = 200, description = "Stand and its objects deleted"),
        (status = 404, description = "Stand not found")
    ),
    tag = "stand"
)]
pub async fn delete_stand(
    State(repo): State<RepositoryState>,
    ApiJson(body): ApiJson<StandIdRequest>,
) -> Result<impl IntoResponse, AppError> {
    let id_stand = required(body.id_stand)?;
    workflows::delete_stand(repo.as_ref(), id_stand).await?;
    Ok(Json(json!({ "message": "Stand deleted" })))
}

#[utoipa::path(
    delete,
    path = "/v1/event/stand/delete/all",
    request_body = EventIdRequest,
    responses(
        (status = 200, description = "Every stand of the event deleted"),
        (status = 404, description = "Event not found")
    ),
    tag = "stand"
)]
pub async fn delete_all_stands_for_event(
    State(repo): State<RepositoryState>,
    ApiJson(body): ApiJson<EventIdRequest>,
) -> Result<impl IntoResponse, AppError> {
    let id_event = required(body.id_event)?;
    workflows::delete_all_stands_for_event(repo.as_ref(), id_event).await?;
    Ok(Json(json!({ "message": "All event stands deleted" })))
}
