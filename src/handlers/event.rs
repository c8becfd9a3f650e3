use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use serde_json::json;

use super::{ApiJson, ApiQuery, event_details, events_details};
use crate::{
    auth::AuthUser,
    error::{AppError, Entity},
    models::{
        EventDetails, EventIdQuery, EventIdRequest, EventPatch, EventRequest, EventSearchQuery,
        NewEvent, PopularQuery,
    },
    repository::RepositoryState,
    validation::{optional_text, parse_date, required, required_text, validate_mail_address},
    workflows,
};

const DEFAULT_TOP_NUMBER: i64 = 5;

/// Business rules every stored event satisfies, checked after merging updates.
fn check_event(event: &NewEvent) -> Result<(), AppError> {
    let valid = (1000..=9998).contains(&event.postal_code)
        && (1..=5).contains(&event.security_level)
        && event.max_place_count > 0
        && event.ending_date > event.starting_date;
    if valid {
        Ok(())
    } else {
        Err(AppError::InvalidRequest)
    }
}

/// get_event
///
/// [Authenticated Route] One event with its participation and stand counts.
#[utoipa::path(
    get,
    path = "/v1/event",
    params(EventIdQuery),
    responses(
        (status = 200, description = "Event found", body = EventDetails),
        (status = 400, description = "Missing or mistyped idEvent"),
        (status = 404, description = "Event not found")
    ),
    tag = "event"
)]
pub async fn get_event(
    State(repo): State<RepositoryState>,
    ApiQuery(query): ApiQuery<EventIdQuery>,
) -> Result<impl IntoResponse, AppError> {
    let id_event = required(query.id_event)?;
    let mut uow = repo.begin().await?;
    let event = uow
        .get_event(id_event)
        .await?
        .ok_or(AppError::NotFound(Entity::Event))?;
    let event = event_details(uow.as_mut(), event).await?;
    Ok(Json(json!({ "event": event })))
}

#[utoipa::path(
    get,
    path = "/v1/event/all",
    responses((status = 200, description = "Every event with its counts", body = [EventDetails])),
    tag = "event"
)]
pub async fn get_all_events(
    State(repo): State<RepositoryState>,
) -> Result<impl IntoResponse, AppError> {
    let mut uow = repo.begin().await?;
    let events = uow.get_all_events().await?;
    let events = events_details(uow.as_mut(), events).await?;
    Ok(Json(json!({ "events": events })))
}

/// search_events
///
/// [Authenticated Route] With `date`, the events in progress at that instant;
/// without it, the events that are not finished yet. `city` narrows either
/// search, ignoring case.
#[utoipa::path(
    get,
    path = "/v1/event/search",
    params(EventSearchQuery),
    responses(
        (status = 200, description = "Matching events"),
        (status = 400, description = "Invalid date")
    ),
    tag = "event"
)]
pub async fn search_events(
    State(repo): State<RepositoryState>,
    ApiQuery(query): ApiQuery<EventSearchQuery>,
) -> Result<impl IntoResponse, AppError> {
    let city = query.city.as_deref().map(str::trim).filter(|c| !c.is_empty());
    let date = query.date.as_deref().map(parse_date).transpose()?;

    let mut uow = repo.begin().await?;
    let events = match date {
        Some(date) => uow.search_events(date, city).await?,
        None => uow.search_upcoming_events(Utc::now(), city).await?,
    };
    Ok(Json(json!({ "events": events })))
}

/// get_popular_events
///
/// [Authenticated Route] The `topNumber` (default 5) events with the most
/// participations, most popular first.
#[utoipa::path(
    get,
    path = "/v1/event/popular",
    params(PopularQuery),
    responses(
        (status = 200, description = "Ranked events", body = [EventDetails]),
        (status = 400, description = "topNumber below 1")
    ),
    tag = "event"
)]
pub async fn get_popular_events(
    State(repo): State<RepositoryState>,
    ApiQuery(query): ApiQuery<PopularQuery>,
) -> Result<impl IntoResponse, AppError> {
    let top = query.top_number.unwrap_or(DEFAULT_TOP_NUMBER);
    if top < 1 {
        return Err(AppError::InvalidRequest);
    }
    let mut uow = repo.begin().await?;
    let mut events = Vec::new();
    for ranked in uow.get_most_popular_events(top).await? {
        if let Some(event) = uow.get_event(ranked.id_event).await? {
            events.push(EventDetails {
                event,
                count: ranked.count,
                stand_count: uow.count_stands_for_event(ranked.id_event).await?,
            });
        }
    }
    Ok(Json(json!({ "events": events })))
}

/// add_event
///
/// [Admin Route] Creates an event. The three flags default to `true` and the
/// creator defaults to the caller; any other creator must be a known user.
#[utoipa::path(
    post,
    path = "/v1/event/add",
    request_body = EventRequest,
    responses(
        (status = 201, description = "Event created"),
        (status = 400, description = "Invalid body, types, dates or mail address"),
        (status = 404, description = "Creator not found")
    ),
    tag = "event"
)]
pub async fn add_event(
    caller: AuthUser,
    State(repo): State<RepositoryState>,
    ApiJson(body): ApiJson<EventRequest>,
) -> Result<impl IntoResponse, AppError> {
    let event = NewEvent {
        name: required_text(body.name)?,
        starting_date: parse_date(&required_text(body.starting_date)?)?,
        ending_date: parse_date(&required_text(body.ending_date)?)?,
        street_name: required_text(body.street_name)?,
        house_number: body.house_number,
        postal_code: required(body.postal_code)?,
        city: required_text(body.city)?,
        children_accepted: body.children_accepted.unwrap_or(true),
        description: required_text(body.description)?,
        event_type: required_text(body.event_type)?,
        security_level: required(body.security_level)?,
        require_mask: body.require_mask.unwrap_or(true),
        require_covid_safe_ticket: body.require_covid_safe_ticket.unwrap_or(true),
        max_place_count: required(body.max_place_count)?,
        mail_address_creator: body
            .mail_address_creator
            .unwrap_or_else(|| caller.mail_address.clone()),
    };
    validate_mail_address(&event.mail_address_creator)?;
    check_event(&event)?;

    let mut uow = repo.begin().await?;
    if event.mail_address_creator != caller.mail_address
        && !uow.user_exists(&event.mail_address_creator).await?
    {
        return Err(AppError::NotFound(Entity::Creator));
    }
    let event = uow.insert_event(&event).await?;
    uow.commit().await?;

    tracing::info!(id_event = event.id, "event created");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Event created", "event": event })),
    ))
}

/// update_event
///
/// [Admin Route] Partial update: omitted fields keep their stored value. The
/// merged event must still satisfy every creation rule.
#[utoipa::path(
    patch,
    path = "/v1/event/update",
    request_body = EventRequest,
    responses(
        (status = 200, description = "Event updated"),
        (status = 400, description = "Invalid body, nothing to update"),
        (status = 404, description = "Event or creator not found")
    ),
    tag = "event"
)]
pub async fn update_event(
    State(repo): State<RepositoryState>,
    ApiJson(body): ApiJson<EventRequest>,
) -> Result<impl IntoResponse, AppError> {
    let id_event = required(body.id_event)?;
    let patch = EventPatch {
        name: optional_text(body.name)?,
        starting_date: body.starting_date.as_deref().map(parse_date).transpose()?,
        ending_date: body.ending_date.as_deref().map(parse_date).transpose()?,
        street_name: optional_text(body.street_name)?,
        house_number: body.house_number,
        postal_code: body.postal_code,
        city: optional_text(body.city)?,
        children_accepted: body.children_accepted,
        description: optional_text(body.description)?,
        event_type: optional_text(body.event_type)?,
        security_level: body.security_level,
        require_mask: body.require_mask,
        require_covid_safe_ticket: body.require_covid_safe_ticket,
        max_place_count: body.max_place_count,
        mail_address_creator: body.mail_address_creator,
    };
    if patch.is_empty() {
        return Err(AppError::NothingToUpdate);
    }
    if let Some(creator) = &patch.mail_address_creator {
        validate_mail_address(creator)?;
    }

    let mut uow = repo.begin().await?;
    if let Some(creator) = &patch.mail_address_creator {
        if !uow.user_exists(creator).await? {
            return Err(AppError::NotFound(Entity::Creator));
        }
    }
    let current = uow
        .get_event(id_event)
        .await?
        .ok_or(AppError::NotFound(Entity::Event))?;
    let merged = patch.apply(current);
    check_event(&merged)?;
    let event = uow
        .update_event(id_event, &merged)
        .await?
        .ok_or(AppError::NotFound(Entity::Event))?;
    uow.commit().await?;

    Ok(Json(json!({ "message": "Event updated", "event": event })))
}

/// delete_event
///
/// [Admin Route] Cascading delete: participations, stands and their objects go with the event.
#[utoipa::path(
    delete,
    path = "/v1/event/delete",
    request_body = EventIdRequest,
    responses(
        (status = 200, description = "Event deleted"),
        (status = 404, description = "Event not found")
    ),
    tag = "event"
)]
pub async fn delete_event(
    State(repo): State<RepositoryState>,
    ApiJson(body): ApiJson<EventIdRequest>,
) -> Result<impl IntoResponse, AppError> {
    let id_event = required(body.id_event)?;
    workflows::delete_event(repo.as_ref(), id_event).await?;
    Ok(Json(json!({ "message": "Event deleted" })))
}
