use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use serde_json::json;

use super::{ApiJson, ApiQuery, event_details};
use crate::{
    auth::AuthUser,
    error::{AppError, Conflict, Entity},
    models::{
        DateRangeQuery, EventDetails, EventIdQuery, EventIdRequest, MailAddressUserRequest,
        Participation, ParticipationListing, ParticipationPatch, ParticipationQuery,
        ParticipationRequest,
    },
    repository::{RepositoryState, UnitOfWork},
    validation::{parse_date, required, required_text, validate_mail_address},
};

/// Resolves the `(user, event)` pair addressed by an admin request, checking
/// the event first and the user second.
async fn check_pair(
    uow: &mut dyn UnitOfWork,
    mail_address: &str,
    id_event: i32,
) -> Result<(), AppError> {
    if !uow.event_exists(id_event).await? {
        return Err(AppError::NotFound(Entity::Event));
    }
    if !uow.user_exists(mail_address).await? {
        return Err(AppError::NotFound(Entity::User));
    }
    Ok(())
}

// --- Caller-scoped routes ---

/// consult_participation
///
/// [Authenticated Route] When the caller registered for one event.
#[utoipa::path(
    get,
    path = "/v1/user/reservation/consult",
    params(EventIdQuery),
    responses(
        (status = 200, description = "Register date of the caller"),
        (status = 404, description = "Event or participation not found")
    ),
    tag = "participation"
)]
pub async fn consult_participation(
    caller: AuthUser,
    State(repo): State<RepositoryState>,
    ApiQuery(query): ApiQuery<EventIdQuery>,
) -> Result<impl IntoResponse, AppError> {
    let id_event = required(query.id_event)?;
    let mut uow = repo.begin().await?;
    if !uow.event_exists(id_event).await? {
        return Err(AppError::NotFound(Entity::Event));
    }
    let participation = uow
        .get_participation(&caller.mail_address, id_event)
        .await?
        .ok_or(AppError::NotFound(Entity::Participation))?;
    Ok(Json(json!({ "registerDate": participation.register_date })))
}

/// consult_all_participations
///
/// [Authenticated Route] Every event the caller registered for, split on the
/// event's ending date into finished and upcoming events.
#[utoipa::path(
    get,
    path = "/v1/user/reservation/consult/all",
    responses((status = 200, description = "oldEvents and upcomingEvents", body = [EventDetails])),
    tag = "participation"
)]
pub async fn consult_all_participations(
    caller: AuthUser,
    State(repo): State<RepositoryState>,
) -> Result<impl IntoResponse, AppError> {
    let now = Utc::now();
    let mut uow = repo.begin().await?;
    let mut old_events = Vec::new();
    let mut upcoming_events = Vec::new();
    for participation in uow.get_participations_for_user(&caller.mail_address).await? {
        let Some(event) = uow.get_event(participation.id_event).await? else {
            continue;
        };
        let details = event_details(uow.as_mut(), event).await?;
        if details.event.ending_date < now {
            old_events.push(details);
        } else {
            upcoming_events.push(details);
        }
    }
    Ok(Json(json!({
        "oldEvents": old_events,
        "upcomingEvents": upcoming_events
    })))
}

/// consult_participations_between
///
/// [Authenticated Route] The caller's participations whose event overlaps
/// `[startingDate, endingDate]`.
#[utoipa::path(
    get,
    path = "/v1/user/reservation/consult/between",
    params(DateRangeQuery),
    responses(
        (status = 200, description = "Overlapping participations", body = [Participation]),
        (status = 400, description = "Missing, invalid or incoherent dates")
    ),
    tag = "participation"
)]
pub async fn consult_participations_between(
    caller: AuthUser,
    State(repo): State<RepositoryState>,
    ApiQuery(query): ApiQuery<DateRangeQuery>,
) -> Result<impl IntoResponse, AppError> {
    let starting = parse_date(&required_text(query.starting_date)?)?;
    let ending = parse_date(&required_text(query.ending_date)?)?;
    if ending <= starting {
        return Err(AppError::IncoherentDates);
    }
    let mut uow = repo.begin().await?;
    let participations = uow
        .get_participations_for_user_between(&caller.mail_address, starting, ending)
        .await?;
    Ok(Json(json!({ "participations": participations })))
}

#[utoipa::path(
    post,
    path = "/v1/user/reservation/add",
    request_body = EventIdRequest,
    responses(
        (status = 201, description = "Participation created"),
        (status = 400, description = "Already registered for this event"),
        (status = 404, description = "Event not found")
    ),
    tag = "participation"
)]
pub async fn add_participation(
    caller: AuthUser,
    State(repo): State<RepositoryState>,
    ApiJson(body): ApiJson<EventIdRequest>,
) -> Result<impl IntoResponse, AppError> {
    let id_event = required(body.id_event)?;
    let mut uow = repo.begin().await?;
    if !uow.event_exists(id_event).await? {
        return Err(AppError::NotFound(Entity::Event));
    }
    if uow.participation_exists(&caller.mail_address, id_event).await? {
        return Err(AppError::Conflict(Conflict::ParticipationExists));
    }
    let participation = uow
        .insert_participation(&Participation {
            mail_address_user: caller.mail_address.clone(),
            id_event,
            register_date: Utc::now(),
        })
        .await?;
    uow.commit().await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Participation created", "participation": participation })),
    ))
}

#[utoipa::path(
    delete,
    path = "/v1/user/reservation/delete",
    request_body = EventIdRequest,
    responses(
        (status = 200, description = "Participation deleted"),
        (status = 404, description = "Event or participation not found")
    ),
    tag = "participation"
)]
pub async fn delete_participation(
    caller: AuthUser,
    State(repo): State<RepositoryState>,
    ApiJson(body): ApiJson<EventIdRequest>,
) -> Result<impl IntoResponse, AppError> {
    let id_event = required(body.id_event)?;
    let mut uow = repo.begin().await?;
    if !uow.event_exists(id_event).await? {
        return Err(AppError::NotFound(Entity::Event));
    }
    if !uow.delete_participation(&caller.mail_address, id_event).await? {
        return Err(AppError::NotFound(Entity::Participation));
    }
    uow.commit().await?;
    Ok(Json(json!({ "message": "Participation deleted" })))
}

/// count_participations_for_event
///
/// [Authenticated Route] Number of registrations for one event.
#[utoipa::path(
    get,
    path = "/v1/event/reservation/count",
    params(EventIdQuery),
    responses(
        (status = 200, description = "participationInfos.participation_count"),
        (status = 404, description = "Event not found")
    ),
    tag = "participation"
)]
pub async fn count_participations_for_event(
    State(repo): State<RepositoryState>,
    ApiQuery(query): ApiQuery<EventIdQuery>,
) -> Result<impl IntoResponse, AppError> {
    let id_event = required(query.id_event)?;
    let mut uow = repo.begin().await?;
    if !uow.event_exists(id_event).await? {
        return Err(AppError::NotFound(Entity::Event));
    }
    let count = uow.count_participations_for_event(id_event).await?;
    Ok(Json(json!({ "participationInfos": { "participation_count": count } })))
}

// --- Admin routes ---

#[utoipa::path(
    get,
    path = "/v1/event/reservation",
    params(ParticipationQuery),
    responses(
        (status = 200, description = "Register date of the user"),
        (status = 404, description = "Event, user or participation not found")
    ),
    tag = "participation"
)]
pub async fn get_participation(
    State(repo): State<RepositoryState>,
    ApiQuery(query): ApiQuery<ParticipationQuery>,
) -> Result<impl IntoResponse, AppError> {
    let mail_address = required_text(query.mail_address)?;
    let id_event = required(query.id_event)?;
    validate_mail_address(&mail_address)?;

    let mut uow = repo.begin().await?;
    check_pair(uow.as_mut(), &mail_address, id_event).await?;
    let participation = uow
        .get_participation(&mail_address, id_event)
        .await?
        .ok_or(AppError::NotFound(Entity::Participation))?;
    Ok(Json(json!({ "registerDate": participation.register_date })))
}

#[utoipa::path(
    get,
    path = "/v1/user/reservation/all",
    responses((status = 200, description = "Every participation with its event name", body = [ParticipationListing])),
    tag = "participation"
)]
pub async fn get_all_participations(
    State(repo): State<RepositoryState>,
) -> Result<impl IntoResponse, AppError> {
    let mut uow = repo.begin().await?;
    let participations = uow.get_all_participations().await?;
    Ok(Json(json!({ "participations": participations })))
}

#[utoipa::path(
    get,
    path = "/v1/event/reservation/consult/all",
    params(EventIdQuery),
    responses(
        (status = 200, description = "Participations of the event", body = [Participation]),
        (status = 404, description = "Event not found")
    ),
    tag = "participation"
)]
pub async fn get_participations_for_event(
    State(repo): State<RepositoryState>,
    ApiQuery(query): ApiQuery<EventIdQuery>,
) -> Result<impl IntoResponse, AppError> {
    let id_event = required(query.id_event)?;
    let mut uow = repo.begin().await?;
    if !uow.event_exists(id_event).await? {
        return Err(AppError::NotFound(Entity::Event));
    }
    let participations = uow.get_participations_for_event(id_event).await?;
    Ok(Json(json!({ "participations": participations })))
}

/// admin_add_participation
///
/// [Admin Route] Registers any user for any event. `registerDate` defaults to now.
#[utoipa::path(
    post,
    path = "/v1/user/reservation/admin/add",
    request_body = ParticipationRequest,
    responses(
        (status = 201, description = "Participation created"),
        (status = 400, description = "Invalid body or already registered"),
        (status = 404, description = "Event or user not found")
    ),
    tag = "participation"
)]
pub async fn admin_add_participation(
    State(repo): State<RepositoryState>,
    ApiJson(body): ApiJson<ParticipationRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mail_address = required_text(body.mail_address)?;
    let id_event = required(body.id_event)?;
    validate_mail_address(&mail_address)?;
    let register_date = match body.register_date.as_deref() {
        Some(date) => parse_date(date)?,
        None => Utc::now(),
    };

    let mut uow = repo.begin().await?;
    check_pair(uow.as_mut(), &mail_address, id_event).await?;
    if uow.participation_exists(&mail_address, id_event).await? {
        return Err(AppError::Conflict(Conflict::ParticipationExists));
    }
    let participation = uow
        .insert_participation(&Participation {
            mail_address_user: mail_address,
            id_event,
            register_date,
        })
        .await?;
    uow.commit().await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Participation created", "participation": participation })),
    ))
}

/// update_participation
///
/// [Admin Route] Moves a participation to `newMailAddress` and/or `newIdEvent`,
/// or re-dates it with `registerDate`. The target pair must be free.
#[utoipa::path(
    patch,
    path = "/v1/user/reservation/update",
    request_body = ParticipationRequest,
    responses(
        (status = 200, description = "Participation updated"),
        (status = 400, description = "Invalid body, nothing to update or target already registered"),
        (status = 404, description = "Event, user or participation not found")
    ),
    tag = "participation"
)]
pub async fn update_participation(
    State(repo): State<RepositoryState>,
    ApiJson(body): ApiJson<ParticipationRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mail_address = required_text(body.mail_address)?;
    let id_event = required(body.id_event)?;
    validate_mail_address(&mail_address)?;
    let patch = ParticipationPatch {
        mail_address_user: body.new_mail_address,
        id_event: body.new_id_event,
        register_date: body.register_date.as_deref().map(parse_date).transpose()?,
    };
    if patch.is_empty() {
        return Err(AppError::NothingToUpdate);
    }
    if let Some(new_address) = &patch.mail_address_user {
        validate_mail_address(new_address)?;
    }

    let mut uow = repo.begin().await?;
    check_pair(uow.as_mut(), &mail_address, id_event).await?;
    let current = uow
        .get_participation(&mail_address, id_event)
        .await?
        .ok_or(AppError::NotFound(Entity::Participation))?;
    let target = patch.apply(current);
    let moved = target.mail_address_user != mail_address || target.id_event != id_event;
    if moved {
        check_pair(uow.as_mut(), &target.mail_address_user, target.id_event).await?;
        if uow
            .participation_exists(&target.mail_address_user, target.id_event)
            .await?
        {
            return Err(AppError::Conflict(Conflict::ParticipationExists));
        }
    }
    let participation = uow
        .update_participation(&mail_address, id_event, &target)
        .await?
        .ok_or(AppError::NotFound(Entity::Participation))?;
    uow.commit().await?;

    Ok(Json(json!({ "message": "Participation updated", "participation": participation })))
}

#[utoipa::path(
    delete,
    path = "/v1/user/reservation/admin/delete",
    request_body = ParticipationRequest,
    responses(
        (status = 200, description = "Participation deleted"),
        (status = 404, description = "Event, user or participation not found")
    ),
    tag = "participation"
)]
pub async fn admin_delete_participation(
    State(repo): State<RepositoryState>,
    ApiJson(body): ApiJson<ParticipationRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mail_address = required_text(body.mail_address)?;
    let id_event = required(body.id_event)?;
    validate_mail_address(&mail_address)?;

    let mut uow = repo.begin().await?;
    check_pair(uow.as_mut(), &mail_address, id_event).await?;
    if !uow.delete_participation(&mail_address, id_event).await? {
        return Err(AppError::NotFound(Entity::Participation));
    }
    uow.commit().await?;
    Ok(Json(json!({ "message": "Participation deleted" })))
}

#[utoipa::path(
    delete,
    path = "/v1/user/reservation/delete/all",
    request_body = MailAddressUserRequest,
    responses(
        (status = 200, description = "Every participation of the user deleted"),
        (status = 404, description = "User not found")
    ),
    tag = "participation"
)]
pub async fn delete_all_participations_for_user(
    State(repo): State<RepositoryState>,
    ApiJson(body): ApiJson<MailAddressUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mail_address = required_text(body.mail_address_user)?;
    validate_mail_address(&mail_address)?;

    let mut uow = repo.begin().await?;
    if !uow.user_exists(&mail_address).await? {
        return Err(AppError::NotFound(Entity::User));
    }
    let deleted = uow.delete_participations_for_user(&mail_address).await?;
    uow.commit().await?;

    tracing::info!(mail_address = %mail_address, deleted, "user participations deleted");
    Ok(Json(json!({ "message": "All user participations deleted" })))
}

#[utoipa::path(
    delete,
    path = "/v1/event/reservation/delete/all",
    request_body = EventIdRequest,
    responses(
        (status = 200, description = "Every participation of the event deleted"),
        (status = 404, description = "Event not found")
    ),
    tag = "participation"
)]
pub async fn delete_all_participations_for_event(
    State(repo): State<RepositoryState>,
    ApiJson(body): ApiJson<EventIdRequest>,
) -> Result<impl IntoResponse, AppError> {
    let id_event = required(body.id_event)?;
    let mut uow = repo.begin().await?;
    if !uow.event_exists(id_event).await? {
        return Err(AppError::NotFound(Entity::Event));
    }
    let deleted = uow.delete_participations_for_event(id_event).await?;
    uow.commit().await?;

    tracing::info!(id_event, deleted, "event participations deleted");
    Ok(Json(json!({ "message": "All event participations deleted" })))
}
