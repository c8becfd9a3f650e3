use axum::{
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::request::Parts,
};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{
    error::AppError,
    models::{Event, EventDetails},
    repository::UnitOfWork,
    validation::validate_types,
};

pub mod event;
pub mod object;
pub mod participation;
pub mod product;
pub mod stand;
pub mod user;

/// ApiJson
///
/// JSON body extractor speaking the API's error vocabulary: a body that is not
/// a JSON object is an `InvalidRequest`, a field of the wrong primitive type
/// is `InvalidTypes`. Content-Type is not enforced.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(request, state)
            .await
            .map_err(|_| AppError::InvalidRequest)?;
        let value: Value = serde_json::from_slice(&bytes).map_err(|_| AppError::InvalidRequest)?;
        validate_types(value).map(ApiJson)
    }
}

/// ApiQuery
///
/// Query string extractor. Every parameter struct is all-`Option`, so the only
/// way decoding fails is a value that does not parse as its declared type.
pub struct ApiQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| {
                tracing::debug!("query rejected: {}", e);
                AppError::InvalidTypes
            })?;
        Ok(ApiQuery(value))
    }
}

/// Adds the participation count and stand count served by the event read endpoints.
pub(crate) async fn event_details(
    uow: &mut dyn UnitOfWork,
    event: Event,
) -> Result<EventDetails, AppError> {
    let count = uow.count_participations_for_event(event.id).await?;
    let stand_count = uow.count_stands_for_event(event.id).await?;
    Ok(EventDetails {
        event,
        count,
        stand_count,
    })
}

pub(crate) async fn events_details(
    uow: &mut dyn UnitOfWork,
    events: Vec<Event>,
) -> Result<Vec<EventDetails>, AppError> {
    let mut details = Vec::with_capacity(events.len());
    for event in events {
        details.push(event_details(uow, event).await?);
    }
    Ok(details)
}
