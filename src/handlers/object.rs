use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;

use super::{ApiJson, ApiQuery};
use crate::{
    error::{AppError, Conflict, Entity},
    models::{ObjectListing, ObjectPair, ObjectRequest, Product, StandIdQuery},
    repository::{RepositoryState, UnitOfWork},
    validation::required,
};

fn pair_of(body: &ObjectRequest) -> Result<ObjectPair, AppError> {
    Ok(ObjectPair {
        id_stand: required(body.id_stand)?,
        id_product: required(body.id_product)?,
    })
}

/// Both ends of a pair must exist before it can be stored.
async fn check_ends(uow: &mut dyn UnitOfWork, pair: ObjectPair) -> Result<(), AppError> {
    if !uow.stand_exists(pair.id_stand).await? {
        return Err(AppError::NotFound(Entity::Stand));
    }
    if !uow.product_exists(pair.id_product).await? {
        return Err(AppError::NotFound(Entity::Product));
    }
    Ok(())
}

/// get_products_for_stand
///
/// [Authenticated Route] The products sold at one stand.
#[utoipa::path(
    get,
    path = "/v1/event/stand/product",
    params(StandIdQuery),
    responses(
        (status = 200, description = "Products of the stand", body = [Product]),
        (status = 404, description = "Stand not found")
    ),
    tag = "object"
)]
pub async fn get_products_for_stand(
    State(repo): State<RepositoryState>,
    ApiQuery(query): ApiQuery<StandIdQuery>,
) -> Result<impl IntoResponse, AppError> {
    let id_stand = required(query.id_stand)?;
    let mut uow = repo.begin().await?;
    if !uow.stand_exists(id_stand).await? {
        return Err(AppError::NotFound(Entity::Stand));
    }
    let products = uow.get_products_for_stand(id_stand).await?;
    Ok(Json(json!({ "products": products })))
}

#[utoipa::path(
    get,
    path = "/v1/event/stand/product/all",
    responses((status = 200, description = "Every stand/product pair", body = [ObjectListing])),
    tag = "object"
)]
pub async fn get_all_objects(
    State(repo): State<RepositoryState>,
) -> Result<impl IntoResponse, AppError> {
    let mut uow = repo.begin().await?;
    let objects = uow.get_all_objects().await?;
    Ok(Json(json!({ "objects": objects })))
}

#[utoipa::path(
    post,
    path = "/v1/event/stand/product/add",
    request_body = ObjectRequest,
    responses(
        (status = 201, description = "Product now sold at the stand"),
        (status = 400, description = "Pair already registered"),
        (status = 404, description = "Stand or product not found")
    ),
    tag = "object"
)]
pub async fn add_object(
    State(repo): State<RepositoryState>,
    ApiJson(body): ApiJson<ObjectRequest>,
) -> Result<impl IntoResponse, AppError> {
    let pair = pair_of(&body)?;
    let mut uow = repo.begin().await?;
    check_ends(uow.as_mut(), pair).await?;
    if uow.object_exists(pair).await? {
        return Err(AppError::Conflict(Conflict::ObjectExists));
    }
    let object = uow.insert_object(pair).await?;
    uow.commit().await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Object inserted for the stand", "object": object })),
    ))
}

/// update_object
///
/// [Admin Route] Moves a pair to another stand and/or product. The target pair
/// must not exist yet.
#[utoipa::path(
    patch,
    path = "/v1/event/stand/product/update",
    request_body = ObjectRequest,
    responses(
        (status = 200, description = "Pair moved"),
        (status = 400, description = "Nothing to update or target pair already registered"),
        (status = 404, description = "Object, stand or product not found")
    ),
    tag = "object"
)]
pub async fn update_object(
    State(repo): State<RepositoryState>,
    ApiJson(body): ApiJson<ObjectRequest>,
) -> Result<impl IntoResponse, AppError> {
    let current = pair_of(&body)?;
    if body.new_id_stand.is_none() && body.new_id_product.is_none() {
        return Err(AppError::NothingToUpdate);
    }
    let target = ObjectPair {
        id_stand: body.new_id_stand.unwrap_or(current.id_stand),
        id_product: body.new_id_product.unwrap_or(current.id_product),
    };

    let mut uow = repo.begin().await?;
    if !uow.object_exists(current).await? {
        return Err(AppError::NotFound(Entity::Object));
    }
    check_ends(uow.as_mut(), target).await?;
    if target != current && uow.object_exists(target).await? {
        return Err(AppError::Conflict(Conflict::ObjectExists));
    }
    let object = uow
        .update_object(current, target)
        .await?
        .ok_or(AppError::NotFound(Entity::Object))?;
    uow.commit().await?;

    Ok(Json(json!({ "message": "Object updated from the stand", "object": object })))
}

#[utoipa::path(
    delete,
    path = "/v1/event/stand/product/delete",
    request_body = ObjectRequest,
    responses(
        (status = 200, description = "Pair deleted"),
        (status = 404, description = "Object not found")
    ),
    tag = "object"
)]
pub async fn delete_object(
    State(repo): State<RepositoryState>,
    ApiJson(body): ApiJson<ObjectRequest>,
) -> Result<impl IntoResponse, AppError> {
    let pair = pair_of(&body)?;
    let mut uow = repo.begin().await?;
    if !uow.delete_object(pair).await? {
        return Err(AppError::NotFound(Entity::Object));
    }
    uow.commit().await?;
    Ok(Json(json!({ "message": "Object deleted from the stand" })))
}
