use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;

use super::{ApiJson, ApiQuery};
use crate::{
    error::{AppError, Entity},
    models::{NewProduct, Product, ProductIdQuery, ProductIdRequest, ProductPatch, ProductRequest},
    repository::RepositoryState,
    validation::{optional_text, required, required_text},
    workflows,
};

fn check_price(price: f64) -> Result<(), AppError> {
    if price >= 0.0 {
        Ok(())
    } else {
        Err(AppError::InvalidRequest)
    }
}

#[utoipa::path(
    get,
    path = "/v1/product/get",
    params(ProductIdQuery),
    responses(
        (status = 200, description = "Product found", body = Product),
        (status = 404, description = "Product not found")
    ),
    tag = "product"
)]
pub async fn get_product(
    State(repo): State<RepositoryState>,
    ApiQuery(query): ApiQuery<ProductIdQuery>,
) -> Result<impl IntoResponse, AppError> {
    let id_product = required(query.id_product)?;
    let mut uow = repo.begin().await?;
    let product = uow
        .get_product(id_product)
        .await?
        .ok_or(AppError::NotFound(Entity::Product))?;
    Ok(Json(json!({ "product": product })))
}

#[utoipa::path(
    get,
    path = "/v1/product/all",
    responses((status = 200, description = "Every product", body = [Product])),
    tag = "product"
)]
pub async fn get_all_products(
    State(repo): State<RepositoryState>,
) -> Result<impl IntoResponse, AppError> {
    let mut uow = repo.begin().await?;
    let products = uow.get_all_products().await?;
    Ok(Json(json!({ "products": products })))
}

#[utoipa::path(
    post,
    path = "/v1/product/add",
    request_body = ProductRequest,
    responses(
        (status = 201, description = "Product created"),
        (status = 400, description = "Invalid body or negative price")
    ),
    tag = "product"
)]
pub async fn add_product(
    State(repo): State<RepositoryState>,
    ApiJson(body): ApiJson<ProductRequest>,
) -> Result<impl IntoResponse, AppError> {
    let product = NewProduct {
        name: required_text(body.name)?,
        description: required_text(body.description)?,
        price: required(body.price)?,
    };
    check_price(product.price)?;

    let mut uow = repo.begin().await?;
    let product = uow.insert_product(&product).await?;
    uow.commit().await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Product created", "product": product })),
    ))
}

#[utoipa::path(
    patch,
    path = "/v1/product/update",
    request_body = ProductRequest,
    responses(
        (status = 200, description = "Product updated"),
        (status = 400, description = "Invalid body or nothing to update"),
        (status = 404, description = "Product not found")
    ),
    tag = "product"
)]
pub async fn update_product(
    State(repo): State<RepositoryState>,
    ApiJson(body): ApiJson<ProductRequest>,
) -> Result<impl IntoResponse, AppError> {
    let id_product = required(body.id_product)?;
    let patch = ProductPatch {
        name: optional_text(body.name)?,
        description: optional_text(body.description)?,
        price: body.price,
    };
    if patch.is_empty() {
        return Err(AppError::NothingToUpdate);
    }
    if let Some(price) = patch.price {
        check_price(price)?;
    }

    let mut uow = repo.begin().await?;
    let current = uow
        .get_product(id_product)
        .await?
        .ok_or(AppError::NotFound(Entity::Product))?;
    let product = uow
        .update_product(id_product, &patch.apply(current))
        .await?
        .ok_or(AppError::NotFound(Entity::Product))?;
    uow.commit().await?;

    Ok(Json(json!({ "message": "Product updated", "product": product })))
}

/// delete_product
///
/// [Admin Route] Deletes the product and every stand pairing that sells it.
#[utoipa::path(
    delete,
    path = "/v1/product/delete",
    request_body = ProductIdRequest,
    responses(
        (status = 200, description = "Product deleted"),
        (status = 404, description = "Product not found")
    ),
    tag = "product"
)]
pub async fn delete_product(
    State(repo): State<RepositoryState>,
    ApiJson(body): ApiJson<ProductIdRequest>,
) -> Result<impl IntoResponse, AppError> {
    let id_product = required(body.id_product)?;
    workflows::delete_product(repo.as_ref(), id_product).await?;
    Ok(Json(json!({ "message": "Product deleted" })))
}
