use crate::{
    AppState,
    handlers::{event, object, participation, product, stand, user},
};
use axum::{
    Router,
    routing::{delete, get, patch, post},
};

/// Authenticated Router Module
///
/// Routes available to any user holding a registered token. Handlers that act
/// on "the caller" read the `AuthUser` placed in the request extensions by
/// `auth_middleware`.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // --- Own account ---
        .route("/user/account", get(user::get_account))
        .route("/user/account/picture", get(user::get_profile_picture))
        .route("/user/account/update", patch(user::update_password))
        // Raw image body, capped at 50 KB before decoding.
        .route(
            "/user/account/profilePicture",
            patch(user::update_profile_picture),
        )
        // --- Own participations ---
        .route(
            "/user/reservation/consult",
            get(participation::consult_participation),
        )
        .route(
            "/user/reservation/consult/all",
            get(participation::consult_all_participations),
        )
        .route(
            "/user/reservation/consult/between",
            get(participation::consult_participations_between),
        )
        .route("/user/reservation/add", post(participation::add_participation))
        .route(
            "/user/reservation/delete",
            delete(participation::delete_participation),
        )
        // --- Catalogue reads ---
        .route("/event", get(event::get_event))
        .route("/event/all", get(event::get_all_events))
        .route("/event/search", get(event::search_events))
        .route("/event/popular", get(event::get_popular_events))
        .route(
            "/event/reservation/count",
            get(participation::count_participations_for_event),
        )
        .route("/event/stand/get", get(stand::get_stand))
        .route("/event/stand/get/all", get(stand::get_stands_for_event))
        .route("/event/stand/product", get(object::get_products_for_stand))
        .route("/product/get", get(product::get_product))
        .route("/product/all", get(product::get_all_products))
}
