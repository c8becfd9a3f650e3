use crate::{
    AppState,
    handlers::{event, object, participation, product, stand, user},
};
use axum::{
    Router,
    routing::{delete, get, patch, post},
};

/// Admin Router Module
///
/// Every mutation of the catalogue plus account and participation management
/// on behalf of other users.
///
/// Access Control:
/// `create_router` wraps this router in `admin_middleware` and then in
/// `auth_middleware`, so the token is verified before the role is checked and
/// a non-admin caller gets 403 rather than 401.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // --- Users ---
        .route("/user", get(user::get_user))
        .route("/user/all", get(user::get_all_users))
        .route("/user/admin/register", post(user::admin_register))
        // A new mail address cascades to participations and created events.
        .route("/user/account/admin/update", patch(user::admin_update_user))
        // Created events are handed over to the calling admin.
        .route("/user/delete", delete(user::delete_user))
        // --- Participations ---
        .route(
            "/user/reservation/all",
            get(participation::get_all_participations),
        )
        .route(
            "/user/reservation/admin/add",
            post(participation::admin_add_participation),
        )
        .route(
            "/user/reservation/update",
            patch(participation::update_participation),
        )
        .route(
            "/user/reservation/admin/delete",
            delete(participation::admin_delete_participation),
        )
        .route(
            "/user/reservation/delete/all",
            delete(participation::delete_all_participations_for_user),
        )
        .route("/event/reservation", get(participation::get_participation))
        .route(
            "/event/reservation/consult/all",
            get(participation::get_participations_for_event),
        )
        .route(
            "/event/reservation/delete/all",
            delete(participation::delete_all_participations_for_event),
        )
        // --- Events ---
        .route("/event/add", post(event::add_event))
        .route("/event/update", patch(event::update_event))
        // Cascades to participations, stands and the stands' objects.
        .route("/event/delete", delete(event::delete_event))
        // --- Stands ---
        .route("/event/stand/all", get(stand::get_all_stands))
        .route("/event/stand/add", post(stand::add_stand))
        .route("/event/stand/update", patch(stand::update_stand))
        .route("/event/stand/delete", delete(stand::delete_stand))
        .route(
            "/event/stand/delete/all",
            delete(stand::delete_all_stands_for_event),
        )
        // --- Objects (stand x product) ---
        .route("/event/stand/product/all", get(object::get_all_objects))
        .route("/event/stand/product/add", post(object::add_object))
        .route("/event/stand/product/update", patch(object::update_object))
        .route("/event/stand/product/delete", delete(object::delete_object))
        // --- Products ---
        .route("/product/add", post(product::add_product))
        .route("/product/update", patch(product::update_product))
        .route("/product/delete", delete(product::delete_product))
}
