use crate::{AppState, handlers::user};
use axum::{Router, routing::post};

/// Public Router Module
///
/// The only unauthenticated entry points. `register` refuses callers that
/// already present a valid token, so it reads the header itself.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // POST /user/login
        // Basic credentials in, bearer token out.
        .route("/user/login", post(user::login))
        .route("/user/register", post(user::register))
}
