use axum::{
    Router,
    extract::FromRef,
    http::HeaderName,
    middleware,
    routing::get,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod picture;
pub mod repository;
pub mod tokens;
pub mod validation;
pub mod workflows;

// Access tiers (Public, Authenticated, Admin).
pub mod routes;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::AppError;
pub use repository::{MemoryRepository, PostgresRepository, RepositoryState};
pub use tokens::TokenRegistry;

/// Prefix of the single active API version.
pub const API_PREFIX: &str = "/v1";

/// ApiDoc
///
/// OpenAPI document aggregated from the `#[utoipa::path]` handlers and the
/// `ToSchema` models. Served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::user::login, handlers::user::register, handlers::user::admin_register,
        handlers::user::get_user, handlers::user::get_all_users, handlers::user::get_account,
        handlers::user::get_profile_picture, handlers::user::update_password,
        handlers::user::update_profile_picture, handlers::user::admin_update_user,
        handlers::user::delete_user,
        handlers::event::get_event, handlers::event::get_all_events, handlers::event::search_events,
        handlers::event::get_popular_events, handlers::event::add_event,
        handlers::event::update_event, handlers::event::delete_event,
        handlers::stand::get_stand, handlers::stand::get_all_stands,
        handlers::stand::get_stands_for_event, handlers::stand::add_stand,
        handlers::stand::update_stand, handlers::stand::delete_stand,
        handlers::stand::delete_all_stands_for_event,
        handlers::object::get_products_for_stand, handlers::object::get_all_objects,
        handlers::object::add_object, handlers::object::update_object,
        handlers::object::delete_object,
        handlers::product::get_product, handlers::product::get_all_products,
        handlers::product::add_product, handlers::product::update_product,
        handlers::product::delete_product,
        handlers::participation::consult_participation,
        handlers::participation::consult_all_participations,
        handlers::participation::consult_participations_between,
        handlers::participation::add_participation,
        handlers::participation::delete_participation,
        handlers::participation::count_participations_for_event,
        handlers::participation::get_participation,
        handlers::participation::get_all_participations,
        handlers::participation::get_participations_for_event,
        handlers::participation::admin_add_participation,
        handlers::participation::update_participation,
        handlers::participation::admin_delete_participation,
        handlers::participation::delete_all_participations_for_user,
        handlers::participation::delete_all_participations_for_event,
    ),
    components(
        schemas(
            models::Role, models::UserSummary, models::Event, models::EventDetails,
            models::Stand, models::Product, models::ObjectListing, models::ObjectPair,
            models::Participation, models::ParticipationListing,
            models::RegisterRequest, models::UpdatePasswordRequest,
            models::AdminUpdateUserRequest, models::MailAddressRequest,
            models::MailAddressUserRequest, models::EventRequest, models::EventIdRequest,
            models::StandRequest, models::StandIdRequest, models::ObjectRequest,
            models::ProductRequest, models::ProductIdRequest, models::ParticipationRequest,
            auth::AuthUser,
        )
    ),
    tags(
        (name = "user", description = "Accounts, login and profile pictures"),
        (name = "event", description = "Events and their search"),
        (name = "stand", description = "Stands of an event"),
        (name = "object", description = "Products sold at a stand"),
        (name = "product", description = "Product catalogue"),
        (name = "participation", description = "Event registrations")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single state shared by every request: the storage handle, the live
/// token registry and the immutable configuration. Cheap to clone, every
/// component is reference counted.
#[derive(Clone)]
pub struct AppState {
    /// Storage layer, Postgres in production, in-memory in the test-suite.
    pub repo: RepositoryState,
    /// Issued tokens still accepted by the server. Not persisted.
    pub tokens: TokenRegistry,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for TokenRegistry {
    fn from_ref(app_state: &AppState) -> TokenRegistry {
        app_state.tokens.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the three access tiers under `/v1`, the unversioned health check
/// and the Swagger UI, then wraps everything in the observability layers.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let authenticated = authenticated::authenticated_routes().route_layer(
        middleware::from_fn_with_state(state.clone(), auth::auth_middleware),
    );

    // Layers run outermost first: authentication, then the role gate.
    let admin = admin::admin_routes()
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::admin_middleware,
        ))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    let api = Router::new()
        .merge(public::public_routes())
        .merge(authenticated)
        .merge(admin);

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(|| async { "ok" }))
        .nest(API_PREFIX, api)
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(
                    x_request_id.clone(),
                    MakeRequestUuid,
                ))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span for `TraceLayer` carrying the method, the URI and the `x-request-id`
/// set by `SetRequestIdLayer`, so every log line of a request is correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
