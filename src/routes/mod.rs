/// Router Module Index
///
/// The API is split into three access tiers. Access control is applied to each
/// tier as a whole with `route_layer` in `create_router`, never per handler.

/// Routes open to anonymous clients: login and self-registration.
pub mod public;

/// Routes behind the bearer-token `auth_middleware`.
pub mod authenticated;

/// Routes behind `auth_middleware` and the `admin_middleware` role gate.
pub mod admin;
