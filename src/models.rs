use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::{fmt, str::FromStr};
use ts_rs::TS;
use utoipa::{IntoParams, ToSchema};

use crate::error::AppError;

// --- Core Application Schemas (Mapped to Database) ---

/// Role
///
/// The RBAC field carried by every account and embedded in every token.
/// Stored as lowercase text in the `users.role` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            _ => Err(AppError::InvalidRole),
        }
    }
}

// Lets sqlx decode the TEXT column straight into the enum.
impl TryFrom<String> for Role {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// User
///
/// The canonical account record of the `users` table. The mail address is the
/// primary key; the password is a bcrypt hash and is never serialized.
#[derive(Debug, Clone, Serialize, FromRow, PartialEq)]
pub struct User {
    pub mail_address: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub name: String,
    pub birthdate: NaiveDate,
    #[sqlx(try_from = "String")]
    pub role: Role,
}

/// UserSummary
///
/// Public projection of a user, used by the admin listings (no hash, no picture).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, PartialEq)]
#[ts(export)]
pub struct UserSummary {
    pub mail_address: String,
    pub name: String,
    #[ts(type = "string")]
    pub birthdate: NaiveDate,
    #[sqlx(try_from = "String")]
    pub role: Role,
}

impl From<User> for UserSummary {
    fn from(user: User) -> Self {
        Self {
            mail_address: user.mail_address,
            name: user.name,
            birthdate: user.birthdate,
            role: user.role,
        }
    }
}

/// Event
///
/// A row of the `event` table. `type` is a reserved word in Rust, hence the rename.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, PartialEq)]
#[ts(export)]
pub struct Event {
    pub id: i32,
    pub name: String,
    #[ts(type = "string")]
    pub starting_date: DateTime<Utc>,
    #[ts(type = "string")]
    pub ending_date: DateTime<Utc>,
    pub street_name: String,
    pub house_number: Option<i32>,
    pub postal_code: i32,
    pub city: String,
    pub children_accepted: bool,
    pub description: String,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub event_type: String,
    pub security_level: i32,
    pub require_mask: bool,
    pub require_covid_safe_ticket: bool,
    pub max_place_count: i32,
    pub mail_address_creator: String,
}

/// EventDetails
///
/// An event enriched for the read endpoints with its participation `count`
/// and its `stand_count`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct EventDetails {
    #[serde(flatten)]
    #[ts(flatten)]
    pub event: Event,
    pub count: i64,
    pub stand_count: i64,
}

/// NewEvent
///
/// A fully validated event, ready for insertion. Produced by the event
/// handlers and by `EventPatch::apply`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub name: String,
    pub starting_date: DateTime<Utc>,
    pub ending_date: DateTime<Utc>,
    pub street_name: String,
    pub house_number: Option<i32>,
    pub postal_code: i32,
    pub city: String,
    pub children_accepted: bool,
    pub description: String,
    pub event_type: String,
    pub security_level: i32,
    pub require_mask: bool,
    pub require_covid_safe_ticket: bool,
    pub max_place_count: i32,
    pub mail_address_creator: String,
}

impl NewEvent {
    pub fn with_id(self, id: i32) -> Event {
        Event {
            id,
            name: self.name,
            starting_date: self.starting_date,
            ending_date: self.ending_date,
            street_name: self.street_name,
            house_number: self.house_number,
            postal_code: self.postal_code,
            city: self.city,
            children_accepted: self.children_accepted,
            description: self.description,
            event_type: self.event_type,
            security_level: self.security_level,
            require_mask: self.require_mask,
            require_covid_safe_ticket: self.require_covid_safe_ticket,
            max_place_count: self.max_place_count,
            mail_address_creator: self.mail_address_creator,
        }
    }
}

impl From<Event> for NewEvent {
    fn from(event: Event) -> Self {
        Self {
            name: event.name,
            starting_date: event.starting_date,
            ending_date: event.ending_date,
            street_name: event.street_name,
            house_number: event.house_number,
            postal_code: event.postal_code,
            city: event.city,
            children_accepted: event.children_accepted,
            description: event.description,
            event_type: event.event_type,
            security_level: event.security_level,
            require_mask: event.require_mask,
            require_covid_safe_ticket: event.require_covid_safe_ticket,
            max_place_count: event.max_place_count,
            mail_address_creator: event.mail_address_creator,
        }
    }
}

/// Stand
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, PartialEq)]
#[ts(export)]
pub struct Stand {
    pub id: i32,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub stand_type: String,
    pub manager_name: String,
    pub area_size: f64,
    pub id_event: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewStand {
    pub stand_type: String,
    pub manager_name: String,
    pub area_size: f64,
    pub id_event: i32,
}

/// Product
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, PartialEq)]
#[ts(export)]
pub struct Product {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: f64,
}

/// ObjectPair
///
/// The `object` join row: "this product is sold at this stand".
#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, ToSchema, FromRow, PartialEq, Eq, Hash)]
#[ts(export)]
pub struct ObjectPair {
    pub id_stand: i32,
    pub id_product: i32,
}

/// ObjectListing
///
/// Admin view of a pair, with the stand type and product name joined in.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, PartialEq)]
#[ts(export)]
pub struct ObjectListing {
    pub type_stand: String,
    pub id_stand: i32,
    pub name_product: String,
    pub id_product: i32,
}

/// Participation
///
/// The `participation` join row: one user registered for one event.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, PartialEq)]
#[ts(export)]
pub struct Participation {
    pub mail_address_user: String,
    pub id_event: i32,
    #[ts(type = "string")]
    pub register_date: DateTime<Utc>,
}

/// ParticipationListing
///
/// Admin view of a participation with the event name joined in.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, PartialEq)]
#[ts(export)]
pub struct ParticipationListing {
    pub mail_address_user: String,
    pub id_event: i32,
    pub name: String,
    #[ts(type = "string")]
    pub register_date: DateTime<Utc>,
}

/// PopularEvent
///
/// One row of the popularity ranking: an event id and its participation count.
#[derive(Debug, Clone, Copy, FromRow, PartialEq, Eq)]
pub struct PopularEvent {
    pub id_event: i32,
    pub count: i64,
}

// --- Request Payloads (Input Schemas) ---
//
// Every field is optional at the type level: an absent or null key means
// "not provided", while a key of the wrong JSON type is rejected during
// decoding with `InvalidTypes`. Required fields are enforced by the handlers.

/// RegisterRequest
///
/// Body of `POST /user/register` and `POST /user/admin/register`. `role` is
/// only honoured on the admin route.
#[derive(Debug, Clone, Default, Deserialize, ToSchema, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RegisterRequest {
    pub mail_address: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    pub birthdate: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdatePasswordRequest {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

/// AdminUpdateUserRequest
///
/// Body of `PATCH /user/account/admin/update`. Supplying `newUserMailAddress`
/// triggers the rename workflow.
#[derive(Debug, Clone, Default, Deserialize, ToSchema, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AdminUpdateUserRequest {
    pub user_mail_address: Option<String>,
    pub new_user_mail_address: Option<String>,
    pub name: Option<String>,
    pub password: Option<String>,
    pub birthdate: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct MailAddressRequest {
    pub mail_address: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct MailAddressUserRequest {
    pub mail_address_user: Option<String>,
}

/// EventRequest
///
/// Body of `POST /event/add` and `PATCH /event/update` (`idEvent` only on update).
#[derive(Debug, Clone, Default, Deserialize, ToSchema, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct EventRequest {
    pub id_event: Option<i32>,
    pub name: Option<String>,
    pub starting_date: Option<String>,
    pub ending_date: Option<String>,
    pub street_name: Option<String>,
    pub house_number: Option<i32>,
    pub postal_code: Option<i32>,
    pub city: Option<String>,
    pub children_accepted: Option<bool>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub event_type: Option<String>,
    pub security_level: Option<i32>,
    pub require_mask: Option<bool>,
    pub require_covid_safe_ticket: Option<bool>,
    pub max_place_count: Option<i32>,
    pub mail_address_creator: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct EventIdRequest {
    pub id_event: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StandRequest {
    pub id_stand: Option<i32>,
    #[serde(rename = "type")]
    pub stand_type: Option<String>,
    pub manager_name: Option<String>,
    pub area_size: Option<f64>,
    pub id_event: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StandIdRequest {
    pub id_stand: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ObjectRequest {
    pub id_stand: Option<i32>,
    pub id_product: Option<i32>,
    pub new_id_stand: Option<i32>,
    pub new_id_product: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProductRequest {
    pub id_product: Option<i32>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProductIdRequest {
    pub id_product: Option<i32>,
}

/// ParticipationRequest
///
/// Body shared by the participation mutations. The caller-scoped routes only
/// read `idEvent`; the admin routes also read the mail address and dates.
#[derive(Debug, Clone, Default, Deserialize, ToSchema, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ParticipationRequest {
    pub id_event: Option<i32>,
    pub mail_address: Option<String>,
    pub register_date: Option<String>,
    pub new_id_event: Option<i32>,
    pub new_mail_address: Option<String>,
}

// --- Query Parameters ---

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct EventIdQuery {
    pub id_event: Option<i32>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct StandIdQuery {
    pub id_stand: Option<i32>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ProductIdQuery {
    pub id_product: Option<i32>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct MailAddressUserQuery {
    pub mail_address_user: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ParticipationQuery {
    pub mail_address: Option<String>,
    pub id_event: Option<i32>,
}

/// Event search: `date` selects events in progress at that instant, otherwise
/// upcoming events are returned. `city` is matched case-insensitively.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct EventSearchQuery {
    pub date: Option<String>,
    pub city: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PopularQuery {
    pub top_number: Option<i64>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct DateRangeQuery {
    pub starting_date: Option<String>,
    pub ending_date: Option<String>,
}

// --- Partial Updates ---

/// EventPatch
///
/// Already-parsed optional fields of an event update. `apply` keeps the stored
/// value of every field left as `None`; booleans are merged on presence, so an
/// explicit `false` is applied like any other value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventPatch {
    pub name: Option<String>,
    pub starting_date: Option<DateTime<Utc>>,
    pub ending_date: Option<DateTime<Utc>>,
    pub street_name: Option<String>,
    pub house_number: Option<i32>,
    pub postal_code: Option<i32>,
    pub city: Option<String>,
    pub children_accepted: Option<bool>,
    pub description: Option<String>,
    pub event_type: Option<String>,
    pub security_level: Option<i32>,
    pub require_mask: Option<bool>,
    pub require_covid_safe_ticket: Option<bool>,
    pub max_place_count: Option<i32>,
    pub mail_address_creator: Option<String>,
}

impl EventPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(self, current: Event) -> NewEvent {
        NewEvent {
            name: self.name.unwrap_or(current.name),
            starting_date: self.starting_date.unwrap_or(current.starting_date),
            ending_date: self.ending_date.unwrap_or(current.ending_date),
            street_name: self.street_name.unwrap_or(current.street_name),
            house_number: self.house_number.or(current.house_number),
            postal_code: self.postal_code.unwrap_or(current.postal_code),
            city: self.city.unwrap_or(current.city),
            children_accepted: self.children_accepted.unwrap_or(current.children_accepted),
            description: self.description.unwrap_or(current.description),
            event_type: self.event_type.unwrap_or(current.event_type),
            security_level: self.security_level.unwrap_or(current.security_level),
            require_mask: self.require_mask.unwrap_or(current.require_mask),
            require_covid_safe_ticket: self
                .require_covid_safe_ticket
                .unwrap_or(current.require_covid_safe_ticket),
            max_place_count: self.max_place_count.unwrap_or(current.max_place_count),
            mail_address_creator: self
                .mail_address_creator
                .unwrap_or(current.mail_address_creator),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StandPatch {
    pub stand_type: Option<String>,
    pub manager_name: Option<String>,
    pub area_size: Option<f64>,
    pub id_event: Option<i32>,
}

impl StandPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(self, current: Stand) -> NewStand {
        NewStand {
            stand_type: self.stand_type.unwrap_or(current.stand_type),
            manager_name: self.manager_name.unwrap_or(current.manager_name),
            area_size: self.area_size.unwrap_or(current.area_size),
            id_event: self.id_event.unwrap_or(current.id_event),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
}

impl ProductPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(self, current: Product) -> NewProduct {
        NewProduct {
            name: self.name.unwrap_or(current.name),
            description: self.description.unwrap_or(current.description),
            price: self.price.unwrap_or(current.price),
        }
    }
}

/// ParticipationPatch
///
/// Moves a participation to another user and/or event, or re-dates it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParticipationPatch {
    pub mail_address_user: Option<String>,
    pub id_event: Option<i32>,
    pub register_date: Option<DateTime<Utc>>,
}

impl ParticipationPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(self, current: Participation) -> Participation {
        Participation {
            mail_address_user: self.mail_address_user.unwrap_or(current.mail_address_user),
            id_event: self.id_event.unwrap_or(current.id_event),
            register_date: self.register_date.unwrap_or(current.register_date),
        }
    }
}

/// UserPatch
///
/// Parsed fields of an admin user update. `password` is already hashed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserPatch {
    pub mail_address: Option<String>,
    pub name: Option<String>,
    pub password: Option<String>,
    pub birthdate: Option<NaiveDate>,
    pub role: Option<Role>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(self, current: User) -> User {
        User {
            mail_address: self.mail_address.unwrap_or(current.mail_address),
            password: self.password.unwrap_or(current.password),
            name: self.name.unwrap_or(current.name),
            birthdate: self.birthdate.unwrap_or(current.birthdate),
            role: self.role.unwrap_or(current.role),
        }
    }
}
