use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::{
    error::AppError,
    models::{
        Event, NewEvent, NewProduct, NewStand, ObjectListing, ObjectPair, Participation,
        ParticipationListing, PopularEvent, Product, Stand, User, UserSummary,
    },
};

mod memory;
mod postgres;

pub use memory::MemoryRepository;
pub use postgres::PostgresRepository;

/// Repository Trait
///
/// Entry point of the persistence layer. Every request opens exactly one
/// `UnitOfWork` through `begin()` and performs all of its reads and writes
/// inside it, so multi-entity workflows are atomic by construction.
///
/// **Send + Sync + async_trait** are required to share the trait object
/// (`Arc<dyn Repository>`) across Axum's task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, AppError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// UnitOfWork
///
/// A scoped transaction exposing every entity-access operation. `commit()`
/// consumes it; dropping it without committing rolls everything back, on every
/// exit path including `?` propagation and panics.
///
/// Unique-key violations on join rows and accounts surface as
/// `AppError::Conflict`, whichever store backs the unit of work.
#[async_trait]
pub trait UnitOfWork: Send {
    // --- Events ---
    async fn event_exists(&mut self, id: i32) -> Result<bool, AppError>;
    async fn get_event(&mut self, id: i32) -> Result<Option<Event>, AppError>;
    async fn get_all_events(&mut self) -> Result<Vec<Event>, AppError>;
    async fn get_events_created_by(&mut self, mail_address: &str) -> Result<Vec<Event>, AppError>;
    // Events not yet finished at `now`, optionally in one city (case-insensitive).
    async fn search_upcoming_events(
        &mut self,
        now: DateTime<Utc>,
        city: Option<&str>,
    ) -> Result<Vec<Event>, AppError>;
    // Events in progress at `date`, optionally in one city (case-insensitive).
    async fn search_events(
        &mut self,
        date: DateTime<Utc>,
        city: Option<&str>,
    ) -> Result<Vec<Event>, AppError>;
    // Event ids ranked by participation count, most popular first.
    async fn get_most_popular_events(&mut self, top: i64) -> Result<Vec<PopularEvent>, AppError>;
    async fn insert_event(&mut self, event: &NewEvent) -> Result<Event, AppError>;
    async fn update_event(&mut self, id: i32, event: &NewEvent) -> Result<Option<Event>, AppError>;
    async fn delete_event(&mut self, id: i32) -> Result<bool, AppError>;
    // Rewrites only the creator column of every event owned by `from`.
    async fn reassign_events(&mut self, from: &str, to: &str) -> Result<u64, AppError>;

    // --- Stands ---
    async fn stand_exists(&mut self, id: i32) -> Result<bool, AppError>;
    async fn get_stand(&mut self, id: i32) -> Result<Option<Stand>, AppError>;
    async fn get_all_stands(&mut self) -> Result<Vec<Stand>, AppError>;
    async fn get_stands_for_event(&mut self, id_event: i32) -> Result<Vec<Stand>, AppError>;
    async fn count_stands_for_event(&mut self, id_event: i32) -> Result<i64, AppError>;
    async fn get_products_for_stand(&mut self, id_stand: i32) -> Result<Vec<Product>, AppError>;
    async fn insert_stand(&mut self, stand: &NewStand) -> Result<Stand, AppError>;
    async fn update_stand(&mut self, id: i32, stand: &NewStand) -> Result<Option<Stand>, AppError>;
    async fn delete_stand(&mut self, id: i32) -> Result<bool, AppError>;

    // --- Products ---
    async fn product_exists(&mut self, id: i32) -> Result<bool, AppError>;
    async fn get_product(&mut self, id: i32) -> Result<Option<Product>, AppError>;
    async fn get_all_products(&mut self) -> Result<Vec<Product>, AppError>;
    async fn insert_product(&mut self, product: &NewProduct) -> Result<Product, AppError>;
    async fn update_product(
        &mut self,
        id: i32,
        product: &NewProduct,
    ) -> Result<Option<Product>, AppError>;
    async fn delete_product(&mut self, id: i32) -> Result<bool, AppError>;

    // --- Objects (stand x product) ---
    async fn object_exists(&mut self, pair: ObjectPair) -> Result<bool, AppError>;
    async fn get_all_objects(&mut self) -> Result<Vec<ObjectListing>, AppError>;
    async fn insert_object(&mut self, pair: ObjectPair) -> Result<ObjectPair, AppError>;
    async fn update_object(
        &mut self,
        current: ObjectPair,
        new: ObjectPair,
    ) -> Result<Option<ObjectPair>, AppError>;
    async fn delete_object(&mut self, pair: ObjectPair) -> Result<bool, AppError>;
    async fn delete_objects_for_stand(&mut self, id_stand: i32) -> Result<u64, AppError>;
    async fn delete_objects_for_product(&mut self, id_product: i32) -> Result<u64, AppError>;

    // --- Participations (user x event) ---
    async fn participation_exists(
        &mut self,
        mail_address: &str,
        id_event: i32,
    ) -> Result<bool, AppError>;
    async fn get_participation(
        &mut self,
        mail_address: &str,
        id_event: i32,
    ) -> Result<Option<Participation>, AppError>;
    async fn get_all_participations(&mut self) -> Result<Vec<ParticipationListing>, AppError>;
    async fn get_participations_for_user(
        &mut self,
        mail_address: &str,
    ) -> Result<Vec<Participation>, AppError>;
    async fn get_participations_for_event(
        &mut self,
        id_event: i32,
    ) -> Result<Vec<Participation>, AppError>;
    async fn count_participations_for_event(&mut self, id_event: i32) -> Result<i64, AppError>;
    // Participations whose event overlaps `[starting, ending]`.
    async fn get_participations_for_user_between(
        &mut self,
        mail_address: &str,
        starting: DateTime<Utc>,
        ending: DateTime<Utc>,
    ) -> Result<Vec<Participation>, AppError>;
    async fn insert_participation(
        &mut self,
        participation: &Participation,
    ) -> Result<Participation, AppError>;
    async fn update_participation(
        &mut self,
        mail_address: &str,
        id_event: i32,
        participation: &Participation,
    ) -> Result<Option<Participation>, AppError>;
    async fn delete_participation(
        &mut self,
        mail_address: &str,
        id_event: i32,
    ) -> Result<bool, AppError>;
    async fn delete_participations_for_user(&mut self, mail_address: &str)
    -> Result<u64, AppError>;
    async fn delete_participations_for_event(&mut self, id_event: i32) -> Result<u64, AppError>;
    // Moves every participation of `from` to `to`, keeping event ids and register dates.
    async fn rename_participations(&mut self, from: &str, to: &str) -> Result<u64, AppError>;

    // --- Users ---
    async fn user_exists(&mut self, mail_address: &str) -> Result<bool, AppError>;
    async fn get_user(&mut self, mail_address: &str) -> Result<Option<User>, AppError>;
    async fn get_all_users(&mut self) -> Result<Vec<UserSummary>, AppError>;
    async fn insert_user(&mut self, user: &User) -> Result<User, AppError>;
    // Overwrites the row keyed by `mail_address`, primary key included.
    async fn update_user(&mut self, mail_address: &str, user: &User)
    -> Result<Option<User>, AppError>;
    async fn update_profile_picture(
        &mut self,
        mail_address: &str,
        picture: &str,
    ) -> Result<bool, AppError>;
    async fn get_profile_picture(&mut self, mail_address: &str)
    -> Result<Option<String>, AppError>;
    async fn delete_user(&mut self, mail_address: &str) -> Result<bool, AppError>;

    async fn commit(self: Box<Self>) -> Result<(), AppError>;
}
