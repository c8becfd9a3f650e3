use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};

use super::{Repository, UnitOfWork};
use crate::{
    error::{AppError, Conflict},
    models::{
        Event, NewEvent, NewProduct, NewStand, ObjectListing, ObjectPair, Participation,
        ParticipationListing, PopularEvent, Product, Stand, User, UserSummary,
    },
};

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by PostgreSQL.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, AppError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgUnitOfWork { tx }))
    }
}

/// PgUnitOfWork
///
/// Wraps a live `sqlx::Transaction`. sqlx issues the ROLLBACK itself when the
/// transaction is dropped uncommitted, which gives the RAII guarantee.
pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

const USER_COLUMNS: &str = "mail_address, password, name, birthdate, role";

/// Maps a unique-key violation to the matching business conflict.
fn unique_as(conflict: Conflict) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| match e.as_database_error() {
        Some(db) if db.is_unique_violation() => AppError::Conflict(conflict),
        _ => AppError::Database(e),
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    // --- Events ---

    async fn event_exists(&mut self, id: i32) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM event WHERE id = $1)")
            .bind(id)
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(exists)
    }

    async fn get_event(&mut self, id: i32) -> Result<Option<Event>, AppError> {
        let event = sqlx::query_as::<_, Event>("SELECT * FROM event WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(event)
    }

    async fn get_all_events(&mut self) -> Result<Vec<Event>, AppError> {
        let events = sqlx::query_as::<_, Event>("SELECT * FROM event ORDER BY id")
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(events)
    }

    async fn get_events_created_by(&mut self, mail_address: &str) -> Result<Vec<Event>, AppError> {
        let events = sqlx::query_as::<_, Event>(
            "SELECT * FROM event WHERE mail_address_creator = $1 ORDER BY id",
        )
        .bind(mail_address)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(events)
    }

    async fn search_upcoming_events(
        &mut self,
        now: DateTime<Utc>,
        city: Option<&str>,
    ) -> Result<Vec<Event>, AppError> {
        // A NULL city parameter disables the filter.
        let events = sqlx::query_as::<_, Event>(
            r#"
            SELECT * FROM event
            WHERE (starting_date >= $1 OR ending_date >= $1)
              AND ($2::TEXT IS NULL OR LOWER(city) = LOWER($2))
            ORDER BY starting_date, id
            "#,
        )
        .bind(now)
        .bind(city)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(events)
    }

    async fn search_events(
        &mut self,
        date: DateTime<Utc>,
        city: Option<&str>,
    ) -> Result<Vec<Event>, AppError> {
        let events = sqlx::query_as::<_, Event>(
            r#"
            SELECT * FROM event
            WHERE starting_date <= $1 AND ending_date >= $1
              AND ($2::TEXT IS NULL OR LOWER(city) = LOWER($2))
            ORDER BY starting_date, id
            "#,
        )
        .bind(date)
        .bind(city)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(events)
    }

    async fn get_most_popular_events(&mut self, top: i64) -> Result<Vec<PopularEvent>, AppError> {
        let ranking = sqlx::query_as::<_, PopularEvent>(
            r#"
            SELECT id_event, COUNT(*) AS count FROM participation
            GROUP BY id_event
            ORDER BY COUNT(*) DESC, id_event
            LIMIT $1
            "#,
        )
        .bind(top)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(ranking)
    }

    async fn insert_event(&mut self, event: &NewEvent) -> Result<Event, AppError> {
        let event = sqlx::query_as::<_, Event>(
            r#"
            INSERT INTO event(name, starting_date, ending_date, street_name, house_number, postal_code,
                city, children_accepted, description, type, security_level, require_mask,
                require_covid_safe_ticket, max_place_count, mail_address_creator)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING *
            "#,
        )
        .bind(&event.name)
        .bind(event.starting_date)
        .bind(event.ending_date)
        .bind(&event.street_name)
        .bind(event.house_number)
        .bind(event.postal_code)
        .bind(&event.city)
        .bind(event.children_accepted)
        .bind(&event.description)
        .bind(&event.event_type)
        .bind(event.security_level)
        .bind(event.require_mask)
        .bind(event.require_covid_safe_ticket)
        .bind(event.max_place_count)
        .bind(&event.mail_address_creator)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(event)
    }

    async fn update_event(&mut self, id: i32, event: &NewEvent) -> Result<Option<Event>, AppError> {
        let event = sqlx::query_as::<_, Event>(
            r#"
            UPDATE event
            SET name = $1, starting_date = $2, ending_date = $3, street_name = $4, house_number = $5,
                postal_code = $6, city = $7, children_accepted = $8, description = $9, type = $10,
                security_level = $11, require_mask = $12, require_covid_safe_ticket = $13,
                max_place_count = $14, mail_address_creator = $15
            WHERE id = $16
            RETURNING *
            "#,
        )
        .bind(&event.name)
        .bind(event.starting_date)
        .bind(event.ending_date)
        .bind(&event.street_name)
        .bind(event.house_number)
        .bind(event.postal_code)
        .bind(&event.city)
        .bind(event.children_accepted)
        .bind(&event.description)
        .bind(&event.event_type)
        .bind(event.security_level)
        .bind(event.require_mask)
        .bind(event.require_covid_safe_ticket)
        .bind(event.max_place_count)
        .bind(&event.mail_address_creator)
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(event)
    }

    async fn delete_event(&mut self, id: i32) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM event WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn reassign_events(&mut self, from: &str, to: &str) -> Result<u64, AppError> {
        let result =
            sqlx::query("UPDATE event SET mail_address_creator = $1 WHERE mail_address_creator = $2")
                .bind(to)
                .bind(from)
                .execute(&mut *self.tx)
                .await?;
        Ok(result.rows_affected())
    }

    // --- Stands ---

    async fn stand_exists(&mut self, id: i32) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM stand WHERE id = $1)")
            .bind(id)
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(exists)
    }

    async fn get_stand(&mut self, id: i32) -> Result<Option<Stand>, AppError> {
        let stand = sqlx::query_as::<_, Stand>("SELECT * FROM stand WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(stand)
    }

    async fn get_all_stands(&mut self) -> Result<Vec<Stand>, AppError> {
        let stands = sqlx::query_as::<_, Stand>("SELECT * FROM stand ORDER BY id")
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(stands)
    }

    async fn get_stands_for_event(&mut self, id_event: i32) -> Result<Vec<Stand>, AppError> {
        let stands = sqlx::query_as::<_, Stand>("SELECT * FROM stand WHERE id_event = $1 ORDER BY id")
            .bind(id_event)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(stands)
    }

    async fn count_stands_for_event(&mut self, id_event: i32) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM stand WHERE id_event = $1")
            .bind(id_event)
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(count)
    }

    async fn get_products_for_stand(&mut self, id_stand: i32) -> Result<Vec<Product>, AppError> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT p.* FROM product p
            JOIN object o ON o.id_product = p.id
            WHERE o.id_stand = $1
            ORDER BY p.id
            "#,
        )
        .bind(id_stand)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(products)
    }

    async fn insert_stand(&mut self, stand: &NewStand) -> Result<Stand, AppError> {
        let stand = sqlx::query_as::<_, Stand>(
            r#"
            INSERT INTO stand(type, manager_name, area_size, id_event)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&stand.stand_type)
        .bind(&stand.manager_name)
        .bind(stand.area_size)
        .bind(stand.id_event)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(stand)
    }

    async fn update_stand(&mut self, id: i32, stand: &NewStand) -> Result<Option<Stand>, AppError> {
        let stand = sqlx::query_as::<_, Stand>(
            r#"
            UPDATE stand
            SET type = $1, manager_name = $2, area_size = $3, id_event = $4
            WHERE id = $5
            RETURNING *
            "#,
        )
        .bind(&stand.stand_type)
        .bind(&stand.manager_name)
        .bind(stand.area_size)
        .bind(stand.id_event)
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(stand)
    }

    async fn delete_stand(&mut self, id: i32) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM stand WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- Products ---

    async fn product_exists(&mut self, id: i32) -> Result<bool, AppError> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM product WHERE id = $1)")
                .bind(id)
                .fetch_one(&mut *self.tx)
                .await?;
        Ok(exists)
    }

    async fn get_product(&mut self, id: i32) -> Result<Option<Product>, AppError> {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM product WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(product)
    }

    async fn get_all_products(&mut self) -> Result<Vec<Product>, AppError> {
        let products = sqlx::query_as::<_, Product>("SELECT * FROM product ORDER BY id")
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(products)
    }

    async fn insert_product(&mut self, product: &NewProduct) -> Result<Product, AppError> {
        let product = sqlx::query_as::<_, Product>(
            "INSERT INTO product(name, description, price) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(product)
    }

    async fn update_product(
        &mut self,
        id: i32,
        product: &NewProduct,
    ) -> Result<Option<Product>, AppError> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            UPDATE product
            SET name = $1, description = $2, price = $3
            WHERE id = $4
            RETURNING *
            "#,
        )
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(product)
    }

    async fn delete_product(&mut self, id: i32) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM product WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- Objects ---

    async fn object_exists(&mut self, pair: ObjectPair) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM object WHERE id_stand = $1 AND id_product = $2)",
        )
        .bind(pair.id_stand)
        .bind(pair.id_product)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(exists)
    }

    async fn get_all_objects(&mut self) -> Result<Vec<ObjectListing>, AppError> {
        let objects = sqlx::query_as::<_, ObjectListing>(
            r#"
            SELECT s.type AS type_stand, o.id_stand, p.name AS name_product, o.id_product
            FROM object o
            JOIN stand s ON s.id = o.id_stand
            JOIN product p ON p.id = o.id_product
            ORDER BY o.id_stand, o.id_product
            "#,
        )
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(objects)
    }

    async fn insert_object(&mut self, pair: ObjectPair) -> Result<ObjectPair, AppError> {
        let pair = sqlx::query_as::<_, ObjectPair>(
            "INSERT INTO object(id_stand, id_product) VALUES ($1, $2) RETURNING id_stand, id_product",
        )
        .bind(pair.id_stand)
        .bind(pair.id_product)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(unique_as(Conflict::ObjectExists))?;
        Ok(pair)
    }

    async fn update_object(
        &mut self,
        current: ObjectPair,
        new: ObjectPair,
    ) -> Result<Option<ObjectPair>, AppError> {
        let pair = sqlx::query_as::<_, ObjectPair>(
            r#"
            UPDATE object SET id_stand = $1, id_product = $2
            WHERE id_stand = $3 AND id_product = $4
            RETURNING id_stand, id_product
            "#,
        )
        .bind(new.id_stand)
        .bind(new.id_product)
        .bind(current.id_stand)
        .bind(current.id_product)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(unique_as(Conflict::ObjectExists))?;
        Ok(pair)
    }

    async fn delete_object(&mut self, pair: ObjectPair) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM object WHERE id_stand = $1 AND id_product = $2")
            .bind(pair.id_stand)
            .bind(pair.id_product)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_objects_for_stand(&mut self, id_stand: i32) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM object WHERE id_stand = $1")
            .bind(id_stand)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_objects_for_product(&mut self, id_product: i32) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM object WHERE id_product = $1")
            .bind(id_product)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    // --- Participations ---

    async fn participation_exists(
        &mut self,
        mail_address: &str,
        id_event: i32,
    ) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM participation WHERE mail_address_user = $1 AND id_event = $2)",
        )
        .bind(mail_address)
        .bind(id_event)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(exists)
    }

    async fn get_participation(
        &mut self,
        mail_address: &str,
        id_event: i32,
    ) -> Result<Option<Participation>, AppError> {
        let participation = sqlx::query_as::<_, Participation>(
            "SELECT * FROM participation WHERE mail_address_user = $1 AND id_event = $2",
        )
        .bind(mail_address)
        .bind(id_event)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(participation)
    }

    async fn get_all_participations(&mut self) -> Result<Vec<ParticipationListing>, AppError> {
        let participations = sqlx::query_as::<_, ParticipationListing>(
            r#"
            SELECT p.mail_address_user, p.id_event, e.name, p.register_date
            FROM participation p
            JOIN event e ON e.id = p.id_event
            ORDER BY p.id_event, p.mail_address_user
            "#,
        )
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(participations)
    }

    async fn get_participations_for_user(
        &mut self,
        mail_address: &str,
    ) -> Result<Vec<Participation>, AppError> {
        let participations = sqlx::query_as::<_, Participation>(
            "SELECT * FROM participation WHERE mail_address_user = $1 ORDER BY id_event",
        )
        .bind(mail_address)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(participations)
    }

    async fn get_participations_for_event(
        &mut self,
        id_event: i32,
    ) -> Result<Vec<Participation>, AppError> {
        let participations = sqlx::query_as::<_, Participation>(
            "SELECT * FROM participation WHERE id_event = $1 ORDER BY mail_address_user",
        )
        .bind(id_event)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(participations)
    }

    async fn count_participations_for_event(&mut self, id_event: i32) -> Result<i64, AppError> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM participation WHERE id_event = $1")
                .bind(id_event)
                .fetch_one(&mut *self.tx)
                .await?;
        Ok(count)
    }

    async fn get_participations_for_user_between(
        &mut self,
        mail_address: &str,
        starting: DateTime<Utc>,
        ending: DateTime<Utc>,
    ) -> Result<Vec<Participation>, AppError> {
        let participations = sqlx::query_as::<_, Participation>(
            r#"
            SELECT p.* FROM participation p
            JOIN event e ON e.id = p.id_event
            WHERE p.mail_address_user = $1
              AND e.starting_date <= $3 AND e.ending_date >= $2
            ORDER BY e.starting_date, p.id_event
            "#,
        )
        .bind(mail_address)
        .bind(starting)
        .bind(ending)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(participations)
    }

    async fn insert_participation(
        &mut self,
        participation: &Participation,
    ) -> Result<Participation, AppError> {
        let participation = sqlx::query_as::<_, Participation>(
            r#"
            INSERT INTO participation(mail_address_user, id_event, register_date)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(&participation.mail_address_user)
        .bind(participation.id_event)
        .bind(participation.register_date)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(unique_as(Conflict::ParticipationExists))?;
        Ok(participation)
    }

    async fn update_participation(
        &mut self,
        mail_address: &str,
        id_event: i32,
        participation: &Participation,
    ) -> Result<Option<Participation>, AppError> {
        let participation = sqlx::query_as::<_, Participation>(
            r#"
            UPDATE participation
            SET mail_address_user = $1, id_event = $2, register_date = $3
            WHERE mail_address_user = $4 AND id_event = $5
            RETURNING *
            "#,
        )
        .bind(&participation.mail_address_user)
        .bind(participation.id_event)
        .bind(participation.register_date)
        .bind(mail_address)
        .bind(id_event)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(unique_as(Conflict::ParticipationExists))?;
        Ok(participation)
    }

    async fn delete_participation(
        &mut self,
        mail_address: &str,
        id_event: i32,
    ) -> Result<bool, AppError> {
        let result =
            sqlx::query("DELETE FROM participation WHERE mail_address_user = $1 AND id_event = $2")
                .bind(mail_address)
                .bind(id_event)
                .execute(&mut *self.tx)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_participations_for_user(
        &mut self,
        mail_address: &str,
    ) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM participation WHERE mail_address_user = $1")
            .bind(mail_address)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_participations_for_event(&mut self, id_event: i32) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM participation WHERE id_event = $1")
            .bind(id_event)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn rename_participations(&mut self, from: &str, to: &str) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE participation SET mail_address_user = $1 WHERE mail_address_user = $2",
        )
        .bind(to)
        .bind(from)
        .execute(&mut *self.tx)
        .await
        .map_err(unique_as(Conflict::ParticipationExists))?;
        Ok(result.rows_affected())
    }

    // --- Users ---

    async fn user_exists(&mut self, mail_address: &str) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE mail_address = $1)",
        )
        .bind(mail_address)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(exists)
    }

    async fn get_user(&mut self, mail_address: &str) -> Result<Option<User>, AppError> {
        let query = format!("SELECT {} FROM users WHERE mail_address = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&query)
            .bind(mail_address)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(user)
    }

    async fn get_all_users(&mut self) -> Result<Vec<UserSummary>, AppError> {
        let users = sqlx::query_as::<_, UserSummary>(
            "SELECT mail_address, name, birthdate, role FROM users ORDER BY mail_address",
        )
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(users)
    }

    async fn insert_user(&mut self, user: &User) -> Result<User, AppError> {
        let query = format!(
            "INSERT INTO users({cols}) VALUES ($1, $2, $3, $4, $5) RETURNING {cols}",
            cols = USER_COLUMNS
        );
        let user = sqlx::query_as::<_, User>(&query)
            .bind(&user.mail_address)
            .bind(&user.password)
            .bind(&user.name)
            .bind(user.birthdate)
            .bind(user.role.as_str())
            .fetch_one(&mut *self.tx)
            .await
            .map_err(unique_as(Conflict::AlreadyRegistered))?;
        Ok(user)
    }

    async fn update_user(
        &mut self,
        mail_address: &str,
        user: &User,
    ) -> Result<Option<User>, AppError> {
        let query = format!(
            r#"
            UPDATE users
            SET mail_address = $1, password = $2, name = $3, birthdate = $4, role = $5
            WHERE mail_address = $6
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, User>(&query)
            .bind(&user.mail_address)
            .bind(&user.password)
            .bind(&user.name)
            .bind(user.birthdate)
            .bind(user.role.as_str())
            .bind(mail_address)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(unique_as(Conflict::AlreadyRegistered))?;
        Ok(user)
    }

    async fn update_profile_picture(
        &mut self,
        mail_address: &str,
        picture: &str,
    ) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE users SET profile_picture = $1 WHERE mail_address = $2")
            .bind(picture)
            .bind(mail_address)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_profile_picture(
        &mut self,
        mail_address: &str,
    ) -> Result<Option<String>, AppError> {
        let picture = sqlx::query_scalar::<_, Option<String>>(
            "SELECT profile_picture FROM users WHERE mail_address = $1",
        )
        .bind(mail_address)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(picture.flatten())
    }

    async fn delete_user(&mut self, mail_address: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM users WHERE mail_address = $1")
            .bind(mail_address)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        self.tx.commit().await?;
        Ok(())
    }
}
