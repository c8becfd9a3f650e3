//! Postgres-backed checks of the SQL layer. They need a reachable database:
//! `DATABASE_URL=postgres://... cargo test -- --ignored`.

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use event_ticketing::{
    error::{AppError, Conflict},
    models::{NewEvent, NewProduct, NewStand, ObjectPair, Participation, Role, User},
    repository::{PostgresRepository, Repository},
    tokens::TokenRegistry,
    workflows,
};
use sqlx::PgPool;

// --- Test Context and Setup ---

struct DbTestContext {
    pool: PgPool,
}

impl DbTestContext {
    async fn setup() -> Self {
        dotenv::dotenv().ok();

        let db_url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set to run integration tests");

        let pool = PgPool::connect(&db_url)
            .await
            .expect("Failed to connect to database for integration tests.");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run database migrations.");

        DbTestContext { pool }
    }

    fn repository(&self) -> PostgresRepository {
        PostgresRepository::new(self.pool.clone())
    }
}

// --- Test Data Helpers ---

/// A mail address no other test run has used.
fn unique_mail(prefix: &str) -> String {
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    format!("{}.{}.{}@test.be", prefix, std::process::id(), nanos)
}

fn user(mail_address: &str) -> User {
    User {
        mail_address: mail_address.to_string(),
        password: "$2b$04$hash".to_string(),
        name: "Integration".to_string(),
        birthdate: NaiveDate::from_ymd_opt(1992, 11, 3).unwrap(),
        role: Role::User,
    }
}

fn new_event(creator: &str) -> NewEvent {
    let starting_date = Utc.with_ymd_and_hms(2032, 4, 10, 9, 0, 0).unwrap();
    NewEvent {
        name: "Spring market".to_string(),
        starting_date,
        ending_date: starting_date + Duration::hours(10),
        street_name: "Grand Place".to_string(),
        house_number: None,
        postal_code: 1000,
        city: "Bruxelles".to_string(),
        children_accepted: true,
        description: "Flowers".to_string(),
        event_type: "market".to_string(),
        security_level: 1,
        require_mask: false,
        require_covid_safe_ticket: false,
        max_place_count: 80,
        mail_address_creator: creator.to_string(),
    }
}

// --- Tests ---

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_event_round_trip_keeps_the_type_column() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let creator = unique_mail("creator");

    let mut uow = repo.begin().await.unwrap();
    uow.insert_user(&user(&creator)).await.unwrap();
    let event = uow.insert_event(&new_event(&creator)).await.unwrap();
    uow.commit().await.unwrap();

    let mut uow = repo.begin().await.unwrap();
    let fetched = uow.get_event(event.id).await.unwrap().unwrap();
    assert_eq!(fetched, event);
    assert_eq!(fetched.event_type, "market");
    assert_eq!(fetched.house_number, None);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_duplicate_object_is_a_conflict() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let creator = unique_mail("objects");

    let mut uow = repo.begin().await.unwrap();
    uow.insert_user(&user(&creator)).await.unwrap();
    let event = uow.insert_event(&new_event(&creator)).await.unwrap();
    let stand = uow
        .insert_stand(&NewStand {
            stand_type: "bakery".to_string(),
            manager_name: "Marie".to_string(),
            area_size: 9.0,
            id_event: event.id,
        })
        .await
        .unwrap();
    let product = uow
        .insert_product(&NewProduct {
            name: "Bread".to_string(),
            description: "Sourdough".to_string(),
            price: 4.2,
        })
        .await
        .unwrap();
    let pair = ObjectPair {
        id_stand: stand.id,
        id_product: product.id,
    };
    uow.insert_object(pair).await.unwrap();
    let duplicate = uow.insert_object(pair).await;
    assert!(matches!(
        duplicate,
        Err(AppError::Conflict(Conflict::ObjectExists))
    ));
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_rename_relies_on_deferred_foreign_keys() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let old_address = unique_mail("old");
    let new_address = unique_mail("new");

    let mut uow = repo.begin().await.unwrap();
    uow.insert_user(&user(&old_address)).await.unwrap();
    let event = uow.insert_event(&new_event(&old_address)).await.unwrap();
    uow.insert_participation(&Participation {
        mail_address_user: old_address.clone(),
        id_event: event.id,
        register_date: Utc::now(),
    })
    .await
    .unwrap();
    uow.commit().await.unwrap();

    let patch = event_ticketing::models::UserPatch {
        mail_address: Some(new_address.clone()),
        ..Default::default()
    };
    workflows::update_user(&repo, &TokenRegistry::new(), &old_address, patch)
        .await
        .unwrap();

    let mut uow = repo.begin().await.unwrap();
    assert!(uow.participation_exists(&new_address, event.id).await.unwrap());
    let event = uow.get_event(event.id).await.unwrap().unwrap();
    assert_eq!(event.mail_address_creator, new_address);
    assert!(!uow.user_exists(&old_address).await.unwrap());
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_uncommitted_unit_of_work_rolls_back() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let mail_address = unique_mail("rollback");

    {
        let mut uow = repo.begin().await.unwrap();
        uow.insert_user(&user(&mail_address)).await.unwrap();
        // Dropped without commit.
    }

    let mut uow = repo.begin().await.unwrap();
    assert!(!uow.user_exists(&mail_address).await.unwrap());
}
