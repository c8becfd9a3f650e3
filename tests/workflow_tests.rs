use chrono::{Duration, NaiveDate, TimeZone, Utc};
use event_ticketing::{
    auth::{Identity, authenticate, issue_token},
    error::{AppError, AuthFailure, Conflict, Entity},
    models::{NewEvent, NewProduct, NewStand, ObjectPair, Participation, Role, User, UserPatch},
    repository::{MemoryRepository, Repository},
    tokens::TokenRegistry,
    workflows::{self, CascadeReport},
};

// --- Test Data Helpers ---

fn user(mail_address: &str, role: Role) -> User {
    User {
        mail_address: mail_address.to_string(),
        password: "$2b$04$hash".to_string(),
        name: mail_address.split('@').next().unwrap_or("user").to_string(),
        birthdate: NaiveDate::from_ymd_opt(1990, 5, 17).unwrap(),
        role,
    }
}

fn new_event(name: &str, creator: &str) -> NewEvent {
    let starting_date = Utc.with_ymd_and_hms(2031, 7, 1, 12, 0, 0).unwrap();
    NewEvent {
        name: name.to_string(),
        starting_date,
        ending_date: starting_date + Duration::days(2),
        street_name: "Rue de Bruxelles".to_string(),
        house_number: Some(61),
        postal_code: 5000,
        city: "Namur".to_string(),
        children_accepted: true,
        description: "Open air festival".to_string(),
        event_type: "festival".to_string(),
        security_level: 3,
        require_mask: false,
        require_covid_safe_ticket: false,
        max_place_count: 1200,
        mail_address_creator: creator.to_string(),
    }
}

/// Ids of the rows created by `seed`.
struct Seeded {
    id_event: i32,
    stands: Vec<i32>,
    id_product: i32,
}

/// One admin, one user, one event created by the user with two stands selling
/// three objects in total, and two participations.
async fn seed(repo: &MemoryRepository) -> Seeded {
    let mut uow = repo.begin().await.unwrap();
    uow.insert_user(&user("admin@test.be", Role::Admin)).await.unwrap();
    uow.insert_user(&user("alice@test.be", Role::User)).await.unwrap();
    let event = uow
        .insert_event(&new_event("Summer festival", "alice@test.be"))
        .await
        .unwrap();

    let mut stands = Vec::new();
    for stand_type in ["food", "drinks"] {
        let stand = uow
            .insert_stand(&NewStand {
                stand_type: stand_type.to_string(),
                manager_name: "Bob".to_string(),
                area_size: 12.5,
                id_event: event.id,
            })
            .await
            .unwrap();
        stands.push(stand.id);
    }

    let mut products = Vec::new();
    for (name, price) in [("Fries", 3.5), ("Beer", 2.5)] {
        let product = uow
            .insert_product(&NewProduct {
                name: name.to_string(),
                description: format!("{} of the day", name),
                price,
            })
            .await
            .unwrap();
        products.push(product.id);
    }
    for (id_stand, id_product) in [
        (stands[0], products[0]),
        (stands[0], products[1]),
        (stands[1], products[1]),
    ] {
        uow.insert_object(ObjectPair {
            id_stand,
            id_product,
        })
        .await
        .unwrap();
    }

    for mail_address in ["admin@test.be", "alice@test.be"] {
        uow.insert_participation(&Participation {
            mail_address_user: mail_address.to_string(),
            id_event: event.id,
            register_date: Utc.with_ymd_and_hms(2031, 6, 1, 9, 30, 0).unwrap(),
        })
        .await
        .unwrap();
    }
    uow.commit().await.unwrap();

    Seeded {
        id_event: event.id,
        stands,
        id_product: products[1],
    }
}

// --- Event cascade ---

#[tokio::test]
async fn deleting_an_event_removes_every_dependent_row() {
    let repo = MemoryRepository::new();
    let seeded = seed(&repo).await;

    let report = workflows::delete_event(&repo, seeded.id_event).await.unwrap();
    assert_eq!(
        report,
        CascadeReport {
            participations: 2,
            stands: 2,
            objects: 3,
        }
    );

    let mut uow = repo.begin().await.unwrap();
    assert!(!uow.event_exists(seeded.id_event).await.unwrap());
    assert!(uow.get_all_stands().await.unwrap().is_empty());
    assert!(uow.get_all_objects().await.unwrap().is_empty());
    assert!(uow.get_all_participations().await.unwrap().is_empty());
    // Products are not owned by the event.
    assert_eq!(uow.get_all_products().await.unwrap().len(), 2);
}

#[tokio::test]
async fn failed_event_cascade_leaves_everything_untouched() {
    let repo = MemoryRepository::new();
    let seeded = seed(&repo).await;

    // Participations and the first stand's objects are already gone when this fires.
    repo.fail_on("delete_stand");
    let result = workflows::delete_event(&repo, seeded.id_event).await;
    assert!(matches!(result, Err(AppError::Internal(_))));
    repo.clear_failures();

    let mut uow = repo.begin().await.unwrap();
    assert!(uow.event_exists(seeded.id_event).await.unwrap());
    assert_eq!(uow.get_stands_for_event(seeded.id_event).await.unwrap().len(), 2);
    assert_eq!(uow.get_all_objects().await.unwrap().len(), 3);
    assert_eq!(
        uow.count_participations_for_event(seeded.id_event).await.unwrap(),
        2
    );
}

#[tokio::test]
async fn deleting_a_missing_event_is_not_found() {
    let repo = MemoryRepository::new();
    let result = workflows::delete_event(&repo, 404).await;
    assert!(matches!(result, Err(AppError::NotFound(Entity::Event))));
}

// --- Stand and product cascades ---

#[tokio::test]
async fn deleting_a_stand_removes_only_its_objects() {
    let repo = MemoryRepository::new();
    let seeded = seed(&repo).await;

    let report = workflows::delete_stand(&repo, seeded.stands[0]).await.unwrap();
    assert_eq!(report.objects, 2);

    let mut uow = repo.begin().await.unwrap();
    assert!(!uow.stand_exists(seeded.stands[0]).await.unwrap());
    let remaining = uow.get_all_objects().await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id_stand, seeded.stands[1]);
}

#[tokio::test]
async fn deleting_all_stands_keeps_the_event_and_its_participations() {
    let repo = MemoryRepository::new();
    let seeded = seed(&repo).await;

    let report = workflows::delete_all_stands_for_event(&repo, seeded.id_event)
        .await
        .unwrap();
    assert_eq!(report.stands, 2);
    assert_eq!(report.objects, 3);

    let mut uow = repo.begin().await.unwrap();
    assert!(uow.event_exists(seeded.id_event).await.unwrap());
    assert_eq!(uow.count_stands_for_event(seeded.id_event).await.unwrap(), 0);
    assert_eq!(
        uow.count_participations_for_event(seeded.id_event).await.unwrap(),
        2
    );
}

#[tokio::test]
async fn deleting_a_product_unlinks_it_from_every_stand() {
    let repo = MemoryRepository::new();
    let seeded = seed(&repo).await;

    let report = workflows::delete_product(&repo, seeded.id_product).await.unwrap();
    assert_eq!(report.objects, 2);

    let mut uow = repo.begin().await.unwrap();
    assert!(!uow.product_exists(seeded.id_product).await.unwrap());
    assert_eq!(uow.get_all_objects().await.unwrap().len(), 1);
}

// --- User deletion ---

#[tokio::test]
async fn deleting_a_user_hands_events_over_and_revokes_tokens() {
    let repo = MemoryRepository::new();
    let seeded = seed(&repo).await;
    let registry = TokenRegistry::new();
    registry.insert("alice@test.be", "token-a");
    registry.insert("alice@test.be", "token-b");
    registry.insert("admin@test.be", "token-admin");

    let deletion = workflows::delete_user(&repo, &registry, "admin@test.be", "alice@test.be")
        .await
        .unwrap();
    assert_eq!(deletion.reassigned_events, 1);
    assert_eq!(deletion.participations, 1);
    assert_eq!(deletion.revoked_tokens, 2);

    let mut uow = repo.begin().await.unwrap();
    assert!(!uow.user_exists("alice@test.be").await.unwrap());
    assert!(uow
        .get_participations_for_user("alice@test.be")
        .await
        .unwrap()
        .is_empty());
    let event = uow.get_event(seeded.id_event).await.unwrap().unwrap();
    assert_eq!(event.mail_address_creator, "admin@test.be");
    // Only the creator column changes.
    assert_eq!(event.name, "Summer festival");

    assert!(!registry.is_valid("alice@test.be", "token-a"));
    assert!(registry.is_valid("admin@test.be", "token-admin"));
}

#[tokio::test]
async fn an_admin_cannot_delete_itself() {
    let repo = MemoryRepository::new();
    seed(&repo).await;
    let registry = TokenRegistry::new();

    let result = workflows::delete_user(&repo, &registry, "admin@test.be", "admin@test.be").await;
    assert!(matches!(result, Err(AppError::CannotDeleteSelf)));
}

#[tokio::test]
async fn failed_user_deletion_keeps_the_account_and_its_tokens() {
    let repo = MemoryRepository::new();
    let seeded = seed(&repo).await;
    let registry = TokenRegistry::new();
    registry.insert("alice@test.be", "token-a");

    repo.fail_on("delete_user");
    let result = workflows::delete_user(&repo, &registry, "admin@test.be", "alice@test.be").await;
    assert!(result.is_err());
    repo.clear_failures();

    let mut uow = repo.begin().await.unwrap();
    assert!(uow.user_exists("alice@test.be").await.unwrap());
    let event = uow.get_event(seeded.id_event).await.unwrap().unwrap();
    assert_eq!(event.mail_address_creator, "alice@test.be");
    assert_eq!(
        uow.get_participations_for_user("alice@test.be").await.unwrap().len(),
        1
    );
    assert!(registry.is_valid("alice@test.be", "token-a"));
}

// --- Rename ---

#[tokio::test]
async fn renaming_a_user_carries_participations_and_events() {
    let repo = MemoryRepository::new();
    let seeded = seed(&repo).await;
    let registry = TokenRegistry::new();
    registry.insert("alice@test.be", "token-a");

    let before = {
        let mut uow = repo.begin().await.unwrap();
        uow.get_participation("alice@test.be", seeded.id_event)
            .await
            .unwrap()
            .unwrap()
    };

    let patch = UserPatch {
        mail_address: Some("alice@new.be".to_string()),
        name: Some("Alice".to_string()),
        ..Default::default()
    };
    let updated = workflows::update_user(&repo, &registry, "alice@test.be", patch)
        .await
        .unwrap();
    assert_eq!(updated.mail_address, "alice@new.be");
    assert_eq!(updated.name, "Alice");
    assert_eq!(updated.role, Role::User);

    let mut uow = repo.begin().await.unwrap();
    assert!(!uow.user_exists("alice@test.be").await.unwrap());
    let moved = uow
        .get_participation("alice@new.be", seeded.id_event)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(moved.register_date, before.register_date);
    assert!(uow
        .get_participations_for_user("alice@test.be")
        .await
        .unwrap()
        .is_empty());
    assert!(uow
        .get_events_created_by("alice@test.be")
        .await
        .unwrap()
        .is_empty());
    let event = uow.get_event(seeded.id_event).await.unwrap().unwrap();
    assert_eq!(event.mail_address_creator, "alice@new.be");
    assert_eq!(event.description, "Open air festival");

    assert_eq!(registry.count("alice@test.be"), 0);
}

#[tokio::test]
async fn renaming_onto_a_registered_address_is_a_conflict() {
    let repo = MemoryRepository::new();
    seed(&repo).await;
    let registry = TokenRegistry::new();

    let patch = UserPatch {
        mail_address: Some("admin@test.be".to_string()),
        ..Default::default()
    };
    let result = workflows::update_user(&repo, &registry, "alice@test.be", patch).await;
    assert!(matches!(
        result,
        Err(AppError::Conflict(Conflict::AlreadyRegistered))
    ));
}

#[tokio::test]
async fn failed_rename_is_fully_rolled_back() {
    let repo = MemoryRepository::new();
    let seeded = seed(&repo).await;
    let registry = TokenRegistry::new();
    registry.insert("alice@test.be", "token-a");

    // Participations are already rewritten when the event step fails.
    repo.fail_on("reassign_events");
    let patch = UserPatch {
        mail_address: Some("alice@new.be".to_string()),
        ..Default::default()
    };
    assert!(workflows::update_user(&repo, &registry, "alice@test.be", patch)
        .await
        .is_err());
    repo.clear_failures();

    let mut uow = repo.begin().await.unwrap();
    assert!(uow.user_exists("alice@test.be").await.unwrap());
    assert!(!uow.user_exists("alice@new.be").await.unwrap());
    assert!(uow
        .participation_exists("alice@test.be", seeded.id_event)
        .await
        .unwrap());
    assert!(registry.is_valid("alice@test.be", "token-a"));
}

#[tokio::test]
async fn an_empty_user_patch_touches_nothing() {
    let repo = MemoryRepository::new();
    seed(&repo).await;
    let registry = TokenRegistry::new();

    let result =
        workflows::update_user(&repo, &registry, "alice@test.be", UserPatch::default()).await;
    assert!(matches!(result, Err(AppError::NothingToUpdate)));
}

fn bearer(token: &str) -> axum::http::HeaderMap {
    let mut headers = axum::http::HeaderMap::new();
    headers.insert(
        axum::http::header::AUTHORIZATION,
        format!("Bearer {}", token).parse().unwrap(),
    );
    headers
}

#[tokio::test]
async fn demoting_an_admin_revokes_the_tokens_carrying_the_old_role() {
    const SECRET: &str = "workflow-secret";
    let repo = MemoryRepository::new();
    seed(&repo).await;
    let registry = TokenRegistry::new();
    let token = issue_token(
        Identity {
            mail_address: "admin@test.be".to_string(),
            name: "admin".to_string(),
            role: Role::Admin,
        },
        SECRET,
    )
    .unwrap();
    registry.insert("admin@test.be", &token);
    assert!(authenticate(&bearer(&token), SECRET, &registry)
        .unwrap()
        .is_admin());

    let patch = UserPatch {
        role: Some(Role::User),
        ..Default::default()
    };
    let updated = workflows::update_user(&repo, &registry, "admin@test.be", patch)
        .await
        .unwrap();
    assert_eq!(updated.role, Role::User);

    assert_eq!(
        authenticate(&bearer(&token), SECRET, &registry),
        Err(AuthFailure::RevokedCredential)
    );
}

#[tokio::test]
async fn a_new_display_name_revokes_tokens_but_a_password_change_does_not() {
    let repo = MemoryRepository::new();
    seed(&repo).await;
    let registry = TokenRegistry::new();
    registry.insert("alice@test.be", "token-a");

    let patch = UserPatch {
        password: Some("$2b$04$other".to_string()),
        ..Default::default()
    };
    workflows::update_user(&repo, &registry, "alice@test.be", patch)
        .await
        .unwrap();
    assert!(registry.is_valid("alice@test.be", "token-a"));

    // Same name as stored: nothing to revoke.
    let patch = UserPatch {
        name: Some("alice".to_string()),
        ..Default::default()
    };
    workflows::update_user(&repo, &registry, "alice@test.be", patch)
        .await
        .unwrap();
    assert!(registry.is_valid("alice@test.be", "token-a"));

    let patch = UserPatch {
        name: Some("Alice Liddell".to_string()),
        ..Default::default()
    };
    workflows::update_user(&repo, &registry, "alice@test.be", patch)
        .await
        .unwrap();
    assert_eq!(registry.count("alice@test.be"), 0);
}
