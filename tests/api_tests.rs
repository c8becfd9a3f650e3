use chrono::NaiveDate;
use event_ticketing::{
    AppConfig, AppState, MemoryRepository, TokenRegistry, auth, create_router,
    models::{Role, User},
    repository::{Repository, RepositoryState},
};
use image::{ImageFormat, Rgb, RgbImage};
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use std::{io::Cursor, sync::Arc};
use tokio::net::TcpListener;

const ADMIN: (&str, &str) = ("admin@test.be", "adminpass");
const USER: (&str, &str) = ("user@test.be", "userpass");

pub struct TestApp {
    pub address: String,
    pub repo: MemoryRepository,
    pub tokens: TokenRegistry,
    pub client: Client,
}

impl TestApp {
    fn url(&self, path: &str) -> String {
        format!("{}/v1{}", self.address, path)
    }

    async fn login(&self, (mail_address, password): (&str, &str)) -> String {
        let response = self
            .client
            .post(self.url("/user/login"))
            .basic_auth(mail_address, Some(password))
            .send()
            .await
            .expect("req fail");
        assert_eq!(response.status(), StatusCode::CREATED);
        let body: Value = response.json().await.unwrap();
        body["token"].as_str().unwrap().to_string()
    }

    async fn create_event(&self, token: &str) -> i64 {
        let response = self
            .client
            .post(self.url("/event/add"))
            .bearer_auth(token)
            .json(&event_body())
            .send()
            .await
            .expect("req fail");
        assert_eq!(response.status(), StatusCode::CREATED);
        let body: Value = response.json().await.unwrap();
        body["event"]["id"].as_i64().unwrap()
    }
}

fn event_body() -> Value {
    json!({
        "name": "Harvest fair",
        "startingDate": "2031-09-20T10:00:00Z",
        "endingDate": "2031-09-21T22:00:00Z",
        "streetName": "Place d'Armes",
        "houseNumber": 1,
        "postalCode": 5000,
        "city": "Namur",
        "description": "Local producers",
        "type": "fair",
        "securityLevel": 2,
        "maxPlaceCount": 300
    })
}

async fn seed_user(repo: &MemoryRepository, (mail_address, password): (&str, &str), role: Role) {
    let password = auth::hash_password(password.to_string(), 4).await.unwrap();
    let mut uow = repo.begin().await.unwrap();
    uow.insert_user(&User {
        mail_address: mail_address.to_string(),
        password,
        name: "Tester".to_string(),
        birthdate: NaiveDate::from_ymd_opt(1985, 3, 9).unwrap(),
        role,
    })
    .await
    .unwrap();
    uow.commit().await.unwrap();
}

async fn spawn_app() -> TestApp {
    let repo = MemoryRepository::new();
    seed_user(&repo, ADMIN, Role::Admin).await;
    seed_user(&repo, USER, Role::User).await;

    let tokens = TokenRegistry::new();
    let state = AppState {
        repo: Arc::new(repo.clone()) as RepositoryState,
        tokens: tokens.clone(),
        config: AppConfig::default(),
    };
    let router = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp {
        address,
        repo,
        tokens,
        client: Client::new(),
    }
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_pixel(width, height, Rgb([200, 40, 40]));
    let mut bytes = Cursor::new(Vec::new());
    image.write_to(&mut bytes, ImageFormat::Png).unwrap();
    bytes.into_inner()
}

// --- Service ---

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;
    let response = app
        .client
        .get(format!("{}/health", app.address))
        .send()
        .await
        .expect("req fail");
    assert!(response.status().is_success());
    assert!(response.headers().contains_key("x-request-id"));
}

// --- Login and registration ---

#[tokio::test]
async fn test_login_registers_the_issued_token() {
    let app = spawn_app().await;
    let token = app.login(ADMIN).await;
    assert!(app.tokens.is_valid(ADMIN.0, &token));

    let response = app
        .client
        .get(app.url("/user/account"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["user"]["mailAddress"], ADMIN.0);
    assert_eq!(body["user"]["role"], "admin");
}

#[tokio::test]
async fn test_login_failures() {
    let app = spawn_app().await;

    let wrong_password = app
        .client
        .post(app.url("/user/login"))
        .basic_auth(USER.0, Some("not-the-password"))
        .send()
        .await
        .unwrap();
    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    let body: Value = wrong_password.json().await.unwrap();
    assert_eq!(body["error"], "Invalid password");

    let unknown = app
        .client
        .post(app.url("/user/login"))
        .basic_auth("nobody@test.be", Some("whatever"))
        .send()
        .await
        .unwrap();
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);

    let missing = app.client.post(app.url("/user/login")).send().await.unwrap();
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

    let bad_mail = app
        .client
        .post(app.url("/user/login"))
        .basic_auth("not-a-mail", Some("whatever"))
        .send()
        .await
        .unwrap();
    assert_eq!(bad_mail.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_register_then_use_the_token() {
    let app = spawn_app().await;
    let body = json!({
        "mailAddress": "new@test.be",
        "password": "secret123",
        "name": "Newcomer",
        "birthdate": "1999-02-14",
        "role": "admin"
    });

    let response = app
        .client
        .post(app.url("/user/register"))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: Value = response.json().await.unwrap();
    let token = created["token"].as_str().unwrap().to_string();

    // Self-registration never grants the admin role.
    let account: Value = app
        .client
        .get(app.url("/user/account"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(account["user"]["role"], "user");

    let again = app
        .client
        .post(app.url("/user/register"))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(again.status(), StatusCode::BAD_REQUEST);

    let logged_in = app
        .client
        .post(app.url("/user/register"))
        .bearer_auth(&token)
        .json(&json!({
            "mailAddress": "other@test.be",
            "password": "secret123",
            "name": "Other",
            "birthdate": "1999-02-14"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(logged_in.status(), StatusCode::BAD_REQUEST);
    let error: Value = logged_in.json().await.unwrap();
    assert_eq!(error["error"], "Can not register user if you are logged in");
}

#[tokio::test]
async fn test_register_validation() {
    let app = spawn_app().await;
    let cases = [
        json!({ "mailAddress": "bad", "password": "secret123", "name": "A", "birthdate": "1990-01-01" }),
        json!({ "mailAddress": "a@test.be", "password": "123", "name": "A", "birthdate": "1990-01-01" }),
        json!({ "mailAddress": "a@test.be", "password": "secret123", "name": "A", "birthdate": "2020-01-01" }),
        json!({ "mailAddress": "a@test.be", "password": "secret123", "birthdate": "1990-01-01" }),
        json!({ "mailAddress": "a@test.be", "password": 123456, "name": "A", "birthdate": "1990-01-01" }),
    ];
    for body in cases {
        let response = app
            .client
            .post(app.url("/user/register"))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {}", body);
    }
}

// --- Authentication and authorization gates ---

#[tokio::test]
async fn test_token_is_required_and_checked() {
    let app = spawn_app().await;

    let missing = app.client.get(app.url("/event/all")).send().await.unwrap();
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);
    let body: Value = missing.json().await.unwrap();
    assert_eq!(body["error"], "Missing token");

    let garbage = app
        .client
        .get(app.url("/event/all"))
        .bearer_auth("not.a.token")
        .send()
        .await
        .unwrap();
    assert_eq!(garbage.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_routes_refuse_regular_users() {
    let app = spawn_app().await;
    let token = app.login(USER).await;

    let response = app
        .client
        .post(app.url("/event/add"))
        .bearer_auth(&token)
        .json(&event_body())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // No token at all is an authentication failure, not an authorization one.
    let anonymous = app
        .client
        .get(app.url("/user/all"))
        .send()
        .await
        .unwrap();
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);
}

// --- Events ---

#[tokio::test]
async fn test_event_lifecycle() {
    let app = spawn_app().await;
    let admin = app.login(ADMIN).await;
    let user = app.login(USER).await;
    let id_event = app.create_event(&admin).await;

    let fetched: Value = app
        .client
        .get(app.url("/event"))
        .query(&[("idEvent", id_event)])
        .bearer_auth(&user)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let event = &fetched["event"];
    assert_eq!(event["type"], "fair");
    assert_eq!(event["mail_address_creator"], ADMIN.0);
    assert_eq!(event["require_mask"], true);
    assert_eq!(event["count"], 0);
    assert_eq!(event["stand_count"], 0);

    // An explicit false is an update, not an omission.
    let updated = app
        .client
        .patch(app.url("/event/update"))
        .bearer_auth(&admin)
        .json(&json!({ "idEvent": id_event, "requireMask": false }))
        .send()
        .await
        .unwrap();
    assert_eq!(updated.status(), StatusCode::OK);
    let updated: Value = updated.json().await.unwrap();
    assert_eq!(updated["event"]["require_mask"], false);
    assert_eq!(updated["event"]["name"], "Harvest fair");

    let nothing = app
        .client
        .patch(app.url("/event/update"))
        .bearer_auth(&admin)
        .json(&json!({ "idEvent": id_event }))
        .send()
        .await
        .unwrap();
    assert_eq!(nothing.status(), StatusCode::BAD_REQUEST);

    let incoherent = app
        .client
        .patch(app.url("/event/update"))
        .bearer_auth(&admin)
        .json(&json!({ "idEvent": id_event, "endingDate": "2031-09-01T00:00:00Z" }))
        .send()
        .await
        .unwrap();
    assert_eq!(incoherent.status(), StatusCode::BAD_REQUEST);

    // Blank text is refused on update just as on creation.
    for field in ["name", "city", "description", "type"] {
        let blank = app
            .client
            .patch(app.url("/event/update"))
            .bearer_auth(&admin)
            .json(&json!({ "idEvent": id_event, field: "" }))
            .send()
            .await
            .unwrap();
        assert_eq!(blank.status(), StatusCode::BAD_REQUEST, "blank {}", field);
    }
    let kept: Value = app
        .client
        .get(app.url("/event"))
        .query(&[("idEvent", id_event)])
        .bearer_auth(&user)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(kept["event"]["name"], "Harvest fair");

    let deleted = app
        .client
        .delete(app.url("/event/delete"))
        .bearer_auth(&admin)
        .json(&json!({ "idEvent": id_event }))
        .send()
        .await
        .unwrap();
    assert_eq!(deleted.status(), StatusCode::OK);

    let gone = app
        .client
        .get(app.url("/event"))
        .query(&[("idEvent", id_event)])
        .bearer_auth(&user)
        .send()
        .await
        .unwrap();
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_types_are_reported() {
    let app = spawn_app().await;
    let admin = app.login(ADMIN).await;

    let mut body = event_body();
    body["postalCode"] = json!("five thousand");
    let response = app
        .client
        .post(app.url("/event/add"))
        .bearer_auth(&admin)
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error: Value = response.json().await.unwrap();
    assert_eq!(error["error"], "Invalid types in the request");

    let query = app
        .client
        .get(app.url("/event"))
        .query(&[("idEvent", "abc")])
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(query.status(), StatusCode::BAD_REQUEST);

    let not_json = app
        .client
        .post(app.url("/event/add"))
        .bearer_auth(&admin)
        .header("content-type", "application/json")
        .body("{ not json")
        .send()
        .await
        .unwrap();
    assert_eq!(not_json.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_search_and_popular_events() {
    let app = spawn_app().await;
    let admin = app.login(ADMIN).await;
    let user = app.login(USER).await;
    let quiet = app.create_event(&admin).await;
    let busy = app.create_event(&admin).await;

    for token in [&admin, &user] {
        let response = app
            .client
            .post(app.url("/user/reservation/add"))
            .bearer_auth(token)
            .json(&json!({ "idEvent": busy }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let popular: Value = app
        .client
        .get(app.url("/event/popular"))
        .query(&[("topNumber", 1)])
        .bearer_auth(&user)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let events = popular["events"].as_array().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["id"].as_i64(), Some(busy));
    assert_eq!(events[0]["count"], 2);

    let in_progress: Value = app
        .client
        .get(app.url("/event/search"))
        .query(&[("date", "2031-09-20T18:00:00Z"), ("city", "NAMUR")])
        .bearer_auth(&user)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(in_progress["events"].as_array().unwrap().len(), 2);

    let elsewhere: Value = app
        .client
        .get(app.url("/event/search"))
        .query(&[("city", "Liège")])
        .bearer_auth(&user)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(elsewhere["events"].as_array().unwrap().is_empty());
    assert_ne!(quiet, busy);
}

// --- Stands, products and objects ---

#[tokio::test]
async fn test_stand_products_and_object_conflict() {
    let app = spawn_app().await;
    let admin = app.login(ADMIN).await;
    let id_event = app.create_event(&admin).await;

    let stand: Value = app
        .client
        .post(app.url("/event/stand/add"))
        .bearer_auth(&admin)
        .json(&json!({ "type": "food", "managerName": "Bob", "areaSize": 20.0, "idEvent": id_event }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let id_stand = stand["stand"]["id"].as_i64().unwrap();
    assert_eq!(stand["stand"]["type"], "food");

    let product: Value = app
        .client
        .post(app.url("/product/add"))
        .bearer_auth(&admin)
        .json(&json!({ "name": "Waffle", "description": "Liège waffle", "price": 3.0 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let id_product = product["product"]["id"].as_i64().unwrap();

    let pair = json!({ "idStand": id_stand, "idProduct": id_product });
    let first = app
        .client
        .post(app.url("/event/stand/product/add"))
        .bearer_auth(&admin)
        .json(&pair)
        .send()
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::CREATED);
    let second = app
        .client
        .post(app.url("/event/stand/product/add"))
        .bearer_auth(&admin)
        .json(&pair)
        .send()
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::BAD_REQUEST);

    let sold: Value = app
        .client
        .get(app.url("/event/stand/product"))
        .query(&[("idStand", id_stand)])
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(sold["products"][0]["name"], "Waffle");

    let negative = app
        .client
        .patch(app.url("/product/update"))
        .bearer_auth(&admin)
        .json(&json!({ "idProduct": id_product, "price": -1.0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(negative.status(), StatusCode::BAD_REQUEST);

    let deleted: Value = app
        .client
        .delete(app.url("/event/stand/product/delete"))
        .bearer_auth(&admin)
        .json(&pair)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(deleted["message"], "Object deleted from the stand");

    let event: Value = app
        .client
        .get(app.url("/event"))
        .query(&[("idEvent", id_event)])
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(event["event"]["stand_count"], 1);
}

// --- Participations ---

#[tokio::test]
async fn test_participation_flow() {
    let app = spawn_app().await;
    let admin = app.login(ADMIN).await;
    let user = app.login(USER).await;
    let id_event = app.create_event(&admin).await;

    let add = |token: String| {
        let request = app
            .client
            .post(app.url("/user/reservation/add"))
            .bearer_auth(token)
            .json(&json!({ "idEvent": id_event }));
        async move { request.send().await.unwrap().status() }
    };
    assert_eq!(add(user.clone()).await, StatusCode::CREATED);
    assert_eq!(add(user.clone()).await, StatusCode::BAD_REQUEST);

    let consult = app
        .client
        .get(app.url("/user/reservation/consult"))
        .query(&[("idEvent", id_event)])
        .bearer_auth(&user)
        .send()
        .await
        .unwrap();
    assert_eq!(consult.status(), StatusCode::OK);
    let consult: Value = consult.json().await.unwrap();
    assert!(consult["registerDate"].is_string());

    let all: Value = app
        .client
        .get(app.url("/user/reservation/consult/all"))
        .bearer_auth(&user)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(all["oldEvents"].as_array().unwrap().is_empty());
    assert_eq!(all["upcomingEvents"][0]["count"], 1);

    let count: Value = app
        .client
        .get(app.url("/event/reservation/count"))
        .query(&[("idEvent", id_event)])
        .bearer_auth(&user)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(count["participationInfos"]["participation_count"], 1);

    let incoherent = app
        .client
        .get(app.url("/user/reservation/consult/between"))
        .query(&[
            ("startingDate", "2031-09-22T00:00:00Z"),
            ("endingDate", "2031-09-01T00:00:00Z"),
        ])
        .bearer_auth(&user)
        .send()
        .await
        .unwrap();
    assert_eq!(incoherent.status(), StatusCode::BAD_REQUEST);

    let between: Value = app
        .client
        .get(app.url("/user/reservation/consult/between"))
        .query(&[
            ("startingDate", "2031-09-01T00:00:00Z"),
            ("endingDate", "2031-09-20T12:00:00Z"),
        ])
        .bearer_auth(&user)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(between["participations"].as_array().unwrap().len(), 1);

    // Admin moves the registration onto the admin account.
    let moved = app
        .client
        .patch(app.url("/user/reservation/update"))
        .bearer_auth(&admin)
        .json(&json!({ "mailAddress": USER.0, "idEvent": id_event, "newMailAddress": ADMIN.0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(moved.status(), StatusCode::OK);
    let moved: Value = moved.json().await.unwrap();
    assert_eq!(moved["participation"]["mail_address_user"], ADMIN.0);

    let removed = app
        .client
        .delete(app.url("/user/reservation/delete"))
        .bearer_auth(&user)
        .json(&json!({ "idEvent": id_event }))
        .send()
        .await
        .unwrap();
    assert_eq!(removed.status(), StatusCode::NOT_FOUND);
}

// --- Accounts ---

#[tokio::test]
async fn test_profile_picture_upload() {
    let app = spawn_app().await;
    let user = app.login(USER).await;
    let url = app.url("/user/account/profilePicture");

    let none = app
        .client
        .get(app.url("/user/account/picture"))
        .bearer_auth(&user)
        .send()
        .await
        .unwrap();
    assert_eq!(none.status(), StatusCode::NOT_FOUND);

    let too_large = app
        .client
        .patch(&url)
        .bearer_auth(&user)
        .body(vec![0u8; 60_000])
        .send()
        .await
        .unwrap();
    assert_eq!(too_large.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let not_an_image = app
        .client
        .patch(&url)
        .bearer_auth(&user)
        .body(b"plain text, not pixels".to_vec())
        .send()
        .await
        .unwrap();
    assert_eq!(not_an_image.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

    let accepted = app
        .client
        .patch(&url)
        .bearer_auth(&user)
        .body(png_bytes(64, 32))
        .send()
        .await
        .unwrap();
    assert_eq!(accepted.status(), StatusCode::OK);

    let stored: Value = app
        .client
        .get(app.url("/user/account/picture"))
        .bearer_auth(&user)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(
        stored["profilePicture"]
            .as_str()
            .unwrap()
            .starts_with("data:image/jpeg;base64,")
    );
}

#[tokio::test]
async fn test_password_update_requires_the_current_password() {
    let app = spawn_app().await;
    let user = app.login(USER).await;

    let wrong = app
        .client
        .patch(app.url("/user/account/update"))
        .bearer_auth(&user)
        .json(&json!({ "currentPassword": "guessing", "newPassword": "brandnew1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

    let right = app
        .client
        .patch(app.url("/user/account/update"))
        .bearer_auth(&user)
        .json(&json!({ "currentPassword": USER.1, "newPassword": "brandnew1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(right.status(), StatusCode::OK);

    app.login((USER.0, "brandnew1")).await;
}

#[tokio::test]
async fn test_deleted_user_tokens_stop_working() {
    let app = spawn_app().await;
    let admin = app.login(ADMIN).await;
    let user = app.login(USER).await;

    let self_delete = app
        .client
        .delete(app.url("/user/delete"))
        .bearer_auth(&admin)
        .json(&json!({ "mailAddress": ADMIN.0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(self_delete.status(), StatusCode::BAD_REQUEST);

    let deleted = app
        .client
        .delete(app.url("/user/delete"))
        .bearer_auth(&admin)
        .json(&json!({ "mailAddress": USER.0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(deleted.status(), StatusCode::OK);

    let rejected = app
        .client
        .get(app.url("/user/account"))
        .bearer_auth(&user)
        .send()
        .await
        .unwrap();
    assert_eq!(rejected.status(), StatusCode::UNAUTHORIZED);
    let body: Value = rejected.json().await.unwrap();
    assert_eq!(
        body["error"],
        "This token is not valid : user deleted or server reboot"
    );

    let mut uow = app.repo.begin().await.unwrap();
    assert!(!uow.user_exists(USER.0).await.unwrap());
}

#[tokio::test]
async fn test_admin_rename_moves_everything() {
    let app = spawn_app().await;
    let admin = app.login(ADMIN).await;
    let user = app.login(USER).await;
    let id_event = app.create_event(&admin).await;
    app.client
        .post(app.url("/user/reservation/add"))
        .bearer_auth(&user)
        .json(&json!({ "idEvent": id_event }))
        .send()
        .await
        .unwrap();

    let renamed = app
        .client
        .patch(app.url("/user/account/admin/update"))
        .bearer_auth(&admin)
        .json(&json!({
            "userMailAddress": USER.0,
            "newUserMailAddress": "renamed@test.be",
            "role": "admin"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(renamed.status(), StatusCode::OK);
    let renamed: Value = renamed.json().await.unwrap();
    assert_eq!(renamed["user"]["mail_address"], "renamed@test.be");
    assert_eq!(renamed["user"]["role"], "admin");
    assert!(renamed["user"].get("password").is_none());

    // The old address no longer holds a session.
    let stale = app
        .client
        .get(app.url("/user/account"))
        .bearer_auth(&user)
        .send()
        .await
        .unwrap();
    assert_eq!(stale.status(), StatusCode::UNAUTHORIZED);

    let mut uow = app.repo.begin().await.unwrap();
    assert!(
        uow.participation_exists("renamed@test.be", id_event as i32)
            .await
            .unwrap()
    );
    assert!(!uow.user_exists(USER.0).await.unwrap());
}
