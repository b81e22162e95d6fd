#![allow(dead_code)]

use reqwest::Client;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ActiveValue, ColumnTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter,
};
use sea_orm_migration::MigratorTrait;
use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Once,
};

use placemark::models::{location, user, vote, Vote};

static INIT: Once = Once::new();
static MIGRATIONS_RAN: AtomicBool = AtomicBool::new(false);
static NAME_COUNTER: AtomicUsize = AtomicUsize::new(0);

fn init_env() {
    INIT.call_once(|| {
        dotenv::dotenv().ok();
        std::env::set_var(
            "JWT_SECRET",
            "integration_test_secret_that_is_at_least_32_characters_long",
        );
        std::env::set_var("RATE_LIMIT_ENABLED", "false");
        let config = placemark::config::jwt::JwtConfig::from_env().unwrap();
        let _ = placemark::utils::jwt::init_jwt_config(config);
    });
}

pub struct TestApp {
    pub addr: String,
    pub db: DatabaseConnection,
    pub client: Client,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.addr, path)
    }
}

/// Spawn the API against the database named by TEST_DATABASE_URL.
/// Returns None (so the test can skip) when no test database is
/// configured.
pub async fn try_spawn_app() -> Option<TestApp> {
    init_env();

    let Ok(database_url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set, skipping integration test");
        return None;
    };

    let db = sea_orm::Database::connect(&database_url)
        .await
        .expect("Failed to connect to test database");

    // Run migrations only once globally
    if !MIGRATIONS_RAN.swap(true, Ordering::SeqCst) {
        placemark::migration::Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");
    }

    let app = axum::Router::new()
        .merge(placemark::routes::create_routes())
        .layer(axum::extract::Extension(db.clone()));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .expect("Test server failed");
    });

    Some(TestApp {
        addr: format!("http://{}", addr),
        db,
        client: Client::new(),
    })
}

/// Names unique per process run so parallel tests never collide on the
/// users.username constraint.
pub fn unique_name(prefix: &str) -> String {
    let n = NAME_COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("{}_{}_{}", prefix, std::process::id(), n)
}

pub async fn create_test_user(db: &DatabaseConnection, prefix: &str) -> (i32, String) {
    let username = unique_name(prefix);
    let now = chrono::Utc::now().naive_utc();
    let model = user::ActiveModel {
        username: ActiveValue::Set(username.clone()),
        email: ActiveValue::Set(format!("{username}@example.com")),
        created_at: ActiveValue::Set(now),
        ..Default::default()
    };
    let inserted = model.insert(db).await.expect("Failed to insert test user");
    let token = placemark::utils::jwt::encode_access_token(&inserted.id.to_string())
        .expect("Failed to mint test token");
    (inserted.id, token)
}

pub async fn create_test_location(db: &DatabaseConnection) -> i32 {
    let now = chrono::Utc::now().naive_utc();
    let model = location::ActiveModel {
        name: ActiveValue::Set(unique_name("location")),
        city: ActiveValue::Set("Test City".to_string()),
        category: ActiveValue::Set("cafe".to_string()),
        description: ActiveValue::Set(None),
        created_at: ActiveValue::Set(now),
        updated_at: ActiveValue::Set(now),
        ..Default::default()
    };
    let inserted = model
        .insert(db)
        .await
        .expect("Failed to insert test location");
    inserted.id
}

pub async fn soft_delete_user(db: &DatabaseConnection, user_id: i32) {
    placemark::models::User::update_many()
        .col_expr(user::Column::DeletedAt, Expr::current_timestamp().into())
        .filter(user::Column::Id.eq(user_id))
        .exec(db)
        .await
        .expect("Failed to soft-delete test user");
}

pub async fn live_vote_count(db: &DatabaseConnection, user_id: i32, location_id: i32) -> u64 {
    Vote::find()
        .filter(vote::Column::UserId.eq(user_id))
        .filter(vote::Column::LocationId.eq(location_id))
        .filter(vote::Column::DeletedAt.is_null())
        .count(db)
        .await
        .expect("Failed to count votes")
}
