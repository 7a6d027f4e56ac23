//! `PgAccountStore` against a real Postgres.
//!
//! Each test creates its own database from `configuration.yaml` (or `APP__*`
//! overrides) and runs the migrations. Run with `cargo test -- --ignored`
//! once Postgres is reachable.

use sqlx::{Connection, Executor, PgConnection, PgPool, Row};
use uuid::Uuid;
use videotube::auth::token_digest;
use videotube::configuration::{get_configuration, DatabaseSettings};
use videotube::error::{AppError, DatabaseError};
use videotube::storage::{AccountStore, NewAccount, PgAccountStore, SubscriptionState};

struct TestStore {
    store: PgAccountStore,
    db_pool: PgPool,
}

async fn spawn_store() -> TestStore {
    let mut configuration = get_configuration().expect("Failed to read configuration.");
    configuration.database.database_name = Uuid::new_v4().to_string();
    let db_pool = configure_database(&configuration.database).await;

    TestStore {
        store: PgAccountStore::new(db_pool.clone()),
        db_pool,
    }
}

async fn configure_database(config: &DatabaseSettings) -> PgPool {
    let mut connection = PgConnection::connect(&config.connection_string_without_db())
        .await
        .expect("Failed to connect to Postgres");
    connection
        .execute(&*format!(r#"CREATE DATABASE "{}";"#, config.database_name))
        .await
        .expect("Failed to create database.");

    let connection_pool = PgPool::connect(&config.connection_string())
        .await
        .expect("Failed to connect to Postgres.");
    sqlx::migrate!("./migrations")
        .run(&connection_pool)
        .await
        .expect("Failed to migrate the database.");
    connection_pool
}

fn new_account(user_name: &str) -> NewAccount {
    NewAccount {
        user_name: user_name.to_string(),
        email: format!("{}@example.com", user_name),
        full_name: "Test User".to_string(),
        password_hash: "hash".to_string(),
    }
}

async fn stored_digest(pool: &PgPool, id: Uuid) -> Option<String> {
    sqlx::query("SELECT refresh_token_hash FROM users WHERE id = $1")
        .bind(id)
        .fetch_one(pool)
        .await
        .expect("Failed to fetch user")
        .get::<Option<String>, _>("refresh_token_hash")
}

async fn subscription_count(pool: &PgPool, subscriber_id: Uuid, channel_id: Uuid) -> i64 {
    sqlx::query(
        "SELECT COUNT(*) AS n FROM subscriptions WHERE subscriber_id = $1 AND channel_id = $2",
    )
    .bind(subscriber_id)
    .bind(channel_id)
    .fetch_one(pool)
    .await
    .expect("Failed to count subscriptions")
    .get::<i64, _>("n")
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn refresh_token_is_overwritten_then_cleared() {
    let app = spawn_store().await;
    let profile = app.store.insert_account(new_account("alice")).await.unwrap();

    assert_eq!(stored_digest(&app.db_pool, profile.id).await, None);

    let first = token_digest("first.refresh.token");
    let second = token_digest("second.refresh.token");
    app.store.set_refresh_token(profile.id, &first).await.unwrap();
    app.store.set_refresh_token(profile.id, &second).await.unwrap();

    let credentials = app.store.find_credentials(profile.id).await.unwrap().unwrap();
    assert_eq!(credentials.refresh_token_hash.as_deref(), Some(second.as_str()));
    assert_eq!(stored_digest(&app.db_pool, profile.id).await, Some(second));

    app.store.clear_refresh_token(profile.id).await.unwrap();

    let credentials = app.store.find_credentials(profile.id).await.unwrap().unwrap();
    assert_eq!(credentials.refresh_token_hash, None);
    assert_eq!(stored_digest(&app.db_pool, profile.id).await, None);
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn set_refresh_token_for_missing_account_is_not_found() {
    let app = spawn_store().await;

    let result = app.store.set_refresh_token(Uuid::new_v4(), "digest").await;

    assert!(matches!(result, Err(AppError::Database(DatabaseError::NotFound(_)))));
    assert!(app.store.find_credentials(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn login_lookup_by_user_name_or_email() {
    let app = spawn_store().await;
    let alice = app.store.insert_account(new_account("alice")).await.unwrap();
    app.store.insert_account(new_account("bob")).await.unwrap();

    let by_name = app.store.find_credentials_by_login(Some("alice"), None).await.unwrap();
    let by_email = app
        .store
        .find_credentials_by_login(None, Some("alice@example.com"))
        .await
        .unwrap();

    assert_eq!(by_name.map(|c| c.id), Some(alice.id));
    assert_eq!(by_email.map(|c| c.id), Some(alice.id));
    assert!(app.store.find_credentials_by_login(Some("nobody"), None).await.unwrap().is_none());
    // A NULL identifier must not match rows
    assert!(app.store.find_credentials_by_login(None, None).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn duplicate_account_is_a_conflict() {
    let app = spawn_store().await;
    app.store.insert_account(new_account("alice")).await.unwrap();

    let result = app.store.insert_account(new_account("alice")).await;

    assert!(matches!(
        result,
        Err(AppError::Database(DatabaseError::UniqueConstraintViolation(_)))
    ));
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn toggle_subscription_alternates_without_duplicates() {
    let app = spawn_store().await;
    let viewer = app.store.insert_account(new_account("viewer")).await.unwrap();
    let channel = app.store.insert_account(new_account("creator")).await.unwrap();

    let state = app.store.toggle_subscription(viewer.id, channel.id).await.unwrap();
    assert_eq!(state, SubscriptionState::Subscribed);
    assert_eq!(subscription_count(&app.db_pool, viewer.id, channel.id).await, 1);

    let state = app.store.toggle_subscription(viewer.id, channel.id).await.unwrap();
    assert_eq!(state, SubscriptionState::Unsubscribed);
    assert_eq!(subscription_count(&app.db_pool, viewer.id, channel.id).await, 0);

    let (a, b) = tokio::join!(
        app.store.toggle_subscription(viewer.id, channel.id),
        app.store.toggle_subscription(viewer.id, channel.id),
    );
    a.unwrap();
    b.unwrap();
    assert!(subscription_count(&app.db_pool, viewer.id, channel.id).await <= 1);
}
