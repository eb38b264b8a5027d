//! User repository behaviour against a real store

mod support;

use authkit::{AuthError, Metadata, UserRepository};
use common::{BackendKind, StorePool};
use serde_json::json;

async fn repository() -> anyhow::Result<UserRepository> {
    let store = support::bootstrap_store().await?;
    Ok(UserRepository::new(store, support::cheap_hasher()))
}

#[tokio::test]
async fn test_create_then_lookup_by_username() -> anyhow::Result<()> {
    let users = repository().await?;

    let created = users
        .create_user("amina", "amina@example.com", "correct horse battery")
        .await?;
    assert!(created.id > 0);
    assert!(created.is_active);
    assert!(created.metadata.is_empty());
    assert_ne!(created.password_hash, "correct horse battery");

    let found = users.get_user_by_username("amina").await?;
    assert_eq!(found.id, created.id);
    assert_eq!(found.username, "amina");
    assert_eq!(found.email, "amina@example.com");
    assert!(found.is_active);
    assert_eq!(found.created_at, created.created_at);

    Ok(())
}

#[tokio::test]
async fn test_duplicate_username_is_rejected_and_first_user_kept() -> anyhow::Result<()> {
    let users = repository().await?;

    let first = users
        .create_user("amina", "amina@example.com", "correct horse battery")
        .await?;
    let err = users
        .create_user("amina", "other@example.com", "another passphrase")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::UserExists));

    let found = users.get_user_by_username("amina").await?;
    assert_eq!(found, first);
    assert!(users.verify_credentials("amina", "correct horse battery").await.is_ok());

    Ok(())
}

#[tokio::test]
async fn test_unknown_username_is_not_found() -> anyhow::Result<()> {
    let users = repository().await?;

    let err = users.get_user_by_username("nobody").await.unwrap_err();
    assert!(matches!(err, AuthError::UserNotFound));

    let err = users.get_user_by_id(4242).await.unwrap_err();
    assert!(matches!(err, AuthError::UserNotFound));

    Ok(())
}

#[tokio::test]
async fn test_username_lookup_is_case_sensitive() -> anyhow::Result<()> {
    let users = repository().await?;
    users
        .create_user("Amina", "amina@example.com", "correct horse battery")
        .await?;

    assert!(users.get_user_by_username("Amina").await.is_ok());
    assert!(matches!(
        users.get_user_by_username("amina").await,
        Err(AuthError::UserNotFound)
    ));

    Ok(())
}

#[tokio::test]
async fn test_verify_credentials_does_not_reveal_which_part_failed() -> anyhow::Result<()> {
    let users = repository().await?;
    let created = users
        .create_user("amina", "amina@example.com", "correct horse battery")
        .await?;

    let verified = users
        .verify_credentials("amina", "correct horse battery")
        .await?;
    assert_eq!(verified.id, created.id);

    let wrong_password = users
        .verify_credentials("amina", "wrong horse battery")
        .await
        .unwrap_err();
    let unknown_user = users
        .verify_credentials("nobody", "correct horse battery")
        .await
        .unwrap_err();

    assert!(matches!(wrong_password, AuthError::InvalidCredentials));
    assert!(matches!(unknown_user, AuthError::InvalidCredentials));
    assert_eq!(wrong_password.to_string(), unknown_user.to_string());

    Ok(())
}

#[tokio::test]
async fn test_deactivated_user_is_hidden_from_username_lookup() -> anyhow::Result<()> {
    let users = repository().await?;
    let created = users
        .create_user("amina", "amina@example.com", "correct horse battery")
        .await?;

    users.deactivate_user(created.id).await?;

    assert!(matches!(
        users.get_user_by_username("amina").await,
        Err(AuthError::UserNotFound)
    ));
    assert!(matches!(
        users.verify_credentials("amina", "correct horse battery").await,
        Err(AuthError::InvalidCredentials)
    ));

    let historical = users.get_user_by_id(created.id).await?;
    assert!(!historical.is_active);
    assert!(historical.updated_at >= created.updated_at);
    assert_eq!(historical.created_at, created.created_at);

    // Already inactive
    assert!(matches!(
        users.deactivate_user(created.id).await,
        Err(AuthError::UserNotFound)
    ));

    Ok(())
}

#[tokio::test]
async fn test_metadata_round_trips_through_the_store() -> anyhow::Result<()> {
    let users = repository().await?;
    let created = users
        .create_user("amina", "amina@example.com", "correct horse battery")
        .await?;

    let mut metadata = Metadata::new();
    metadata.insert("plan".to_string(), json!("pro"));
    metadata.insert("seats".to_string(), json!(5));
    metadata.insert("flags".to_string(), json!({ "beta": true, "regions": ["cm", "fr"] }));

    users.update_metadata(created.id, &metadata).await?;
    let found = users.get_user_by_username("amina").await?;
    assert_eq!(found.metadata, metadata);

    users.update_metadata(created.id, &Metadata::new()).await?;
    let found = users.get_user_by_username("amina").await?;
    assert!(found.metadata.is_empty());

    assert!(matches!(
        users.update_metadata(9999, &metadata).await,
        Err(AuthError::UserNotFound)
    ));

    Ok(())
}

#[tokio::test]
async fn test_corrupt_stored_metadata_is_reported() -> anyhow::Result<()> {
    let store = support::bootstrap_store().await?;
    let users = UserRepository::new(store.clone(), support::cheap_hasher());
    let created = users
        .create_user("amina", "amina@example.com", "correct horse battery")
        .await?;

    assert_eq!(store.backend(), BackendKind::Sqlite);
    let StorePool::Sqlite(sqlite) = store.pool() else {
        anyhow::bail!("expected a SQLite pool");
    };
    sqlx::query("UPDATE users SET metadata = ? WHERE id = ?")
        .bind("{broken")
        .bind(created.id)
        .execute(sqlite)
        .await?;

    assert!(matches!(
        users.get_user_by_username("amina").await,
        Err(AuthError::MetadataCorrupt(_))
    ));

    Ok(())
}

#[tokio::test]
async fn test_change_password_replaces_the_credential() -> anyhow::Result<()> {
    let users = repository().await?;
    let created = users
        .create_user("amina", "amina@example.com", "correct horse battery")
        .await?;

    users.change_password(created.id, "brand new passphrase").await?;

    assert!(users.verify_credentials("amina", "brand new passphrase").await.is_ok());
    assert!(matches!(
        users.verify_credentials("amina", "correct horse battery").await,
        Err(AuthError::InvalidCredentials)
    ));
    assert!(matches!(
        users.change_password(9999, "brand new passphrase").await,
        Err(AuthError::UserNotFound)
    ));

    Ok(())
}

#[tokio::test]
async fn test_invalid_input_is_rejected_before_touching_the_store() -> anyhow::Result<()> {
    let users = repository().await?;

    assert!(matches!(
        users.create_user("ab", "amina@example.com", "correct horse battery").await,
        Err(AuthError::InvalidInput(_))
    ));
    assert!(matches!(
        users.create_user("amina", "", "correct horse battery").await,
        Err(AuthError::InvalidInput(_))
    ));
    assert!(matches!(
        users.create_user("amina", "amina@example.com", "short").await,
        Err(AuthError::InvalidInput(_))
    ));
    assert!(matches!(
        users.get_user_by_username("amina").await,
        Err(AuthError::UserNotFound)
    ));

    Ok(())
}

#[tokio::test]
async fn test_free_form_usernames_and_emails_are_accepted() -> anyhow::Result<()> {
    let users = repository().await?;

    let ops = users
        .create_user("ops", "root@localhost", "correct horse battery")
        .await?;
    assert_eq!(ops.email, "root@localhost");

    let accented = users
        .create_user("amína", "a@example.com", "correct horse battery")
        .await?;
    assert_eq!(users.get_user_by_username("amína").await?.id, accented.id);
    assert!(matches!(
        users.get_user_by_username("amina").await,
        Err(AuthError::UserNotFound)
    ));

    Ok(())
}
