//! Shared fixtures for the integration tests
//!
//! Every test gets its own in-memory SQLite store bootstrapped from the
//! shipped schema.

#![allow(dead_code)]

use authkit::{AuthSettings, Clock, CredentialHasher, RecordStore};
use chrono::{DateTime, Duration, Utc};
use common::{DatabaseConfig, StorePool, init_pool};
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

const SQLITE_SCHEMA: &str = include_str!("../../schema/sqlite.sql");

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub async fn bootstrap_store() -> anyhow::Result<RecordStore> {
    init_tracing();

    let pool = init_pool(&DatabaseConfig::sqlite_in_memory()).await?;
    let StorePool::Sqlite(sqlite) = &pool else {
        anyhow::bail!("expected a SQLite pool");
    };
    sqlx::raw_sql(SQLITE_SCHEMA).execute(sqlite).await?;

    Ok(RecordStore::new(pool))
}

/// Settings with the cheapest argon2 cost so tests stay fast
pub fn cheap_settings() -> AuthSettings {
    AuthSettings {
        hash_memory_kib: 1024,
        hash_iterations: 1,
        hash_parallelism: 1,
        session_ttl_secs: 3600,
    }
}

pub fn cheap_hasher() -> CredentialHasher {
    CredentialHasher::new(cheap_settings().hasher_config()).expect("valid argon2 parameters")
}

/// Clock that only moves when told to
#[derive(Clone)]
pub struct TestClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl Default for TestClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TestClock {
    pub fn new() -> Self {
        Self {
            now: Arc::new(Mutex::new(Utc::now())),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }

    pub fn clock(&self) -> Clock {
        let now = self.now.clone();
        Arc::new(move || *now.lock().unwrap())
    }
}
