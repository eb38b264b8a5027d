//! Record store adapter
//!
//! Every statement the identity core issues lives here, rendered once for the
//! backend the pool was built for. Absence is reported as `None` or as zero
//! affected rows; everything else the driver reports is a [`DatabaseError`].

use chrono::{DateTime, Utc};
use common::{BackendKind, DatabaseError, DatabaseResult, StorePool};
use std::sync::Arc;

use crate::models::{NewSession, NewUser, Session, UserRow};

const USER_COLUMNS: &str =
    "id, username, email, password_hash, is_active, created_at, updated_at, metadata";
const SESSION_COLUMNS: &str = "id, user_id, token, expires_at, created_at, ip_address, user_agent";

/// Run the same query body against whichever pool variant is live
macro_rules! on_pool {
    ($pool:expr, $conn:ident => $body:expr) => {
        match $pool {
            StorePool::Postgres($conn) => $body,
            StorePool::MySql($conn) => $body,
            StorePool::Sqlite($conn) => $body,
        }
    };
}

macro_rules! bind_all {
    ($query:expr $(, $value:expr)* $(,)?) => {
        $query $(.bind($value))*
    };
}

/// Rewrite `?` markers into PostgreSQL's `$1, $2, ...`
fn numbered_placeholders(sql: &str) -> String {
    let mut rendered = String::with_capacity(sql.len() + 8);
    let mut index = 0;

    for ch in sql.chars() {
        if ch == '?' {
            index += 1;
            rendered.push('$');
            rendered.push_str(&index.to_string());
        } else {
            rendered.push(ch);
        }
    }

    rendered
}

#[derive(Debug)]
struct Statements {
    insert_user: String,
    select_user_by_id: String,
    select_active_user_by_username: String,
    deactivate_user: String,
    update_user_metadata: String,
    update_user_password: String,
    insert_session: String,
    select_session_by_id: String,
    select_session_by_token: String,
    delete_session_by_token: String,
    delete_sessions_for_user: String,
    delete_expired_sessions: String,
}

impl Statements {
    fn for_backend(backend: BackendKind) -> Self {
        // MySQL has no RETURNING; inserted rows are read back by LAST_INSERT_ID().
        let returning = |columns: &str| match backend {
            BackendKind::MySql => String::new(),
            _ => format!(" RETURNING {}", columns),
        };
        let render = |sql: String| match backend {
            BackendKind::Postgres => numbered_placeholders(&sql),
            _ => sql,
        };

        Self {
            insert_user: render(format!(
                "INSERT INTO users (username, email, password_hash, is_active, metadata) \
                 VALUES (?, ?, ?, ?, ?){}",
                returning(USER_COLUMNS)
            )),
            select_user_by_id: render(format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS)),
            select_active_user_by_username: render(format!(
                "SELECT {} FROM users WHERE username = ? AND is_active = ?",
                USER_COLUMNS
            )),
            deactivate_user: render(
                "UPDATE users SET is_active = ?, updated_at = CURRENT_TIMESTAMP \
                 WHERE id = ? AND is_active = ?"
                    .to_string(),
            ),
            update_user_metadata: render(
                "UPDATE users SET metadata = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?"
                    .to_string(),
            ),
            update_user_password: render(
                "UPDATE users SET password_hash = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?"
                    .to_string(),
            ),
            insert_session: render(format!(
                "INSERT INTO sessions (user_id, token, expires_at, ip_address, user_agent) \
                 VALUES (?, ?, ?, ?, ?){}",
                returning(SESSION_COLUMNS)
            )),
            select_session_by_id: render(format!(
                "SELECT {} FROM sessions WHERE id = ?",
                SESSION_COLUMNS
            )),
            select_session_by_token: render(format!(
                "SELECT {} FROM sessions WHERE token = ?",
                SESSION_COLUMNS
            )),
            delete_session_by_token: render("DELETE FROM sessions WHERE token = ?".to_string()),
            delete_sessions_for_user: render("DELETE FROM sessions WHERE user_id = ?".to_string()),
            delete_expired_sessions: render(
                "DELETE FROM sessions WHERE expires_at <= ?".to_string(),
            ),
        }
    }
}

fn inserted_id(last_insert_id: u64) -> DatabaseResult<i64> {
    i64::try_from(last_insert_id)
        .map_err(|e| DatabaseError::Query(sqlx::Error::Decode(Box::new(e))))
}

/// Parameterized access to the `users` and `sessions` tables
#[derive(Debug, Clone)]
pub struct RecordStore {
    pool: StorePool,
    statements: Arc<Statements>,
}

impl RecordStore {
    /// Wrap a pool and render the statement set for its backend
    pub fn new(pool: StorePool) -> Self {
        let statements = Arc::new(Statements::for_backend(pool.backend()));
        Self { pool, statements }
    }

    pub fn pool(&self) -> &StorePool {
        &self.pool
    }

    pub fn backend(&self) -> BackendKind {
        self.pool.backend()
    }

    /// Insert a user and return the row with store-assigned id and timestamps
    pub async fn insert_user(&self, user: &NewUser, metadata: &str) -> DatabaseResult<UserRow> {
        let sql = self.statements.insert_user.as_str();

        if let StorePool::MySql(pool) = &self.pool {
            let result = bind_all!(
                sqlx::query(sql),
                &user.username,
                &user.email,
                &user.password_hash,
                true,
                metadata
            )
            .execute(pool)
            .await
            .map_err(DatabaseError::Query)?;

            let id = inserted_id(result.last_insert_id())?;
            return self
                .fetch_user_by_id(id)
                .await?
                .ok_or(DatabaseError::Query(sqlx::Error::RowNotFound));
        }

        on_pool!(&self.pool, pool => bind_all!(
            sqlx::query_as::<_, UserRow>(sql),
            &user.username,
            &user.email,
            &user.password_hash,
            true,
            metadata
        )
        .fetch_one(pool)
        .await
        .map_err(DatabaseError::Query))
    }

    pub async fn fetch_user_by_id(&self, id: i64) -> DatabaseResult<Option<UserRow>> {
        let sql = self.statements.select_user_by_id.as_str();

        on_pool!(&self.pool, pool => sqlx::query_as::<_, UserRow>(sql)
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(DatabaseError::Query))
    }

    /// Exact-match lookup restricted to active users
    pub async fn fetch_active_user_by_username(
        &self,
        username: &str,
    ) -> DatabaseResult<Option<UserRow>> {
        let sql = self.statements.select_active_user_by_username.as_str();

        on_pool!(&self.pool, pool => bind_all!(sqlx::query_as::<_, UserRow>(sql), username, true)
            .fetch_optional(pool)
            .await
            .map_err(DatabaseError::Query))
    }

    /// Flip an active user to inactive; returns the number of rows changed
    pub async fn deactivate_user(&self, id: i64) -> DatabaseResult<u64> {
        let sql = self.statements.deactivate_user.as_str();

        on_pool!(&self.pool, pool => bind_all!(sqlx::query(sql), false, id, true)
            .execute(pool)
            .await
            .map(|result| result.rows_affected())
            .map_err(DatabaseError::Query))
    }

    pub async fn update_user_metadata(&self, id: i64, metadata: &str) -> DatabaseResult<u64> {
        let sql = self.statements.update_user_metadata.as_str();

        on_pool!(&self.pool, pool => bind_all!(sqlx::query(sql), metadata, id)
            .execute(pool)
            .await
            .map(|result| result.rows_affected())
            .map_err(DatabaseError::Query))
    }

    pub async fn update_user_password(&self, id: i64, password_hash: &str) -> DatabaseResult<u64> {
        let sql = self.statements.update_user_password.as_str();

        on_pool!(&self.pool, pool => bind_all!(sqlx::query(sql), password_hash, id)
            .execute(pool)
            .await
            .map(|result| result.rows_affected())
            .map_err(DatabaseError::Query))
    }

    /// Insert a session and return the row with store-assigned id and creation time
    pub async fn insert_session(&self, session: &NewSession) -> DatabaseResult<Session> {
        let sql = self.statements.insert_session.as_str();

        if let StorePool::MySql(pool) = &self.pool {
            let result = bind_all!(
                sqlx::query(sql),
                session.user_id,
                &session.token,
                session.expires_at,
                &session.ip_address,
                &session.user_agent
            )
            .execute(pool)
            .await
            .map_err(DatabaseError::Query)?;

            let id = inserted_id(result.last_insert_id())?;
            let select = self.statements.select_session_by_id.as_str();
            return sqlx::query_as::<_, Session>(select)
                .bind(id)
                .fetch_one(pool)
                .await
                .map_err(DatabaseError::Query);
        }

        on_pool!(&self.pool, pool => bind_all!(
            sqlx::query_as::<_, Session>(sql),
            session.user_id,
            &session.token,
            session.expires_at,
            &session.ip_address,
            &session.user_agent
        )
        .fetch_one(pool)
        .await
        .map_err(DatabaseError::Query))
    }

    pub async fn fetch_session_by_token(&self, token: &str) -> DatabaseResult<Option<Session>> {
        let sql = self.statements.select_session_by_token.as_str();

        on_pool!(&self.pool, pool => sqlx::query_as::<_, Session>(sql)
            .bind(token)
            .fetch_optional(pool)
            .await
            .map_err(DatabaseError::Query))
    }

    pub async fn delete_session_by_token(&self, token: &str) -> DatabaseResult<u64> {
        let sql = self.statements.delete_session_by_token.as_str();

        on_pool!(&self.pool, pool => sqlx::query(sql)
            .bind(token)
            .execute(pool)
            .await
            .map(|result| result.rows_affected())
            .map_err(DatabaseError::Query))
    }

    pub async fn delete_sessions_for_user(&self, user_id: i64) -> DatabaseResult<u64> {
        let sql = self.statements.delete_sessions_for_user.as_str();

        on_pool!(&self.pool, pool => sqlx::query(sql)
            .bind(user_id)
            .execute(pool)
            .await
            .map(|result| result.rows_affected())
            .map_err(DatabaseError::Query))
    }

    /// Delete every session whose expiry is at or before `now`
    pub async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> DatabaseResult<u64> {
        let sql = self.statements.delete_expired_sessions.as_str();

        on_pool!(&self.pool, pool => sqlx::query(sql)
            .bind(now)
            .execute(pool)
            .await
            .map(|result| result.rows_affected())
            .map_err(DatabaseError::Query))
    }
}
