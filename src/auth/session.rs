use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use diesel::prelude::*;
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::db::PgPool;
use crate::models::NewSessionRow;
use crate::schema::sessions::dsl as sessions_dsl;

pub const SESSION_COOKIE_NAME: &str = "session_id";
const SESSION_TOKEN_BYTES: usize = 32;

/// Opaque key-value store with per-entry expiry. Absence is never an error.
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    async fn set_with_expiry(&self, key: &str, value: Value, ttl: Duration) -> Result<()>;

    async fn get(&self, key: &str) -> Result<Option<Value>>;

    async fn delete(&self, key: &str) -> Result<()>;
}

/// Session store backed by the sessions table. Expired rows are dropped
/// lazily on read.
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> Result<diesel::r2d2::PooledConnection<diesel::r2d2::ConnectionManager<PgConnection>>> {
        self.pool
            .get()
            .map_err(|err| anyhow!("session store pool error: {err}"))
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn set_with_expiry(&self, key: &str, value: Value, ttl: Duration) -> Result<()> {
        let user_id: Uuid = value
            .get("user_id")
            .and_then(|v| v.as_str())
            .and_then(|s| Uuid::parse_str(s).ok())
            .context("session value must carry a user_id")?;

        let row = NewSessionRow {
            token_hash: key.to_string(),
            user_id,
            claims: value,
            expires_at: (Utc::now() + chrono::Duration::from_std(ttl)?).naive_utc(),
        };

        let mut conn = self.conn()?;
        diesel::insert_into(crate::schema::sessions::table)
            .values(&row)
            .execute(&mut conn)
            .context("failed to persist session")?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let mut conn = self.conn()?;
        let now = Utc::now().naive_utc();

        let row: Option<(Value, chrono::NaiveDateTime)> = sessions_dsl::sessions
            .filter(sessions_dsl::token_hash.eq(key))
            .select((sessions_dsl::claims, sessions_dsl::expires_at))
            .first(&mut conn)
            .optional()
            .context("failed to look up session")?;

        match row {
            Some((claims, expires_at)) if expires_at > now => Ok(Some(claims)),
            Some(_) => {
                diesel::delete(sessions_dsl::sessions.filter(sessions_dsl::token_hash.eq(key)))
                    .execute(&mut conn)
                    .context("failed to drop expired session")?;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.conn()?;
        diesel::delete(sessions_dsl::sessions.filter(sessions_dsl::token_hash.eq(key)))
            .execute(&mut conn)
            .context("failed to delete session")?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub user_id: Uuid,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Issues and resolves opaque session tokens. Tokens are stored under
/// their SHA-256 hash; the raw token only ever lives in the cookie.
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    ttl: Duration,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Creates a session and returns the raw token. The TTL is fixed at
    /// creation and never refreshed by reads.
    pub async fn create(&self, user_id: Uuid, extra: serde_json::Map<String, Value>) -> Result<String> {
        let token = generate_session_token();
        let claims = SessionClaims { user_id, extra };
        self.store
            .set_with_expiry(
                &hash_session_token(&token),
                serde_json::to_value(&claims)?,
                self.ttl,
            )
            .await?;
        Ok(token)
    }

    pub async fn get(&self, token: &str) -> Result<Option<SessionClaims>> {
        let value = self.store.get(&hash_session_token(token)).await?;
        match value {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    pub async fn delete(&self, token: &str) -> Result<()> {
        self.store.delete(&hash_session_token(token)).await
    }
}

fn generate_session_token() -> String {
    let mut bytes = [0u8; SESSION_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

fn hash_session_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}
