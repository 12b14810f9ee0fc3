//! Session store for SOS sessions.
//!
//! `SessionRepository` is the seam handlers and services talk to. The
//! in-memory implementation keeps two tables behind one lock: sessions by
//! id, and the share-token index pointing back at session ids.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::AppError;
use crate::models::sos_session::{LocationPoint, SosSession};
use crate::types::SosId;

/// Repository trait for SOS session storage.
///
/// Use `MockSessionRepository` in tests to mock the behavior.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Stores a new session and indexes its share token.
    /// Fails with `Conflict` if the id or the token is already taken.
    async fn insert(&self, session: SosSession) -> Result<(), AppError>;

    async fn find_by_id(&self, id: SosId) -> Result<Option<SosSession>, AppError>;

    async fn find_by_share_token(&self, token: &str) -> Result<Option<SosSession>, AppError>;

    /// Appends a position and replaces the latest one.
    /// Returns `None` when the session does not exist.
    async fn record_location(
        &self,
        id: SosId,
        point: LocationPoint,
    ) -> Result<Option<SosSession>, AppError>;

    /// Returns `None` when the session does not exist.
    async fn mark_ended(
        &self,
        id: SosId,
        ended_at: DateTime<Utc>,
        reason: String,
    ) -> Result<Option<SosSession>, AppError>;
}

/// Backing tables of the in-memory store.
#[derive(Debug, Default, Clone)]
pub struct SessionTables {
    pub sessions: HashMap<SosId, SosSession>,
    pub share_tokens: HashMap<String, SosId>,
}

#[derive(Debug, Clone, Default)]
pub struct InMemorySessionRepository {
    tables: Arc<RwLock<SessionTables>>,
}

impl InMemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store over pre-populated tables.
    pub fn with_tables(tables: SessionTables) -> Self {
        Self {
            tables: Arc::new(RwLock::new(tables)),
        }
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, SessionTables>, AppError> {
        self.tables
            .read()
            .map_err(|_| AppError::InternalServerError(anyhow::anyhow!("session store poisoned")))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, SessionTables>, AppError> {
        self.tables
            .write()
            .map_err(|_| AppError::InternalServerError(anyhow::anyhow!("session store poisoned")))
    }

    fn update_with<F>(&self, id: SosId, apply: F) -> Result<Option<SosSession>, AppError>
    where
        F: FnOnce(&mut SosSession),
    {
        let mut tables = self.write()?;
        Ok(tables.sessions.get_mut(&id).map(|session| {
            apply(session);
            session.clone()
        }))
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn insert(&self, session: SosSession) -> Result<(), AppError> {
        let mut tables = self.write()?;
        if tables.sessions.contains_key(&session.id) {
            return Err(AppError::Conflict("Session id already exists".into()));
        }
        if tables.share_tokens.contains_key(&session.share_token) {
            return Err(AppError::Conflict("Share token already exists".into()));
        }
        tables
            .share_tokens
            .insert(session.share_token.clone(), session.id);
        tables.sessions.insert(session.id, session);
        Ok(())
    }

    async fn find_by_id(&self, id: SosId) -> Result<Option<SosSession>, AppError> {
        Ok(self.read()?.sessions.get(&id).cloned())
    }

    async fn find_by_share_token(&self, token: &str) -> Result<Option<SosSession>, AppError> {
        let tables = self.read()?;
        Ok(tables
            .share_tokens
            .get(token)
            .and_then(|id| tables.sessions.get(id))
            .cloned())
    }

    async fn record_location(
        &self,
        id: SosId,
        point: LocationPoint,
    ) -> Result<Option<SosSession>, AppError> {
        self.update_with(id, |session| session.record_location(point))
    }

    async fn mark_ended(
        &self,
        id: SosId,
        ended_at: DateTime<Utc>,
        reason: String,
    ) -> Result<Option<SosSession>, AppError> {
        self.update_with(id, |session| session.end(ended_at, reason))
    }
}
