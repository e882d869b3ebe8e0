//! In-process roster store keyed by scope.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::RosterStore;
use crate::errors::AppError;
use crate::models::{Member, RosterDocument, Scope};

#[derive(Default)]
struct Inner {
    rosters: HashMap<Scope, RosterDocument>,
    /// Number of upcoming replaces to reject as if another writer won.
    forced_races: usize,
}

/// Roster store backed by a map. The map key makes a second roster for
/// the same scope impossible.
#[derive(Default)]
pub struct MemoryRosterStore {
    inner: RwLock<Inner>,
}

impl MemoryRosterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.rosters.len()
    }

    /// Make the next `count` replaces lose a simulated race.
    pub async fn fail_next_replaces(&self, count: usize) {
        self.inner.write().await.forced_races = count;
    }
}

#[async_trait]
impl RosterStore for MemoryRosterStore {
    async fn find(&self, scope: &Scope) -> Result<Option<RosterDocument>, AppError> {
        Ok(self.inner.read().await.rosters.get(scope).cloned())
    }

    async fn insert(
        &self,
        scope: &Scope,
        members: &[Member],
    ) -> Result<Option<RosterDocument>, AppError> {
        let mut inner = self.inner.write().await;
        if inner.rosters.contains_key(scope) {
            return Ok(None);
        }

        let roster = RosterDocument {
            id: uuid::Uuid::new_v4().to_string(),
            church: scope.church.clone(),
            department: scope.department.clone(),
            position: scope.position,
            members: members.to_vec(),
            created_at: Utc::now(),
            updated_at: None,
            version: 1,
        };
        inner.rosters.insert(scope.clone(), roster.clone());
        Ok(Some(roster))
    }

    async fn replace(&self, roster: &RosterDocument) -> Result<Option<RosterDocument>, AppError> {
        let mut inner = self.inner.write().await;
        if inner.forced_races > 0 {
            inner.forced_races -= 1;
            return Ok(None);
        }

        let scope = Scope::new(
            roster.church.clone(),
            roster.department.clone(),
            roster.position,
        );
        let Some(stored) = inner.rosters.get_mut(&scope) else {
            return Ok(None);
        };
        if stored.id != roster.id || stored.version != roster.version {
            return Ok(None);
        }

        stored.members = roster.members.clone();
        stored.updated_at = Some(Utc::now());
        stored.version += 1;
        Ok(Some(stored.clone()))
    }
}
