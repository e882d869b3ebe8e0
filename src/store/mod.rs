//! Member repository over a document-style roster store.
//!
//! Every mutation reads the whole roster document for a scope, changes the
//! embedded members in memory and writes the whole document back. Writes are
//! conditional on the version that was read, so a concurrent writer surfaces
//! as a retry or a conflict instead of a lost update.

#[cfg(test)]
pub mod memory;
pub mod order;

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::AppError;
use crate::models::{Member, MemberPatch, NewMember, RosterDocument, Scope};
pub use order::{sort_members, visible_members, Viewer};

/// Attempts made by a mutation without a caller-supplied version before it
/// gives up with a conflict.
const MAX_WRITE_ATTEMPTS: usize = 3;

/// Storage backend holding one roster document per scope.
#[async_trait]
pub trait RosterStore: Send + Sync {
    /// Look up the roster for a scope.
    async fn find(&self, scope: &Scope) -> Result<Option<RosterDocument>, AppError>;

    /// Insert a roster for a scope that has none, with `members` as its
    /// initial content. Returns `None` when the scope already has a roster.
    async fn insert(
        &self,
        scope: &Scope,
        members: &[Member],
    ) -> Result<Option<RosterDocument>, AppError>;

    /// Overwrite the stored roster with `roster`, provided the stored version
    /// still equals `roster.version`. Returns the saved document with its
    /// bumped version and refreshed `updated_at`, or `None` on a version
    /// mismatch.
    async fn replace(&self, roster: &RosterDocument) -> Result<Option<RosterDocument>, AppError>;
}

/// Result of a successful mutation together with the roster version it produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Applied<T> {
    pub value: T,
    pub version: i64,
}

/// Member operations scoped by church, department and position.
#[derive(Clone)]
pub struct MemberRepository {
    store: Arc<dyn RosterStore>,
}

impl MemberRepository {
    pub fn new(store: Arc<dyn RosterStore>) -> Self {
        Self { store }
    }

    /// Get the stored roster without creating a template.
    pub async fn get_roster(&self, scope: &Scope) -> Result<RosterDocument, AppError> {
        let mut roster = self
            .store
            .find(scope)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Roster {} not found", scope)))?;
        sort_members(&mut roster.members);
        Ok(roster)
    }

    /// Get the roster for a scope, materializing an empty template first if
    /// the scope has none. Members come back sorted by (grade, group, name).
    pub async fn fetch_all(&self, scope: &Scope) -> Result<RosterDocument, AppError> {
        let mut roster = match self.store.find(scope).await? {
            Some(roster) => roster,
            None => {
                tracing::info!(%scope, "Creating empty roster template");
                if let Some(created) = self.store.insert(scope, &[]).await? {
                    created
                } else {
                    // Another caller created it between our lookup and insert.
                    self.store.find(scope).await?.ok_or_else(|| {
                        AppError::Internal(format!(
                            "Roster template for {} could not be materialized",
                            scope
                        ))
                    })?
                }
            }
        };

        sort_members(&mut roster.members);
        tracing::debug!(%scope, count = roster.members.len(), "Fetched roster");
        Ok(roster)
    }

    /// Role-aware read. Returns an empty list when the scope has no roster.
    pub async fn fetch_members(
        &self,
        scope: &Scope,
        viewer: &Viewer,
    ) -> Result<Vec<Member>, AppError> {
        let Some(roster) = self.store.find(scope).await? else {
            tracing::debug!(%scope, "No roster for scope");
            return Ok(Vec::new());
        };
        Ok(visible_members(roster.members, viewer))
    }

    /// Append members to the scope's roster, creating the roster with these
    /// members as its initial content when it does not exist yet.
    pub async fn create(
        &self,
        scope: &Scope,
        members: Vec<NewMember>,
        expected_version: Option<i64>,
    ) -> Result<Applied<Vec<Member>>, AppError> {
        if members.is_empty() {
            return Err(AppError::Validation(
                "At least one member is required".to_string(),
            ));
        }

        let members = members
            .into_iter()
            .map(|m| m.into_member(scope.position))
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(dup) = first_duplicate_id(&members) {
            return Err(AppError::Validation(format!(
                "Duplicate member id {} in request",
                dup
            )));
        }

        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let Some(mut roster) = self.store.find(scope).await? else {
                if let Some(created) = self.store.insert(scope, &members).await? {
                    tracing::info!(%scope, count = members.len(), "Created roster with members");
                    return Ok(Applied {
                        value: members,
                        version: created.version,
                    });
                }
                tracing::warn!(%scope, attempt, "Roster appeared while creating it, retrying");
                continue;
            };

            check_expected_version(&roster, expected_version)?;

            if let Some(taken) = members
                .iter()
                .find(|m| roster.members.iter().any(|existing| existing.id == m.id))
            {
                return Err(AppError::Validation(format!(
                    "Member {} already exists in roster {}",
                    taken.id, scope
                )));
            }

            roster.members.extend(members.iter().cloned());
            if let Some(saved) = self.store.replace(&roster).await? {
                tracing::info!(%scope, count = members.len(), version = saved.version, "Appended members");
                return Ok(Applied {
                    value: members,
                    version: saved.version,
                });
            }
            self.on_write_race(scope, attempt, expected_version).await?;
        }

        Err(self.conflict(scope).await)
    }

    /// Merge `patch` into the member with `member_id`. A missing roster or
    /// member is a no-op and yields `None`.
    pub async fn modify(
        &self,
        scope: &Scope,
        member_id: &str,
        patch: &MemberPatch,
        expected_version: Option<i64>,
    ) -> Result<Option<Applied<Member>>, AppError> {
        patch.validate(scope.position)?;

        self.rewrite(scope, expected_version, |members| {
            let member = members.iter_mut().find(|m| m.id == member_id)?;
            patch.apply(member);
            Some(member.clone())
        })
        .await
    }

    /// Drop every member whose id is in `ids`. Returns how many were removed.
    pub async fn remove(
        &self,
        scope: &Scope,
        ids: &[String],
        expected_version: Option<i64>,
    ) -> Result<Applied<usize>, AppError> {
        let ids: HashSet<&str> = ids.iter().map(String::as_str).collect();

        let outcome = self
            .rewrite(scope, expected_version, |members| {
                let before = members.len();
                members.retain(|m| !ids.contains(m.id.as_str()));
                let removed = before - members.len();
                (removed > 0).then_some(removed)
            })
            .await?;

        match outcome {
            Some(applied) => Ok(applied),
            None => {
                let version = self.store.find(scope).await?.map_or(0, |r| r.version);
                Ok(Applied { value: 0, version })
            }
        }
    }

    /// Read-modify-write loop shared by `modify` and `remove`. `apply` returns
    /// `None` when nothing changed, in which case nothing is written.
    async fn rewrite<T, F>(
        &self,
        scope: &Scope,
        expected_version: Option<i64>,
        mut apply: F,
    ) -> Result<Option<Applied<T>>, AppError>
    where
        F: FnMut(&mut Vec<Member>) -> Option<T> + Send,
        T: Send,
    {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let Some(mut roster) = self.store.find(scope).await? else {
                tracing::debug!(%scope, "No roster for scope, nothing to change");
                return Ok(None);
            };

            check_expected_version(&roster, expected_version)?;

            let Some(value) = apply(&mut roster.members) else {
                return Ok(None);
            };

            if let Some(saved) = self.store.replace(&roster).await? {
                tracing::info!(%scope, version = saved.version, "Rewrote roster");
                return Ok(Some(Applied {
                    value,
                    version: saved.version,
                }));
            }
            self.on_write_race(scope, attempt, expected_version).await?;
        }

        Err(self.conflict(scope).await)
    }

    /// A conditional write lost to a concurrent writer. With a caller-supplied
    /// version that is final; otherwise the caller loop re-reads and retries.
    async fn on_write_race(
        &self,
        scope: &Scope,
        attempt: usize,
        expected_version: Option<i64>,
    ) -> Result<(), AppError> {
        if expected_version.is_some() {
            return Err(self.conflict(scope).await);
        }
        tracing::warn!(%scope, attempt, "Concurrent roster write detected, retrying");
        Ok(())
    }

    async fn conflict(&self, scope: &Scope) -> AppError {
        let current_version = match self.store.find(scope).await {
            Ok(roster) => roster.map_or(0, |r| r.version),
            Err(e) => return e,
        };
        AppError::Conflict {
            message: "Concurrent modification detected".to_string(),
            current_version,
        }
    }
}

fn first_duplicate_id(members: &[Member]) -> Option<String> {
    let mut seen = HashSet::new();
    members
        .iter()
        .find(|m| !seen.insert(m.id.as_str()))
        .map(|m| m.id.clone())
}

fn check_expected_version(
    roster: &RosterDocument,
    expected_version: Option<i64>,
) -> Result<(), AppError> {
    match expected_version {
        Some(expected) if expected != roster.version => Err(AppError::Conflict {
            message: format!(
                "Version mismatch: expected {}, current {}",
                expected, roster.version
            ),
            current_version: roster.version,
        }),
        _ => Ok(()),
    }
}
