//! Demande (ticket) entity and its lifecycle rules.
//!
//! # Invariants
//! - `created_by` never changes after creation.
//! - `assigned_at` is non-null exactly when `assigned_agent` is non-null,
//!   and both move in the same update.
//! - `deleted_at == None` means the record is active/visible; soft-delete is
//!   one-way and stamps who deleted and when.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::id::{DemandeId, UserId};

/// Workflow status of a demande.
///
/// Transitions are intentionally permissive: any agent may set any status at
/// any time, including moving backward from Done. Flagged for product
/// clarification; do not tighten without direction.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DemandeStatus {
    #[default]
    Pending,
    InProgress,
    Done,
}

impl DemandeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DemandeStatus::Pending => "pending",
            DemandeStatus::InProgress => "in_progress",
            DemandeStatus::Done => "done",
        }
    }
}

impl core::fmt::Display for DemandeStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for DemandeStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(DemandeStatus::Pending),
            "in_progress" => Ok(DemandeStatus::InProgress),
            "done" => Ok(DemandeStatus::Done),
            other => Err(DomainError::validation(format!("unknown status: {other}"))),
        }
    }
}

/// A ticket tracked through the Pending/InProgress/Done lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Demande {
    pub id: DemandeId,
    pub title: String,
    pub description: String,
    pub status: DemandeStatus,
    pub created_by: UserId,
    pub assigned_agent: Option<UserId>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub updated_by: Option<UserId>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<UserId>,
}

/// Assignment change requested in a workflow update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assignment {
    /// Assign (or move) the ticket to an agent. `at` lets the caller pin an
    /// explicit assignment time; otherwise the server clock is used.
    Assign {
        agent: UserId,
        at: Option<DateTime<Utc>>,
    },
    /// Remove the current assignee.
    Clear,
}

/// Workflow fields of an update (agent-gated at the policy layer).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkflowPatch {
    pub status: Option<DemandeStatus>,
    /// `None` leaves the assignment untouched.
    pub assignment: Option<Assignment>,
}

impl WorkflowPatch {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.assignment.is_none()
    }
}

impl Demande {
    /// Open a new ticket. Status is forced to Pending, the creator is the
    /// acting identity, and assignment starts unset.
    pub fn open(
        created_by: UserId,
        title: impl Into<String>,
        description: impl Into<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let title = title.into().trim().to_string();
        if title.is_empty() {
            return Err(DomainError::validation("title cannot be empty"));
        }

        Ok(Self {
            id: DemandeId::new(),
            title,
            description: description.into(),
            status: DemandeStatus::Pending,
            created_by,
            assigned_agent: None,
            assigned_at: None,
            created_at: now,
            updated_at: None,
            updated_by: None,
            deleted_at: None,
            deleted_by: None,
        })
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Apply content changes (title/description). Callers gate this on the
    /// creator-only policy check.
    pub fn apply_content(
        &mut self,
        title: Option<String>,
        description: Option<String>,
    ) -> DomainResult<()> {
        if let Some(title) = title {
            let title = title.trim().to_string();
            if title.is_empty() {
                return Err(DomainError::validation("title cannot be empty"));
            }
            self.title = title;
        }
        if let Some(description) = description {
            self.description = description;
        }
        Ok(())
    }

    /// Apply workflow changes (status/assignment).
    ///
    /// The assignment timestamp is derived here: set when the agent is newly
    /// set or changed, cleared together with the agent. Re-submitting the
    /// current assignee leaves the timestamp alone.
    pub fn apply_workflow(&mut self, patch: WorkflowPatch, now: DateTime<Utc>) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        match patch.assignment {
            Some(Assignment::Assign { agent, at }) => {
                if self.assigned_agent != Some(agent) {
                    self.assigned_at = Some(at.unwrap_or(now));
                }
                self.assigned_agent = Some(agent);
            }
            Some(Assignment::Clear) => {
                self.assigned_agent = None;
                self.assigned_at = None;
            }
            None => {}
        }
    }

    /// Stamp the audit fields for a successful update, even when only
    /// workflow fields changed.
    pub fn stamp_update(&mut self, actor: UserId, now: DateTime<Utc>) {
        self.updated_at = Some(now);
        self.updated_by = Some(actor);
    }

    /// Soft-delete the ticket. Already-deleted records behave as absent.
    pub fn soft_delete(&mut self, actor: UserId, now: DateTime<Utc>) -> DomainResult<()> {
        if self.is_deleted() {
            return Err(DomainError::NotFound);
        }
        self.deleted_at = Some(now);
        self.deleted_by = Some(actor);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    fn ticket(creator: UserId) -> Demande {
        Demande::open(creator, "Printer broken", "3rd floor printer jams", now()).unwrap()
    }

    #[test]
    fn open_forces_pending_and_unassigned() {
        let creator = UserId::new();
        let d = ticket(creator);
        assert_eq!(d.status, DemandeStatus::Pending);
        assert_eq!(d.created_by, creator);
        assert!(d.assigned_agent.is_none());
        assert!(d.assigned_at.is_none());
        assert!(!d.is_deleted());
    }

    #[test]
    fn assigning_sets_timestamp_in_same_update() {
        let mut d = ticket(UserId::new());
        let agent = UserId::new();

        d.apply_workflow(
            WorkflowPatch {
                status: None,
                assignment: Some(Assignment::Assign { agent, at: None }),
            },
            now(),
        );

        assert_eq!(d.assigned_agent, Some(agent));
        assert!(d.assigned_at.is_some());
        assert_eq!(d.status, DemandeStatus::Pending);
    }

    #[test]
    fn clearing_assignment_clears_timestamp() {
        let mut d = ticket(UserId::new());
        let agent = UserId::new();
        d.apply_workflow(
            WorkflowPatch {
                status: None,
                assignment: Some(Assignment::Assign { agent, at: None }),
            },
            now(),
        );

        d.apply_workflow(
            WorkflowPatch {
                status: None,
                assignment: Some(Assignment::Clear),
            },
            now(),
        );

        assert!(d.assigned_agent.is_none());
        assert!(d.assigned_at.is_none());
    }

    #[test]
    fn reassigning_same_agent_keeps_timestamp() {
        let mut d = ticket(UserId::new());
        let agent = UserId::new();
        let t0 = now();
        d.apply_workflow(
            WorkflowPatch {
                status: None,
                assignment: Some(Assignment::Assign { agent, at: Some(t0) }),
            },
            now(),
        );

        d.apply_workflow(
            WorkflowPatch {
                status: Some(DemandeStatus::InProgress),
                assignment: Some(Assignment::Assign { agent, at: None }),
            },
            now(),
        );

        assert_eq!(d.assigned_at, Some(t0));
        assert_eq!(d.status, DemandeStatus::InProgress);
    }

    #[test]
    fn changing_agent_refreshes_timestamp() {
        let mut d = ticket(UserId::new());
        let t0 = now();
        d.apply_workflow(
            WorkflowPatch {
                status: None,
                assignment: Some(Assignment::Assign {
                    agent: UserId::new(),
                    at: Some(t0),
                }),
            },
            t0,
        );

        let t1 = t0 + chrono::Duration::minutes(5);
        d.apply_workflow(
            WorkflowPatch {
                status: None,
                assignment: Some(Assignment::Assign {
                    agent: UserId::new(),
                    at: None,
                }),
            },
            t1,
        );

        assert_eq!(d.assigned_at, Some(t1));
    }

    #[test]
    fn status_transitions_are_permissive() {
        let mut d = ticket(UserId::new());
        for status in [
            DemandeStatus::Done,
            DemandeStatus::Pending,
            DemandeStatus::InProgress,
            DemandeStatus::Pending,
        ] {
            d.apply_workflow(
                WorkflowPatch {
                    status: Some(status),
                    assignment: None,
                },
                now(),
            );
            assert_eq!(d.status, status);
        }
    }

    #[test]
    fn workflow_update_leaves_content_and_creator_alone() {
        let creator = UserId::new();
        let mut d = ticket(creator);
        d.apply_workflow(
            WorkflowPatch {
                status: Some(DemandeStatus::Done),
                assignment: None,
            },
            now(),
        );
        assert_eq!(d.title, "Printer broken");
        assert_eq!(d.created_by, creator);
    }

    #[test]
    fn soft_delete_twice_is_not_found() {
        let mut d = ticket(UserId::new());
        let actor = UserId::new();
        d.soft_delete(actor, now()).unwrap();
        assert!(d.is_deleted());
        assert_eq!(d.deleted_by, Some(actor));

        let err = d.soft_delete(actor, now()).unwrap_err();
        assert_eq!(err, DomainError::NotFound);
    }

    #[test]
    fn content_update_rejects_empty_title() {
        let mut d = ticket(UserId::new());
        let err = d.apply_content(Some("  ".into()), None).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn status_tokens_round_trip() {
        for (s, tok) in [
            (DemandeStatus::Pending, "pending"),
            (DemandeStatus::InProgress, "in_progress"),
            (DemandeStatus::Done, "done"),
        ] {
            assert_eq!(s.to_string(), tok);
            assert_eq!(tok.parse::<DemandeStatus>().unwrap(), s);
        }
        assert!("closed".parse::<DemandeStatus>().is_err());
    }
}
