//! Commentaire entity: an append-only annotation on a demande.
//!
//! Comments are never edited in place. Deletion is a soft-delete stamped on
//! the comment itself and is independent of the parent ticket's deletion:
//! deleting a demande does not cascade onto its comments (audit history is
//! preserved on purpose).

use chrono::{DateTime, Utc};

use crate::demande::Demande;
use crate::error::{DomainError, DomainResult};
use crate::id::{CommentaireId, DemandeId, UserId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commentaire {
    pub id: CommentaireId,
    pub demande_id: DemandeId,
    /// Fixed to the acting identity at creation; caller-supplied authors are
    /// never honored.
    pub author: UserId,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<UserId>,
}

impl Commentaire {
    /// Post a comment on an active demande. A soft-deleted parent behaves as
    /// absent, regardless of the actor's role.
    pub fn post(
        parent: &Demande,
        author: UserId,
        content: impl Into<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if parent.is_deleted() {
            return Err(DomainError::NotFound);
        }
        let content = content.into();
        if content.trim().is_empty() {
            return Err(DomainError::validation("content cannot be empty"));
        }

        Ok(Self {
            id: CommentaireId::new(),
            demande_id: parent.id,
            author,
            content,
            created_at: now,
            deleted_at: None,
            deleted_by: None,
        })
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Soft-delete the comment. Already-deleted comments behave as absent.
    pub fn soft_delete(&mut self, actor: UserId, now: DateTime<Utc>) -> DomainResult<()> {
        if self.is_deleted() {
            return Err(DomainError::NotFound);
        }
        self.deleted_at = Some(now);
        self.deleted_by = Some(actor);
        Ok(())
    }
}
