//! The `RecordStore` trait and the filter types that encode the query
//! contract.
//!
//! Contract highlights:
//! - `list_*` never returns soft-deleted rows.
//! - `get_*` by id returns the row even when soft-deleted, so update/delete
//!   preconditions can answer NotFound themselves; read endpoints translate
//!   a deleted row to NotFound at the handler.
//! - An explicit assigned-agent filter takes priority over the
//!   assigned/unassigned flag.
//! - Comment listing for non-agents joins through the parent demande's
//!   creator, and that join does NOT hide comments whose parent was later
//!   deleted.

use async_trait::async_trait;
use chrono::NaiveDate;

use guichet_core::{
    Commentaire, CommentaireId, Demande, DemandeId, DemandeStatus, DomainResult, Role, User,
    UserId,
};

/// Creation-order toggle for demande listings.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    /// Newest first (the default).
    #[default]
    Desc,
}

/// Row scope for demande listings.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DemandeScope {
    /// Agent view: every active demande.
    All,
    /// Non-agent view: only the actor's own demandes.
    CreatedBy(UserId),
}

#[derive(Debug, Clone)]
pub struct DemandeFilter {
    pub scope: DemandeScope,
    pub status: Option<DemandeStatus>,
    /// Wins over `assigned` when both are present.
    pub assigned_agent: Option<UserId>,
    pub assigned: Option<bool>,
    /// Exact-day match on the creation timestamp (UTC).
    pub created_on: Option<NaiveDate>,
    pub order: SortOrder,
}

impl DemandeFilter {
    pub fn scoped(scope: DemandeScope) -> Self {
        Self {
            scope,
            status: None,
            assigned_agent: None,
            assigned: None,
            created_on: None,
            order: SortOrder::default(),
        }
    }

    /// In-process evaluation of the filter, shared by the in-memory backend
    /// and the contract tests. Soft-deleted rows never match.
    pub fn matches(&self, d: &Demande) -> bool {
        if d.is_deleted() {
            return false;
        }
        if let DemandeScope::CreatedBy(creator) = self.scope {
            if d.created_by != creator {
                return false;
            }
        }
        if let Some(status) = self.status {
            if d.status != status {
                return false;
            }
        }
        if let Some(agent) = self.assigned_agent {
            if d.assigned_agent != Some(agent) {
                return false;
            }
        } else if let Some(assigned) = self.assigned {
            if d.assigned_agent.is_some() != assigned {
                return false;
            }
        }
        if let Some(day) = self.created_on {
            if d.created_at.date_naive() != day {
                return false;
            }
        }
        true
    }
}

/// Row scope for commentaire listings.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CommentaireScope {
    /// Agent view.
    All,
    /// Non-agent view: comments whose parent demande was created by this user.
    ParentCreatedBy(UserId),
}

#[derive(Debug, Clone)]
pub struct CommentaireFilter {
    pub scope: CommentaireScope,
    pub demande: Option<DemandeId>,
}

impl CommentaireFilter {
    pub fn scoped(scope: CommentaireScope) -> Self {
        Self {
            scope,
            demande: None,
        }
    }

    /// `parent_creator` is the creator of the comment's parent demande,
    /// looked up regardless of the parent's deletion stamp.
    pub fn matches(&self, c: &Commentaire, parent_creator: Option<UserId>) -> bool {
        if c.is_deleted() {
            return false;
        }
        if let CommentaireScope::ParentCreatedBy(creator) = self.scope {
            if parent_creator != Some(creator) {
                return false;
            }
        }
        if let Some(demande) = self.demande {
            if c.demande_id != demande {
                return false;
            }
        }
        true
    }
}

/// Filters for the agent-only user listing.
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub active: Option<bool>,
    /// Case-insensitive substring match.
    pub email_contains: Option<String>,
    pub role: Option<Role>,
}

impl UserFilter {
    pub fn matches(&self, u: &User) -> bool {
        if let Some(active) = self.active {
            if u.active != active {
                return false;
            }
        }
        if let Some(fragment) = &self.email_contains {
            if !u.email.to_lowercase().contains(&fragment.to_lowercase()) {
                return false;
            }
        }
        if let Some(role) = self.role {
            if u.role != role {
                return false;
            }
        }
        true
    }
}

/// Transactional persistence over the three entity types.
///
/// Each method is one bounded read or write; callers compose them into
/// short read-modify-write sequences. Updates persist the whole record
/// (last-write-wins, per the concurrency model).
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn insert_user(&self, user: &User) -> DomainResult<()>;
    async fn get_user(&self, id: UserId) -> DomainResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> DomainResult<Option<User>>;
    async fn update_user(&self, user: &User) -> DomainResult<()>;
    async fn list_users(&self, filter: &UserFilter) -> DomainResult<Vec<User>>;

    async fn insert_demande(&self, demande: &Demande) -> DomainResult<()>;
    async fn get_demande(&self, id: DemandeId) -> DomainResult<Option<Demande>>;
    async fn update_demande(&self, demande: &Demande) -> DomainResult<()>;
    async fn list_demandes(&self, filter: &DemandeFilter) -> DomainResult<Vec<Demande>>;

    async fn insert_commentaire(&self, commentaire: &Commentaire) -> DomainResult<()>;
    async fn get_commentaire(&self, id: CommentaireId) -> DomainResult<Option<Commentaire>>;
    async fn update_commentaire(&self, commentaire: &Commentaire) -> DomainResult<()>;
    async fn list_commentaires(&self, filter: &CommentaireFilter) -> DomainResult<Vec<Commentaire>>;
}
