//! In-memory record store for dev/test.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use guichet_core::{
    Commentaire, CommentaireId, Demande, DemandeId, DomainError, DomainResult, User, UserId,
};

use crate::store::{CommentaireFilter, DemandeFilter, RecordStore, SortOrder, UserFilter};

/// Lock-per-table in-memory store. Filter semantics are the shared
/// `matches()` evaluation, so this backend doubles as the reference for the
/// Postgres queries.
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<UserId, User>>,
    demandes: RwLock<HashMap<DemandeId, Demande>>,
    commentaires: RwLock<HashMap<CommentaireId, Commentaire>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned(_: impl std::fmt::Debug) -> DomainError {
    DomainError::storage("memory store lock poisoned")
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn insert_user(&self, user: &User) -> DomainResult<()> {
        let mut users = self.users.write().map_err(poisoned)?;
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn get_user(&self, id: UserId) -> DomainResult<Option<User>> {
        let users = self.users.read().map_err(poisoned)?;
        Ok(users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> DomainResult<Option<User>> {
        let users = self.users.read().map_err(poisoned)?;
        Ok(users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn update_user(&self, user: &User) -> DomainResult<()> {
        let mut users = self.users.write().map_err(poisoned)?;
        match users.get_mut(&user.id) {
            Some(slot) => {
                *slot = user.clone();
                Ok(())
            }
            None => Err(DomainError::NotFound),
        }
    }

    async fn list_users(&self, filter: &UserFilter) -> DomainResult<Vec<User>> {
        let users = self.users.read().map_err(poisoned)?;
        let mut out: Vec<User> = users.values().filter(|u| filter.matches(u)).cloned().collect();
        out.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(out)
    }

    async fn insert_demande(&self, demande: &Demande) -> DomainResult<()> {
        let mut demandes = self.demandes.write().map_err(poisoned)?;
        demandes.insert(demande.id, demande.clone());
        Ok(())
    }

    async fn get_demande(&self, id: DemandeId) -> DomainResult<Option<Demande>> {
        let demandes = self.demandes.read().map_err(poisoned)?;
        Ok(demandes.get(&id).cloned())
    }

    async fn update_demande(&self, demande: &Demande) -> DomainResult<()> {
        let mut demandes = self.demandes.write().map_err(poisoned)?;
        match demandes.get_mut(&demande.id) {
            Some(slot) => {
                *slot = demande.clone();
                Ok(())
            }
            None => Err(DomainError::NotFound),
        }
    }

    async fn list_demandes(&self, filter: &DemandeFilter) -> DomainResult<Vec<Demande>> {
        let demandes = self.demandes.read().map_err(poisoned)?;
        let mut out: Vec<Demande> = demandes
            .values()
            .filter(|d| filter.matches(d))
            .cloned()
            .collect();
        out.sort_by(|a, b| match filter.order {
            SortOrder::Asc => a.created_at.cmp(&b.created_at),
            SortOrder::Desc => b.created_at.cmp(&a.created_at),
        });
        Ok(out)
    }

    async fn insert_commentaire(&self, commentaire: &Commentaire) -> DomainResult<()> {
        let mut commentaires = self.commentaires.write().map_err(poisoned)?;
        commentaires.insert(commentaire.id, commentaire.clone());
        Ok(())
    }

    async fn get_commentaire(&self, id: CommentaireId) -> DomainResult<Option<Commentaire>> {
        let commentaires = self.commentaires.read().map_err(poisoned)?;
        Ok(commentaires.get(&id).cloned())
    }

    async fn update_commentaire(&self, commentaire: &Commentaire) -> DomainResult<()> {
        let mut commentaires = self.commentaires.write().map_err(poisoned)?;
        match commentaires.get_mut(&commentaire.id) {
            Some(slot) => {
                *slot = commentaire.clone();
                Ok(())
            }
            None => Err(DomainError::NotFound),
        }
    }

    async fn list_commentaires(&self, filter: &CommentaireFilter) -> DomainResult<Vec<Commentaire>> {
        let commentaires = self.commentaires.read().map_err(poisoned)?;
        // Parent lookup ignores the parent's deletion stamp on purpose:
        // orphaned comments stay visible to their owner.
        let demandes = self.demandes.read().map_err(poisoned)?;

        let mut out: Vec<Commentaire> = commentaires
            .values()
            .filter(|c| {
                let parent_creator = demandes.get(&c.demande_id).map(|d| d.created_by);
                filter.matches(c, parent_creator)
            })
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }
}
