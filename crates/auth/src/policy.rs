//! Access policy engine.
//!
//! One decision function per resource action. All of them are pure, total,
//! and deterministic: they take the actor's claim plus already-loaded record
//! metadata, never touch storage, and never panic. Callers load the record
//! first, ask here, then act.

use guichet_core::{Commentaire, Demande, UserId};

use crate::claims::Claim;

/// Outcome of a user-edit check: whether the edit may proceed at all, and
/// separately whether the role field may move.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct UserEditGrant {
    pub allowed: bool,
    pub can_change_role: bool,
}

/// Agents see everyone; everyone sees themselves.
pub fn can_view_user(actor: &Claim, target: UserId) -> bool {
    actor.role.is_agent() || actor.user_id == target
}

pub fn can_list_users(actor: &Claim) -> bool {
    actor.role.is_agent()
}

/// Self-edits are allowed, but only agents may change a role.
pub fn can_edit_user(actor: &Claim, target: UserId) -> UserEditGrant {
    UserEditGrant {
        allowed: actor.role.is_agent() || actor.user_id == target,
        can_change_role: actor.role.is_agent(),
    }
}

pub fn can_deactivate_user(actor: &Claim) -> bool {
    actor.role.is_agent()
}

pub fn can_view_demande(actor: &Claim, demande: &Demande) -> bool {
    actor.role.is_agent() || demande.created_by == actor.user_id
}

/// Any authenticated actor may open a ticket.
pub fn can_create_demande(_actor: &Claim) -> bool {
    true
}

/// Content fields (title/description) belong to the creator, regardless of
/// role: an agent who is not the creator may not touch them.
pub fn can_edit_demande_content(actor: &Claim, demande: &Demande) -> bool {
    demande.created_by == actor.user_id
}

/// Status and assignment belong to the agent role collectively.
pub fn can_edit_demande_workflow(actor: &Claim) -> bool {
    actor.role.is_agent()
}

pub fn can_delete_demande(actor: &Claim, demande: &Demande) -> bool {
    actor.role.is_agent() || demande.created_by == actor.user_id
}

/// Comment visibility follows the parent ticket's visibility.
pub fn can_view_commentaire(actor: &Claim, parent: &Demande) -> bool {
    can_view_demande(actor, parent)
}

pub fn can_create_commentaire(actor: &Claim, parent: &Demande) -> bool {
    actor.role.is_agent() || parent.created_by == actor.user_id
}

/// Authors delete their own comments; agents delete any.
pub fn can_delete_commentaire(actor: &Claim, commentaire: &Commentaire) -> bool {
    actor.role.is_agent() || commentaire.author == actor.user_id
}
