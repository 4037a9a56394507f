use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer};

use guichet_core::{
    Assignment, Commentaire, Demande, DemandeId, DemandeStatus, Role, User, UserId, UserPatch,
    WorkflowPatch,
};
use guichet_infra::SortOrder;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    /// Defaults to `regular`.
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    /// A non-empty value replaces the credential; empty or absent leaves it
    /// untouched.
    pub password: Option<String>,
}

impl UpdateUserRequest {
    pub fn into_patch(self) -> (UserPatch, Option<String>) {
        let password = self.password.filter(|p| !p.is_empty());
        (
            UserPatch {
                name: self.name,
                email: self.email,
                role: self.role,
            },
            password,
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateDemandeRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateDemandeRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<DemandeStatus>,
    /// Tri-state: absent leaves the assignment untouched, `null` clears it,
    /// an id assigns.
    #[serde(default, deserialize_with = "deserialize_some")]
    pub assigned_agent: Option<Option<UserId>>,
    /// Optional explicit assignment time; server clock otherwise.
    pub assigned_at: Option<DateTime<Utc>>,
}

impl UpdateDemandeRequest {
    pub fn has_content_fields(&self) -> bool {
        self.title.is_some() || self.description.is_some()
    }

    pub fn workflow_patch(&self) -> WorkflowPatch {
        let assignment = match self.assigned_agent {
            Some(Some(agent)) => Some(Assignment::Assign {
                agent,
                at: self.assigned_at,
            }),
            Some(None) => Some(Assignment::Clear),
            None => None,
        };
        WorkflowPatch {
            status: self.status,
            assignment,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateCommentaireRequest {
    pub demande_id: DemandeId,
    pub content: String,
}

// -------------------------
// Query DTOs
// -------------------------

#[derive(Debug, Copy, Clone, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderParam {
    Asc,
    Desc,
}

impl From<OrderParam> for SortOrder {
    fn from(value: OrderParam) -> Self {
        match value {
            OrderParam::Asc => SortOrder::Asc,
            OrderParam::Desc => SortOrder::Desc,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DemandeListQuery {
    pub status: Option<DemandeStatus>,
    pub agent_id: Option<UserId>,
    pub assigned: Option<bool>,
    pub created_on: Option<NaiveDate>,
    pub order: Option<OrderParam>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UserListQuery {
    pub active: Option<bool>,
    /// Case-insensitive substring on the email.
    pub email: Option<String>,
    pub role: Option<Role>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CommentaireListQuery {
    pub demande_id: Option<DemandeId>,
}

/// Distinguish an explicit `null` from an absent field (used with
/// `#[serde(default)]` on a double-`Option` field).
fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

// -------------------------
// JSON mapping helpers
// -------------------------

pub fn user_to_json(u: &User) -> serde_json::Value {
    serde_json::json!({
        "id": u.id.to_string(),
        "name": u.name,
        "email": u.email,
        "role": u.role.as_str(),
        "active": u.active,
    })
}

pub fn demande_to_json(d: &Demande) -> serde_json::Value {
    serde_json::json!({
        "id": d.id.to_string(),
        "title": d.title,
        "description": d.description,
        "status": d.status.as_str(),
        "created_by": d.created_by.to_string(),
        "assigned_agent": d.assigned_agent.map(|a| a.to_string()),
        "assigned_at": d.assigned_at,
        "created_at": d.created_at,
        "updated_at": d.updated_at,
        "updated_by": d.updated_by.map(|u| u.to_string()),
    })
}

pub fn commentaire_to_json(c: &Commentaire) -> serde_json::Value {
    serde_json::json!({
        "id": c.id.to_string(),
        "demande_id": c.demande_id.to_string(),
        "author": c.author.to_string(),
        "content": c.content,
        "created_at": c.created_at,
    })
}
