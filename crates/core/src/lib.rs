//! `guichet-core` — domain foundation for the ticket backend.
//!
//! This crate contains **pure domain** code (no storage, no HTTP): the
//! strongly-typed identifiers, the error taxonomy, and the lifecycle rules
//! for the three entities (User, Demande, Commentaire).

pub mod commentaire;
pub mod demande;
pub mod error;
pub mod id;
pub mod user;

pub use commentaire::Commentaire;
pub use demande::{Assignment, Demande, DemandeStatus, WorkflowPatch};
pub use error::{DomainError, DomainResult};
pub use id::{CommentaireId, DemandeId, UserId};
pub use user::{Role, User, UserPatch};
