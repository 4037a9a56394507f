//! `guichet-infra` — the Record Store: persistence behind one async trait.
//!
//! The filtering contract (what "active" and "visible" mean at the query
//! boundary) lives in `store`; both backends must agree on it. `memory` is
//! the dev/test backend, `postgres` the persistent one.

pub mod memory;
pub mod postgres;
pub mod store;

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use store::{
    CommentaireFilter, CommentaireScope, DemandeFilter, DemandeScope, RecordStore, SortOrder,
    UserFilter,
};
