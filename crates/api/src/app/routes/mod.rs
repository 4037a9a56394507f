use axum::{routing::get, Router};

pub mod auth;
pub mod commentaires;
pub mod demandes;
pub mod system;
pub mod users;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/users", users::router())
        .nest("/demandes", demandes::router())
        .nest("/commentaires", commentaires::router())
}
