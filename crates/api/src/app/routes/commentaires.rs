use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::Utc;

use guichet_auth::policy;
use guichet_core::{Commentaire, CommentaireId, DomainError};
use guichet_infra::{CommentaireFilter, CommentaireScope};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_commentaires).post(create_commentaire))
        .route("/:id", get(get_commentaire).delete(delete_commentaire))
}

pub async fn list_commentaires(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Query(query): Query<dto::CommentaireListQuery>,
) -> axum::response::Response {
    let scope = if actor.is_agent() {
        CommentaireScope::All
    } else {
        CommentaireScope::ParentCreatedBy(actor.user_id())
    };

    let mut filter = CommentaireFilter::scoped(scope);
    filter.demande = query.demande_id;

    match services.store.list_commentaires(&filter).await {
        Ok(commentaires) => {
            let items = commentaires
                .iter()
                .map(dto::commentaire_to_json)
                .collect::<Vec<_>>();
            (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
        }
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn create_commentaire(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Json(body): Json<dto::CreateCommentaireRequest>,
) -> axum::response::Response {
    // The parent is loaded including its deletion stamp; `Commentaire::post`
    // answers NotFound for a deleted parent, whatever the actor's role.
    let parent = match services.store.get_demande(body.demande_id).await {
        Ok(Some(d)) => d,
        Ok(None) => return errors::domain_error_to_response(DomainError::NotFound),
        Err(e) => return errors::domain_error_to_response(e),
    };

    if !parent.is_deleted() && !policy::can_create_commentaire(actor.claim(), &parent) {
        return errors::domain_error_to_response(DomainError::Forbidden);
    }

    let commentaire = match Commentaire::post(&parent, actor.user_id(), body.content, Utc::now()) {
        Ok(c) => c,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.store.insert_commentaire(&commentaire).await {
        Ok(()) => (
            StatusCode::CREATED,
            Json(dto::commentaire_to_json(&commentaire)),
        )
            .into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn get_commentaire(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: CommentaireId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let commentaire = match services.store.get_commentaire(id).await {
        Ok(Some(c)) if !c.is_deleted() => c,
        Ok(_) => return errors::domain_error_to_response(DomainError::NotFound),
        Err(e) => return errors::domain_error_to_response(e),
    };

    // Visibility follows the parent's creator, even when the parent itself
    // was soft-deleted since.
    let parent = match services.store.get_demande(commentaire.demande_id).await {
        Ok(Some(d)) => d,
        Ok(None) => return errors::domain_error_to_response(DomainError::NotFound),
        Err(e) => return errors::domain_error_to_response(e),
    };

    if !policy::can_view_commentaire(actor.claim(), &parent) {
        return errors::domain_error_to_response(DomainError::Forbidden);
    }

    (StatusCode::OK, Json(dto::commentaire_to_json(&commentaire))).into_response()
}

pub async fn delete_commentaire(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: CommentaireId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let mut commentaire = match services.store.get_commentaire(id).await {
        Ok(Some(c)) => c,
        Ok(None) => return errors::domain_error_to_response(DomainError::NotFound),
        Err(e) => return errors::domain_error_to_response(e),
    };

    if !policy::can_delete_commentaire(actor.claim(), &commentaire) {
        return errors::domain_error_to_response(DomainError::Forbidden);
    }

    if let Err(e) = commentaire.soft_delete(actor.user_id(), Utc::now()) {
        return errors::domain_error_to_response(e);
    }

    match services.store.update_commentaire(&commentaire).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}
