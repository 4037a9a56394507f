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
use guichet_core::{Demande, DemandeId, DomainError};
use guichet_infra::{DemandeFilter, DemandeScope};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_demandes).post(create_demande))
        .route(
            "/:id",
            get(get_demande).patch(update_demande).delete(delete_demande),
        )
}

pub async fn list_demandes(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Query(query): Query<dto::DemandeListQuery>,
) -> axum::response::Response {
    let scope = if actor.is_agent() {
        DemandeScope::All
    } else {
        DemandeScope::CreatedBy(actor.user_id())
    };

    let mut filter = DemandeFilter::scoped(scope);
    filter.status = query.status;
    filter.assigned_agent = query.agent_id;
    filter.assigned = query.assigned;
    filter.created_on = query.created_on;
    if let Some(order) = query.order {
        filter.order = order.into();
    }

    match services.store.list_demandes(&filter).await {
        Ok(demandes) => {
            let items = demandes.iter().map(dto::demande_to_json).collect::<Vec<_>>();
            (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
        }
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn create_demande(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Json(body): Json<dto::CreateDemandeRequest>,
) -> axum::response::Response {
    if !policy::can_create_demande(actor.claim()) {
        return errors::domain_error_to_response(DomainError::Forbidden);
    }

    let demande = match Demande::open(actor.user_id(), body.title, body.description, Utc::now()) {
        Ok(d) => d,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.store.insert_demande(&demande).await {
        Ok(()) => (StatusCode::CREATED, Json(dto::demande_to_json(&demande))).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn get_demande(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: DemandeId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let demande = match load_active(&services, id).await {
        Ok(d) => d,
        Err(resp) => return resp,
    };

    if !policy::can_view_demande(actor.claim(), &demande) {
        return errors::domain_error_to_response(DomainError::Forbidden);
    }

    (StatusCode::OK, Json(dto::demande_to_json(&demande))).into_response()
}

pub async fn update_demande(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateDemandeRequest>,
) -> axum::response::Response {
    let id: DemandeId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let mut demande = match load_active(&services, id).await {
        Ok(d) => d,
        Err(resp) => return resp,
    };

    let workflow = body.workflow_patch();
    if !body.has_content_fields() && workflow.is_empty() {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "update contains no fields",
        );
    }

    // Content fields belong to the creator; workflow fields to the agent
    // role. Each half is gated independently.
    if body.has_content_fields() {
        if !policy::can_edit_demande_content(actor.claim(), &demande) {
            return errors::domain_error_to_response(DomainError::Forbidden);
        }
        if let Err(e) = demande.apply_content(body.title.clone(), body.description.clone()) {
            return errors::domain_error_to_response(e);
        }
    }

    if !workflow.is_empty() {
        if !policy::can_edit_demande_workflow(actor.claim()) {
            return errors::domain_error_to_response(DomainError::Forbidden);
        }
        demande.apply_workflow(workflow, Utc::now());
    }

    demande.stamp_update(actor.user_id(), Utc::now());

    match services.store.update_demande(&demande).await {
        Ok(()) => (StatusCode::OK, Json(dto::demande_to_json(&demande))).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn delete_demande(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: DemandeId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    // Load including the deletion stamp: a second delete must answer
    // NotFound, which `soft_delete` itself enforces.
    let mut demande = match services.store.get_demande(id).await {
        Ok(Some(d)) => d,
        Ok(None) => return errors::domain_error_to_response(DomainError::NotFound),
        Err(e) => return errors::domain_error_to_response(e),
    };

    if !policy::can_delete_demande(actor.claim(), &demande) {
        return errors::domain_error_to_response(DomainError::Forbidden);
    }

    if let Err(e) = demande.soft_delete(actor.user_id(), Utc::now()) {
        return errors::domain_error_to_response(e);
    }

    match services.store.update_demande(&demande).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

/// Load a demande and translate absent-or-deleted to NotFound.
async fn load_active(
    services: &AppServices,
    id: DemandeId,
) -> Result<Demande, axum::response::Response> {
    match services.store.get_demande(id).await {
        Ok(Some(d)) if !d.is_deleted() => Ok(d),
        Ok(_) => Err(errors::domain_error_to_response(DomainError::NotFound)),
        Err(e) => Err(errors::domain_error_to_response(e)),
    }
}
