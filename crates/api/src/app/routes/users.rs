use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use guichet_auth::policy;
use guichet_core::{DomainError, UserId};
use guichet_infra::UserFilter;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_users))
        .route("/:id", get(get_user).patch(update_user))
        .route("/:id/deactivate", post(deactivate_user))
}

pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Query(query): Query<dto::UserListQuery>,
) -> axum::response::Response {
    if !policy::can_list_users(actor.claim()) {
        return errors::domain_error_to_response(DomainError::Forbidden);
    }

    let filter = UserFilter {
        active: query.active,
        email_contains: query.email,
        role: query.role,
    };

    match services.store.list_users(&filter).await {
        Ok(users) => {
            let items = users.iter().map(dto::user_to_json).collect::<Vec<_>>();
            (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
        }
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: UserId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    if !policy::can_view_user(actor.claim(), id) {
        return errors::domain_error_to_response(DomainError::Forbidden);
    }

    match services.store.get_user(id).await {
        Ok(Some(user)) => (StatusCode::OK, Json(dto::user_to_json(&user))).into_response(),
        Ok(None) => errors::domain_error_to_response(DomainError::NotFound),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateUserRequest>,
) -> axum::response::Response {
    let id: UserId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let grant = policy::can_edit_user(actor.claim(), id);
    if !grant.allowed {
        return errors::domain_error_to_response(DomainError::Forbidden);
    }

    let mut user = match services.store.get_user(id).await {
        Ok(Some(u)) => u,
        Ok(None) => return errors::domain_error_to_response(DomainError::NotFound),
        Err(e) => return errors::domain_error_to_response(e),
    };

    let (patch, new_password) = body.into_patch();
    let new_hash = match new_password {
        Some(plain) => match services.hasher.hash(&plain) {
            Ok(h) => Some(h),
            Err(e) => {
                tracing::error!("password hashing failed: {e}");
                return errors::json_error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "hash_error",
                    "could not process credentials",
                );
            }
        },
        None => None,
    };

    if let Err(e) = user.apply_update(patch, grant.can_change_role, new_hash) {
        return errors::domain_error_to_response(e);
    }

    // The new email must stay unique across all accounts.
    match services.store.find_user_by_email(&user.email).await {
        Ok(Some(other)) if other.id != user.id => {
            return errors::domain_error_to_response(DomainError::conflict(
                "email already registered",
            ))
        }
        Ok(_) => {}
        Err(e) => return errors::domain_error_to_response(e),
    }

    match services.store.update_user(&user).await {
        Ok(()) => (StatusCode::OK, Json(dto::user_to_json(&user))).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn deactivate_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: UserId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    if !policy::can_deactivate_user(actor.claim()) {
        return errors::domain_error_to_response(DomainError::Forbidden);
    }

    let mut user = match services.store.get_user(id).await {
        Ok(Some(u)) => u,
        Ok(None) => return errors::domain_error_to_response(DomainError::NotFound),
        Err(e) => return errors::domain_error_to_response(e),
    };

    if let Err(e) = user.deactivate() {
        return errors::domain_error_to_response(e);
    }

    match services.store.update_user(&user).await {
        Ok(()) => (StatusCode::OK, Json(dto::user_to_json(&user))).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}
