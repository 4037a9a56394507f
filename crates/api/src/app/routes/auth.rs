use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};

use guichet_auth::Claim;
use guichet_core::{DomainError, User};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::RegisterRequest>,
) -> axum::response::Response {
    if body.password.is_empty() {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "password cannot be empty",
        );
    }

    let hash = match services.hasher.hash(&body.password) {
        Ok(h) => h,
        Err(e) => {
            tracing::error!("password hashing failed: {e}");
            return errors::json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "hash_error",
                "could not process credentials",
            );
        }
    };

    let user = match User::register(body.name, body.email, body.role.unwrap_or_default(), hash) {
        Ok(u) => u,
        Err(e) => return errors::domain_error_to_response(e),
    };

    // Uniqueness spans active and inactive accounts.
    match services.store.find_user_by_email(&user.email).await {
        Ok(Some(_)) => {
            return errors::domain_error_to_response(DomainError::conflict(
                "email already registered",
            ))
        }
        Ok(None) => {}
        Err(e) => return errors::domain_error_to_response(e),
    }

    if let Err(e) = services.store.insert_user(&user).await {
        return errors::domain_error_to_response(e);
    }

    (StatusCode::CREATED, Json(dto::user_to_json(&user))).into_response()
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::LoginRequest>,
) -> axum::response::Response {
    let user = match services.store.find_user_by_email(&body.email).await {
        Ok(Some(u)) => u,
        Ok(None) => return errors::domain_error_to_response(DomainError::InvalidCredentials),
        Err(e) => return errors::domain_error_to_response(e),
    };

    if !services.hasher.verify(&user.password_hash, &body.password) {
        return errors::domain_error_to_response(DomainError::InvalidCredentials);
    }

    if !user.active {
        tracing::info!(user_id = %user.id, "login rejected for inactive account");
        return errors::domain_error_to_response(DomainError::InactiveAccount);
    }

    let token = match services.tokens.issue(&Claim::new(user.id, user.role)) {
        Ok(t) => t,
        Err(e) => {
            tracing::error!("token issuance failed: {e}");
            return errors::json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "token_error",
                "could not issue token",
            );
        }
    };

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "token": token,
            "user": dto::user_to_json(&user),
        })),
    )
        .into_response()
}
