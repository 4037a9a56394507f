use std::sync::Arc;

use guichet_auth::{Argon2CredentialHasher, CredentialHasher, Hs256TokenCodec, TokenCodec};
use guichet_infra::{MemoryStore, PgStore, RecordStore};

/// Wired infrastructure shared by every handler.
#[derive(Clone)]
pub struct AppServices {
    pub store: Arc<dyn RecordStore>,
    pub hasher: Arc<dyn CredentialHasher>,
    pub tokens: Arc<dyn TokenCodec>,
}

/// Issued tokens stay valid for a working day.
const TOKEN_TTL_HOURS: i64 = 8;

pub async fn build_services(jwt_secret: String) -> AppServices {
    let tokens: Arc<dyn TokenCodec> = Arc::new(Hs256TokenCodec::new(
        jwt_secret.as_bytes(),
        chrono::Duration::hours(TOKEN_TTL_HOURS),
    ));

    let use_persistent = std::env::var("USE_PERSISTENT_STORES")
        .unwrap_or_else(|_| "false".to_string())
        .parse::<bool>()
        .unwrap_or(false);

    let store: Arc<dyn RecordStore> = if use_persistent {
        let database_url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set when USE_PERSISTENT_STORES=true");
        let store = PgStore::connect(&database_url)
            .await
            .expect("failed to connect to Postgres");
        tracing::info!("using Postgres record store");
        Arc::new(store)
    } else {
        tracing::info!("using in-memory record store");
        Arc::new(MemoryStore::new())
    };

    AppServices {
        store,
        hasher: Arc::new(Argon2CredentialHasher),
        tokens,
    }
}
