use guichet_auth::Claim;
use guichet_core::UserId;

/// Actor context for a request (authenticated identity + role).
///
/// Injected by the auth middleware and must be present for all protected
/// routes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ActorContext {
    claim: Claim,
}

impl ActorContext {
    pub fn new(claim: Claim) -> Self {
        Self { claim }
    }

    pub fn claim(&self) -> &Claim {
        &self.claim
    }

    pub fn user_id(&self) -> UserId {
        self.claim.user_id
    }

    pub fn is_agent(&self) -> bool {
        self.claim.role.is_agent()
    }
}
