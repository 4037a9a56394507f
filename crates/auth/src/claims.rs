use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use guichet_core::{Role, UserId};

/// The authenticated identity + role, passed explicitly into every core
/// operation. Never cached, never ambient.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Claim {
    pub user_id: UserId,
    pub role: Role,
}

impl Claim {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }
}

/// Wire-level JWT claims. Timestamps are unix seconds so the standard
/// `exp` validation applies when the token is decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject: the user id.
    pub sub: UserId,

    /// Role granted to the subject.
    pub role: Role,

    /// Issued-at (unix seconds).
    pub iat: i64,

    /// Expiration (unix seconds).
    pub exp: i64,
}

impl JwtClaims {
    pub fn issue(claim: &Claim, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            sub: claim.user_id,
            role: claim.role,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        }
    }

    pub fn to_claim(&self) -> Claim {
        Claim::new(self.sub, self.role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_claims_carry_subject_and_role() {
        let claim = Claim::new(UserId::new(), Role::Agent);
        let now = Utc::now();
        let jwt = JwtClaims::issue(&claim, now, Duration::minutes(30));

        assert_eq!(jwt.sub, claim.user_id);
        assert_eq!(jwt.role, Role::Agent);
        assert_eq!(jwt.exp - jwt.iat, 30 * 60);
        assert_eq!(jwt.to_claim(), claim);
    }
}
