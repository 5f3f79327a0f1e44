use tenantdesk_auth::Claims;
use tenantdesk_infra::Caller;

/// Principal context for a request (verified token claims + client address).
///
/// Inserted by the auth middleware; present on every protected route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    claims: Claims,
    ip: Option<String>,
}

impl PrincipalContext {
    pub fn new(claims: Claims, ip: Option<String>) -> Self {
        Self { claims, ip }
    }

    pub fn claims(&self) -> &Claims {
        &self.claims
    }

    pub fn caller(&self) -> Caller {
        Caller::new(self.claims, self.ip.clone())
    }
}
