use serde::Deserialize;

use tenantdesk_core::{DomainResult, validate};

/// Self-service signup: a tenant plus its first `tenant_admin`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub name: String,
    pub subdomain: String,
    pub admin_email: String,
    pub admin_password: String,
    pub admin_full_name: String,
}

impl Registration {
    /// Normalize (trim, lowercase) and validate every field.
    pub fn validate(self) -> DomainResult<Self> {
        validate::password(&self.admin_password)?;
        Ok(Self {
            name: validate::required_text("name", &self.name)?,
            subdomain: validate::subdomain(&self.subdomain)?,
            admin_email: validate::email(&self.admin_email)?,
            admin_full_name: validate::required_text("adminFullName", &self.admin_full_name)?,
            admin_password: self.admin_password,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Registration {
        serde_json::from_value(serde_json::json!({
            "name": "Acme",
            "subdomain": "Acme",
            "adminEmail": "A@Acme.com",
            "adminPassword": "Secret123",
            "adminFullName": "A"
        }))
        .unwrap()
    }

    #[test]
    fn normalizes_subdomain_and_email() {
        let r = sample().validate().unwrap();
        assert_eq!(r.subdomain, "acme");
        assert_eq!(r.admin_email, "a@acme.com");
    }

    #[test]
    fn rejects_short_password() {
        let mut r = sample();
        r.admin_password = "short".into();
        assert!(r.validate().is_err());
    }
}
