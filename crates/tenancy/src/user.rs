use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tenantdesk_auth::{Field, FieldMask, Role};
use tenantdesk_core::{DomainError, DomainResult, Entity, TenantId, UserId, validate};

/// User account.
///
/// `tenant_id` is `None` exactly for super admins and never changes.
/// The password hash is never serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub tenant_id: Option<TenantId>,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub full_name: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        tenant_id: Option<TenantId>,
        new: NewUser,
        password_hash: String,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if new.role.is_tenant_scoped() != tenant_id.is_some() {
            return Err(DomainError::validation(
                "only super admins exist outside a tenant",
            ));
        }
        Ok(Self {
            id: UserId::new(),
            tenant_id,
            email: new.email,
            password_hash,
            full_name: new.full_name,
            role: new.role,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply(&mut self, patch: UserPatch, now: DateTime<Utc>) {
        if let Some(full_name) = patch.full_name {
            self.full_name = full_name;
        }
        if let Some(role) = patch.role {
            self.role = role;
        }
        if let Some(is_active) = patch.is_active {
            self.is_active = is_active;
        }
        self.updated_at = now;
    }
}

impl Entity for User {
    type Id = UserId;
    const ENTITY_TYPE: &'static str = "user";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Input for a new account; the plaintext password is hashed by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub full_name: String,
    #[serde(default = "default_role")]
    pub role: Role,
}

fn default_role() -> Role {
    Role::User
}

impl NewUser {
    pub fn validate(self) -> DomainResult<Self> {
        validate::password(&self.password)?;
        Ok(Self {
            email: validate::email(&self.email)?,
            full_name: validate::required_text("fullName", &self.full_name)?,
            password: self.password,
            role: self.role,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    pub full_name: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

impl UserPatch {
    pub fn fields(&self) -> FieldMask {
        let mut mask = FieldMask::EMPTY;
        if self.full_name.is_some() {
            mask.insert(Field::FullName);
        }
        if self.role.is_some() {
            mask.insert(Field::Role);
        }
        if self.is_active.is_some() {
            mask.insert(Field::IsActive);
        }
        mask
    }

    pub fn validate(mut self) -> DomainResult<Self> {
        if let Some(name) = &self.full_name {
            self.full_name = Some(validate::required_text("fullName", name)?);
        }
        Ok(self)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UserFilter {
    pub role: Option<Role>,
    /// Case-insensitive substring of email or full name.
    pub search: Option<String>,
}

impl UserFilter {
    pub fn matches(&self, user: &User) -> bool {
        if self.role.is_some_and(|r| r != user.role) {
            return false;
        }
        match &self.search {
            Some(q) => {
                let q = q.to_lowercase();
                user.email.contains(&q) || user.full_name.to_lowercase().contains(&q)
            }
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(role: Role) -> NewUser {
        NewUser {
            email: "Bob@Acme.com".into(),
            password: "Secret123".into(),
            full_name: " Bob ".into(),
            role,
        }
        .validate()
        .unwrap()
    }

    #[test]
    fn password_hash_never_serialized() {
        let user = User::new(Some(TenantId::new()), new_user(Role::User), "$argon2id$x".into(), Utc::now())
            .unwrap();
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["email"], "bob@acme.com");
        assert_eq!(json["fullName"], "Bob");
        assert_eq!(json["role"], "user");
    }

    #[test]
    fn role_and_tenant_binding_must_agree() {
        assert!(User::new(None, new_user(Role::User), String::new(), Utc::now()).is_err());
        assert!(User::new(Some(TenantId::new()), new_user(Role::SuperAdmin), String::new(), Utc::now()).is_err());
        assert!(User::new(None, new_user(Role::SuperAdmin), String::new(), Utc::now()).is_ok());
    }

    #[test]
    fn role_defaults_to_user() {
        let n: NewUser = serde_json::from_value(serde_json::json!({
            "email": "c@acme.com", "password": "Secret123", "fullName": "C"
        }))
        .unwrap();
        assert_eq!(n.role, Role::User);
    }

    #[test]
    fn patch_reports_touched_fields() {
        let p = UserPatch { role: Some(Role::TenantAdmin), is_active: Some(false), ..Default::default() };
        assert_eq!(p.fields(), FieldMask::of(&[Field::Role, Field::IsActive]));
    }
}
