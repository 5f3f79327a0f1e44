//! Input-shape checks shared by the record types.

use crate::error::{DomainError, DomainResult};

pub const MAX_TEXT_LEN: usize = 255;
pub const MIN_PASSWORD_LEN: usize = 8;

/// Trimmed, non-empty, at most [`MAX_TEXT_LEN`] characters.
pub fn required_text(field: &str, value: &str) -> DomainResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(format!("{field} is required")));
    }
    if trimmed.chars().count() > MAX_TEXT_LEN {
        return Err(DomainError::validation(format!(
            "{field} must be at most {MAX_TEXT_LEN} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Lowercased email with a single `@`, non-empty local part and dotted domain.
pub fn email(value: &str) -> DomainResult<String> {
    let normalized = value.trim().to_ascii_lowercase();
    let invalid = || DomainError::validation("email is invalid");

    let (local, domain) = normalized.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') || normalized.len() > MAX_TEXT_LEN {
        return Err(invalid());
    }
    let mut labels = domain.split('.');
    let dotted = domain.contains('.') && labels.all(|l| !l.is_empty());
    if !dotted || normalized.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    Ok(normalized)
}

/// Lowercased subdomain: 3-63 chars of `[a-z0-9-]`, no leading/trailing `-`.
pub fn subdomain(value: &str) -> DomainResult<String> {
    let s = value.trim().to_ascii_lowercase();
    let ok_len = (3..=63).contains(&s.len());
    let ok_chars = s
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if !ok_len || !ok_chars || s.starts_with('-') || s.ends_with('-') {
        return Err(DomainError::validation(
            "subdomain must be 3-63 characters of a-z, 0-9 or '-' and not start or end with '-'",
        ));
    }
    Ok(s)
}

pub fn password(value: &str) -> DomainResult<()> {
    if value.chars().count() < MIN_PASSWORD_LEN {
        return Err(DomainError::validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

pub fn positive_limit(field: &str, value: i32) -> DomainResult<i32> {
    if value < 1 {
        return Err(DomainError::validation(format!("{field} must be at least 1")));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_is_trimmed_and_bounded() {
        assert_eq!(required_text("name", "  Acme ").unwrap(), "Acme");
        assert!(required_text("name", "   ").is_err());
        assert!(required_text("name", &"x".repeat(256)).is_err());
    }

    #[test]
    fn email_shapes() {
        assert_eq!(email("A@Acme.COM").unwrap(), "a@acme.com");
        for bad in ["", "a", "@acme.com", "a@acme", "a@@acme.com", "a@acme.", "a b@acme.com"] {
            assert!(email(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn subdomain_shapes() {
        assert_eq!(subdomain("Acme").unwrap(), "acme");
        assert!(subdomain("my-co-2").is_ok());
        for bad in ["ab", "-acme", "acme-", "ac_me", "ac.me"] {
            assert!(subdomain(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn password_minimum_length() {
        assert!(password("Secret123").is_ok());
        assert!(password("short").is_err());
    }
}
