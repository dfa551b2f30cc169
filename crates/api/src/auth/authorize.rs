//! Role-based authorization
//!
//! Pure allow-list check layered on top of the authentication middleware by
//! handlers that need elevated privilege (uploads, category creation).

use crate::error::ApiError;

pub const ROLE_USER: &str = "user";
pub const ROLE_ADMIN: &str = "admin";

/// Succeed iff `role` is a member of `allowed`.
pub fn authorize(role: &str, allowed: &[&str]) -> Result<(), ApiError> {
    if allowed.contains(&role) {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn member_of_allow_list_passes() {
        assert!(authorize(ROLE_ADMIN, &[ROLE_ADMIN]).is_ok());
        assert!(authorize(ROLE_USER, &[ROLE_USER, ROLE_ADMIN]).is_ok());
    }

    #[test]
    fn non_member_is_forbidden() {
        assert!(matches!(
            authorize(ROLE_USER, &[ROLE_ADMIN]),
            Err(ApiError::Forbidden)
        ));
    }

    #[test]
    fn match_is_exact() {
        assert!(authorize("Admin", &[ROLE_ADMIN]).is_err());
        assert!(authorize("", &[ROLE_ADMIN]).is_err());
    }
}
