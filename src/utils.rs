// Utility helpers

use crate::{
    constants::{CREATORS_PAGE_MAX_LIMIT, CREATOR_HANDLE_MAX_LEN},
    error::{AppError, Result},
};

/// Canonical form of a creator handle: no surrounding whitespace, no leading `@`, lowercase.
pub fn normalize_handle(raw: &str) -> String {
    raw.trim().trim_start_matches('@').to_ascii_lowercase()
}

/// Normalizes and checks a handle against the platform's username rules.
pub fn validate_handle(raw: &str) -> Result<String> {
    let handle = normalize_handle(raw);
    if handle.is_empty() {
        return Err(AppError::BadRequest("Handle cannot be empty".into()));
    }
    if handle.len() > CREATOR_HANDLE_MAX_LEN {
        return Err(AppError::BadRequest(format!(
            "Handle longer than {} characters",
            CREATOR_HANDLE_MAX_LEN
        )));
    }
    if !handle
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(AppError::BadRequest(
            "Handle may only contain letters, digits and underscores".into(),
        ));
    }
    Ok(handle)
}

/// Basic guard for list/query limits to avoid expensive queries.
pub fn ensure_page_limit(limit: i32) -> Result<()> {
    if limit <= 0 || limit > CREATORS_PAGE_MAX_LIMIT {
        return Err(AppError::BadRequest(format!(
            "limit must be between 1 and {}",
            CREATORS_PAGE_MAX_LIMIT
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_at_and_case() {
        assert_eq!(normalize_handle("@Vitalik"), "vitalik");
        assert_eq!(normalize_handle("  vitalik "), "vitalik");
        assert_eq!(normalize_handle("@@vitalik"), "vitalik");
    }

    #[test]
    fn validate_rejects_bad_handles() {
        assert!(validate_handle("@").is_err());
        assert!(validate_handle("has space").is_err());
        assert!(validate_handle("a_very_long_handle_name").is_err());
        assert_eq!(validate_handle("@Good_Name1").unwrap(), "good_name1");
    }

    #[test]
    fn page_limit_bounds() {
        assert!(ensure_page_limit(0).is_err());
        assert!(ensure_page_limit(CREATORS_PAGE_MAX_LIMIT + 1).is_err());
        assert!(ensure_page_limit(20).is_ok());
    }
}
