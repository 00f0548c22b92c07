//! Common validation utilities.

use validator::ValidationError;

/// Maximum threshold accepted for `days_before` / `days_after` (one year).
pub const MAX_THRESHOLD_DAYS: i32 = 365;

/// Validates that a string contains at least one non-whitespace character.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Value must not be blank".into());
        Err(err)
    } else {
        Ok(())
    }
}

/// Validates that a day threshold is within 0..=365.
pub fn validate_threshold_days(days: i32) -> Result<(), ValidationError> {
    if (0..=MAX_THRESHOLD_DAYS).contains(&days) {
        Ok(())
    } else {
        let mut err = ValidationError::new("threshold_range");
        err.message = Some("Day threshold must be between 0 and 365".into());
        Err(err)
    }
}

/// Validates an action URL template.
///
/// Empty is allowed (no action). Otherwise the template must be an
/// application-relative path or an absolute http(s) URL; placeholders are
/// allowed anywhere after the prefix.
pub fn validate_action_url(url: &str) -> Result<(), ValidationError> {
    if url.is_empty()
        || url.starts_with('/')
        || url.starts_with("https://")
        || url.starts_with("http://")
    {
        Ok(())
    } else {
        let mut err = ValidationError::new("action_url");
        err.message = Some("Action URL must be empty, a relative path or an http(s) URL".into());
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_not_blank() {
        assert!(validate_not_blank("Task due").is_ok());
        assert!(validate_not_blank("").is_err());
        assert!(validate_not_blank("   \t").is_err());
    }

    #[test]
    fn test_validate_not_blank_error_message() {
        let err = validate_not_blank(" ").unwrap_err();
        assert_eq!(err.message.unwrap().to_string(), "Value must not be blank");
    }

    #[test]
    fn test_validate_threshold_days() {
        assert!(validate_threshold_days(0).is_ok());
        assert!(validate_threshold_days(7).is_ok());
        assert!(validate_threshold_days(365).is_ok());
        assert!(validate_threshold_days(-1).is_err());
        assert!(validate_threshold_days(366).is_err());
    }

    #[test]
    fn test_validate_action_url() {
        assert!(validate_action_url("").is_ok());
        assert!(validate_action_url("/tasks/{entityId}").is_ok());
        assert!(validate_action_url("https://crm.example.com/quotes/{entityId}").is_ok());
        assert!(validate_action_url("javascript:alert(1)").is_err());
        assert!(validate_action_url("tasks/{entityId}").is_err());
    }
}
