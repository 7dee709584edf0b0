pub mod allowance;
pub mod analytics;
pub mod company_settings;
pub mod leave_request;
pub mod leave_type;
pub mod policy;
pub mod team;

use crate::error::{ApiError, ApiResult};

/// Path ids arrive as text so a malformed id gets a readable 400.
pub(crate) fn parse_id(raw: &str, message: &'static str) -> ApiResult<u64> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| ApiError::bad_request(message))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_must_be_numeric() {
        assert_eq!(parse_id("42", "Invalid request ID").unwrap(), 42);
        assert_eq!(
            parse_id("abc", "Invalid request ID").unwrap_err().to_string(),
            "Invalid request ID"
        );
        assert!(parse_id("-1", "Invalid request ID").is_err());
    }
}
