use lazy_static::lazy_static;
use regex::Regex;

use crate::{config::AccountPolicy, error::ApiError};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(
            r#"^(([^<>()\[\]\\.,;:\s@"]+(\.[^<>()\[\]\\.,;:\s@"]+)*)|(".+"))@((\[[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\])|(([a-zA-Z\-0-9]+\.)+[a-zA-Z]{2,}))$"#
        )
        .unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub(crate) fn check_password(policy: &AccountPolicy, password: &str) -> Result<(), ApiError> {
    let len = password.chars().count();
    if len < policy.password_min_len {
        return Err(ApiError::validation(format!(
            "Password must be at least {} characters",
            policy.password_min_len
        )));
    }
    if len > policy.password_max_len {
        return Err(ApiError::validation(format!(
            "Password must not be more than {} characters",
            policy.password_max_len
        )));
    }
    Ok(())
}

pub(crate) fn check_bio(policy: &AccountPolicy, bio: &str) -> Result<(), ApiError> {
    if bio.chars().count() > policy.bio_max_len {
        return Err(ApiError::validation(format!(
            "Bio must not exceed {} characters",
            policy.bio_max_len
        )));
    }
    Ok(())
}

/// Trimmed value, or `None` when blank.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
