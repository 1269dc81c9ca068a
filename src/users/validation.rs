use lazy_static::lazy_static;
use regex::Regex;

use super::dto::RegisterRequest;
use crate::error::ApiError;

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[\w.+-]+@[\w-]+(\.[\w-]+)*\.\w+$").unwrap();
    static ref MOBILE_RE: Regex = Regex::new(r"^[0-9]{10}$").unwrap();
}

pub const MIN_PASSWORD_LEN: usize = 8;

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub fn is_valid_mobile_number(mobile_number: &str) -> bool {
    MOBILE_RE.is_match(mobile_number)
}

/// Presence check, in the order fields are reported.
pub fn check_required(req: &RegisterRequest) -> Result<(), ApiError> {
    let fields = [
        ("name", req.name.as_str(), "Name cannot be empty"),
        ("email", req.email.as_str(), "Email cannot be empty"),
        ("mobile_number", req.mobile_number.as_str(), "Mobile number cannot be empty"),
        ("city", req.city.as_str(), "City cannot be empty"),
        ("password", req.password.as_str(), "Password cannot be empty"),
    ];
    match fields.iter().find(|(_, value, _)| value.trim().is_empty()) {
        Some((field, _, message)) => Err(ApiError::validation(*field, *message)),
        None => Ok(()),
    }
}

pub fn check_mobile_number(mobile_number: &str) -> Result<(), ApiError> {
    if !is_valid_mobile_number(mobile_number) {
        return Err(ApiError::validation("mobile_number", "Mobile number must be 10 digits"));
    }
    Ok(())
}

pub fn check_password_strength(password: &str) -> Result<(), ApiError> {
    let problem = if password.chars().count() < MIN_PASSWORD_LEN {
        Some("Password must be at least 8 characters long")
    } else if !password.chars().any(|c| c.is_ascii_uppercase()) {
        Some("Password must contain at least one uppercase letter")
    } else if !password.chars().any(|c| c.is_ascii_lowercase()) {
        Some("Password must contain at least one lowercase letter")
    } else if !password.chars().any(|c| c.is_ascii_digit()) {
        Some("Password must contain at least one number")
    } else {
        None
    };
    match problem {
        Some(message) => Err(ApiError::validation("password", message)),
        None => Ok(()),
    }
}

pub fn check_confirm_password(password: &str, confirm: Option<&str>) -> Result<(), ApiError> {
    match confirm {
        Some(c) if c != password => {
            Err(ApiError::validation("confirm_password", "Passwords do not match"))
        }
        _ => Ok(()),
    }
}
