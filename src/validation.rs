//! Field rules shared by the web forms and the user service.

use once_cell::sync::Lazy;
use regex::Regex;

pub const MAX_FIELD_LENGTH: usize = 64;
pub const MIN_PASSWORD_LENGTH: usize = 8;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid")
});

static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_.]*$").expect("username pattern is valid"));

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn validate_email(email: &str) -> Result<(), &'static str> {
    if email.is_empty() {
        return Err("This field is required.");
    }
    if email.chars().count() > MAX_FIELD_LENGTH {
        return Err("Field must be between 1 and 64 characters long.");
    }
    if !EMAIL_RE.is_match(email) {
        return Err("Invalid email address.");
    }
    Ok(())
}

pub fn validate_username(username: &str) -> Result<(), &'static str> {
    if username.is_empty() {
        return Err("This field is required.");
    }
    if username.chars().count() > MAX_FIELD_LENGTH {
        return Err("Field must be between 1 and 64 characters long.");
    }
    if !USERNAME_RE.is_match(username) {
        return Err("Usernames must have only letters, numbers, dots or underscores");
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), &'static str> {
    if password.is_empty() {
        return Err("This field is required.");
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err("Password must be at least 8 characters.");
    }
    Ok(())
}
