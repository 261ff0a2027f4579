//! Submitted HTML forms and their field checks.
//!
//! Every struct defaults missing fields to empty strings so a short post
//! reaches validation instead of failing extraction.

use crate::validation::{validate_email, validate_password, validate_username};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Field name to first error message.
#[derive(Debug, Default, Clone)]
pub struct FormErrors(BTreeMap<&'static str, String>);

impl FormErrors {
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_insert_with(|| message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn check(&mut self, field: &'static str, result: Result<(), &'static str>) {
        if let Err(message) = result {
            self.add(field, message);
        }
    }

    fn require(&mut self, field: &'static str, value: &str) {
        if value.is_empty() {
            self.add(field, "This field is required.");
        }
    }

    fn check_match(&mut self, field: &'static str, password: &str, confirm: &str) {
        self.require(field, confirm);
        if password != confirm {
            self.add("password", "Passwords must match.");
        }
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    pub remember_me: Option<String>,
    pub csrf_token: String,
}

impl LoginForm {
    pub fn remember(&self) -> bool {
        self.remember_me.is_some()
    }

    pub fn validate(&self) -> FormErrors {
        let mut errors = FormErrors::default();
        errors.check("email", validate_email(self.email.trim()));
        errors.require("password", &self.password);
        errors
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct RegistrationForm {
    pub email: String,
    pub username: String,
    pub password: String,
    pub password2: String,
    pub csrf_token: String,
}

impl RegistrationForm {
    pub fn validate(&self) -> FormErrors {
        let mut errors = FormErrors::default();
        errors.check("email", validate_email(self.email.trim()));
        errors.check("username", validate_username(&self.username));
        errors.check("password", validate_password(&self.password));
        errors.check_match("password2", &self.password, &self.password2);
        errors
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ChangePasswordForm {
    pub old_password: String,
    pub password: String,
    pub password2: String,
    pub csrf_token: String,
}

impl ChangePasswordForm {
    pub fn validate(&self) -> FormErrors {
        let mut errors = FormErrors::default();
        errors.require("old_password", &self.old_password);
        errors.check("password", validate_password(&self.password));
        errors.check_match("password2", &self.password, &self.password2);
        errors
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct PasswordResetRequestForm {
    pub email: String,
    pub csrf_token: String,
}

impl PasswordResetRequestForm {
    pub fn validate(&self) -> FormErrors {
        let mut errors = FormErrors::default();
        errors.check("email", validate_email(self.email.trim()));
        errors
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct PasswordResetForm {
    pub password: String,
    pub password2: String,
    pub csrf_token: String,
}

impl PasswordResetForm {
    pub fn validate(&self) -> FormErrors {
        let mut errors = FormErrors::default();
        errors.check("password", validate_password(&self.password));
        errors.check_match("password2", &self.password, &self.password2);
        errors
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ChangeEmailForm {
    pub email: String,
    pub password: String,
    pub csrf_token: String,
}

impl ChangeEmailForm {
    pub fn validate(&self) -> FormErrors {
        let mut errors = FormErrors::default();
        errors.check("email", validate_email(self.email.trim()));
        errors.require("password", &self.password);
        errors
    }
}
