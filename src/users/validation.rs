//! Field validators for user records.
//!
//! Every rule runs against the whole draft and all failures are collected, so
//! a caller gets one error per offending field instead of stopping at the first.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::fmt;

use super::{password::MAX_PASSWORD_BYTES, pipeline::Draft};

pub const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    #[cfg(test)]
    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the message recorded for `field`, if any.
    #[cfg(test)]
    pub fn for_field(&self, field: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(FieldError::new(field, message));
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for e in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", e.field, e.message)?;
            first = false;
        }
        Ok(())
    }
}

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    static ref USERNAME_RE: Regex = Regex::new(r"^[A-Za-z][A-Za-z0-9_-]{3,23}$").unwrap();
    static ref MOBILE_ID_RE: Regex = Regex::new(r"^(\+62|62|0)8[1-9][0-9]{7,10}$").unwrap();
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub fn is_valid_username(username: &str) -> bool {
    USERNAME_RE.is_match(username)
}

pub fn is_alphabetic_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(char::is_alphabetic)
}

pub fn is_mobile_phone(phone: &str) -> bool {
    MOBILE_ID_RE.is_match(phone)
}

/// Upper, lower, digit and a symbol from the ASCII punctuation set (space counts too).
pub fn is_strong_password(password: &str) -> bool {
    let mut lower = false;
    let mut upper = false;
    let mut digit = false;
    let mut symbol = false;
    for c in password.chars() {
        lower |= c.is_lowercase();
        upper |= c.is_uppercase();
        digit |= c.is_ascii_digit();
        symbol |= c.is_ascii_punctuation() || c == ' ' || c == '£';
    }
    password.chars().count() >= MIN_PASSWORD_LENGTH && lower && upper && digit && symbol
}

/// Runs every field rule against an already-normalized draft.
pub fn validate(draft: &Draft) -> Result<(), ValidationErrors> {
    let user = draft.user();
    let mut errors = ValidationErrors::default();

    if user.email.is_empty() {
        errors.push("email", "Please provide an email address");
    } else if !is_valid_email(&user.email) {
        errors.push("email", "Please provide a valid email address");
    }

    if user.username.is_empty() {
        errors.push("username", "Please provide a username");
    } else if !is_valid_username(&user.username) {
        errors.push(
            "username",
            "Username must start with a letter and be 4 to 24 characters long; \
             letters, digits, hyphens and underscores are allowed",
        );
    }

    if user.first_name.is_empty() {
        errors.push("firstName", "Please provide a first name");
    } else if !is_alphabetic_name(&user.first_name) {
        errors.push("firstName", "First name must be alphabetic");
    }

    if user.last_name.is_empty() {
        errors.push("lastName", "Please provide a last name");
    } else if !is_alphabetic_name(&user.last_name) {
        errors.push("lastName", "Last name must be alphabetic");
    }

    match draft.password() {
        None if draft.is_new() => errors.push("password", "Please provide a password"),
        None => {}
        Some(password) => {
            if password.chars().count() < MIN_PASSWORD_LENGTH {
                errors.push(
                    "password",
                    format!("Password must be at least {MIN_PASSWORD_LENGTH} characters"),
                );
            } else if password.len() > MAX_PASSWORD_BYTES {
                errors.push(
                    "password",
                    format!("Password must be at most {MAX_PASSWORD_BYTES} bytes long"),
                );
            } else if !is_strong_password(password) {
                errors.push(
                    "password",
                    "Password must contain at least 1 lowercase, 1 uppercase, 1 number \
                     and 1 special character",
                );
            }

            match draft.password_confirm() {
                None | Some("") => {
                    errors.push("passwordConfirm", "Please confirm your password")
                }
                Some(confirm) if confirm != password => {
                    errors.push("passwordConfirm", "Passwords do not match")
                }
                Some(_) => {}
            }
        }
    }

    if let Some(phone) = user.phone_number.as_deref() {
        if !is_mobile_phone(phone) {
            errors.push(
                "phoneNumber",
                "Please provide a valid Indonesian mobile number, e.g. +6281234567890",
            );
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
