// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client-side registration form validation.
//!
//! Every rule is checked so one submission reports all problems at once.
//! Email uniqueness is the backend's business and is not checked here.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Minimum password length, in characters.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Registration form contents. Never persisted.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationInput {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl fmt::Debug for RegistrationInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationInput")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Form field an error is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RegistrationField {
    FirstName,
    LastName,
    Email,
    Password,
    ConfirmPassword,
}

impl RegistrationField {
    /// Field name as the form knows it.
    pub fn as_str(self) -> &'static str {
        match self {
            RegistrationField::FirstName => "firstName",
            RegistrationField::LastName => "lastName",
            RegistrationField::Email => "email",
            RegistrationField::Password => "password",
            RegistrationField::ConfirmPassword => "confirmPassword",
        }
    }
}

impl fmt::Display for RegistrationField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field → message. Empty means valid.
pub type FieldErrors = BTreeMap<RegistrationField, &'static str>;

/// Loose `local@domain.tld` shape; the backend has the final say.
fn looks_like_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"\S+@\S+\.\S+").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Validate a registration form.
pub fn validate_registration(input: &RegistrationInput) -> FieldErrors {
    let mut errors = FieldErrors::new();

    if input.first_name.trim().is_empty() {
        errors.insert(RegistrationField::FirstName, "First name is required");
    }

    if input.last_name.trim().is_empty() {
        errors.insert(RegistrationField::LastName, "Last name is required");
    }

    if input.email.trim().is_empty() {
        errors.insert(RegistrationField::Email, "Email is required");
    } else if !looks_like_email(&input.email) {
        errors.insert(RegistrationField::Email, "Email is invalid");
    }

    if input.password.is_empty() {
        errors.insert(RegistrationField::Password, "Password is required");
    } else if input.password.chars().count() < MIN_PASSWORD_LEN {
        errors.insert(
            RegistrationField::Password,
            "Password must be at least 8 characters",
        );
    }

    if input.password != input.confirm_password {
        errors.insert(RegistrationField::ConfirmPassword, "Passwords do not match");
    }

    errors
}
