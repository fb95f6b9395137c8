//! Registration and login payloads.

use crate::{
    models::user::{NewUser, User},
    validation::{self, Field, ValidationErrors},
};
use serde::{Deserialize, Serialize};
use validator::ValidateEmail;

const USERNAME_MAX: usize = 150;

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct RegisterInput {
    pub username: Field<String>,
    pub email: Field<String>,
    pub password: Field<String>,
    pub password_confirmation: Field<String>,
}

impl RegisterInput {
    /// Field checks that need no database. Email uniqueness is checked by
    /// the account service.
    pub fn validate(self) -> Result<NewUser, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let username = validation::require_text(&mut errors, "username", self.username);
        validation::max_length(&mut errors, "username", &username, USERNAME_MAX);
        if !username.is_empty()
            && !username
                .chars()
                .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
        {
            errors.add(
                "username",
                "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
            );
        }

        let email = validation::require_text(&mut errors, "email", self.email);
        if !email.is_empty() && !email.validate_email() {
            errors.add("email", "Enter a valid email address.");
        }

        let password = validation::require_text(&mut errors, "password", self.password);
        let confirmation = validation::require_text(
            &mut errors,
            "password_confirmation",
            self.password_confirmation,
        );
        if !password.is_empty() && !confirmation.is_empty() && password != confirmation {
            errors.add("password_confirmation", "Passwords do not match.");
        }

        errors.into_result()?;
        Ok(NewUser {
            username,
            email,
            password,
        })
    }
}

/// What registration echoes back. Password fields are write-only.
#[derive(Debug, Clone, Serialize)]
pub struct RegisteredUser {
    pub username: String,
    pub email: String,
}

impl From<User> for RegisteredUser {
    fn from(user: User) -> Self {
        Self {
            username: user.username,
            email: user.email,
        }
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct LoginInput {
    pub username: Field<String>,
    pub password: Field<String>,
}

impl LoginInput {
    pub fn validate(self) -> Result<(String, String), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let username = validation::require_text(&mut errors, "username", self.username);
        let password = validation::require_text(&mut errors, "password", self.password);
        errors.into_result()?;
        Ok((username, password))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenOut {
    pub token: String,
}
