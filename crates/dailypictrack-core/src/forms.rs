//! Login and signup form validation.

use thiserror::Error;

use crate::api::ApiError;

/// Minimum password length accepted by the signup and login forms
pub const MIN_PASSWORD_LEN: usize = 6;

pub const LOGIN_FAILED: &str = "Login failed. Please try again.";
pub const SIGNUP_FAILED: &str = "Registration failed. Please try again.";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    #[error("Full name is required")]
    NameRequired,

    #[error("Email address is required")]
    EmailRequired,

    #[error("Please enter a valid email address")]
    InvalidEmail,

    #[error("Password is required")]
    PasswordRequired,

    #[error("Password must be at least {} characters", MIN_PASSWORD_LEN)]
    PasswordTooShort,
}

fn validate_email(email: &str) -> Result<(), FormError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(FormError::EmailRequired);
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => {
            Ok(())
        }
        _ => Err(FormError::InvalidEmail),
    }
}

fn validate_password(password: &str) -> Result<(), FormError> {
    if password.is_empty() {
        Err(FormError::PasswordRequired)
    } else if password.chars().count() < MIN_PASSWORD_LEN {
        Err(FormError::PasswordTooShort)
    } else {
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    pub fn validate(&self) -> Result<(), FormError> {
        validate_email(&self.email)?;
        validate_password(&self.password)
    }

    pub fn email(&self) -> &str {
        self.email.trim()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SignupForm {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl SignupForm {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            password: password.into(),
        }
    }

    pub fn validate(&self) -> Result<(), FormError> {
        if self.name.trim().is_empty() {
            return Err(FormError::NameRequired);
        }
        validate_email(&self.email)?;
        validate_password(&self.password)
    }

    pub fn name(&self) -> &str {
        self.name.trim()
    }

    pub fn email(&self) -> &str {
        self.email.trim()
    }
}

/// Message to show after a failed login: the server's explanation, else
/// the error itself.
pub fn login_failure_message(err: &ApiError) -> String {
    match err.server_message() {
        Some(message) => message.to_string(),
        None => {
            let text = err.to_string();
            if text.is_empty() {
                LOGIN_FAILED.to_string()
            } else {
                text
            }
        }
    }
}

/// Message to show after a failed signup
pub fn signup_failure_message(err: &ApiError) -> String {
    err.server_message()
        .map(str::to_string)
        .unwrap_or_else(|| SIGNUP_FAILED.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_login_form_validation() {
        assert!(LoginForm::new("ada@example.com", "secret1").validate().is_ok());
        assert_eq!(
            LoginForm::new("", "secret1").validate(),
            Err(FormError::EmailRequired)
        );
        assert_eq!(
            LoginForm::new("ada.example.com", "secret1").validate(),
            Err(FormError::InvalidEmail)
        );
        assert_eq!(
            LoginForm::new("ada@example.com", "").validate(),
            Err(FormError::PasswordRequired)
        );
        assert_eq!(
            LoginForm::new("ada@example.com", "12345").validate(),
            Err(FormError::PasswordTooShort)
        );
    }

    #[test]
    fn test_signup_form_validation() {
        assert!(SignupForm::new("Ada", "ada@example.com", "secret1").validate().is_ok());
        assert_eq!(
            SignupForm::new("   ", "ada@example.com", "secret1").validate(),
            Err(FormError::NameRequired)
        );
        assert_eq!(
            SignupForm::new("Ada", "@example.com", "secret1").validate(),
            Err(FormError::InvalidEmail)
        );
    }

    #[test]
    fn test_trimmed_accessors() {
        let form = SignupForm::new("  Ada ", " ada@example.com ", "secret1");
        assert_eq!(form.name(), "Ada");
        assert_eq!(form.email(), "ada@example.com");
    }

    #[test]
    fn test_failure_messages() {
        let rejected = ApiError::from_status(
            StatusCode::UNAUTHORIZED,
            r#"{"message":"Invalid credentials"}"#,
        );
        assert_eq!(login_failure_message(&rejected), "Invalid credentials");
        assert_eq!(login_failure_message(&ApiError::MissingToken), "No token received");
        assert_eq!(signup_failure_message(&ApiError::MissingToken), SIGNUP_FAILED);
    }
}
