//! Client-side form validation.
//!
//! Pure and network-free: a form that fails here is never sent to the
//! server. Field constraints mirror the registration and review forms.

use std::fmt;

use crate::models::RegisterStudent;

/// One or more fields that failed validation, in form order.
#[derive(Debug, Clone)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

#[derive(Debug, Clone)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

impl ValidationErrors {
    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.iter()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}: {}", err.field, err.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

struct Collector {
    errors: Vec<FieldError>,
}

impl Collector {
    fn new() -> Self {
        Self { errors: Vec::new() }
    }

    fn require(&mut self, ok: bool, field: &'static str, message: &'static str) {
        if !ok {
            self.errors.push(FieldError { field, message });
        }
    }

    fn finish(self) -> Result<(), ValidationErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors {
                errors: self.errors,
            })
        }
    }
}

/// Loose shape check matching what the registration form accepts: something
/// before the `@`, and a domain with a dot in it.
fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

/// Validate a registration form before it is submitted.
pub fn validate_registration(form: &RegisterStudent) -> Result<(), ValidationErrors> {
    let mut check = Collector::new();
    check.require(
        form.username.chars().count() >= 3,
        "username",
        "Username must be at least 3 characters",
    );
    check.require(
        is_plausible_email(&form.email),
        "email",
        "Invalid email address",
    );
    check.require(
        form.password.chars().count() >= 6,
        "password",
        "Password must be at least 6 characters",
    );
    check.require(
        form.password2.chars().count() >= 6,
        "password2",
        "Password must be at least 6 characters",
    );
    if form.password2.chars().count() >= 6 {
        check.require(
            form.password == form.password2,
            "password2",
            "Passwords do not match",
        );
    }
    check.finish()
}

/// Validate an event review before it is submitted.
pub fn validate_review(rating: u8, comment: &str) -> Result<(), ValidationErrors> {
    let mut check = Collector::new();
    check.require(
        (1..=5).contains(&rating),
        "rating",
        "Rating must be between 1 and 5",
    );
    check.require(
        comment.trim().chars().count() >= 5,
        "comment",
        "Please provide a longer comment",
    );
    check.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_form() -> RegisterStudent {
        RegisterStudent {
            username: "ada".to_string(),
            email: "ada@uni.edu".to_string(),
            password: "secret1".to_string(),
            password2: "secret1".to_string(),
            faculty: Some("Computer Science".to_string()),
            speciality: None,
        }
    }

    #[test]
    fn test_valid_registration_passes() {
        assert!(validate_registration(&valid_form()).is_ok());
    }

    #[test]
    fn test_short_username_rejected() {
        let mut form = valid_form();
        form.username = "ab".to_string();
        let errors = validate_registration(&form).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.iter().next().unwrap().field, "username");
    }

    #[test]
    fn test_email_shapes() {
        let mut form = valid_form();
        for bad in ["not-an-email", "no-domain@", "@uni.edu", "ada@nodot", "ada@.edu"] {
            form.email = bad.to_string();
            assert!(
                validate_registration(&form).is_err(),
                "accepted bad email {bad:?}"
            );
        }
        form.email = "ada@mail.uni.edu".to_string();
        assert!(validate_registration(&form).is_ok());
    }

    #[test]
    fn test_mismatched_passwords_rejected() {
        let mut form = valid_form();
        form.password2 = "secret2".to_string();
        let errors = validate_registration(&form).unwrap_err();
        assert_eq!(errors.len(), 1);
        let err = errors.iter().next().unwrap();
        assert_eq!(err.field, "password2");
        assert_eq!(err.message, "Passwords do not match");
    }

    #[test]
    fn test_short_password_reported_once_per_field() {
        let mut form = valid_form();
        form.password = "abc".to_string();
        form.password2 = "abc".to_string();
        let errors = validate_registration(&form).unwrap_err();
        // Both password fields are short; the match check is skipped.
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_display_renders_one_line_per_field() {
        let mut form = valid_form();
        form.username = "a".to_string();
        form.email = "nope".to_string();
        let errors = validate_registration(&form).unwrap_err();
        let rendered = errors.to_string();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("username: "));
        assert!(lines[1].starts_with("email: "));
    }

    #[test]
    fn test_review_bounds() {
        assert!(validate_review(1, "great event").is_ok());
        assert!(validate_review(5, "loved it").is_ok());
        assert!(validate_review(0, "great event").is_err());
        assert!(validate_review(6, "great event").is_err());
    }

    #[test]
    fn test_review_comment_length() {
        let errors = validate_review(4, "meh").unwrap_err();
        assert_eq!(errors.iter().next().unwrap().field, "comment");
        assert!(validate_review(4, "     ").is_err());
    }
}
