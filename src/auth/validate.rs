use lazy_static::lazy_static;
use regex::Regex;

const USERNAME_MIN: usize = 5;
const USERNAME_MAX: usize = 50;
const PASSWORD_MIN: usize = 6;

pub fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Usernames are email addresses, 5 to 50 characters.
pub fn validate_username(username: &str) -> Result<(), &'static str> {
    if username.is_empty() {
        return Err("username must not be empty");
    }
    let len = username.chars().count();
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) {
        return Err("username must be 5-50 characters");
    }
    if !is_valid_email(username) {
        return Err("username must be a valid email address");
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), &'static str> {
    if password.chars().count() < PASSWORD_MIN {
        return Err("password must be at least 6 characters");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_email_form_username() {
        assert!(validate_username("viewer@example.com").is_ok());
        assert!(validate_username("a@b.c").is_ok()); // exactly 5 chars
    }

    #[test]
    fn rejects_bad_usernames() {
        assert!(validate_username("").is_err());
        assert!(validate_username("a@b.").is_err()); // 4 chars, not email-form
        assert!(validate_username("not-an-email").is_err());
        assert!(validate_username("spaces in@here.com").is_err());
        let long = format!("{}@example.com", "x".repeat(50));
        assert!(validate_username(&long).is_err());
    }

    #[test]
    fn username_bounds_are_inclusive() {
        // 50 chars total: 38 + "@" + "example.com" (11)
        let max = format!("{}@example.com", "x".repeat(38));
        assert_eq!(max.chars().count(), 50);
        assert!(validate_username(&max).is_ok());
    }

    #[test]
    fn password_minimum_length() {
        assert!(validate_password("12345").is_err());
        assert!(validate_password("123456").is_ok());
    }

    #[test]
    fn email_shape_check() {
        assert!(is_valid_email("user@host.tld"));
        assert!(!is_valid_email("user@host"));
        assert!(!is_valid_email("@host.tld"));
        assert!(!is_valid_email("user host@x.y"));
    }
}
