pub mod auth;
pub mod health;
pub mod root;

use regex::Regex;

/// Basic email format check; anything a mail server could route.
pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_email_accepts_basic_format() {
        assert!(valid_email("a@x.com"));
        assert!(valid_email("first.last+tag@sub.example.org"));
        assert!(!valid_email("a@x"));
        assert!(!valid_email("no-at-sign.com"));
        assert!(!valid_email("a b@x.com"));
        assert!(!valid_email(""));
    }
}
