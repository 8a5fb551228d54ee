use thiserror::Error;

pub const DEFAULT_ID: &str = "admin";
pub const DEFAULT_PASSWORD: &str = "1234";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    #[error("Incorrect ID or Password")]
    InvalidCredentials,
}

/// The single ID/password pair that opens the results view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub id: String,
    pub password: String,
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            id: DEFAULT_ID.to_string(),
            password: DEFAULT_PASSWORD.to_string(),
        }
    }
}

impl Credentials {
    pub fn new(id: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            password: password.into(),
        }
    }

    pub fn authenticate(&self, id: &str, password: &str) -> bool {
        self.id == id && self.password == password
    }

    pub fn verify(&self, id: &str, password: &str) -> Result<(), AccessError> {
        if self.authenticate(id, password) {
            Ok(())
        } else {
            Err(AccessError::InvalidCredentials)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_pair_is_accepted() {
        let credentials = Credentials::default();
        assert!(credentials.authenticate("admin", "1234"));
        assert_eq!(credentials.verify("admin", "1234"), Ok(()));
    }

    #[test]
    fn both_values_must_match_exactly() {
        let credentials = Credentials::default();
        assert!(!credentials.authenticate("admin", "12345"));
        assert!(!credentials.authenticate("Admin", "1234"));
        assert!(!credentials.authenticate("admin ", "1234"));
        assert!(!credentials.authenticate("", ""));
    }

    #[test]
    fn failure_carries_fixed_message() {
        let err = Credentials::new("lecturer", "s3cret")
            .verify("lecturer", "wrong")
            .unwrap_err();
        assert_eq!(err, AccessError::InvalidCredentials);
        assert_eq!(err.to_string(), "Incorrect ID or Password");
    }
}
