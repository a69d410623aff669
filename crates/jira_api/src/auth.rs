//! Credential handling for Jira Cloud (email + API token) and Server/DC (personal access token).

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;

/// Token plus optional identity email. The email decides the auth scheme.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: Option<String>,
    pub token: String,
}

impl Credentials {
    pub fn new(email: Option<String>, token: impl Into<String>) -> Self {
        let email = email
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        Self {
            email,
            token: token.into(),
        }
    }

    /// Jira Cloud wants basic auth over `email:token`, Server/DC takes the PAT as a bearer.
    pub fn authorization_header(&self) -> String {
        match &self.email {
            Some(email) => {
                let raw = format!("{}:{}", email, self.token);
                format!("Basic {}", BASE64_STANDARD.encode(raw))
            }
            None => format!("Bearer {}", self.token),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.token.trim().is_empty()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("token", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::Credentials;

    #[test]
    fn email_selects_basic_scheme() {
        let credentials = Credentials::new(Some("dev@example.com".into()), "secret");
        // base64("dev@example.com:secret")
        assert_eq!(
            credentials.authorization_header(),
            "Basic ZGV2QGV4YW1wbGUuY29tOnNlY3JldA=="
        );
    }

    #[test]
    fn blank_email_falls_back_to_bearer() {
        let credentials = Credentials::new(Some("   ".into()), "pat-123");
        assert_eq!(credentials.authorization_header(), "Bearer pat-123");
        assert!(credentials.email.is_none());
    }

    #[test]
    fn debug_output_hides_token() {
        let credentials = Credentials::new(None, "pat-123");
        let rendered = format!("{:?}", credentials);
        assert!(!rendered.contains("pat-123"));
    }
}
