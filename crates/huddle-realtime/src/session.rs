use serde::{Deserialize, Serialize};

/// The authenticated session a transport connects on behalf of.
#[derive(Clone, Serialize, Deserialize)]
pub struct SessionCredential {
    pub profile_id: String,
    pub display_name: String,
    /// Bearer token appended to the connection URL.
    #[serde(skip)]
    pub token: Option<String>,
}

impl std::fmt::Debug for SessionCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCredential")
            .field("profile_id", &self.profile_id)
            .field("display_name", &self.display_name)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl SessionCredential {
    pub fn new(profile_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            profile_id: profile_id.into(),
            display_name: display_name.into(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Append the token (if any) to `base` as a `token` query parameter.
    pub fn authorize_url(&self, base: &str) -> String {
        match &self.token {
            Some(token) => {
                let sep = if base.contains('?') { '&' } else { '?' };
                format!("{base}{sep}token={token}")
            }
            None => base.to_string(),
        }
    }
}
