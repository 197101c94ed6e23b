use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

/// Configuration for the user_directory module
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserDirectoryConfig {
    /// Address of the backend; `/users` is appended per request.
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for UserDirectoryConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

impl UserDirectoryConfig {
    /// Parse `base_url`, rejecting addresses that cannot carry path segments.
    pub fn base_url(&self) -> Result<Url> {
        let url = Url::parse(self.base_url.trim())
            .with_context(|| format!("Invalid user directory base_url '{}'", self.base_url))?;
        if url.cannot_be_a_base() {
            anyhow::bail!(
                "user directory base_url '{}' cannot be used as a base address",
                self.base_url
            );
        }
        Ok(url)
    }
}
