use std::fmt;

use crate::error::{DashboardError, Result};

/// Bearer credential for the GitHub API.
///
/// The value never appears in `Debug` output so it cannot leak into logs.
#[derive(Clone)]
pub struct Token(String);

impl Token {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resolves the credential supplied on the command line or through `GITHUB_TOKEN`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when no non-empty token is available.
    pub fn require(token: Option<&str>) -> Result<Self> {
        match token.map(str::trim) {
            Some(value) if !value.is_empty() => Ok(Self::from(value)),
            _ => Err(DashboardError::Config(
                "Set GITHUB_TOKEN environment variable".to_string(),
            )),
        }
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(***)")
    }
}
