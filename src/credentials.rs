//! Credentials: where the OAuth bearer token comes from.
//!
//! Obtaining and refreshing tokens is someone else's job (`gcloud auth
//! print-access-token`, an OAuth helper, a CI secret). This module only
//! finds an already-valid token, from most-specific to least-specific:
//!
//! 1. an explicit value (`--access-token`),
//! 2. the `GDOC_DOWN_ACCESS_TOKEN` environment variable,
//! 3. a JSON token file (`--token-file` or `GDOC_DOWN_TOKEN_FILE`) with an
//!    `access_token` or `token` field, as written by most OAuth helpers.

use crate::error::GDocDownError;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const ACCESS_TOKEN_ENV: &str = "GDOC_DOWN_ACCESS_TOKEN";
pub const TOKEN_FILE_ENV: &str = "GDOC_DOWN_TOKEN_FILE";

/// An OAuth access token. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

#[derive(Debug, Deserialize)]
struct TokenFile {
    access_token: Option<String>,
    token: Option<String>,
}

/// Read a token from a JSON token file.
pub fn read_token_file(path: &Path) -> Result<AccessToken, GDocDownError> {
    let missing = |detail: String| GDocDownError::CredentialsMissing {
        hint: format!("Token file '{}': {detail}", path.display()),
    };
    let contents = std::fs::read_to_string(path).map_err(|e| missing(e.to_string()))?;
    let file: TokenFile =
        serde_json::from_str(&contents).map_err(|e| missing(format!("not a JSON object: {e}")))?;
    file.access_token
        .or(file.token)
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .map(AccessToken)
        .ok_or_else(|| missing("no \"access_token\" field".to_string()))
}

/// Resolve a token from the explicit value, the environment, or a token file.
pub fn resolve_token(
    explicit: Option<&str>,
    token_file: Option<&Path>,
) -> Result<AccessToken, GDocDownError> {
    if let Some(token) = explicit.map(str::trim).filter(|t| !t.is_empty()) {
        debug!("Using access token from the command line");
        return Ok(AccessToken::new(token));
    }

    if let Ok(token) = std::env::var(ACCESS_TOKEN_ENV) {
        if !token.trim().is_empty() {
            debug!("Using access token from {}", ACCESS_TOKEN_ENV);
            return Ok(AccessToken::new(token.trim()));
        }
    }

    let file = token_file
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(TOKEN_FILE_ENV).map(PathBuf::from));
    if let Some(file) = file {
        debug!("Using access token from {}", file.display());
        return read_token_file(&file);
    }

    Err(GDocDownError::CredentialsMissing {
        hint: format!(
            "Pass --access-token, set {ACCESS_TOKEN_ENV}, or point {TOKEN_FILE_ENV} at a JSON \
             token file.\nA short-lived token can be printed with: gcloud auth print-access-token"
        ),
    })
}
