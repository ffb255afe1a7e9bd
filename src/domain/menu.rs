//! Menu destinations.

use url::Url;

use super::error::DomainError;

/// Where a menu item points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuDestination {
    /// Site-relative path such as `/pages/about`.
    Internal(String),
    /// Absolute `http`/`https` URL.
    External(Url),
}

impl MenuDestination {
    pub fn parse(input: &str) -> Result<Self, DomainError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation("menu destination must not be empty"));
        }

        if trimmed.starts_with('/') {
            if trimmed.starts_with("//") {
                return Err(DomainError::validation(
                    "protocol-relative destinations are not allowed",
                ));
            }
            return Ok(Self::Internal(trimmed.to_string()));
        }

        let url = Url::parse(trimmed).map_err(|err| {
            DomainError::validation(format!("invalid menu destination `{trimmed}`: {err}"))
        })?;
        match url.scheme() {
            "http" | "https" => Ok(Self::External(url)),
            other => Err(DomainError::validation(format!(
                "unsupported destination scheme `{other}`"
            ))),
        }
    }

    pub fn as_stored(&self) -> String {
        match self {
            Self::Internal(path) => path.clone(),
            Self::External(url) => url.to_string(),
        }
    }
}
