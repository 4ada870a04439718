//! Claim identity and deep-link parsing.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Query parameter carrying the claim token in a deep link.
pub const TOKEN_PARAM: &str = "token";
/// Query parameter carrying the email in a deep link.
pub const EMAIL_PARAM: &str = "email";

/// Who is claiming: an email and, usually, a claim token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimIdentity {
    pub email: String,
    /// `None` requests an email-only eligibility check.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claim_token: Option<String>,
}

impl ClaimIdentity {
    /// Build an identity. Surrounding whitespace is trimmed and a blank
    /// token is treated as absent.
    pub fn new(email: impl Into<String>, claim_token: Option<String>) -> Self {
        Self {
            email: email.into().trim().to_string(),
            claim_token: claim_token
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
        }
    }

    /// Identity with both email and token.
    pub fn with_token(email: impl Into<String>, token: impl Into<String>) -> Self {
        Self::new(email, Some(token.into()))
    }

    /// Identity for an email-only eligibility check.
    pub fn email_only(email: impl Into<String>) -> Self {
        Self::new(email, None)
    }

    /// Pre-populate an identity from a deep link such as
    /// `https://shop.example.com/claim?token=T1&email=a%40b.com`.
    pub fn from_deep_link(link: &str) -> Result<Self, DeepLinkError> {
        let url = Url::parse(link).map_err(|e| DeepLinkError::InvalidUrl(e.to_string()))?;

        let mut email = None;
        let mut token = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                EMAIL_PARAM if email.is_none() => email = Some(value.into_owned()),
                TOKEN_PARAM if token.is_none() => token = Some(value.into_owned()),
                _ => {}
            }
        }

        let email = email
            .filter(|e| !e.trim().is_empty())
            .ok_or(DeepLinkError::MissingEmail)?;
        Ok(Self::new(email, token))
    }

    /// The same identity run through [`new`](Self::new). Identities built
    /// from struct literals or deserialized input may carry padding or a
    /// blank token.
    pub fn normalized(&self) -> Self {
        Self::new(self.email.as_str(), self.claim_token.clone())
    }

    pub fn has_token(&self) -> bool {
        self.claim_token
            .as_deref()
            .is_some_and(|t| !t.trim().is_empty())
    }
}

/// Why a deep link could not be turned into an identity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeepLinkError {
    #[error("invalid deep link: {0}")]
    InvalidUrl(String),

    #[error("deep link has no '{}' parameter", EMAIL_PARAM)]
    MissingEmail,
}
