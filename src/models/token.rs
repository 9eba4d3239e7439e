//! Token endpoint payload

use serde::Deserialize;

/// Body returned by the OAuth token endpoint.
///
/// Only `access_token` is consumed; everything else the provider sends is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthTokenResponse {
    /// Bearer token for API requests
    pub access_token: String,
}
