//! Authorization code to bearer token exchange

use std::sync::Arc;

use crate::api::{Endpoints, RequestDescriptor, RequestExecutor};
use crate::config::Config;
use crate::error::Result;
use crate::models::OAuthTokenResponse;
use crate::services::InFlightSlot;

use super::CredentialStore;

/// Exchanges one-time authorization codes for a bearer token.
///
/// At most one exchange is in flight. A second request for the same code is
/// rejected with [`Error::DuplicateRequest`](crate::Error::DuplicateRequest)
/// (codes are single-use upstream); a request for a different code cancels
/// the running one and only the newest result is ever stored.
pub struct TokenExchange {
    executor: RequestExecutor,
    endpoints: Endpoints,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    store: Arc<dyn CredentialStore>,
    slot: InFlightSlot<String>,
}

impl TokenExchange {
    /// Create a coordinator using the OAuth client settings from `config`
    pub fn new(
        executor: RequestExecutor,
        endpoints: Endpoints,
        config: &Config,
        store: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            executor,
            endpoints,
            client_id: config.access_key.clone(),
            client_secret: config.secret_key.clone(),
            redirect_uri: config.redirect_uri.clone(),
            store,
            slot: InFlightSlot::default(),
        }
    }

    /// Exchange `code` for a token and persist it in the credential store.
    pub async fn exchange(&self, code: &str) -> Result<String> {
        let request = self.token_request(code);
        let executor = self.executor.clone();

        let pending = self
            .slot
            .start_unique(code.to_string(), async move {
                executor.execute::<OAuthTokenResponse>(request).await
            })
            .inspect_err(|_| tracing::debug!("Exchange for this code already in flight"))?;

        pending
            .finish(|response| {
                self.store.set_token(&response.access_token)?;
                tracing::info!("Authorization code exchanged for a bearer token");
                Ok(response.access_token)
            })
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "Token exchange failed"))
    }

    /// Whether an exchange is running
    pub fn is_exchanging(&self) -> bool {
        self.slot.is_busy()
    }

    /// Abort the running exchange, if any
    pub fn cancel(&self) {
        self.slot.cancel();
    }

    fn token_request(&self, code: &str) -> RequestDescriptor {
        let mut url = self.endpoints.token();
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("client_secret", &self.client_secret)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("code", code)
            .append_pair("grant_type", "authorization_code");
        RequestDescriptor::post(url)
    }
}
