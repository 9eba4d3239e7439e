//! Avatar URL of the signed-in user

use std::sync::Arc;

use tokio::sync::watch;
use url::Url;

use crate::api::{Endpoints, RequestDescriptor, RequestExecutor};
use crate::auth::{CredentialStore, require_token};
use crate::error::{Error, Result};
use crate::models::UserRecord;

use super::InFlightSlot;

/// Fetches a user's avatar URL and publishes the current value.
pub struct AvatarService {
    executor: RequestExecutor,
    endpoints: Endpoints,
    store: Arc<dyn CredentialStore>,
    slot: InFlightSlot<String>,
    avatar: watch::Sender<Option<String>>,
}

impl AvatarService {
    /// Create a service with no avatar
    pub fn new(
        executor: RequestExecutor,
        endpoints: Endpoints,
        store: Arc<dyn CredentialStore>,
    ) -> Self {
        let (avatar, _) = watch::channel(None);
        Self {
            executor,
            endpoints,
            store,
            slot: InFlightSlot::default(),
            avatar,
        }
    }

    /// The cached avatar URL
    pub fn avatar_url(&self) -> Option<String> {
        self.avatar.borrow().clone()
    }

    /// Watch avatar changes; the receiver always sees the latest URL
    pub fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.avatar.subscribe()
    }

    /// Fetch the large avatar URL of `username`, replacing any fetch in flight.
    pub async fn fetch_avatar_url(&self, username: &str) -> Result<String> {
        self.slot.cancel();
        let token = require_token(self.store.as_ref())?;

        let request = RequestDescriptor::get(self.endpoints.user(username)).bearer(&token);
        let executor = self.executor.clone();
        let pending = self.slot.replace(username.to_string(), async move {
            let user = executor
                .execute::<UserRecord>(request)
                .await
                .map_err(|e| match e {
                    Error::NotFound(_) => Error::AvatarNotFound,
                    other => other,
                })?;
            let large = user.profile_image.large;
            if large.is_empty() || Url::parse(&large).is_err() {
                return Err(Error::InvalidAvatarUrl(large));
            }
            Ok(large)
        });

        pending
            .finish(|url| {
                self.avatar.send_replace(Some(url.clone()));
                Ok(url)
            })
            .await
            .inspect_err(|e| tracing::warn!(username, error = %e, "Avatar fetch failed"))
    }

    /// Forget the avatar and abort any running fetch (logout)
    pub fn clear(&self) {
        self.slot.cancel();
        self.avatar.send_replace(None);
    }
}
