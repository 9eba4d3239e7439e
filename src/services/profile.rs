//! Profile of the signed-in user

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::api::{Endpoints, RequestDescriptor, RequestExecutor};
use crate::auth::{CredentialStore, require_token};
use crate::error::{Error, Result};
use crate::models::{Profile, ProfileRecord};

use super::InFlightSlot;

/// Fetches the `/me` profile once and caches it until [`clear`](Self::clear).
pub struct ProfileService {
    executor: RequestExecutor,
    endpoints: Endpoints,
    store: Arc<dyn CredentialStore>,
    slot: InFlightSlot<()>,
    profile: Mutex<Option<Profile>>,
}

impl ProfileService {
    /// Create a service with an empty cache
    pub fn new(
        executor: RequestExecutor,
        endpoints: Endpoints,
        store: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            executor,
            endpoints,
            store,
            slot: InFlightSlot::default(),
            profile: Mutex::new(None),
        }
    }

    fn cache(&self) -> MutexGuard<'_, Option<Profile>> {
        self.profile.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The cached profile, if one was fetched
    pub fn profile(&self) -> Option<Profile> {
        self.cache().clone()
    }

    /// Fetch the profile, replacing any fetch still in flight.
    ///
    /// A 403/404 becomes [`Error::ProfileNotFound`]; a payload without a
    /// username becomes [`Error::InvalidProfileData`].
    pub async fn fetch_profile(&self) -> Result<Profile> {
        self.slot.cancel();
        let token = require_token(self.store.as_ref())?;

        let request = RequestDescriptor::get(self.endpoints.me()).bearer(&token);
        let executor = self.executor.clone();
        let pending = self.slot.replace((), async move {
            let record = executor
                .execute::<ProfileRecord>(request)
                .await
                .map_err(|e| match e {
                    Error::NotFound(_) => Error::ProfileNotFound,
                    other => other,
                })?;
            record.into_profile().ok_or(Error::InvalidProfileData)
        });

        pending
            .finish(|profile| {
                *self.cache() = Some(profile.clone());
                tracing::debug!(username = %profile.username, "Profile loaded");
                Ok(profile)
            })
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "Profile fetch failed"))
    }

    /// Forget the cached profile and abort any running fetch (logout)
    pub fn clear(&self) {
        self.slot.cancel();
        self.cache().take();
    }
}
