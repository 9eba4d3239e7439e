//! Top-level assembly of the data-access layer
//!
//! [`App`] builds every service from one [`Config`] and one credential store
//! and owns them for the lifetime of the session.

use std::sync::Arc;

use crate::api::{Endpoints, RequestExecutor};
use crate::auth::{CredentialStore, TokenExchange, oauth};
use crate::config::Config;
use crate::error::Result;
use crate::models::Profile;
use crate::services::{AvatarService, PhotoFeed, ProfileService};

/// All services of a signed-in (or signing-in) session
pub struct App {
    config: Config,
    endpoints: Endpoints,
    store: Arc<dyn CredentialStore>,
    exchange: TokenExchange,
    feed: PhotoFeed,
    profile: ProfileService,
    avatar: AvatarService,
}

impl App {
    /// Build every service with a default HTTP client
    pub fn new(config: Config, store: Arc<dyn CredentialStore>) -> Result<Self> {
        Self::with_executor(config, store, RequestExecutor::new())
    }

    /// Build every service around the given executor
    pub fn with_executor(
        config: Config,
        store: Arc<dyn CredentialStore>,
        executor: RequestExecutor,
    ) -> Result<Self> {
        let endpoints = Endpoints::from_config(&config)?;

        let exchange = TokenExchange::new(
            executor.clone(),
            endpoints.clone(),
            &config,
            Arc::clone(&store),
        );
        let feed = PhotoFeed::new(
            executor.clone(),
            endpoints.clone(),
            Arc::clone(&store),
            config.per_page,
        );
        let profile = ProfileService::new(executor.clone(), endpoints.clone(), Arc::clone(&store));
        let avatar = AvatarService::new(executor, endpoints.clone(), Arc::clone(&store));

        Ok(Self {
            config,
            endpoints,
            store,
            exchange,
            feed,
            profile,
            avatar,
        })
    }

    /// Active configuration
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Token exchange coordinator
    pub const fn token_exchange(&self) -> &TokenExchange {
        &self.exchange
    }

    /// Photo feed
    pub const fn feed(&self) -> &PhotoFeed {
        &self.feed
    }

    /// Profile service
    pub const fn profile(&self) -> &ProfileService {
        &self.profile
    }

    /// Avatar service
    pub const fn avatar(&self) -> &AvatarService {
        &self.avatar
    }

    /// URL of the provider's login page
    pub fn authorize_url(&self) -> String {
        oauth::authorize_url(&self.endpoints, &self.config)
    }

    /// Whether a bearer token is stored
    pub fn is_authorized(&self) -> bool {
        self.store.has_token()
    }

    /// Exchange an authorization code and store the resulting token
    pub async fn sign_in(&self, code: &str) -> Result<String> {
        self.exchange.exchange(code).await
    }

    /// Fetch the profile, then the avatar of its username.
    ///
    /// An avatar failure is logged and does not fail the call; the avatar
    /// then stays unset.
    pub async fn load_profile(&self) -> Result<Profile> {
        let profile = self.profile.fetch_profile().await?;
        if let Err(e) = self.avatar.fetch_avatar_url(&profile.username).await {
            tracing::warn!(error = %e, "Continuing without avatar");
        }
        Ok(profile)
    }

    /// Sign out: drop the token and every piece of cached session state
    pub fn logout(&self) -> Result<()> {
        self.exchange.cancel();
        self.feed.clear();
        self.profile.clear();
        self.avatar.clear();
        self.store.clear()?;
        tracing::info!("Logged out");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MemoryStore;
    use httpmock::prelude::*;
    use serde_json::json;

    fn app_for(server: &MockServer, store: Arc<MemoryStore>) -> App {
        let config = Config {
            api_base_url: server.base_url(),
            auth_base_url: server.base_url(),
            access_key: "client-id".to_string(),
            secret_key: "client-secret".to_string(),
            ..Config::default()
        };
        App::new(config, store).unwrap()
    }

    #[tokio::test]
    async fn signed_in_token_is_used_by_the_feed() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/oauth/token").query_param("code", "c0de");
            then.status(200).json_body(json!({ "access_token": "fresh" }));
        });
        let photos = server.mock(|when, then| {
            when.method(GET)
                .path("/photos")
                .header("Authorization", "Bearer fresh");
            then.status(200).json_body(json!([]));
        });

        let app = app_for(&server, Arc::new(MemoryStore::new()));
        assert!(!app.is_authorized());

        app.sign_in("c0de").await.unwrap();
        assert!(app.is_authorized());

        app.feed().fetch_next_page().await.unwrap();
        assert_eq!(app.feed().next_page(), 2);
        photos.assert();
    }

    #[tokio::test]
    async fn loads_profile_and_avatar() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.path("/me");
            then.status(200).json_body(json!({ "username": "jdoe", "first_name": "Jane" }));
        });
        server.mock(|when, then| {
            when.path("/users/jdoe");
            then.status(200)
                .json_body(json!({ "profile_image": { "large": "https://images.example/l" } }));
        });

        let app = app_for(&server, Arc::new(MemoryStore::with_token("tok")));
        let profile = app.load_profile().await.unwrap();

        assert_eq!(profile.name, "Jane");
        assert_eq!(app.avatar().avatar_url().as_deref(), Some("https://images.example/l"));
    }

    #[tokio::test]
    async fn avatar_failure_does_not_fail_profile_load() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.path("/me");
            then.status(200).json_body(json!({ "username": "jdoe" }));
        });
        server.mock(|when, then| {
            when.path("/users/jdoe");
            then.status(404);
        });

        let app = app_for(&server, Arc::new(MemoryStore::with_token("tok")));
        assert!(app.load_profile().await.is_ok());
        assert!(app.avatar().avatar_url().is_none());
    }

    #[tokio::test]
    async fn logout_clears_session() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.path("/photos");
            then.status(200).json_body(json!([{
                "id": "p1",
                "width": 10,
                "height": 10,
                "liked_by_user": false,
                "urls": { "thumb": "https://i.example/t", "full": "https://i.example/f" }
            }]));
        });
        server.mock(|when, then| {
            when.path("/me");
            then.status(200).json_body(json!({ "username": "jdoe" }));
        });
        server.mock(|when, then| {
            when.path("/users/jdoe");
            then.status(200)
                .json_body(json!({ "profile_image": { "large": "https://images.example/l" } }));
        });

        let store = Arc::new(MemoryStore::with_token("tok"));
        let app = app_for(&server, Arc::clone(&store));
        app.feed().fetch_next_page().await.unwrap();
        app.load_profile().await.unwrap();

        app.logout().unwrap();

        assert!(!app.is_authorized());
        assert!(store.token().unwrap().is_none());
        assert!(app.feed().is_empty());
        assert_eq!(app.feed().next_page(), 1);
        assert!(app.profile().profile().is_none());
        assert!(app.avatar().avatar_url().is_none());
    }

    #[test]
    fn authorize_url_points_at_auth_host() {
        let store = Arc::new(MemoryStore::new());
        let app = App::new(
            Config {
                access_key: "id".to_string(),
                ..Config::default()
            },
            store,
        )
        .unwrap();
        assert!(app.authorize_url().starts_with("https://unsplash.com/oauth/authorize?client_id=id"));
    }
}
