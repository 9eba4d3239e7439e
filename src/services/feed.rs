//! Paginated photo feed with like support

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast;

use crate::api::{Endpoints, RequestDescriptor, RequestExecutor};
use crate::auth::{CredentialStore, require_token};
use crate::error::{Error, Result};
use crate::models::{Photo, PhotoRecord};

/// Photos requested per page when nothing else is configured
pub const DEFAULT_PER_PAGE: u32 = 10;

const EVENT_CAPACITY: usize = 64;

/// Change notifications published by [`PhotoFeed`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
    /// `count` photos were appended starting at index `start`
    PhotosAppended {
        /// Index of the first new photo
        start: usize,
        /// Number of new photos
        count: usize,
    },
    /// The local like state of a photo changed
    LikeChanged {
        /// Photo id
        photo_id: String,
        /// New like state
        liked: bool,
    },
    /// The feed was emptied (logout)
    Cleared,
}

/// Outcome of [`PhotoFeed::fetch_next_page`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageFetch {
    /// Another page fetch was already running; nothing was sent
    Skipped,
    /// The page was fetched and appended
    Loaded {
        /// Page number that was fetched
        page: u32,
        /// Photos actually appended (duplicates are dropped)
        added: usize,
    },
}

#[derive(Debug)]
struct FeedState {
    photos: Vec<Photo>,
    ids: HashSet<String>,
    next_page: u32,
    is_fetching: bool,
    is_liking: bool,
    // Bumped by `clear`, so results of calls started before a logout are dropped.
    epoch: u64,
}

impl Default for FeedState {
    fn default() -> Self {
        Self {
            photos: Vec::new(),
            ids: HashSet::new(),
            next_page: 1,
            is_fetching: false,
            is_liking: false,
            epoch: 0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Flag {
    Fetching,
    Liking,
}

/// Resets an in-flight flag when the call ends, including when the caller
/// drops the future half-way.
struct FlagGuard<'a> {
    feed: &'a PhotoFeed,
    flag: Flag,
    epoch: u64,
}

impl Drop for FlagGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.feed.lock();
        if state.epoch != self.epoch {
            return;
        }
        match self.flag {
            Flag::Fetching => state.is_fetching = false,
            Flag::Liking => state.is_liking = false,
        }
    }
}

/// Ordered, deduplicated collection of feed photos.
///
/// Pages are appended in fetch order and keep the server's order within a
/// page. At most one page fetch and one like request run at a time.
pub struct PhotoFeed {
    executor: RequestExecutor,
    endpoints: Endpoints,
    store: Arc<dyn CredentialStore>,
    per_page: u32,
    state: Mutex<FeedState>,
    events: broadcast::Sender<FeedEvent>,
}

impl PhotoFeed {
    /// Create an empty feed starting at page 1
    pub fn new(
        executor: RequestExecutor,
        endpoints: Endpoints,
        store: Arc<dyn CredentialStore>,
        per_page: u32,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            executor,
            endpoints,
            store,
            per_page: per_page.max(1),
            state: Mutex::new(FeedState::default()),
            events,
        }
    }

    fn lock(&self) -> MutexGuard<'_, FeedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: FeedEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    /// Subscribe to feed changes
    pub fn subscribe(&self) -> broadcast::Receiver<FeedEvent> {
        self.events.subscribe()
    }

    /// Snapshot of all loaded photos
    pub fn photos(&self) -> Vec<Photo> {
        self.lock().photos.clone()
    }

    /// A single photo by id
    pub fn photo(&self, photo_id: &str) -> Option<Photo> {
        self.lock().photos.iter().find(|p| p.id == photo_id).cloned()
    }

    /// Number of loaded photos
    pub fn len(&self) -> usize {
        self.lock().photos.len()
    }

    /// Check if no photos are loaded
    pub fn is_empty(&self) -> bool {
        self.lock().photos.is_empty()
    }

    /// The page the next fetch will request
    pub fn next_page(&self) -> u32 {
        self.lock().next_page
    }

    /// Whether a page fetch is running
    pub fn is_fetching(&self) -> bool {
        self.lock().is_fetching
    }

    /// Whether a like request is running
    pub fn is_liking(&self) -> bool {
        self.lock().is_liking
    }

    /// Fetch the next page and append it.
    ///
    /// Returns [`PageFetch::Skipped`] without any network traffic while
    /// another fetch runs. On failure the photos and the page cursor are left
    /// exactly as they were, so calling again retries the same page.
    pub async fn fetch_next_page(&self) -> Result<PageFetch> {
        let (page, token, guard) = {
            let mut state = self.lock();
            if state.is_fetching {
                tracing::debug!("Page fetch already in flight, skipping");
                return Ok(PageFetch::Skipped);
            }
            let token = require_token(self.store.as_ref())?;
            state.is_fetching = true;
            let guard = FlagGuard {
                feed: self,
                flag: Flag::Fetching,
                epoch: state.epoch,
            };
            (state.next_page, token, guard)
        };

        tracing::debug!(page, per_page = self.per_page, "Fetching photos");
        let request =
            RequestDescriptor::get(self.endpoints.photos(page, self.per_page)).bearer(&token);
        let result = self.executor.execute::<Vec<PhotoRecord>>(request).await;

        let mut state = self.lock();
        if state.epoch != guard.epoch {
            tracing::debug!(page, "Feed cleared while fetching, dropping page");
            drop(state);
            return Err(Error::Cancelled);
        }
        state.is_fetching = false;

        let records = result.inspect_err(|e| tracing::warn!(page, error = %e, "Page fetch failed"))?;
        let received = records.len();

        let start = state.photos.len();
        for photo in records.into_iter().filter_map(PhotoRecord::into_photo) {
            if state.ids.insert(photo.id.clone()) {
                state.photos.push(photo);
            } else {
                tracing::debug!(id = %photo.id, "Dropping duplicate photo");
            }
        }
        let added = state.photos.len() - start;
        state.next_page += 1;
        drop(state);
        drop(guard);

        tracing::debug!(page, received, added, "Photos appended");
        self.emit(FeedEvent::PhotosAppended {
            start,
            count: added,
        });

        Ok(PageFetch::Loaded { page, added })
    }

    /// Ask the server to like (`true`) or unlike (`false`) a photo.
    ///
    /// This does not touch the local photo: callers apply the change with
    /// [`mark_liked`](Self::mark_liked) once this succeeds, or use
    /// [`toggle_like`](Self::toggle_like) for an optimistic update.
    /// Fails with [`Error::Busy`] while another like request runs.
    pub async fn set_like(&self, photo_id: &str, liked: bool) -> Result<()> {
        let guard = {
            let mut state = self.lock();
            if state.is_liking {
                return Err(Error::Busy);
            }
            state.is_liking = true;
            FlagGuard {
                feed: self,
                flag: Flag::Liking,
                epoch: state.epoch,
            }
        };

        let result = self.send_like(photo_id, liked).await;
        drop(guard);
        result
    }

    /// Flip the like state of a loaded photo optimistically.
    ///
    /// The local state changes (and [`FeedEvent::LikeChanged`] fires) before
    /// the request is sent; if the request fails the previous state is
    /// restored and announced again. Returns the new like state.
    pub async fn toggle_like(&self, photo_id: &str) -> Result<bool> {
        let (liked, guard) = {
            let mut state = self.lock();
            if state.is_liking {
                return Err(Error::Busy);
            }
            let photo = state
                .photos
                .iter_mut()
                .find(|p| p.id == photo_id)
                .ok_or_else(|| Error::PhotoNotFound(photo_id.to_string()))?;
            photo.is_liked = !photo.is_liked;
            let liked = photo.is_liked;
            state.is_liking = true;
            let guard = FlagGuard {
                feed: self,
                flag: Flag::Liking,
                epoch: state.epoch,
            };
            (liked, guard)
        };
        self.emit(FeedEvent::LikeChanged {
            photo_id: photo_id.to_string(),
            liked,
        });

        let result = self.send_like(photo_id, liked).await;
        let epoch = guard.epoch;
        drop(guard);

        if let Err(e) = result {
            tracing::warn!(photo_id, error = %e, "Like request failed, rolling back");
            let rolled_back = {
                let mut state = self.lock();
                state.epoch == epoch && set_liked(&mut state, photo_id, !liked)
            };
            if rolled_back {
                self.emit(FeedEvent::LikeChanged {
                    photo_id: photo_id.to_string(),
                    liked: !liked,
                });
            }
            return Err(e);
        }

        Ok(liked)
    }

    /// Apply a confirmed like state to a loaded photo.
    ///
    /// Returns `false` if the photo is not in the feed.
    pub fn mark_liked(&self, photo_id: &str, liked: bool) -> bool {
        let changed = set_liked(&mut self.lock(), photo_id, liked);
        if changed {
            self.emit(FeedEvent::LikeChanged {
                photo_id: photo_id.to_string(),
                liked,
            });
        }
        changed
    }

    /// Drop every photo and start again from page 1 (logout)
    pub fn clear(&self) {
        {
            let mut state = self.lock();
            let epoch = state.epoch.wrapping_add(1);
            *state = FeedState {
                epoch,
                ..FeedState::default()
            };
        }
        self.emit(FeedEvent::Cleared);
    }

    async fn send_like(&self, photo_id: &str, liked: bool) -> Result<()> {
        let token = require_token(self.store.as_ref())?;
        let url = self.endpoints.photo_like(photo_id);
        let request = if liked {
            RequestDescriptor::post(url)
        } else {
            RequestDescriptor::delete(url)
        }
        .bearer(&token);

        tracing::debug!(photo_id, liked, "Sending like request");
        self.executor.execute_discarding(request).await
    }
}

fn set_liked(state: &mut FeedState, photo_id: &str, liked: bool) -> bool {
    match state.photos.iter_mut().find(|p| p.id == photo_id) {
        Some(photo) => {
            photo.is_liked = liked;
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MemoryStore;
    use httpmock::prelude::*;
    use serde_json::{Value, json};
    use std::time::Duration;

    fn record(id: &str, liked: bool) -> Value {
        json!({
            "id": id,
            "created_at": "2024-01-15T10:00:00Z",
            "width": 3000,
            "height": 2000,
            "description": null,
            "liked_by_user": liked,
            "urls": {
                "thumb": format!("https://images.example/{id}/thumb"),
                "full": format!("https://images.example/{id}/full")
            }
        })
    }

    fn page(prefix: &str, count: usize) -> Value {
        Value::Array(
            (0..count)
                .map(|i| record(&format!("{prefix}{i}"), false))
                .collect(),
        )
    }

    fn feed_for(server: &MockServer, store: Arc<dyn CredentialStore>) -> PhotoFeed {
        PhotoFeed::new(
            RequestExecutor::new(),
            Endpoints::new(&server.base_url(), &server.base_url()).unwrap(),
            store,
            DEFAULT_PER_PAGE,
        )
    }

    fn signed_in(server: &MockServer) -> PhotoFeed {
        feed_for(server, Arc::new(MemoryStore::with_token("tok")))
    }

    #[tokio::test]
    async fn two_pages_append_in_server_order() {
        let server = MockServer::start_async().await;
        let first = server.mock(|when, then| {
            when.method(GET)
                .path("/photos")
                .query_param("page", "1")
                .query_param("per_page", "10")
                .header("Authorization", "Bearer tok");
            then.status(200).json_body(page("a", 10));
        });
        let second = server.mock(|when, then| {
            when.method(GET).path("/photos").query_param("page", "2");
            then.status(200).json_body(page("b", 10));
        });

        let feed = signed_in(&server);
        assert_eq!(
            feed.fetch_next_page().await.unwrap(),
            PageFetch::Loaded { page: 1, added: 10 }
        );
        assert_eq!(
            feed.fetch_next_page().await.unwrap(),
            PageFetch::Loaded { page: 2, added: 10 }
        );

        let ids: Vec<String> = feed.photos().into_iter().map(|p| p.id).collect();
        let expected: Vec<String> = (0..10)
            .map(|i| format!("a{i}"))
            .chain((0..10).map(|i| format!("b{i}")))
            .collect();
        assert_eq!(ids, expected);
        assert_eq!(feed.next_page(), 3);
        first.assert();
        second.assert();
    }

    #[tokio::test]
    async fn concurrent_fetch_is_skipped() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.path("/photos");
            then.status(200)
                .delay(Duration::from_millis(100))
                .json_body(page("a", 10));
        });

        let feed = signed_in(&server);
        let (first, second) = tokio::join!(feed.fetch_next_page(), feed.fetch_next_page());

        assert_eq!(first.unwrap(), PageFetch::Loaded { page: 1, added: 10 });
        assert_eq!(second.unwrap(), PageFetch::Skipped);
        assert_eq!(feed.len(), 10);
        mock.assert_hits(1);
    }

    #[tokio::test]
    async fn failed_fetch_leaves_state_untouched() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.path("/photos").query_param("page", "1");
            then.status(200).json_body(page("a", 10));
        });
        let mut failing = server.mock(|when, then| {
            when.path("/photos").query_param("page", "2");
            then.status(503);
        });

        let feed = signed_in(&server);
        feed.fetch_next_page().await.unwrap();
        let before = feed.photos();

        let err = feed.fetch_next_page().await.unwrap_err();
        assert!(matches!(err, Error::ServerError(503)));
        assert_eq!(feed.photos(), before);
        assert_eq!(feed.next_page(), 2);
        assert!(!feed.is_fetching());
        failing.assert_hits(1);

        failing.delete();
        server.mock(|when, then| {
            when.path("/photos").query_param("page", "2");
            then.status(200).json_body(page("b", 10));
        });
        assert_eq!(
            feed.fetch_next_page().await.unwrap(),
            PageFetch::Loaded { page: 2, added: 10 }
        );
    }

    #[tokio::test]
    async fn missing_token_fails_fast() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.path("/photos");
            then.status(200).json_body(page("a", 10));
        });

        let feed = feed_for(&server, Arc::new(MemoryStore::new()));
        let err = feed.fetch_next_page().await.unwrap_err();

        assert!(matches!(err, Error::MissingCredential));
        assert!(!feed.is_fetching());
        assert_eq!(feed.next_page(), 1);
        mock.assert_hits(0);
    }

    #[tokio::test]
    async fn unauthorized_is_distinct_from_server_error() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.path("/photos");
            then.status(401);
        });

        let feed = signed_in(&server);
        let err = feed.fetch_next_page().await.unwrap_err();
        assert!(matches!(err, Error::Unauthorized));
        assert_eq!(feed.next_page(), 1);
    }

    #[tokio::test]
    async fn duplicate_ids_are_dropped() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.path("/photos").query_param("page", "1");
            then.status(200)
                .json_body(json!([record("x", false), record("y", false)]));
        });
        server.mock(|when, then| {
            when.path("/photos").query_param("page", "2");
            then.status(200)
                .json_body(json!([record("y", false), record("z", false)]));
        });

        let feed = signed_in(&server);
        feed.fetch_next_page().await.unwrap();
        assert_eq!(
            feed.fetch_next_page().await.unwrap(),
            PageFetch::Loaded { page: 2, added: 1 }
        );
        let ids: Vec<String> = feed.photos().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, ["x", "y", "z"]);
        assert_eq!(feed.next_page(), 3);
    }

    #[tokio::test]
    async fn announces_appended_photos() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.path("/photos");
            then.status(200).json_body(page("a", 3));
        });

        let feed = signed_in(&server);
        let mut events = feed.subscribe();
        feed.fetch_next_page().await.unwrap();

        assert_eq!(
            events.recv().await.unwrap(),
            FeedEvent::PhotosAppended { start: 0, count: 3 }
        );
    }

    #[tokio::test]
    async fn set_like_uses_post_and_delete_without_local_change() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.path("/photos");
            then.status(200).json_body(json!([record("p1", false)]));
        });
        let like = server.mock(|when, then| {
            when.method(POST)
                .path("/photos/p1/like")
                .header("Authorization", "Bearer tok");
            then.status(201).json_body(json!({ "photo": { "id": "p1" } }));
        });
        let unlike = server.mock(|when, then| {
            when.method(DELETE).path("/photos/p1/like");
            then.status(200);
        });

        let feed = signed_in(&server);
        feed.fetch_next_page().await.unwrap();

        feed.set_like("p1", true).await.unwrap();
        assert!(!feed.photo("p1").unwrap().is_liked);
        assert!(feed.mark_liked("p1", true));
        assert!(feed.photo("p1").unwrap().is_liked);

        feed.set_like("p1", false).await.unwrap();
        like.assert();
        unlike.assert();
        assert!(!feed.is_liking());
    }

    #[tokio::test]
    async fn second_like_while_busy_is_rejected() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST).path("/photos/p1/like");
            then.status(201).delay(Duration::from_millis(100));
        });

        let feed = signed_in(&server);
        let (first, second) = tokio::join!(feed.set_like("p1", true), feed.set_like("p1", true));

        assert!(first.is_ok());
        assert!(matches!(second, Err(Error::Busy)));
        mock.assert_hits(1);
    }

    #[tokio::test]
    async fn toggle_like_rolls_back_on_failure() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.path("/photos");
            then.status(200).json_body(json!([record("p1", false)]));
        });
        server.mock(|when, then| {
            when.method(POST).path("/photos/p1/like");
            then.status(500);
        });

        let feed = signed_in(&server);
        feed.fetch_next_page().await.unwrap();
        let mut events = feed.subscribe();

        let err = feed.toggle_like("p1").await.unwrap_err();
        assert!(matches!(err, Error::ServerError(500)));
        assert!(!feed.photo("p1").unwrap().is_liked);

        assert_eq!(
            events.recv().await.unwrap(),
            FeedEvent::LikeChanged {
                photo_id: "p1".to_string(),
                liked: true
            }
        );
        assert_eq!(
            events.recv().await.unwrap(),
            FeedEvent::LikeChanged {
                photo_id: "p1".to_string(),
                liked: false
            }
        );
    }

    #[tokio::test]
    async fn toggle_like_keeps_state_on_success() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.path("/photos");
            then.status(200).json_body(json!([record("p1", true)]));
        });
        let unlike = server.mock(|when, then| {
            when.method(DELETE).path("/photos/p1/like");
            then.status(200);
        });

        let feed = signed_in(&server);
        feed.fetch_next_page().await.unwrap();

        assert!(!feed.toggle_like("p1").await.unwrap());
        assert!(!feed.photo("p1").unwrap().is_liked);
        unlike.assert();

        assert!(matches!(
            feed.toggle_like("missing").await,
            Err(Error::PhotoNotFound(id)) if id == "missing"
        ));
    }

    #[tokio::test]
    async fn clear_resets_feed() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.path("/photos");
            then.status(200).json_body(page("a", 4));
        });

        let feed = signed_in(&server);
        feed.fetch_next_page().await.unwrap();
        let mut events = feed.subscribe();

        feed.clear();
        assert!(feed.is_empty());
        assert_eq!(feed.next_page(), 1);
        assert_eq!(events.recv().await.unwrap(), FeedEvent::Cleared);
    }
}
