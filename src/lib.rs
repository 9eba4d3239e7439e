//! # imagefeed
//!
//! Data-access layer of an Unsplash photo-feed client.
//!
//! ## Overview
//!
//! imagefeed signs a user in through the OAuth2 authorization-code flow,
//! pages through the photo feed, likes and unlikes photos, and loads the
//! signed-in user's profile and avatar. Every service can be driven from
//! concurrent tasks; overlapping calls are guarded instead of racing.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          App                                │
//! │   Builds every service from one Config and one store        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!          ┌───────────────────┼───────────────────┐
//!          ▼                   ▼                   ▼
//! ┌─────────────────┐ ┌─────────────────┐ ┌─────────────────┐
//! │      Auth       │ │    Services     │ │     Config      │
//! │                 │ │                 │ │                 │
//! │ • Token exchange│ │ • Photo feed    │ │ • Load/Save     │
//! │ • OAuth URLs    │ │ • Profile       │ │ • Env overrides │
//! │ • Cred. stores  │ │ • Avatar        │ │ • Paths         │
//! └─────────────────┘ └─────────────────┘ └─────────────────┘
//!          │                   │
//!          └─────────┬─────────┘
//!                    ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   API (RequestExecutor)                     │
//! │   One HTTP call: status classification and JSON decoding    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`api`] — Endpoints and the typed request executor
//! - [`app`] — Assembly of all services, sign-in and logout
//! - [`auth`] — Credential stores, OAuth helpers, token exchange
//! - [`config`] — Configuration management
//! - [`error`] — Error taxonomy shared by every operation
//! - [`models`] — Photo and profile models with their wire records
//! - [`services`] — Photo feed, profile and avatar services
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use imagefeed::{App, Config, auth::MemoryStore};
//!
//! # async fn demo() -> imagefeed::Result<()> {
//! let app = App::new(Config::default(), Arc::new(MemoryStore::with_token("token")))?;
//! app.feed().fetch_next_page().await?;
//! for photo in app.feed().photos() {
//!     println!("{} {}", photo.id, photo.thumbnail_url);
//! }
//! # Ok(())
//! # }
//! ```

#![doc(html_root_url = "https://docs.rs/imagefeed/0.1.0")]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::return_self_not_must_use)]

pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod paths;
pub mod services;

// Re-export main types for convenience
pub use app::App;
pub use auth::{CredentialStore, EncryptedFileStore, MemoryStore, TokenExchange};
pub use config::Config;
pub use error::{Error, Result};
pub use models::{Photo, Profile, Size};
pub use services::{AvatarService, FeedEvent, PageFetch, PhotoFeed, ProfileService};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
