//! Stateful services built on the request executor
//!
//! Each service is constructed explicitly and owns its own state; nothing
//! here is a global.

mod avatar;
mod feed;
mod inflight;
mod profile;

pub use avatar::AvatarService;
pub use feed::{DEFAULT_PER_PAGE, FeedEvent, PageFetch, PhotoFeed};
pub use profile::ProfileService;

pub(crate) use inflight::InFlightSlot;
