//! Data models for the photo feed

mod photo;
mod profile;
mod token;

pub use photo::{Photo, PhotoRecord, PhotoUrls, Size};
pub use profile::{Profile, ProfileImage, ProfileRecord, UserRecord};
pub use token::OAuthTokenResponse;
