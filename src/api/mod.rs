//! HTTP plumbing for the photo API
//!
//! [`RequestExecutor`] turns a [`RequestDescriptor`] into a typed value or a
//! classified [`Error`](crate::Error). [`Endpoints`] knows every URL the
//! services talk to.

mod executor;

pub use executor::{RequestDescriptor, RequestExecutor};

use url::Url;

use crate::config::Config;
use crate::error::{Error, Result};

/// URL builder for the provider's API and OAuth hosts
#[derive(Debug, Clone)]
pub struct Endpoints {
    api_base: Url,
    auth_base: Url,
}

impl Endpoints {
    /// Create endpoints from the API and OAuth base URLs
    pub fn new(api_base: &str, auth_base: &str) -> Result<Self> {
        Ok(Self {
            api_base: parse_base(api_base)?,
            auth_base: parse_base(auth_base)?,
        })
    }

    /// Create endpoints from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.api_base_url, &config.auth_base_url)
    }

    /// OAuth authorization page, `{auth}/oauth/authorize`
    pub fn authorize(&self) -> Url {
        join(&self.auth_base, &["oauth", "authorize"])
    }

    /// OAuth token endpoint, `{auth}/oauth/token`
    pub fn token(&self) -> Url {
        join(&self.auth_base, &["oauth", "token"])
    }

    /// One page of the photo list
    pub fn photos(&self, page: u32, per_page: u32) -> Url {
        let mut url = join(&self.api_base, &["photos"]);
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("per_page", &per_page.to_string());
        url
    }

    /// Like endpoint of a single photo (POST to like, DELETE to unlike)
    pub fn photo_like(&self, photo_id: &str) -> Url {
        join(&self.api_base, &["photos", photo_id, "like"])
    }

    /// Profile of the signed-in user
    pub fn me(&self) -> Url {
        join(&self.api_base, &["me"])
    }

    /// Public profile of a user; the username is percent-encoded as a path segment
    pub fn user(&self, username: &str) -> Url {
        join(&self.api_base, &["users", username])
    }
}

fn parse_base(raw: &str) -> Result<Url> {
    let url = Url::parse(raw)?;
    if url.cannot_be_a_base() {
        return Err(Error::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase));
    }
    Ok(url)
}

fn join(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    // Bases are checked in `parse_base`, so this never fails.
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}
