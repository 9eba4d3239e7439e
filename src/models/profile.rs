//! Profile model and the payloads of the profile/avatar endpoints

use serde::{Deserialize, Serialize};

/// The signed-in user's profile, as shown on the profile screen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Account username (used to look up the avatar)
    pub username: String,
    /// Display name built from first and last name
    pub name: String,
    /// Handle, `@username`
    pub login_name: String,
    /// Optional biography
    pub bio: Option<String>,
}

/// Payload of the `/me` endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileRecord {
    /// Account username
    #[serde(default)]
    pub username: Option<String>,
    /// First name
    #[serde(default)]
    pub first_name: Option<String>,
    /// Last name
    #[serde(default)]
    pub last_name: Option<String>,
    /// Biography
    #[serde(default)]
    pub bio: Option<String>,
}

impl ProfileRecord {
    /// Convert into a [`Profile`]; `None` if the username is missing or empty.
    pub fn into_profile(self) -> Option<Profile> {
        let username = self.username.filter(|u| !u.is_empty())?;

        let name = [self.first_name, self.last_name]
            .into_iter()
            .flatten()
            .filter(|part| !part.trim().is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        Some(Profile {
            login_name: format!("@{username}"),
            username,
            name,
            bio: self.bio.filter(|b| !b.is_empty()),
        })
    }
}

/// Image URLs nested in a user payload
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileImage {
    /// Largest avatar rendition
    pub large: String,
    /// Medium avatar rendition
    #[serde(default)]
    pub medium: Option<String>,
    /// Small avatar rendition
    #[serde(default)]
    pub small: Option<String>,
}

/// Payload of the `/users/{username}` endpoint (only the avatar is consumed)
#[derive(Debug, Clone, Deserialize)]
pub struct UserRecord {
    /// Avatar URLs
    pub profile_image: ProfileImage,
}
