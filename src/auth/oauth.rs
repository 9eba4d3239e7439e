//! OAuth authorization-code flow helpers

use url::Url;

use crate::api::Endpoints;
use crate::config::Config;

/// Path the provider redirects to after the user approves access
pub const NATIVE_REDIRECT_PATH: &str = "/oauth/authorize/native";

/// Get the authorization URL for the user to visit
pub fn authorize_url(endpoints: &Endpoints, config: &Config) -> String {
    format!(
        "{}?client_id={}&redirect_uri={}&response_type=code&scope={}",
        endpoints.authorize(),
        urlencoding::encode(&config.access_key),
        urlencoding::encode(&config.redirect_uri),
        urlencoding::encode(&config.scope),
    )
}

/// Extract the authorization code from the page the login flow ends on.
///
/// Only the native redirect page carries a code; any other URL yields `None`.
pub fn code_from_redirect(redirect: &str) -> Option<String> {
    let url = Url::parse(redirect).ok()?;
    if url.path() != NATIVE_REDIRECT_PATH {
        return None;
    }
    url.query_pairs()
        .find(|(name, _)| name == "code")
        .map(|(_, value)| value.into_owned())
        .filter(|code| !code.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorize_url_carries_client_and_scope() {
        let config = Config {
            access_key: "key 1".to_string(),
            ..Config::default()
        };
        let endpoints = Endpoints::from_config(&config).unwrap();

        let url = authorize_url(&endpoints, &config);
        assert!(url.starts_with("https://unsplash.com/oauth/authorize?client_id=key%201"));
        assert!(url.contains("redirect_uri=urn%3Aietf%3Awg%3Aoauth%3A2.0%3Aoob"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("scope=public%20read_user%20write_likes"));
    }

    #[test]
    fn extracts_code_from_native_redirect() {
        assert_eq!(
            code_from_redirect("https://unsplash.com/oauth/authorize/native?code=abc123").as_deref(),
            Some("abc123")
        );
    }

    #[test]
    fn ignores_other_pages() {
        assert!(code_from_redirect("https://unsplash.com/oauth/authorize?code=abc123").is_none());
        assert!(code_from_redirect("https://unsplash.com/oauth/authorize/native").is_none());
        assert!(code_from_redirect("https://unsplash.com/oauth/authorize/native?code=").is_none());
        assert!(code_from_redirect("not a url").is_none());
    }
}
