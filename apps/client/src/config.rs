use std::time::Duration;
use url::Url;

/// Default per-request timeout (seconds).
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_API_URL: &str = "http://localhost:3000/api/";

/// Connection settings for the booking API.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Always ends with `/` so endpoint paths join underneath it.
    pub api_base_url: Url,
    pub request_timeout: Duration,
    /// Bearer token for non-interactive use. Interactive sessions pass
    /// the signed-in user's token instead.
    pub auth_token: Option<String>,
}

impl ClientConfig {
    pub fn new(api_base_url: Url) -> Self {
        Self {
            api_base_url: with_trailing_slash(api_base_url),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            auth_token: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Read `.env` and `PAWBOOK_*` environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let api_url =
            std::env::var("PAWBOOK_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.into());
        let api_base_url: Url = api_url
            .parse()
            .map_err(|e| anyhow::anyhow!("PAWBOOK_API_URL is not a valid URL ({}): {}", api_url, e))?;

        let timeout_secs: u64 = match std::env::var("PAWBOOK_REQUEST_TIMEOUT_SECS") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| anyhow::anyhow!("PAWBOOK_REQUEST_TIMEOUT_SECS must be a number"))?,
            Err(_) => DEFAULT_TIMEOUT_SECS,
        };
        if timeout_secs == 0 {
            anyhow::bail!("PAWBOOK_REQUEST_TIMEOUT_SECS must be positive");
        }

        let auth_token = std::env::var("PAWBOOK_AUTH_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty());
        if auth_token.is_none() {
            tracing::debug!("PAWBOOK_AUTH_TOKEN not set, requests go out unauthenticated");
        }

        Ok(Self {
            api_base_url: with_trailing_slash(api_base_url),
            request_timeout: Duration::from_secs(timeout_secs),
            auth_token,
        })
    }
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slash_added() {
        let config = ClientConfig::new("http://api.example.com/v1".parse().unwrap());
        assert_eq!(config.api_base_url.as_str(), "http://api.example.com/v1/");
        assert_eq!(
            config.api_base_url.join("bookings").unwrap().as_str(),
            "http://api.example.com/v1/bookings"
        );
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::new(DEFAULT_API_URL.parse().unwrap());
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert!(config.auth_token.is_none());
        assert_eq!(config.api_base_url.as_str(), DEFAULT_API_URL);
    }
}
