use std::time::Duration;

use slugge_store::share_tokens::DEFAULT_TOKEN_TTL_DAYS;

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Browser origin allowed by CORS (with credentials).
    pub frontend_origin: String,
    /// Prefix for minted share links; the token is appended as a path segment.
    pub share_base_url: String,
    pub billing_base_url: String,
    /// Serve the demo user from the auth endpoints instead of rejecting.
    pub demo_mode: bool,
    pub share_token_ttl_days: i64,
    pub max_send_queue: usize,
    pub heartbeat_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8000,
            frontend_origin: "http://localhost:5173".into(),
            share_base_url: "http://localhost:5173/share".into(),
            billing_base_url: "https://billing.example.com".into(),
            demo_mode: true,
            share_token_ttl_days: DEFAULT_TOKEN_TTL_DAYS,
            max_send_queue: 256,
            heartbeat_interval: Duration::from_secs(30),
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn share_url(&self, token: &str) -> String {
        format!("{}/{}", self.share_base_url.trim_end_matches('/'), token)
    }

    pub fn billing_url(&self, path: &str) -> String {
        format!("{}/{}", self.billing_base_url.trim_end_matches('/'), path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr(), "127.0.0.1:8000");
        assert!(config.demo_mode);
        assert_eq!(config.share_token_ttl_days, 30);
    }

    #[test]
    fn share_url_joins_token() {
        let config = ServerConfig {
            share_base_url: "https://app.test/share/".into(),
            ..Default::default()
        };
        assert_eq!(config.share_url("abc"), "https://app.test/share/abc");
        assert_eq!(
            ServerConfig::default().share_url("abc"),
            "http://localhost:5173/share/abc"
        );
    }

    #[test]
    fn billing_urls() {
        let config = ServerConfig::default();
        assert_eq!(
            config.billing_url("checkout/demo"),
            "https://billing.example.com/checkout/demo"
        );
    }
}
