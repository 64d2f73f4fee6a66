//! Short-link expansion over HTTP.

use super::matchers::{percent_decode, query_param};
use crate::config::ResolverConfig;
use std::thread;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpandError {
    #[error("network error: {0}")]
    Network(String),
}

/// Turns a short link into the URL it finally lands on.
pub trait UrlExpander {
    fn expand(&mut self, url: &str) -> Result<String, ExpandError>;
}

/// Follows redirects with a blocking `ureq` agent, pausing before every request.
pub struct HttpExpander {
    agent: ureq::Agent,
    delay: Duration,
}

impl HttpExpander {
    pub fn new(config: &ResolverConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(config.request_timeout())
            .redirects(10)
            .user_agent(&config.user_agent)
            .build();
        Self { agent, delay: config.request_delay() }
    }
}

impl UrlExpander for HttpExpander {
    fn expand(&mut self, url: &str) -> Result<String, ExpandError> {
        // Back-to-back requests trip the shortener's bot check.
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }

        let landed = match self.agent.get(url).call() {
            Ok(response) => response.get_url().to_string(),
            // Error pages still carry the URL the redirect chain ended on.
            Err(ureq::Error::Status(code, response)) => {
                tracing::debug!(url, status = code, "short link landed on an error page");
                response.get_url().to_string()
            }
            Err(ureq::Error::Transport(e)) => return Err(ExpandError::Network(e.to_string())),
        };

        Ok(unwrap_interstitial(&landed))
    }
}

/// Unwrap Google's `/sorry/` bot-check page to the URL it would continue to.
pub fn unwrap_interstitial(url: &str) -> String {
    if !url.contains("/sorry/") {
        return url.to_string();
    }
    match query_param(url, "continue") {
        Some(target) if !target.is_empty() => percent_decode(&target).into_owned(),
        _ => url.to_string(),
    }
}
