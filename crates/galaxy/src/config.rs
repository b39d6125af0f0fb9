//! Runner configuration.

use std::time::Duration;

/// Server used when none is configured.
pub const DEFAULT_SERVER: &str = "https://icfpc2020-api.testkontur.ru";

/// Per-request timeout used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Where `send` goes and how long evaluation may run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Base URL; requests go to `<server>/aliens/send`.
    pub server: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
    /// Rewrite budget for the whole session. `None` is unbounded.
    pub step_limit: Option<u64>,
    /// Report bare expressions fully normalized rather than in WHNF.
    pub normalize_results: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            server: DEFAULT_SERVER.to_string(),
            api_key: None,
            timeout: DEFAULT_TIMEOUT,
            step_limit: None,
            normalize_results: false,
        }
    }
}

impl RunnerConfig {
    /// Full URL of the send endpoint, including the API key if any.
    pub fn send_url(&self) -> String {
        let base = self.server.trim_end_matches('/');
        match &self.api_key {
            Some(key) => format!("{base}/aliens/send?apiKey={key}"),
            None => format!("{base}/aliens/send"),
        }
    }
}
