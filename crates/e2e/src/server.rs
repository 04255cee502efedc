//! Pre-flight reachability check of the POS server under test

use std::time::{Duration, Instant};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::{E2eError, E2eResult};

/// Configuration for the pre-flight probe
#[derive(Debug, Clone)]
pub struct ServerProbe {
    /// Root URL of the POS application
    pub base_url: String,

    /// Give up after this long
    pub startup_timeout: Duration,

    /// Delay between attempts
    pub interval: Duration,
}

impl ServerProbe {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            startup_timeout: Duration::from_secs(30),
            interval: Duration::from_millis(250),
        }
    }

    /// Poll the root URL until the server answers with any HTTP status.
    ///
    /// The root page may redirect to a login form or answer 403, all of
    /// which prove the server is up.
    pub async fn wait_until_reachable(&self) -> E2eResult<()> {
        let url = format!("{}/", self.base_url.trim_end_matches('/'));
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        let start = Instant::now();
        let mut attempts = 0;

        loop {
            attempts += 1;

            match client.get(&url).send().await {
                Ok(resp) => {
                    info!("POS server answered {} at {}", resp.status(), url);
                    return Ok(());
                }
                Err(e) => {
                    if attempts == 1 {
                        info!("Waiting for POS server at {}...", url);
                    }
                    // Connection refused is expected while the server is starting
                    if !e.is_connect() {
                        warn!("Probe error: {}", e);
                    }
                }
            }

            if start.elapsed() >= self.startup_timeout {
                break;
            }
            sleep(self.interval).await;
        }

        Err(E2eError::ServerUnreachable { url, attempts })
    }
}
