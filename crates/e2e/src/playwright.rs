//! Playwright browser automation
//!
//! A Node.js bridge process owns one browser, one context and one page.
//! Requests and responses are single JSON lines on its stdin and stdout,
//! so page state survives across steps.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command as TokioCommand};
use tracing::{debug, info, warn};

use crate::error::{E2eError, E2eResult};
use crate::locator::Locator;
use crate::page::Page;

const BRIDGE_SCRIPT: &str = include_str!("../js/bridge.js");
const BRIDGE_OPTIONS_VAR: &str = "POS_E2E_BRIDGE_OPTIONS";

/// Extra time allowed for a bridge reply beyond the operation's own timeout
const REPLY_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

/// Configuration for Playwright
#[derive(Debug, Clone)]
pub struct PlaywrightConfig {
    pub base_url: String,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub browser: Browser,
    pub headless: bool,
    /// Record a video of the page into this directory
    pub video_dir: Option<PathBuf>,
    /// `node_modules` directory that provides `playwright`
    pub node_path: Option<PathBuf>,
    pub launch_timeout: Duration,
    pub navigation_timeout: Duration,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            base_url: crate::config::DEFAULT_BASE_URL.to_string(),
            viewport_width: 1280,
            viewport_height: 720,
            browser: Browser::Chromium,
            headless: true,
            video_dir: Some(PathBuf::from("test-results/videos")),
            node_path: None,
            launch_timeout: Duration::from_secs(30),
            navigation_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Serialize)]
struct BridgeOptions<'a> {
    browser: Browser,
    headless: bool,
    viewport_width: u32,
    viewport_height: u32,
    base_url: &'a str,
    video_dir: Option<&'a Path>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum BridgeCommand<'a> {
    Goto { url: &'a str, timeout_ms: u64 },
    Fill { locator: &'a Locator, value: &'a str, timeout_ms: u64 },
    Click { locator: &'a Locator, timeout_ms: u64 },
    IsVisible { locator: &'a Locator },
    WaitVisible { locator: &'a Locator, timeout_ms: u64 },
    Screenshot { path: &'a Path, full_page: bool },
    Close,
}

impl BridgeCommand<'_> {
    fn name(&self) -> &'static str {
        match self {
            BridgeCommand::Goto { .. } => "goto",
            BridgeCommand::Fill { .. } => "fill",
            BridgeCommand::Click { .. } => "click",
            BridgeCommand::IsVisible { .. } => "is_visible",
            BridgeCommand::WaitVisible { .. } => "wait_visible",
            BridgeCommand::Screenshot { .. } => "screenshot",
            BridgeCommand::Close => "close",
        }
    }

    fn locator(&self) -> Option<&Locator> {
        match self {
            BridgeCommand::Fill { locator, .. }
            | BridgeCommand::Click { locator, .. }
            | BridgeCommand::IsVisible { locator }
            | BridgeCommand::WaitVisible { locator, .. } => Some(locator),
            _ => None,
        }
    }

    fn timeout_ms(&self) -> Option<u64> {
        match self {
            BridgeCommand::Goto { timeout_ms, .. }
            | BridgeCommand::Fill { timeout_ms, .. }
            | BridgeCommand::Click { timeout_ms, .. }
            | BridgeCommand::WaitVisible { timeout_ms, .. } => Some(*timeout_ms),
            _ => None,
        }
    }

    fn to_line(&self, id: u64) -> E2eResult<String> {
        let mut value = serde_json::to_value(self)?;
        value["id"] = serde_json::Value::from(id);
        Ok(serde_json::to_string(&value)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
enum BridgeErrorKind {
    Timeout,
    Locator,
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct BridgeFailure {
    kind: BridgeErrorKind,
    message: String,
}

#[derive(Debug, Deserialize)]
struct BridgeResponse {
    id: u64,
    ok: bool,
    #[serde(default)]
    value: serde_json::Value,
    #[serde(default)]
    error: Option<BridgeFailure>,
}

impl BridgeResponse {
    fn into_result(self, command: &BridgeCommand<'_>) -> E2eResult<serde_json::Value> {
        if self.ok {
            return Ok(self.value);
        }

        let failure = self.error.unwrap_or(BridgeFailure {
            kind: BridgeErrorKind::Other,
            message: "no error detail".to_string(),
        });
        let target = command
            .locator()
            .map(ToString::to_string)
            .unwrap_or_else(|| command.name().to_string());

        Err(match failure.kind {
            BridgeErrorKind::Timeout => E2eError::AssertionTimeout {
                what: target,
                timeout_ms: command.timeout_ms().unwrap_or_default(),
            },
            BridgeErrorKind::Locator => E2eError::Locator {
                locator: target,
                reason: first_line(&failure.message),
            },
            BridgeErrorKind::Other => {
                E2eError::Bridge(format!("{} failed: {}", command.name(), first_line(&failure.message)))
            }
        })
    }
}

fn first_line(message: &str) -> String {
    message.lines().next().unwrap_or_default().trim().to_string()
}

#[derive(Debug, Default, Deserialize)]
struct CloseReply {
    #[serde(default)]
    video: Option<PathBuf>,
}

/// A live browser page driven through the Playwright bridge
pub struct PlaywrightSession {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    next_id: u64,
    navigation_timeout: Duration,
    closed: bool,
    _script_dir: tempfile::TempDir,
}

impl PlaywrightSession {
    /// Start the bridge and wait until its page is ready
    pub async fn launch(config: &PlaywrightConfig) -> E2eResult<Self> {
        check_playwright_installed()?;

        if let Some(dir) = &config.video_dir {
            std::fs::create_dir_all(dir)?;
        }

        let script_dir = tempfile::tempdir()?;
        let script_path = script_dir.path().join("bridge.js");
        std::fs::write(&script_path, BRIDGE_SCRIPT)?;

        let video_dir = config.video_dir.as_deref().map(absolute).transpose()?;
        let options = serde_json::to_string(&BridgeOptions {
            browser: config.browser,
            headless: config.headless,
            viewport_width: config.viewport_width,
            viewport_height: config.viewport_height,
            base_url: &config.base_url,
            video_dir: video_dir.as_deref(),
        })?;

        let mut cmd = TokioCommand::new("node");
        cmd.arg(&script_path)
            .env(BRIDGE_OPTIONS_VAR, options)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(node_path) = resolve_node_path(config.node_path.as_deref())? {
            cmd.env("NODE_PATH", node_path);
        }

        info!("Launching {} via Playwright bridge", config.browser.as_str());
        let mut child = cmd
            .spawn()
            .map_err(|e| E2eError::Bridge(format!("failed to spawn node: {}", e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| E2eError::Bridge("bridge stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| E2eError::Bridge("bridge stdout unavailable".to_string()))?;
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(target: "playwright", "{}", line);
                }
            });
        }

        let mut session = Self {
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
            next_id: 1,
            navigation_timeout: config.navigation_timeout,
            closed: false,
            _script_dir: script_dir,
        };

        let ready = tokio::time::timeout(config.launch_timeout, session.read_response(0))
            .await
            .map_err(|_| {
                E2eError::Bridge(format!(
                    "browser not ready after {} ms",
                    config.launch_timeout.as_millis()
                ))
            })??;
        if !ready.ok {
            let message = ready.error.map(|e| e.message).unwrap_or_default();
            return Err(E2eError::Bridge(format!("browser launch failed: {}", message)));
        }
        debug!("Playwright bridge ready: {}", ready.value);

        Ok(session)
    }

    /// Close the page, keeping its video only when asked to
    pub async fn close(mut self, keep_video: bool) -> E2eResult<Option<PathBuf>> {
        let reply = self.request(BridgeCommand::Close, Duration::from_secs(30)).await;
        self.closed = true;
        self.stop().await;

        let video = serde_json::from_value::<CloseReply>(reply?)?.video;
        match video {
            Some(path) if !keep_video => {
                if let Err(e) = std::fs::remove_file(&path) {
                    warn!("Could not remove video {}: {}", path.display(), e);
                }
                Ok(None)
            }
            other => Ok(other),
        }
    }

    async fn request(&mut self, command: BridgeCommand<'_>, timeout: Duration) -> E2eResult<serde_json::Value> {
        if self.closed {
            return Err(E2eError::Bridge("session already closed".to_string()));
        }

        let id = self.next_id;
        self.next_id += 1;

        let mut line = command.to_line(id)?;
        line.push('\n');
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.flush().await?;

        let response = tokio::time::timeout(timeout + REPLY_GRACE, self.read_response(id))
            .await
            .map_err(|_| E2eError::Bridge(format!("no reply to {} within {} ms", command.name(), timeout.as_millis())))??;

        response.into_result(&command)
    }

    async fn read_response(&mut self, id: u64) -> E2eResult<BridgeResponse> {
        loop {
            let line = self
                .stdout
                .next_line()
                .await?
                .ok_or_else(|| E2eError::Bridge("bridge exited unexpectedly".to_string()))?;

            match serde_json::from_str::<BridgeResponse>(&line) {
                Ok(response) if response.id == id => return Ok(response),
                Ok(response) => debug!("Ignoring stale bridge reply {}", response.id),
                Err(_) => debug!(target: "playwright", "{}", line),
            }
        }
    }

    /// Wait briefly for the bridge to exit, then SIGTERM, then kill
    async fn stop(&mut self) {
        let exited = tokio::time::timeout(Duration::from_secs(5), self.child.wait()).await;
        if matches!(exited, Ok(Ok(_))) {
            return;
        }

        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            if let Some(pid) = self.child.id() {
                if kill(Pid::from_raw(pid as i32), Signal::SIGTERM).is_ok()
                    && tokio::time::timeout(Duration::from_millis(500), self.child.wait())
                        .await
                        .is_ok()
                {
                    return;
                }
            }
        }

        let _ = self.child.kill().await;
    }
}

#[async_trait]
impl Page for PlaywrightSession {
    async fn goto(&mut self, url: &str) -> E2eResult<()> {
        let timeout = self.navigation_timeout;
        self.request(
            BridgeCommand::Goto { url, timeout_ms: timeout.as_millis() as u64 },
            timeout,
        )
        .await?;
        Ok(())
    }

    async fn fill(&mut self, locator: &Locator, value: &str, timeout: Duration) -> E2eResult<()> {
        self.request(
            BridgeCommand::Fill { locator, value, timeout_ms: timeout.as_millis() as u64 },
            timeout,
        )
        .await?;
        Ok(())
    }

    async fn click(&mut self, locator: &Locator, timeout: Duration) -> E2eResult<()> {
        self.request(
            BridgeCommand::Click { locator, timeout_ms: timeout.as_millis() as u64 },
            timeout,
        )
        .await?;
        Ok(())
    }

    async fn is_visible(&mut self, locator: &Locator) -> E2eResult<bool> {
        let value = self
            .request(BridgeCommand::IsVisible { locator }, Duration::ZERO)
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn wait_visible(&mut self, locator: &Locator, timeout: Duration) -> E2eResult<()> {
        self.request(
            BridgeCommand::WaitVisible { locator, timeout_ms: timeout.as_millis() as u64 },
            timeout,
        )
        .await?;
        Ok(())
    }

    async fn screenshot(&mut self, path: &Path, full_page: bool) -> E2eResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let path = absolute(path)?;
        self.request(
            BridgeCommand::Screenshot { path: &path, full_page },
            Duration::from_secs(30),
        )
        .await?;
        Ok(())
    }
}

/// Check if Playwright is installed
fn check_playwright_installed() -> E2eResult<()> {
    let output = Command::new("npx")
        .args(["playwright", "--version"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    match output {
        Ok(status) if status.success() => Ok(()),
        _ => Err(E2eError::PlaywrightNotFound),
    }
}

fn resolve_node_path(configured: Option<&Path>) -> E2eResult<Option<PathBuf>> {
    if let Some(path) = configured {
        return Ok(Some(absolute(path)?));
    }
    let local = std::env::current_dir()?.join("node_modules");
    Ok(local.is_dir().then_some(local))
}

fn absolute(path: &Path) -> E2eResult<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}
