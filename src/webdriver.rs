//! W3C WebDriver client backing the browser layer.
//!
//! [`WebDriverLauncher`] spawns a `chromedriver` child process per session,
//! waits for it to report ready, and opens a headless Chrome session with
//! the caller's [`ChromeOptions`]. A [`WebDriver`] dropped without
//! [`quit`](BrowserDriver::quit) spawns a best-effort session `DELETE` on
//! the current runtime so chromedriver closes Chrome, and the child is
//! spawned with `kill_on_drop` so the driver process goes away regardless.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use crate::browser::{BrowserDriver, BrowserLauncher, ChromeOptions};
use crate::config::CrawlerConfig;
use crate::crawler::ExtractionError;

const STARTUP_TIMEOUT: Duration = Duration::from_secs(15);
const STARTUP_POLL: Duration = Duration::from_millis(100);

/// Launches `chromedriver`-backed sessions.
pub struct WebDriverLauncher {
    binary: PathBuf,
    port: u16,
    client: reqwest::Client,
}

impl WebDriverLauncher {
    pub fn new(config: &CrawlerConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .build()?;
        Ok(Self {
            binary: config.webdriver_binary.clone(),
            port: config.webdriver_port,
            client,
        })
    }

    fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    fn spawn_driver(&self) -> Result<Child, ExtractionError> {
        Command::new(&self.binary)
            .arg(format!("--port={}", self.port))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                ExtractionError::Browser(format!(
                    "failed to start '{}': {}. Is chromedriver installed?",
                    self.binary.display(),
                    e
                ))
            })
    }

    async fn wait_until_ready(&self, base: &str) -> Result<(), ExtractionError> {
        let deadline = Instant::now() + STARTUP_TIMEOUT;
        loop {
            if let Ok(resp) = self.client.get(format!("{}/status", base)).send().await {
                if let Ok(body) = resp.json::<Value>().await {
                    if body["value"]["ready"].as_bool() == Some(true) {
                        return Ok(());
                    }
                }
            }
            if Instant::now() >= deadline {
                return Err(ExtractionError::Browser(format!(
                    "webdriver at {} not ready after {:?}",
                    base, STARTUP_TIMEOUT
                )));
            }
            tokio::time::sleep(STARTUP_POLL).await;
        }
    }
}

#[async_trait]
impl BrowserLauncher for WebDriverLauncher {
    async fn launch(
        &self,
        options: &ChromeOptions,
    ) -> Result<Box<dyn BrowserDriver>, ExtractionError> {
        let base = self.base_url();
        let mut child = self.spawn_driver()?;

        if let Err(e) = self.wait_until_ready(&base).await {
            let _ = child.kill().await;
            return Err(e);
        }

        let capabilities = json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": { "args": options.args() }
                }
            }
        });
        let value = match send(self.client.post(format!("{}/session", base)).json(&capabilities)).await
        {
            Ok(value) => value,
            Err(e) => {
                let _ = child.kill().await;
                return Err(e);
            }
        };
        let Some(session_id) = value["sessionId"].as_str().map(str::to_string) else {
            let _ = child.kill().await;
            return Err(ExtractionError::Browser(
                "webdriver response carried no sessionId".to_string(),
            ));
        };

        debug!(session_id, "Browser session started");
        Ok(Box::new(WebDriver {
            client: self.client.clone(),
            session_url: format!("{}/session/{}", base, session_id),
            child: Some(child),
            open: true,
        }))
    }
}

/// One live WebDriver session and the driver process serving it.
pub struct WebDriver {
    client: reqwest::Client,
    session_url: String,
    child: Option<Child>,
    open: bool,
}

#[async_trait]
impl BrowserDriver for WebDriver {
    async fn navigate(&mut self, url: &str) -> Result<(), ExtractionError> {
        send(
            self.client
                .post(format!("{}/url", self.session_url))
                .json(&json!({ "url": url })),
        )
        .await?;
        Ok(())
    }

    async fn execute_script(&mut self, script: &str) -> Result<Value, ExtractionError> {
        send(
            self.client
                .post(format!("{}/execute/sync", self.session_url))
                .json(&json!({ "script": script, "args": [] })),
        )
        .await
    }

    async fn page_source(&mut self) -> Result<String, ExtractionError> {
        let value = send(self.client.get(format!("{}/source", self.session_url))).await?;
        match value {
            Value::String(source) => Ok(source),
            other => Err(ExtractionError::Browser(format!(
                "page source is not a string: {}",
                other
            ))),
        }
    }

    async fn quit(&mut self) -> Result<(), ExtractionError> {
        if !self.open {
            return Ok(());
        }
        self.open = false;
        let deleted = send(self.client.delete(&self.session_url)).await;
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill().await {
                warn!(error = %e, "Failed to stop webdriver process");
            }
        }
        deleted.map(|_| ())
    }
}

impl Drop for WebDriver {
    fn drop(&mut self) {
        if !self.open {
            return;
        }
        // Outside a runtime only kill_on_drop applies.
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let request = self.client.delete(&self.session_url);
        let session_url = self.session_url.clone();
        let child = self.child.take();
        handle.spawn(async move {
            if let Err(e) = request.send().await {
                debug!(session_url = %session_url, error = %e, "Session delete on drop failed");
            }
            drop(child);
        });
    }
}

/// Send a WebDriver request and unwrap the `value` envelope.
async fn send(request: reqwest::RequestBuilder) -> Result<Value, ExtractionError> {
    let resp = request
        .send()
        .await
        .map_err(|e| ExtractionError::Browser(e.to_string()))?;
    let status = resp.status();
    let body: Value = resp
        .json()
        .await
        .map_err(|e| ExtractionError::Browser(format!("invalid webdriver response: {}", e)))?;
    let value = body.get("value").cloned().unwrap_or(Value::Null);

    if !status.is_success() {
        let error = value["error"].as_str().unwrap_or("unknown error");
        let message = value["message"].as_str().unwrap_or("");
        return Err(ExtractionError::Browser(format!(
            "webdriver {}: {} {}",
            status, error, message
        )));
    }
    Ok(value)
}
