use async_trait::async_trait;
use chrono::{DateTime, Utc};
use headless_chrome::{Browser, LaunchOptions, Tab};
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::BrowserConfig;
use crate::utils::error::FetchError;

// Extra time allowed on top of the navigation timeout before the async side gives up
const NAVIGATION_GRACE: Duration = Duration::from_secs(10);
const READY_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderedPage {
    pub url: String,
    pub final_url: String, // After redirects
    pub html: String,
    pub fetched_at: DateTime<Utc>,
    pub response_time_ms: u64,
}

/// Loads a URL and returns the DOM once it has had time to render.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<RenderedPage, FetchError>;
}

/// Launches a fresh headless Chrome for every fetch.
///
/// After the DOM is parsed the fetcher waits `settle_secs` so client-side
/// scripts can fill in live fields. This is a heuristic: a page that renders
/// slower than that yields partially populated content, not an error.
pub struct ChromeFetcher {
    config: BrowserConfig,
}

impl ChromeFetcher {
    pub fn new(config: BrowserConfig) -> Self {
        Self { config }
    }

    pub fn launch_options(config: &BrowserConfig) -> Result<LaunchOptions<'_>, FetchError> {
        let args: Vec<&OsStr> = config.extra_args.iter().map(OsStr::new).collect();

        LaunchOptions::default_builder()
            .headless(true)
            .sandbox(false) // Often needed in containerized environments
            .window_size(Some((config.window_width, config.window_height)))
            .path(config.chrome_path.as_ref().map(PathBuf::from))
            .idle_browser_timeout(config.navigation_timeout() + config.settle_delay() + NAVIGATION_GRACE)
            .args(args)
            .build()
            .map_err(|e| FetchError::Launch(format!("Failed to create launch options: {}", e)))
    }
}

#[async_trait]
impl PageFetcher for ChromeFetcher {
    async fn fetch(&self, url: &str) -> Result<RenderedPage, FetchError> {
        let start_time = Instant::now();
        let timeout = self.config.navigation_timeout();

        tracing::debug!(url = %url, "Loading match page");

        let config = self.config.clone();
        let target = url.to_string();
        let open = tokio::task::spawn_blocking(move || BrowserSession::open(&config, &target));

        // If this times out the blocking task keeps running; its session is
        // still dropped (and the browser killed) when that task finishes.
        let opened = match tokio::time::timeout(timeout + NAVIGATION_GRACE, open).await {
            Ok(joined) => joined.map_err(|e| FetchError::Task(e.to_string()))??,
            Err(_) => {
                return Err(FetchError::Timeout {
                    url: url.to_string(),
                    seconds: timeout.as_secs(),
                })
            }
        };

        // Held across the settle delay, so this future may be dropped while owning it
        let session = BlockingRelease::new(opened);
        tokio::time::sleep(self.config.settle_delay()).await;

        let session = session
            .into_inner()
            .ok_or_else(|| FetchError::Content("browser session already released".to_string()))?;
        let (html, final_url) = tokio::task::spawn_blocking(move || session.read_content())
            .await
            .map_err(|e| FetchError::Task(e.to_string()))??;

        Ok(RenderedPage {
            url: url.to_string(),
            final_url,
            html,
            fetched_at: Utc::now(),
            response_time_ms: start_time.elapsed().as_millis() as u64,
        })
    }
}

/// One browser process plus the tab loading the match page. Dropping the
/// session closes the tab and kills the browser, whichever path got here.
struct BrowserSession {
    tab: Arc<Tab>,
    _browser: Browser,
}

impl BrowserSession {
    fn open(config: &BrowserConfig, url: &str) -> Result<Self, FetchError> {
        let options = ChromeFetcher::launch_options(config)?;
        let browser = Browser::new(options)
            .map_err(|e| FetchError::Launch(format!("Failed to launch browser: {}", e)))?;
        let tab = browser
            .new_tab()
            .map_err(|e| FetchError::Launch(format!("Failed to create tab: {}", e)))?;

        let session = Self {
            tab,
            _browser: browser,
        };
        session.navigate(config, url)?;
        Ok(session)
    }

    fn navigate(&self, config: &BrowserConfig, url: &str) -> Result<(), FetchError> {
        let timeout = config.navigation_timeout();
        let navigation_error = |e: anyhow::Error| FetchError::Navigation {
            url: url.to_string(),
            message: e.to_string(),
        };

        self.tab.set_default_timeout(timeout);
        self.tab
            .set_user_agent(&config.user_agent, None, None)
            .map_err(navigation_error)?;
        self.tab.navigate_to(url).map_err(navigation_error)?;

        self.wait_for_dom_ready(url, timeout)
    }

    /// Waits for `DOMContentLoaded` rather than the full load event.
    fn wait_for_dom_ready(&self, url: &str, timeout: Duration) -> Result<(), FetchError> {
        let started = Instant::now();

        loop {
            let ready_state = self
                .tab
                .evaluate("document.readyState", false)
                .ok()
                .and_then(|object| object.value)
                .and_then(|value| value.as_str().map(str::to_string));

            let parsed = matches!(ready_state.as_deref(), Some("interactive") | Some("complete"));
            if parsed && self.tab.get_url() != "about:blank" {
                return Ok(());
            }

            if started.elapsed() >= timeout {
                return Err(FetchError::Timeout {
                    url: url.to_string(),
                    seconds: timeout.as_secs(),
                });
            }

            std::thread::sleep(READY_POLL_INTERVAL);
        }
    }

    fn read_content(self) -> Result<(String, String), FetchError> {
        let html = self
            .tab
            .get_content()
            .map_err(|e| FetchError::Content(e.to_string()))?;
        let final_url = self.tab.get_url();
        Ok((html, final_url))
    }
}

/// Owns a value whose drop blocks, such as a [`BrowserSession`]. If it is
/// dropped on a runtime thread the value is handed to the blocking pool.
struct BlockingRelease<T: Send + 'static>(Option<T>);

impl<T: Send + 'static> BlockingRelease<T> {
    fn new(value: T) -> Self {
        Self(Some(value))
    }

    fn into_inner(mut self) -> Option<T> {
        self.0.take()
    }
}

impl<T: Send + 'static> Drop for BlockingRelease<T> {
    fn drop(&mut self) {
        let Some(value) = self.0.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn_blocking(move || drop(value));
            }
            Err(_) => drop(value),
        }
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        if let Err(e) = self.tab.close(true) {
            tracing::debug!("Tab close failed during session release: {}", e);
        }
        tracing::trace!("Browser session released");
    }
}
