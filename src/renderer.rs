use std::ffi::OsStr;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use headless_chrome::{Browser, LaunchOptions, Tab};
use scraper::{Html, Selector};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::settings::Settings;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("readiness selector `{selector}` did not appear within {timeout:?}")]
    Timeout { selector: String, timeout: Duration },
    #[error("{0}")]
    Unavailable(String),
}

/// Produces the fully rendered markup of a page.
pub trait PageRenderer {
    fn render(
        &self,
        url: &Url,
        ready_selector: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<String, RenderError>> + Send;
}

const WINDOW_SIZE: (u32, u32) = (1920, 1080);
const SCROLL_PAUSE: Duration = Duration::from_millis(1500);
/// headless_chrome passes this by default; it sets `navigator.webdriver`.
const IGNORED_DEFAULT_ARGS: &[&str] = &["--enable-automation"];
const SCROLL_TO_BOTTOM: &str =
    "window.scrollTo(0, document.body.scrollHeight); document.body.scrollHeight";

/// Drives a fresh headless Chrome for every render call.
#[derive(Clone, Debug)]
pub struct ChromeRenderer {
    user_agent: String,
    settle_delay: Duration,
    scroll_passes: u32,
    headless: bool,
}

impl ChromeRenderer {
    pub fn new(user_agent: impl Into<String>, settle_delay: Duration) -> Self {
        Self {
            user_agent: user_agent.into(),
            settle_delay,
            scroll_passes: 0,
            headless: true,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.user_agent.clone(), settings.settle_delay())
            .with_scroll_passes(settings.scroll_passes)
            .with_headless(settings.headless)
    }

    pub fn with_scroll_passes(mut self, passes: u32) -> Self {
        self.scroll_passes = passes;
        self
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    fn launch_options(&self, timeout: Duration) -> Result<LaunchOptions<'static>, RenderError> {
        // Chrome exits on its own if we somehow never get to tear it down.
        let idle = timeout + self.settle_delay + Duration::from_secs(30);
        LaunchOptions::default_builder()
            .headless(self.headless)
            .sandbox(false)
            .window_size(Some(WINDOW_SIZE))
            .idle_browser_timeout(idle)
            .ignore_default_args(IGNORED_DEFAULT_ARGS.iter().map(OsStr::new).collect())
            .args(vec![
                OsStr::new("--disable-blink-features=AutomationControlled"),
                OsStr::new("--disable-dev-shm-usage"),
                OsStr::new("--disable-gpu"),
            ])
            .build()
            .map_err(|err| RenderError::Unavailable(format!("invalid launch options: {err}")))
    }

    fn render_blocking(
        &self,
        url: &str,
        ready_selector: &str,
        timeout: Duration,
    ) -> Result<String, RenderError> {
        let session = BrowserSession::launch(self.launch_options(timeout)?)?;
        let tab = &session.tab;

        // Registers its patches for every new document, so it has to run
        // before navigation. It rewrites the user agent, hence ours after.
        tab.enable_stealth_mode()
            .map_err(unavailable("failed to enable stealth mode"))?;
        tab.set_user_agent(&self.user_agent, Some("en-US,en"), None)
            .map_err(unavailable("failed to set user agent"))?;
        tab.set_default_timeout(timeout);

        info!(%url, "loading page");
        tab.navigate_to(url)
            .map_err(unavailable("failed to navigate"))?
            .wait_until_navigated()
            .map_err(unavailable("navigation did not complete"))?;

        debug!(selector = ready_selector, ?timeout, "waiting for readiness selector");
        tab.wait_for_element_with_custom_timeout(ready_selector, timeout)
            .map_err(|err| {
                debug!(error = %err, "readiness wait failed");
                RenderError::Timeout {
                    selector: ready_selector.to_string(),
                    timeout,
                }
            })?;

        self.scroll_to_end(tab);

        std::thread::sleep(self.settle_delay);
        tab.get_content()
            .map_err(unavailable("failed to capture page content"))
    }

    /// Scrolls until the page stops growing or the pass budget runs out.
    fn scroll_to_end(&self, tab: &Tab) {
        let mut last_height: Option<f64> = None;
        for pass in 1..=self.scroll_passes {
            let height = match tab.evaluate(SCROLL_TO_BOTTOM, false) {
                Ok(result) => result.value.and_then(|v| v.as_f64()),
                Err(err) => {
                    warn!(error = %err, pass, "scroll failed");
                    return;
                }
            };
            if height.is_some() && height == last_height {
                debug!(pass, "page height stable, done scrolling");
                return;
            }
            last_height = height;
            std::thread::sleep(SCROLL_PAUSE);
        }
    }
}

impl PageRenderer for ChromeRenderer {
    async fn render(
        &self,
        url: &Url,
        ready_selector: &str,
        timeout: Duration,
    ) -> Result<String, RenderError> {
        let renderer = self.clone();
        let url = url.to_string();
        let selector = ready_selector.to_string();

        // headless_chrome is synchronous; keep it off the async workers.
        tokio::task::spawn_blocking(move || renderer.render_blocking(&url, &selector, timeout))
            .await
            .map_err(|err| RenderError::Unavailable(format!("render task aborted: {err}")))?
    }
}

fn unavailable<E: std::fmt::Display>(context: &'static str) -> impl FnOnce(E) -> RenderError {
    move |err| RenderError::Unavailable(format!("{context}: {err}"))
}

/// One browser process and its tab. Dropping the session closes the tab and
/// then the browser, which kills the Chrome process.
struct BrowserSession {
    tab: Arc<Tab>,
    _browser: Browser,
}

impl BrowserSession {
    fn launch(options: LaunchOptions<'_>) -> Result<Self, RenderError> {
        let browser = Browser::new(options).map_err(unavailable("failed to launch browser"))?;
        let tab = browser
            .new_tab()
            .map_err(unavailable("failed to open tab"))?;
        debug!("browser session started");
        Ok(Self {
            tab,
            _browser: browser,
        })
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        if let Err(err) = self.tab.close(false) {
            debug!(error = %err, "tab close failed, browser will be killed");
        }
        debug!("browser session released");
    }
}

/// Plain GET for pages that arrive pre-rendered.
#[derive(Clone, Debug)]
pub struct HttpRenderer {
    client: reqwest::Client,
}

impl HttpRenderer {
    pub fn new(user_agent: &str) -> Result<Self, RenderError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(unavailable("failed to build HTTP client"))?;
        Ok(Self { client })
    }
}

impl PageRenderer for HttpRenderer {
    async fn render(
        &self,
        url: &Url,
        ready_selector: &str,
        timeout: Duration,
    ) -> Result<String, RenderError> {
        let as_timeout = |err: reqwest::Error| {
            if err.is_timeout() {
                RenderError::Timeout {
                    selector: ready_selector.to_string(),
                    timeout,
                }
            } else {
                RenderError::Unavailable(err.to_string())
            }
        };

        info!(%url, "fetching page");
        let response = self
            .client
            .get(url.as_str())
            .timeout(timeout)
            .send()
            .await
            .map_err(as_timeout)?
            .error_for_status()
            .map_err(as_timeout)?;
        let body = response.text().await.map_err(as_timeout)?;

        if !contains_selector(&body, ready_selector)? {
            return Err(RenderError::Timeout {
                selector: ready_selector.to_string(),
                timeout,
            });
        }
        Ok(body)
    }
}

fn contains_selector(markup: &str, selector: &str) -> Result<bool, RenderError> {
    let selector = Selector::parse(selector).map_err(|err| {
        RenderError::Unavailable(format!("invalid readiness selector `{selector}`: {err}"))
    })?;
    Ok(Html::parse_document(markup).select(&selector).next().is_some())
}
