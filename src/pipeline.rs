use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use tracing::{error, info, warn};
use url::Url;

use crate::error::ScrapeError;
use crate::models::{FitnessClass, ScheduleSnapshot};
use crate::parser::parse_schedule;
use crate::renderer::PageRenderer;
use crate::settings::Settings;
use crate::snapshot::write_snapshot;

/// Search URL for the facility's class listing.
pub fn build_url(settings: &Settings) -> Url {
    let mut url = settings.base_url.clone();
    url.query_pairs_mut()
        .append_pair("onlineSiteId", &settings.online_site_id)
        .append_pair("activity_select_param", &settings.activity_select_param)
        .append_pair("activity_keyword", &settings.facility_keyword)
        .append_pair("viewMode", &settings.view_mode);
    url
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Linear backoff: the wait after attempt `n` is `base_delay * n`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }
}

pub struct ScheduleScraper<R> {
    renderer: R,
    url: Url,
    ready_selector: String,
    timeout: Duration,
    default_location: String,
    retry: RetryPolicy,
    output_path: PathBuf,
    debug_html_path: Option<PathBuf>,
}

impl<R: PageRenderer> ScheduleScraper<R> {
    pub fn new(renderer: R, settings: &Settings) -> Self {
        Self {
            renderer,
            url: build_url(settings),
            ready_selector: settings.ready_selector.clone(),
            timeout: settings.page_load_timeout(),
            default_location: settings.facility_name.clone(),
            retry: RetryPolicy {
                max_attempts: settings.max_retries.max(1),
                base_delay: settings.retry_delay(),
            },
            output_path: settings.output_path.clone(),
            debug_html_path: settings.debug_html_path.clone(),
        }
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Scrapes, then writes the snapshot whatever the outcome. The snapshot
    /// is returned only when it holds at least one class; an empty one is
    /// still written, and the error that ended the last attempt is returned.
    pub async fn run(&self) -> Result<ScheduleSnapshot, ScrapeError> {
        let (classes, failure) = match self.fetch_classes().await {
            Ok(classes) => (classes, None),
            Err(err) => (Vec::new(), Some(err)),
        };

        let snapshot = ScheduleSnapshot::new(classes, Utc::now());
        if let Err(err) = write_snapshot(&self.output_path, &snapshot).await {
            error!(path = %self.output_path.display(), error = %err, "failed to save snapshot");
            return Err(err.into());
        }
        info!(
            path = %self.output_path.display(),
            count = snapshot.class_count,
            "snapshot saved"
        );

        match failure {
            None => Ok(snapshot),
            Some(err) => Err(err),
        }
    }

    /// Render and parse until one attempt yields classes or attempts run out.
    /// Never returns `Ok` with an empty list.
    pub async fn fetch_classes(&self) -> Result<Vec<FitnessClass>, ScrapeError> {
        let max_attempts = self.retry.max_attempts;
        let mut last_error = None;
        info!(url = %self.url, max_attempts, "fetching schedule");

        for attempt in 1..=max_attempts {
            info!(attempt, max_attempts, "scrape attempt");

            match self.attempt(attempt).await {
                Ok(classes) => {
                    info!(attempt, count = classes.len(), "scraped classes");
                    return Ok(classes);
                }
                Err(err) => {
                    error!(attempt, error = %err, "attempt failed");
                    last_error = Some(err);
                }
            }

            if attempt < max_attempts {
                let delay = self.retry.delay_after(attempt);
                info!(attempt, ?delay, "retrying after backoff");
                tokio::time::sleep(delay).await;
            }
        }

        let err = last_error.unwrap_or(ScrapeError::EmptyResult {
            attempts: max_attempts,
        });
        error!(attempts = max_attempts, error = %err, "all attempts failed");
        Err(err)
    }

    async fn attempt(&self, attempt: u32) -> Result<Vec<FitnessClass>, ScrapeError> {
        let markup = self
            .renderer
            .render(&self.url, &self.ready_selector, self.timeout)
            .await?;

        if let Some(path) = &self.debug_html_path {
            match tokio::fs::write(path, &markup).await {
                Ok(()) => info!(attempt, path = %path.display(), "saved rendered page"),
                Err(err) => warn!(attempt, path = %path.display(), error = %err, "failed to save rendered page"),
            }
        }

        let classes = parse_schedule(&markup, &self.default_location);
        if classes.is_empty() {
            return Err(ScrapeError::EmptyResult { attempts: attempt });
        }
        Ok(classes)
    }
}
