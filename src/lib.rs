pub mod category;
pub mod error;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod renderer;
pub mod settings;
pub mod snapshot;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::models::ScheduleSnapshot;
use crate::pipeline::ScheduleScraper;
use crate::renderer::{ChromeRenderer, HttpRenderer};
use crate::settings::{RendererKind, Settings};

/// Scrapes the schedule once and writes the snapshot. Any `Err`, including
/// a run that found no classes, should end the process with a failure code.
pub async fn run() -> Result<ScheduleSnapshot, Box<dyn std::error::Error>> {
    let settings = Settings::from_env()?;

    let level = if settings.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_target(false)
        .init();

    info!(
        renderer = ?settings.renderer,
        output = %settings.output_path.display(),
        "starting schedule scrape"
    );

    let snapshot = match settings.renderer {
        RendererKind::Chrome => {
            let renderer = ChromeRenderer::from_settings(&settings);
            ScheduleScraper::new(renderer, &settings).run().await?
        }
        RendererKind::Http => {
            let renderer = HttpRenderer::new(&settings.user_agent)?;
            ScheduleScraper::new(renderer, &settings).run().await?
        }
    };

    info!(count = snapshot.class_count, "scrape finished");
    Ok(snapshot)
}
