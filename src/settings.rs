use std::path::PathBuf;
use std::time::Duration;

use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RendererKind {
    #[default]
    Chrome,
    Http,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Settings {
    pub base_url: Url,
    pub online_site_id: String,
    pub activity_select_param: String,
    pub facility_keyword: String,
    pub view_mode: String,
    /// Location used for classes whose row carries none.
    pub facility_name: String,
    pub user_agent: String,
    pub ready_selector: String,
    pub page_load_timeout_secs: u64,
    pub settle_delay_secs: u64,
    pub scroll_passes: u32,
    pub max_retries: u32,
    pub retry_delay_secs: u64,
    pub output_path: PathBuf,
    pub renderer: RendererKind,
    pub headless: bool,
    pub debug_html_path: Option<PathBuf>,
    pub debug: bool,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let config = Config::builder()
            // APP_MAX_RETRIES=5, APP_RENDERER=http, ...
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_default(
                "base_url",
                "https://anc.apm.activecommunities.com/denver/activity/search",
            )?
            .set_default("online_site_id", "0")?
            .set_default("activity_select_param", "2")?
            .set_default("facility_keyword", "Carla Madison")?
            .set_default("view_mode", "list")?
            .set_default("facility_name", "Carla Madison Rec Center")?
            .set_default(
                "user_agent",
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36",
            )?
            .set_default("ready_selector", "tr")?
            .set_default("page_load_timeout_secs", 60)?
            .set_default("settle_delay_secs", 5)?
            .set_default("scroll_passes", 0)?
            .set_default("max_retries", 3)?
            .set_default("retry_delay_secs", 10)?
            .set_default("output_path", "data/schedule.json")?
            .set_default("renderer", "chrome")?
            .set_default("headless", true)?
            .set_default("debug", false)?
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        if settings.max_retries == 0 {
            return Err(ConfigError::Message("max_retries must be at least 1".into()));
        }
        Ok(settings)
    }

    pub fn page_load_timeout(&self) -> Duration {
        Duration::from_secs(self.page_load_timeout_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.settle_delay_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    const VARS: &[&str] = &[
        "APP_MAX_RETRIES",
        "APP_RENDERER",
        "APP_FACILITY_NAME",
        "APP_DEBUG_HTML_PATH",
    ];

    fn clear_vars() {
        for var in VARS {
            // SAFETY: tests touching the environment are serialized.
            unsafe { std::env::remove_var(var) };
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_vars();
        let settings = Settings::from_env().unwrap();
        assert_eq!(settings.max_retries, 3);
        assert_eq!(settings.retry_delay(), Duration::from_secs(10));
        assert_eq!(settings.page_load_timeout(), Duration::from_secs(60));
        assert_eq!(settings.facility_keyword, "Carla Madison");
        assert_eq!(settings.renderer, RendererKind::Chrome);
        assert_eq!(settings.output_path, PathBuf::from("data/schedule.json"));
        assert!(settings.debug_html_path.is_none());
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear_vars();
        unsafe {
            std::env::set_var("APP_MAX_RETRIES", "5");
            std::env::set_var("APP_RENDERER", "http");
            std::env::set_var("APP_FACILITY_NAME", "Main Gym");
            std::env::set_var("APP_DEBUG_HTML_PATH", "/tmp/page.html");
        }
        let settings = Settings::from_env().unwrap();
        clear_vars();

        assert_eq!(settings.max_retries, 5);
        assert_eq!(settings.renderer, RendererKind::Http);
        assert_eq!(settings.facility_name, "Main Gym");
        assert_eq!(settings.debug_html_path, Some(PathBuf::from("/tmp/page.html")));
    }

    #[test]
    #[serial]
    fn test_zero_retries_rejected() {
        clear_vars();
        unsafe { std::env::set_var("APP_MAX_RETRIES", "0") };
        let result = Settings::from_env();
        clear_vars();
        assert!(result.is_err());
    }
}
