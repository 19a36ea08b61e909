//! Static suite configuration: endpoints, timeouts, and locator tables.
//!
//! Everything here is plain data injected at construction time; there is
//! no process-wide configuration state. Locator tables are configuration,
//! not constants, because the catalog's markup varies across deployments;
//! the defaults below target kinopoisk.ru and its public API.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::locator::{Locator, LocatorSet};

/// Public catalog API endpoint settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiSettings {
    /// API base URL, including version prefix
    pub base_url: String,
    /// API token sent as the `X-API-KEY` header
    pub token: String,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.kinopoisk.dev/v1.4".to_string(),
            token: String::new(),
        }
    }
}

/// Browser-facing site settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiSettings {
    /// Start page of the catalog site
    pub base_url: String,
    /// Run the browser headless
    pub headless: bool,
    /// Window width in pixels
    pub window_width: u32,
    /// Window height in pixels
    pub window_height: u32,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            base_url: "https://www.kinopoisk.ru".to_string(),
            headless: false,
            window_width: 1920,
            window_height: 1080,
        }
    }
}

/// Wait budgets for the suite's poll loops
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitSettings {
    /// Budget for mandatory single-locator resolution
    pub explicit: Duration,
    /// Budget for the document-ready signal after navigation
    pub page_load: Duration,
    /// Silent grace budget for pending async-library activity
    pub dynamic_grace: Duration,
    /// Per-candidate budget when falling back across a locator set
    pub candidate: Duration,
    /// Budget for confirming a typed value echoed back
    pub echo: Duration,
    /// Budget for search results (or a no-results message) to settle
    pub settle: Duration,
    /// Budget for a dismissed overlay to leave the DOM
    pub banner_dismiss: Duration,
    /// Interval between condition checks
    pub poll_interval: Duration,
}

impl Default for WaitSettings {
    fn default() -> Self {
        Self {
            explicit: Duration::from_secs(20),
            page_load: Duration::from_secs(30),
            dynamic_grace: Duration::from_secs(5),
            candidate: Duration::from_secs(5),
            echo: Duration::from_secs(5),
            settle: Duration::from_secs(5),
            banner_dismiss: Duration::from_secs(3),
            poll_interval: Duration::from_millis(crate::wait::DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

/// Locator tables for the search pages, in fallback priority order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatorTable {
    /// Search input candidates
    pub search_inputs: LocatorSet,
    /// Search submit button candidates
    pub search_buttons: LocatorSet,
    /// Result container candidates
    pub search_results: LocatorSet,
    /// Cookie/consent banner dismiss-button candidates
    pub cookie_banner: LocatorSet,
    /// Last-resort locator for scraping result titles off headings
    pub fallback_titles: Locator,
    /// Lower-cased phrases that mean "nothing was found"
    pub no_results_phrases: Vec<String>,
}

impl Default for LocatorTable {
    fn default() -> Self {
        Self {
            search_inputs: LocatorSet::new(vec![
                Locator::xpath("//input[@name='kp_query']"),
                Locator::name("kp_query"),
                Locator::css("header form input[type='text']"),
            ]),
            search_buttons: LocatorSet::new(vec![
                Locator::xpath("//button[@type='submit' and contains(@class, 'search')]"),
                Locator::css("button[type='submit']"),
            ]),
            search_results: LocatorSet::new(vec![
                Locator::xpath(
                    "//div[contains(@class, 'search_results')]//div[contains(@class, 'element')]",
                ),
                Locator::xpath("//a[contains(@href, '/film/')]"),
            ]),
            cookie_banner: LocatorSet::new(vec![
                Locator::xpath("//button[contains(text(), 'Принять')]"),
                Locator::css("[class*='cookies'] button"),
            ]),
            fallback_titles: Locator::xpath(
                "//h1 | //h2 | //h3 | //div[contains(@class, 'title')]",
            ),
            no_results_phrases: vec![
                "ничего не найдено".to_string(),
                "не найдено".to_string(),
                "no results".to_string(),
                "ничего не нашлось".to_string(),
            ],
        }
    }
}

/// Complete suite configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Catalog API settings
    pub api: ApiSettings,
    /// Site/browser settings
    pub ui: UiSettings,
    /// Wait budgets
    pub waits: WaitSettings,
    /// Directory for failure screenshots
    pub screenshots_dir: PathBuf,
    /// Locator tables
    pub locators: LocatorTable,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api: ApiSettings::default(),
            ui: UiSettings::default(),
            waits: WaitSettings::default(),
            screenshots_dir: PathBuf::from("screenshots"),
            locators: LocatorTable::default(),
        }
    }
}

impl Settings {
    /// Defaults overridden from the process environment.
    ///
    /// Loads `.env` first (missing file is fine), then reads:
    /// `API_BASE_URL`, `KINOPOISK_API_TOKEN`, `UI_BASE_URL`, `HEADLESS`,
    /// `WINDOW_WIDTH`, `WINDOW_HEIGHT`, `EXPLICIT_WAIT`,
    /// `PAGE_LOAD_TIMEOUT`, `SCREENSHOTS_DIR`.
    #[must_use]
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let mut settings = Self::default();
        if let Ok(value) = std::env::var("API_BASE_URL") {
            settings.api.base_url = value;
        }
        if let Ok(value) = std::env::var("KINOPOISK_API_TOKEN") {
            settings.api.token = value;
        }
        if let Ok(value) = std::env::var("UI_BASE_URL") {
            settings.ui.base_url = value;
        }
        if let Some(value) = env_bool("HEADLESS") {
            settings.ui.headless = value;
        }
        if let Some(value) = env_u32("WINDOW_WIDTH") {
            settings.ui.window_width = value;
        }
        if let Some(value) = env_u32("WINDOW_HEIGHT") {
            settings.ui.window_height = value;
        }
        if let Some(value) = env_secs("EXPLICIT_WAIT") {
            settings.waits.explicit = value;
        }
        if let Some(value) = env_secs("PAGE_LOAD_TIMEOUT") {
            settings.waits.page_load = value;
        }
        if let Ok(value) = std::env::var("SCREENSHOTS_DIR") {
            settings.screenshots_dir = PathBuf::from(value);
        }
        settings
    }
}

fn env_bool(name: &str) -> Option<bool> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().eq_ignore_ascii_case("true"))
}

fn env_u32(name: &str) -> Option<u32> {
    std::env::var(name).ok().and_then(|value| value.trim().parse().ok())
}

fn env_secs(name: &str) -> Option<Duration> {
    std::env::var(name)
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}
