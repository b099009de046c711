use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Months, NaiveDate, TimeZone, Utc};
use chrono_tz::Asia::Jerusalem;
use serde::{Deserialize, Serialize};

use crate::browser::Viewport;
use crate::clock::Clock;
use crate::companies::CompanyType;
use crate::duration::{
    deserialize_duration, deserialize_duration_opt, serialize_duration, serialize_duration_opt,
};

/// Default timeout applied to page operations (30 seconds).
fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_filter_by_date() -> bool {
    true
}

fn default_future_months() -> u32 {
    1
}

/// How the browser is launched and set up.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserOptions {
    /// Run with a visible window instead of headless.
    pub show_browser: bool,

    /// Chrome/Chromium binary. Auto-detected when unset.
    pub executable_path: Option<PathBuf>,

    /// Extra command-line arguments passed to the browser.
    pub args: Vec<String>,

    /// Bound on launching the browser process.
    #[serde(
        deserialize_with = "deserialize_duration_opt",
        serialize_with = "serialize_duration_opt"
    )]
    pub launch_timeout: Option<Duration>,

    /// Viewport applied to the scraping page.
    pub viewport: Option<Viewport>,

    /// User agent applied to the scraping page.
    pub user_agent: Option<String>,

    /// Leave a caller-supplied browser open after scraping.
    pub skip_close_browser: bool,
}

/// Options for a single scrape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperOptions {
    /// Institution to scrape. Informational when an adapter is supplied directly.
    pub company_id: Option<CompanyType>,

    /// Earliest date of interest. Defaults to one year before today.
    pub start_date: Option<NaiveDate>,

    /// Months past the current one to fetch (future installment charges).
    #[serde(default = "default_future_months")]
    pub future_months_to_scrape: u32,

    /// Report installment purchases once, dated at the original purchase.
    pub combine_installments: bool,

    /// Drop transactions dated before the start date.
    #[serde(default = "default_filter_by_date")]
    pub filter_by_date: bool,

    /// Clamp the start date to at most this many months back. Some
    /// institutions reject queries beyond their history window.
    pub max_lookback_months: Option<u32>,

    /// Immediate re-attempts for a navigation answered with a non-2xx status.
    pub navigation_retry_count: u32,

    /// Default timeout for page operations.
    #[serde(
        default = "default_timeout",
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub default_timeout: Duration,

    /// Where to save a screenshot when a scrape fails. If relative, resolved
    /// from the config file location.
    pub screenshot_path: Option<PathBuf>,

    /// Log every progress event at info level.
    pub verbose: bool,

    /// Browser launch and page setup.
    pub browser: BrowserOptions,
}

impl Default for ScraperOptions {
    fn default() -> Self {
        Self {
            company_id: None,
            start_date: None,
            future_months_to_scrape: default_future_months(),
            combine_installments: false,
            filter_by_date: default_filter_by_date(),
            max_lookback_months: None,
            navigation_retry_count: 0,
            default_timeout: default_timeout(),
            screenshot_path: None,
            verbose: false,
            browser: BrowserOptions::default(),
        }
    }
}

impl ScraperOptions {
    /// Load options from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut options: ScraperOptions = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        if let Some(config_dir) = path.parent() {
            options.resolve_paths(config_dir);
        }
        Ok(options)
    }

    /// Load options from a file, or return defaults if the file doesn't exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Resolve relative paths against `config_dir`.
    pub fn resolve_paths(&mut self, config_dir: &Path) {
        if let Some(path) = &self.screenshot_path {
            if path.is_relative() {
                self.screenshot_path = Some(config_dir.join(path));
            }
        }
    }

    /// The first day of interest, after applying the default and the
    /// lookback clamp.
    pub fn effective_start_date(&self, clock: &dyn Clock) -> NaiveDate {
        let today = clock.today();
        let requested = self.start_date.unwrap_or_else(|| {
            today
                .checked_sub_months(Months::new(12))
                .unwrap_or(today)
        });
        match self.max_lookback_months {
            Some(months) => {
                let earliest = today
                    .checked_sub_months(Months::new(months))
                    .unwrap_or(today);
                requested.max(earliest)
            }
            None => requested,
        }
    }

    /// Start of [`effective_start_date`](Self::effective_start_date) in Israel,
    /// as a UTC instant.
    pub fn start_instant(&self, clock: &dyn Clock) -> DateTime<Utc> {
        let midnight = self.effective_start_date(clock).and_time(chrono::NaiveTime::MIN);
        Jerusalem
            .from_local_datetime(&midnight)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
    }
}

/// Returns the default config file path.
///
/// Resolution order:
/// 1. `./scrapers.toml` if it exists in current directory
/// 2. `~/.config/israeli-bank-scrapers/scrapers.toml`
pub fn default_config_path() -> PathBuf {
    let local_config = PathBuf::from("scrapers.toml");
    if local_config.exists() {
        return local_config;
    }

    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("israeli-bank-scrapers").join("scrapers.toml");
    }

    local_config
}
