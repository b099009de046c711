//! The browser capabilities the scraping core consumes.
//!
//! Everything above this module talks to a browser only through [`Page`] and
//! [`Browser`]. The Chromium backend lives in [`chromium`] behind the
//! `browser` feature; tests drive the core with in-memory implementations.

#[cfg(feature = "browser")]
pub mod chromium;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Lifecycle event a navigation waits for before it is considered done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitUntil {
    #[default]
    Load,
    DomContentLoaded,
    NetworkIdle,
}

/// What a completed navigation produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    /// Same-document navigation (e.g. only the hash changed). No response exists.
    SameDocument,
    /// The navigation request was answered with this HTTP status.
    Response { status: u16 },
    /// A navigation request was issued but no response was recorded.
    NoResponse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 768,
        }
    }
}

/// A single browser tab.
///
/// Script evaluation returns structured-clone-serializable values only, so
/// results travel as JSON. Promises returned by `script` are awaited.
#[async_trait]
pub trait Page: Send + Sync {
    async fn goto(&self, url: &str, wait_until: WaitUntil) -> Result<Navigation>;

    async fn wait_for_navigation(&self, wait_until: WaitUntil) -> Result<()>;

    /// URL as seen by the browser process.
    async fn url(&self) -> Result<String>;

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value>;

    async fn type_text(&self, selector: &str, text: &str) -> Result<()>;

    async fn click(&self, selector: &str) -> Result<()>;

    async fn select(&self, selector: &str, value: &str) -> Result<()>;

    async fn element_exists(&self, selector: &str) -> Result<bool>;

    async fn wait_for_selector(&self, selector: &str, visible: bool, timeout: Duration)
        -> Result<()>;

    async fn screenshot(&self, path: &Path, full_page: bool) -> Result<()>;

    async fn set_user_agent(&self, user_agent: &str) -> Result<()>;

    async fn set_viewport(&self, viewport: Viewport) -> Result<()>;

    /// Timeout applied to operations that don't carry their own.
    fn set_default_timeout(&self, timeout: Duration);

    async fn close(&self) -> Result<()>;
}

/// A browser (or browser context) that can open pages.
#[async_trait]
pub trait Browser: Send + Sync {
    async fn new_page(&self) -> Result<Arc<dyn Page>>;

    async fn close(&self) -> Result<()>;
}
