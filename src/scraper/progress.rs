//! Scrape progress notifications.

use std::fmt;

use serde::Serialize;

use crate::companies::CompanyType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ProgressType {
    Initializing,
    StartScraping,
    LoggingIn,
    LoginSuccess,
    LoginFailed,
    ChangePassword,
    EndScraping,
    Terminating,
}

impl fmt::Display for ProgressType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProgressType::Initializing => "INITIALIZING",
            ProgressType::StartScraping => "START_SCRAPING",
            ProgressType::LoggingIn => "LOGGING_IN",
            ProgressType::LoginSuccess => "LOGIN_SUCCESS",
            ProgressType::LoginFailed => "LOGIN_FAILED",
            ProgressType::ChangePassword => "CHANGE_PASSWORD",
            ProgressType::EndScraping => "END_SCRAPING",
            ProgressType::Terminating => "TERMINATING",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    pub company: CompanyType,
    #[serde(rename = "type")]
    pub kind: ProgressType,
}

type Listener = Box<dyn Fn(&ProgressEvent) + Send + Sync>;

/// Fans progress events out to subscribers, synchronously and in
/// subscription order.
#[derive(Default)]
pub struct ProgressEmitter {
    listeners: Vec<Listener>,
    verbose: bool,
}

impl ProgressEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also log every event at info level instead of debug.
    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    pub fn subscribe(&mut self, listener: impl Fn(&ProgressEvent) + Send + Sync + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn emit(&self, company: CompanyType, kind: ProgressType) {
        if self.verbose {
            tracing::info!(%company, progress = %kind, "scrape progress");
        } else {
            tracing::debug!(%company, progress = %kind, "scrape progress");
        }
        let event = ProgressEvent { company, kind };
        for listener in &self.listeners {
            listener(&event);
        }
    }
}

impl fmt::Debug for ProgressEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressEmitter")
            .field("listeners", &self.listeners.len())
            .field("verbose", &self.verbose)
            .finish()
    }
}
