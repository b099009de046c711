//! Element-level helpers adapters compose their login and statement flows from.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

use crate::browser::Page;
use crate::waiting::{wait_until, DEFAULT_POLL_INTERVAL};

pub const DEFAULT_ELEMENT_TIMEOUT: Duration = Duration::from_secs(30);

pub async fn wait_until_element_found(
    page: &dyn Page,
    selector: &str,
    only_visible: bool,
    timeout: Duration,
) -> Result<()> {
    page.wait_for_selector(selector, only_visible, timeout).await
}

pub async fn wait_until_element_disappear(
    page: &dyn Page,
    selector: &str,
    timeout: Duration,
) -> Result<()> {
    wait_until(
        move || async move {
            let present = page.element_exists(selector).await?;
            Ok::<_, anyhow::Error>((!present).then_some(()))
        },
        &format!("waiting for element {selector} to disappear"),
        timeout,
        DEFAULT_POLL_INTERVAL,
    )
    .await
}

pub async fn element_present_on_page(page: &dyn Page, selector: &str) -> Result<bool> {
    page.element_exists(selector).await
}

/// Clear the input at `selector`, then type `value` into it.
pub async fn fill_input(page: &dyn Page, selector: &str, value: &str) -> Result<()> {
    let clear = format!(
        "(() => {{ const el = document.querySelector({}); if (el) el.value = ''; return el !== null; }})()",
        serde_json::to_string(selector)?
    );
    let found = page.evaluate(&clear).await?;
    if found != serde_json::Value::Bool(true) {
        anyhow::bail!("input not found: {selector}");
    }
    page.type_text(selector, value)
        .await
        .with_context(|| format!("Failed to type into {selector}"))
}

pub async fn click_button(page: &dyn Page, selector: &str) -> Result<()> {
    page.click(selector)
        .await
        .with_context(|| format!("Failed to click {selector}"))
}

pub async fn dropdown_select(page: &dyn Page, selector: &str, value: &str) -> Result<()> {
    page.select(selector, value)
        .await
        .with_context(|| format!("Failed to select {value:?} in {selector}"))
}

/// Map every element matching `selector` through `mapper`, a JS function
/// expression taking the element list, and deserialize the result.
pub async fn page_eval_all<T: DeserializeOwned>(
    page: &dyn Page,
    selector: &str,
    mapper: &str,
) -> Result<T> {
    let script = format!(
        "({mapper})(Array.from(document.querySelectorAll({})))",
        serde_json::to_string(selector)?
    );
    let value = page.evaluate(&script).await?;
    serde_json::from_value(value)
        .with_context(|| format!("Unexpected result mapping elements {selector}"))
}
