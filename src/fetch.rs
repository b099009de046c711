//! JSON fetch helpers: direct HTTP through `reqwest`, and `fetch()` issued
//! from inside the logged-in page so the institution's session cookies apply.

use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::browser::Page;

fn json_headers(extra: &[(&str, &str)]) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    for (name, value) in extra {
        let name = HeaderName::from_bytes(name.as_bytes())
            .with_context(|| format!("Invalid header name: {name}"))?;
        let value = HeaderValue::from_str(value)
            .with_context(|| format!("Invalid value for header {name}"))?;
        headers.insert(name, value);
    }
    Ok(headers)
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response, url: &str) -> Result<T> {
    let status = response.status();
    if status != StatusCode::OK {
        anyhow::bail!(
            "sending a request to the institute server returned with status code {}",
            status.as_u16()
        );
    }
    response
        .json::<T>()
        .await
        .with_context(|| format!("Failed to parse JSON response from {url}"))
}

pub async fn fetch_get<T: DeserializeOwned>(
    client: &Client,
    url: &str,
    extra_headers: &[(&str, &str)],
) -> Result<T> {
    let response = client
        .get(url)
        .headers(json_headers(extra_headers)?)
        .send()
        .await
        .with_context(|| format!("GET {url} failed"))?;
    read_json(response, url).await
}

pub async fn fetch_post<T: DeserializeOwned, B: Serialize + ?Sized>(
    client: &Client,
    url: &str,
    body: &B,
    extra_headers: &[(&str, &str)],
) -> Result<T> {
    let response = client
        .post(url)
        .headers(json_headers(extra_headers)?)
        .json(body)
        .send()
        .await
        .with_context(|| format!("POST {url} failed"))?;
    read_json(response, url).await
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GraphqlRequest<'a> {
    operation_name: Option<&'a str>,
    query: &'a str,
    variables: &'a serde_json::Value,
}

#[derive(Deserialize)]
struct GraphqlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

#[derive(Deserialize)]
struct GraphqlError {
    message: String,
}

/// POST a GraphQL query; any entry in `errors` fails the call.
pub async fn fetch_graphql<T: DeserializeOwned>(
    client: &Client,
    url: &str,
    query: &str,
    variables: &serde_json::Value,
    extra_headers: &[(&str, &str)],
) -> Result<T> {
    let request = GraphqlRequest {
        operation_name: None,
        query,
        variables,
    };
    let response: GraphqlResponse<T> = fetch_post(client, url, &request, extra_headers).await?;
    if let Some(first) = response.errors.first() {
        anyhow::bail!("GraphQL request to {url} failed: {}", first.message);
    }
    response
        .data
        .with_context(|| format!("GraphQL response from {url} had no data"))
}

#[derive(Debug, Deserialize)]
struct InPageResponse {
    status: u16,
    body: Option<String>,
}

fn parse_in_page<T: DeserializeOwned>(
    response: InPageResponse,
    url: &str,
    ignore_errors: bool,
) -> Result<Option<T>> {
    let Some(body) = response.body else {
        return Ok(None);
    };
    match serde_json::from_str(&body) {
        Ok(value) => Ok(Some(value)),
        Err(_) if ignore_errors => Ok(None),
        Err(e) => Err(anyhow::anyhow!(
            "fetch within page parse error: {e}, url: {url}, status: {}",
            response.status
        )),
    }
}

/// GET `url` with the page's cookies. A 204 yields `None`; so does an
/// unparseable body when `ignore_errors` is set.
pub async fn fetch_get_within_page<T: DeserializeOwned>(
    page: &dyn Page,
    url: &str,
    ignore_errors: bool,
) -> Result<Option<T>> {
    let script = format!(
        "(async () => {{ const response = await fetch({url}, {{ credentials: 'include' }}); \
         if (response.status === 204) return {{ status: 204, body: null }}; \
         return {{ status: response.status, body: await response.text() }}; }})()",
        url = serde_json::to_string(url)?,
    );
    let raw = page.evaluate(&script).await?;
    let response: InPageResponse =
        serde_json::from_value(raw).context("Unexpected in-page fetch result")?;
    parse_in_page(response, url, ignore_errors)
}

/// POST `body` as JSON from inside the page.
pub async fn fetch_post_within_page<T: DeserializeOwned, B: Serialize + ?Sized>(
    page: &dyn Page,
    url: &str,
    body: &B,
    extra_headers: &[(&str, &str)],
    ignore_errors: bool,
) -> Result<Option<T>> {
    let mut headers = serde_json::Map::new();
    headers.insert(
        "Content-Type".to_string(),
        "application/x-www-form-urlencoded; charset=UTF-8".into(),
    );
    for (name, value) in extra_headers {
        headers.insert((*name).to_string(), (*value).into());
    }
    let script = format!(
        "(async () => {{ const response = await fetch({url}, {{ method: 'POST', body: JSON.stringify({body}), \
         credentials: 'include', headers: {headers} }}); \
         if (response.status === 204) return {{ status: 204, body: null }}; \
         return {{ status: response.status, body: await response.text() }}; }})()",
        url = serde_json::to_string(url)?,
        body = serde_json::to_string(body)?,
        headers = serde_json::Value::Object(headers),
    );
    let raw = page.evaluate(&script).await?;
    let response: InPageResponse =
        serde_json::from_value(raw).context("Unexpected in-page fetch result")?;
    parse_in_page(response, url, ignore_errors)
}
