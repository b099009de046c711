use anyhow::Result;
use israeli_bank_scrapers::fetch::{fetch_get, fetch_graphql, fetch_post};
use serde::Deserialize;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct CardsResponse {
    cards: Vec<Card>,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct Card {
    last4_digits: String,
}

#[tokio::test]
async fn get_sends_json_headers_and_parses_body() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/cards"))
        .and(header("accept", "application/json"))
        .and(header("authorization", "CALAuthScheme abc"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"{ "cards": [ { "last4Digits": "4580" } ] }"#,
            "application/json",
        ))
        .mount(&server)
        .await;

    let client = reqwest::Client::new();
    let url = format!("{}/api/cards", server.uri());
    let cards: CardsResponse =
        fetch_get(&client, &url, &[("authorization", "CALAuthScheme abc")]).await?;

    assert_eq!(cards.cards[0].last4_digits, "4580");
    Ok(())
}

#[tokio::test]
async fn non_ok_status_is_an_error() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/cards"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let client = reqwest::Client::new();
    let url = format!("{}/api/cards", server.uri());
    let err = fetch_get::<CardsResponse>(&client, &url, &[]).await.unwrap_err();

    assert!(err.to_string().contains("status code 401"));
    Ok(())
}

#[tokio::test]
async fn post_sends_the_body() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/login"))
        .and(body_json(json!({ "username": "dana" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": "t-1" })))
        .mount(&server)
        .await;

    #[derive(Deserialize)]
    struct Token {
        token: String,
    }

    let client = reqwest::Client::new();
    let url = format!("{}/api/login", server.uri());
    let token: Token = fetch_post(&client, &url, &json!({ "username": "dana" }), &[]).await?;

    assert_eq!(token.token, "t-1");
    Ok(())
}

#[tokio::test]
async fn graphql_returns_data() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "cards": [ { "last4Digits": "1234" } ] }
        })))
        .mount(&server)
        .await;

    let client = reqwest::Client::new();
    let url = format!("{}/graphql", server.uri());
    let data: CardsResponse = fetch_graphql(
        &client,
        &url,
        "query { cards { last4Digits } }",
        &json!({}),
        &[],
    )
    .await?;

    assert_eq!(data.cards.len(), 1);
    Ok(())
}

#[tokio::test]
async fn graphql_errors_fail_the_call() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": null,
            "errors": [ { "message": "Unauthorized" } ]
        })))
        .mount(&server)
        .await;

    let client = reqwest::Client::new();
    let url = format!("{}/graphql", server.uri());
    let err = fetch_graphql::<CardsResponse>(&client, &url, "query { cards }", &json!({}), &[])
        .await
        .unwrap_err();

    assert!(err.to_string().contains("Unauthorized"));
    Ok(())
}
