use std::time::Duration;

use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Per-request cap so a stalled server surfaces as the normal failure path
/// instead of hanging the typing indicator forever.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Serialize)]
struct AskRequest {
    query: String,
}

/// A navigable recommendation from the assistant. Clicking one navigates
/// the whole page to `url`, so the client treats it as opaque.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct LinkCard {
    pub label: String,
    #[serde(default)]
    pub description: String,
    pub url: String,
}

/// Structured reply from `POST /assistant/ask`. Every field is optional on
/// the wire; `answer` gets a fallback at render time.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssistantReply {
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub primary_link: Option<LinkCard>,
    #[serde(default)]
    pub suggestions: Vec<LinkCard>,
    #[serde(default)]
    pub quick_replies: Vec<String>,
}

#[derive(Clone)]
pub struct AssistantClient {
    client: Client,
    base_url: String,
}

impl AssistantClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn ask(&self, query: &str) -> Result<AssistantReply> {
        let url = format!("{}/assistant/ask", self.base_url);

        let request = AskRequest {
            query: query.to_string(),
        };

        let response = self
            .client
            .post(&url)
            .timeout(REQUEST_TIMEOUT)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "assistant request failed with status: {}",
                response.status()
            ));
        }

        let reply: AssistantReply = response.json().await?;
        Ok(reply)
    }

    /// Resolve a card url against the site base. Cards usually carry
    /// site-relative paths like `/bookings/`.
    pub fn page_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else if url.starts_with('/') {
            format!("{}{}", self.base_url, url)
        } else {
            format!("{}/{}", self.base_url, url)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_reply_fields_default_when_absent() {
        let reply: AssistantReply = serde_json::from_str(r#"{"answer":"Try Room 4B"}"#)
            .expect("minimal reply should parse");
        assert_eq!(reply.answer.as_deref(), Some("Try Room 4B"));
        assert!(reply.primary_link.is_none());
        assert!(reply.suggestions.is_empty());
        assert!(reply.quick_replies.is_empty());
    }

    #[test]
    fn test_reply_parses_full_shape() {
        let reply: AssistantReply = serde_json::from_str(
            r#"{
                "answer": "Here are some options.",
                "primary_link": {"label": "Open My Bookings", "url": "/bookings/"},
                "suggestions": [{"label": "A", "description": "d", "url": "/a"}],
                "quick_replies": ["Waitlist help"]
            }"#,
        )
        .expect("full reply should parse");
        let primary = reply.primary_link.expect("primary link present");
        assert_eq!(primary.label, "Open My Bookings");
        assert_eq!(primary.description, "");
        assert_eq!(reply.suggestions.len(), 1);
        assert_eq!(reply.suggestions[0].description, "d");
        assert_eq!(reply.quick_replies, vec!["Waitlist help".to_string()]);
    }

    #[test]
    fn test_page_url_resolution() {
        let client = AssistantClient::new("http://localhost:8000/");
        assert_eq!(client.page_url("/bookings/"), "http://localhost:8000/bookings/");
        assert_eq!(client.page_url("waitlist"), "http://localhost:8000/waitlist");
        assert_eq!(client.page_url("https://example.com/x"), "https://example.com/x");
    }

    #[tokio::test]
    async fn test_ask_posts_query_and_parses_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/assistant/ask"))
            .and(header("content-type", "application/json"))
            .and(body_json(serde_json::json!({"query": "room for 10"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "answer": "Try Room 4B",
                "quick_replies": ["Book it"]
            })))
            .mount(&server)
            .await;

        let client = AssistantClient::new(&server.uri());
        let reply = client.ask("room for 10").await.expect("request should succeed");
        assert_eq!(reply.answer.as_deref(), Some("Try Room 4B"));
        assert_eq!(reply.quick_replies, vec!["Book it".to_string()]);
    }

    #[tokio::test]
    async fn test_ask_rejects_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/assistant/ask"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = AssistantClient::new(&server.uri());
        assert!(client.ask("hello").await.is_err());
    }

    #[tokio::test]
    async fn test_ask_rejects_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/assistant/ask"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = AssistantClient::new(&server.uri());
        assert!(client.ask("hello").await.is_err());
    }
}
