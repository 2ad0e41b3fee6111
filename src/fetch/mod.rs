pub mod page;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::frame::Frame;

/// Default page size for flat-array (GitHub-style) pagination.
const FLAT_PAGE_SIZE: usize = 100;
/// Default page size for wrapped (analytics-style) pagination; the server
/// caps requests at 500.
const WRAPPED_PAGE_SIZE: u64 = 500;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("API request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected response shape: {0}")]
    ResponseShape(String),
}

/// Capability interface the extractors and orchestrator fetch through.
/// Production uses [`Client`]; tests substitute scripted implementations.
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Single GET against a flat-array endpoint (array or single object).
    async fn flat(&self, endpoint: &str, query: &[(String, String)]) -> Result<Frame, FetchError>;

    /// Paginated GET against a flat-array endpoint (`page`/`per_page`,
    /// terminated by an empty or short page).
    async fn flat_paginated(
        &self,
        endpoint: &str,
        query: &[(String, String)],
    ) -> Result<Frame, FetchError>;

    /// Paginated GET against a wrapped endpoint (`page`/`page_size`,
    /// terminated per wrapper shape — see [`page`]).
    async fn wrapped_paginated(
        &self,
        endpoint: &str,
        query: &[(String, String)],
    ) -> Result<Frame, FetchError>;
}

/// Raw JSON GET seam under the [`Client`], so pagination loops are testable
/// without a live server.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get_json(
        &self,
        endpoint: &str,
        query: &[(String, String)],
    ) -> Result<Value, FetchError>;
}

/// Reqwest-backed transport. Every request carries the API key as the basic
/// auth username with an empty password; non-2xx responses surface as
/// transport failures with no retry.
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get_json(
        &self,
        endpoint: &str,
        query: &[(String, String)],
    ) -> Result<Value, FetchError> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!(%url, params = query.len(), "GET");
        let response = self
            .http
            .get(&url)
            .query(query)
            .basic_auth(&self.api_key, Some(""))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json::<Value>().await?)
    }
}

/// Protocol adapter over the two response shapes the API serves.
pub struct Client<T: Transport = HttpTransport> {
    transport: T,
}

impl Client<HttpTransport> {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            transport: HttpTransport {
                http: reqwest::Client::new(),
                base_url: base_url.trim_end_matches('/').to_string(),
                api_key: api_key.to_string(),
            },
        }
    }
}

impl<T: Transport> Client<T> {
    #[cfg(test)]
    fn with_transport(transport: T) -> Self {
        Self { transport }
    }

    async fn flat_pages(
        &self,
        endpoint: &str,
        query: &[(String, String)],
        per_page: usize,
    ) -> Result<Frame, FetchError> {
        let mut frame = Frame::new();
        let mut page_number: u64 = 1;
        loop {
            let mut page_query = query.to_vec();
            page_query.push(("page".to_string(), page_number.to_string()));
            page_query.push(("per_page".to_string(), per_page.to_string()));

            let payload = self.transport.get_json(endpoint, &page_query).await?;
            let rows = page::flat_rows(payload)?;
            if rows.is_empty() {
                break;
            }
            let short = rows.len() < per_page;
            for row in rows {
                frame.push(row);
            }
            if short {
                break;
            }
            page_number += 1;
        }
        debug!(endpoint, rows = frame.len(), pages = page_number, "flat pagination done");
        Ok(frame)
    }

    async fn wrapped_pages(
        &self,
        endpoint: &str,
        query: &[(String, String)],
        page_size: u64,
    ) -> Result<Frame, FetchError> {
        let mut frame = Frame::new();
        let mut page_number: u64 = 1;
        loop {
            let mut page_query = query.to_vec();
            page_query.push(("page".to_string(), page_number.to_string()));
            page_query.push(("page_size".to_string(), page_size.to_string()));

            let payload = self.transport.get_json(endpoint, &page_query).await?;
            let parsed = page::wrapped_page(payload, page_size)?;
            let fetched_so_far = frame.len() as u64 + parsed.rows.len() as u64;
            let last = parsed.is_last(fetched_so_far);
            for row in parsed.rows {
                frame.push(row);
            }
            if last {
                break;
            }
            page_number += 1;
        }
        debug!(endpoint, rows = frame.len(), pages = page_number, "wrapped pagination done");
        Ok(frame)
    }
}

#[async_trait]
impl<T: Transport> Fetch for Client<T> {
    async fn flat(&self, endpoint: &str, query: &[(String, String)]) -> Result<Frame, FetchError> {
        let payload = self.transport.get_json(endpoint, query).await?;
        Ok(Frame::from_records(page::flat_rows(payload)?))
    }

    async fn flat_paginated(
        &self,
        endpoint: &str,
        query: &[(String, String)],
    ) -> Result<Frame, FetchError> {
        self.flat_pages(endpoint, query, FLAT_PAGE_SIZE).await
    }

    async fn wrapped_paginated(
        &self,
        endpoint: &str,
        query: &[(String, String)],
    ) -> Result<Frame, FetchError> {
        self.wrapped_pages(endpoint, query, WRAPPED_PAGE_SIZE).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    /// Transport that serves a fixed sequence of responses and records the
    /// queries it was asked with.
    struct Scripted {
        responses: Mutex<Vec<Value>>,
        calls: Mutex<Vec<Vec<(String, String)>>>,
    }

    impl Scripted {
        fn new(responses: Vec<Value>) -> Self {
            let mut responses = responses;
            responses.reverse();
            Self {
                responses: Mutex::new(responses),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Transport for Scripted {
        async fn get_json(
            &self,
            _endpoint: &str,
            query: &[(String, String)],
        ) -> Result<Value, FetchError> {
            self.calls.lock().unwrap().push(query.to_vec());
            self.responses
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| FetchError::ResponseShape("no scripted response left".into()))
        }
    }

    fn flat_page(start: usize, count: usize) -> Value {
        Value::Array(
            (start..start + count)
                .map(|i| json!({"id": i}))
                .collect::<Vec<_>>(),
        )
    }

    #[tokio::test]
    async fn test_flat_pagination_stops_at_short_page() {
        let client = Client::with_transport(Scripted::new(vec![
            flat_page(0, 3),
            flat_page(3, 3),
            flat_page(6, 2),
        ]));
        let frame = client.flat_pages("/repos/a/x/pulls", &[], 3).await.unwrap();
        assert_eq!(frame.len(), 8);
        assert_eq!(client.transport.call_count(), 3);
        // Concatenation preserves page order.
        let ids: Vec<u64> = frame
            .rows()
            .iter()
            .map(|r| r["id"].as_u64().unwrap())
            .collect();
        assert_eq!(ids, (0..8).collect::<Vec<u64>>());
    }

    #[tokio::test]
    async fn test_flat_pagination_stops_at_empty_page() {
        let client =
            Client::with_transport(Scripted::new(vec![flat_page(0, 3), json!([])]));
        let frame = client.flat_pages("/repos/a/x/pulls", &[], 3).await.unwrap();
        assert_eq!(frame.len(), 3);
        assert_eq!(client.transport.call_count(), 2);
    }

    #[tokio::test]
    async fn test_flat_pagination_sends_page_params() {
        let client = Client::with_transport(Scripted::new(vec![flat_page(0, 1)]));
        client.flat_pages("/repos", &[], 5).await.unwrap();
        let calls = client.transport.calls.lock().unwrap();
        assert!(calls[0].contains(&("page".to_string(), "1".to_string())));
        assert!(calls[0].contains(&("per_page".to_string(), "5".to_string())));
    }

    #[tokio::test]
    async fn test_flat_pagination_propagates_shape_error() {
        let client = Client::with_transport(Scripted::new(vec![json!("not an array")]));
        let err = client.flat_pages("/repos", &[], 5).await.unwrap_err();
        assert!(matches!(err, FetchError::ResponseShape(_)));
    }

    #[tokio::test]
    async fn test_wrapped_data_shape_follows_has_next_page() {
        let client = Client::with_transport(Scripted::new(vec![
            json!({"data": [{"n": 1}], "pagination": {"hasNextPage": true}}),
            json!({"data": [{"n": 2}], "pagination": {"hasNextPage": true}}),
            json!({"data": [{"n": 3}], "pagination": {"hasNextPage": false}}),
        ]));
        let frame = client.wrapped_pages("/analytics/ai-code/commits", &[], 500).await.unwrap();
        assert_eq!(frame.len(), 3);
        assert_eq!(client.transport.call_count(), 3);
    }

    #[tokio::test]
    async fn test_wrapped_items_shape_respects_total_count() {
        let client = Client::with_transport(Scripted::new(vec![
            json!({"items": [{"n": 1}, {"n": 2}], "totalCount": 4, "page": 1, "pageSize": 2}),
            json!({"items": [{"n": 3}, {"n": 4}], "totalCount": 4, "page": 2, "pageSize": 2}),
        ]));
        let frame = client.wrapped_pages("/analytics/ai-code/commits", &[], 2).await.unwrap();
        assert_eq!(frame.len(), 4);
        assert_eq!(client.transport.call_count(), 2);
    }

    #[tokio::test]
    async fn test_wrapped_items_shape_stops_on_short_page() {
        let client = Client::with_transport(Scripted::new(vec![
            json!({"items": [{"n": 1}], "totalCount": 10, "page": 1, "pageSize": 5}),
        ]));
        let frame = client.wrapped_pages("/analytics/ai-code/commits", &[], 5).await.unwrap();
        assert_eq!(frame.len(), 1);
        assert_eq!(client.transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_flat_single_object_is_one_row() {
        let client =
            Client::with_transport(Scripted::new(vec![json!({"full_name": "acme/platform"})]));
        let frame = client.flat("/repos/acme/platform", &[]).await.unwrap();
        assert_eq!(frame.len(), 1);
        assert_eq!(frame.strings("full_name"), vec!["acme/platform"]);
    }
}
