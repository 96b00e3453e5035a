//! Executes one logical operation as a chain of HTTP calls.

use log::{debug, warn};
use serde_json::{Map, Value as JsonValue};
use std::sync::Arc;
use std::time::Instant;

use super::{PendingRequest, RawResponse, RestOperation};
use crate::balancer::{operation_url, Balancer};
use crate::error::{Result, StorageLinkError};
use crate::models::{ApiResponse, ItemsPage, RawItem, TablesPage};
use crate::transport::HttpTransport;

/// Continuation state of a paged operation.
#[derive(Debug, Default)]
struct PageCursor {
    items: Vec<RawItem>,
    tables: Vec<String>,
    start_key: Option<JsonValue>,
    start_table: Option<String>,
}

/// Outcome of one page.
enum Step {
    Continue,
    Done(RawResponse),
}

/// Request/pagination engine.
pub struct RestEngine {
    http: Arc<dyn HttpTransport>,
    balancer: Balancer,
    application_key: String,
    authentication_token: Option<String>,
}

impl RestEngine {
    pub fn new(
        http: Arc<dyn HttpTransport>,
        balancer: Balancer,
        application_key: impl Into<String>,
        authentication_token: Option<String>,
    ) -> Self {
        Self {
            http,
            balancer,
            application_key: application_key.into(),
            authentication_token,
        }
    }

    pub fn balancer(&self) -> &Balancer {
        &self.balancer
    }

    pub fn application_key(&self) -> &str {
        &self.application_key
    }

    /// Run `request` until its last page and return the assembled result.
    pub async fn execute(&self, request: &PendingRequest) -> Result<RawResponse> {
        let operation = request.operation;
        let started = Instant::now();
        let mut cursor = PageCursor::default();
        let mut pages = 0usize;

        loop {
            let endpoint = self.balancer.resolve().await?;
            let url = operation_url(&endpoint.url, operation.name());
            let body = self.encode_body(request, &cursor)?;

            debug!(
                "[STORAGE_REST] POST {} (page {}, cached_endpoint={})",
                url,
                pages + 1,
                endpoint.from_cache
            );

            let text = match self.http.post(&url, body).await {
                Ok(text) => text,
                Err(e) if e.is_transport() && endpoint.from_cache => {
                    warn!(
                        "[STORAGE_REST] {} failed on cached endpoint, resolving again: {}",
                        operation, e
                    );
                    self.balancer.invalidate();
                    continue;
                }
                Err(e) => {
                    warn!("[STORAGE_REST] {} failed: {}", operation, e);
                    return Err(e);
                }
            };
            pages += 1;

            let response: ApiResponse = serde_json::from_str(&text)?;
            if let Some(error) = response.error {
                warn!(
                    "[STORAGE_REST] {} server error: code={} message=\"{}\"",
                    operation, error.code, error.message
                );
                return Err(StorageLinkError::ServerError {
                    code: error.code,
                    message: error.message,
                });
            }

            match Self::absorb_page(request, &mut cursor, response.data)? {
                Step::Continue => continue,
                Step::Done(raw) => {
                    debug!(
                        "[STORAGE_REST] {} complete: pages={} total_ms={}",
                        operation,
                        pages,
                        started.elapsed().as_millis()
                    );
                    return Ok(raw);
                }
            }
        }
    }

    /// Serialize the request body with credentials and continuation tokens.
    fn encode_body(&self, request: &PendingRequest, cursor: &PageCursor) -> Result<String> {
        let mut body = Map::with_capacity(request.body.len() + 3);
        body.insert(
            "applicationKey".to_string(),
            JsonValue::String(self.application_key.clone()),
        );
        if let Some(token) = &self.authentication_token {
            body.insert(
                "authenticationToken".to_string(),
                JsonValue::String(token.clone()),
            );
        }
        for (name, value) in &request.body {
            body.insert(name.clone(), value.clone());
        }
        if let Some(start_key) = &cursor.start_key {
            body.insert("startKey".to_string(), start_key.clone());
        }
        if let Some(start_table) = &cursor.start_table {
            body.insert(
                "startTable".to_string(),
                JsonValue::String(start_table.clone()),
            );
        }

        serde_json::to_string(&body).map_err(|e| StorageLinkError::EncodeError(e.to_string()))
    }

    fn absorb_page(
        request: &PendingRequest,
        cursor: &mut PageCursor,
        data: JsonValue,
    ) -> Result<Step> {
        let operation = request.operation;

        if operation.pages_items() {
            let page: ItemsPage = serde_json::from_value(data)?;
            let next = page.next_token().cloned();
            cursor.items.extend(page.items);

            let below_limit = match (operation, request.limit) {
                (RestOperation::QueryItems, Some(limit)) => cursor.items.len() < limit,
                _ => true,
            };

            return Ok(match next {
                Some(token) if below_limit => {
                    cursor.start_key = Some(token);
                    Step::Continue
                }
                _ => Step::Done(RawResponse::Items(std::mem::take(&mut cursor.items))),
            });
        }

        if operation == RestOperation::ListTables {
            let page: TablesPage = serde_json::from_value(data)?;
            let next = page.next_token().map(str::to_string);
            cursor.tables.extend(page.tables);

            return Ok(match next {
                Some(token) => {
                    cursor.start_table = Some(token);
                    Step::Continue
                }
                None => Step::Done(RawResponse::Tables(std::mem::take(&mut cursor.tables))),
            });
        }

        Ok(Step::Done(RawResponse::Data(data)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Answers posts from a script and records the decoded bodies.
    #[derive(Default)]
    struct Script {
        answers: Mutex<VecDeque<Result<String>>>,
        bodies: Mutex<Vec<JsonValue>>,
    }

    #[async_trait]
    impl HttpTransport for Script {
        async fn get(&self, _url: &str) -> Result<String> {
            Ok(r#"{"url":"http://node"}"#.to_string())
        }

        async fn post(&self, _url: &str, body: String) -> Result<String> {
            self.bodies
                .lock()
                .unwrap()
                .push(serde_json::from_str(&body).unwrap());
            self.answers
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(StorageLinkError::TransportError("script empty".into())))
        }
    }

    fn engine(answers: Vec<Result<String>>) -> (RestEngine, Arc<Script>) {
        let script = Arc::new(Script {
            answers: Mutex::new(answers.into()),
            bodies: Mutex::new(Vec::new()),
        });
        let balancer = Balancer::new(script.clone(), "http://node", false, false, "app");
        let engine = RestEngine::new(script.clone(), balancer, "app", Some("token".into()));
        (engine, script)
    }

    fn ok(data: JsonValue) -> Result<String> {
        Ok(json!({ "data": data }).to_string())
    }

    #[tokio::test]
    async fn test_body_carries_credentials_and_tokens() {
        let (engine, script) = engine(vec![
            ok(json!({"items": [{"id": 1}], "stopKey": {"id": 1}})),
            ok(json!({"items": [{"id": 2}]})),
        ]);
        let request = PendingRequest::for_table(RestOperation::ListItems, "t");

        let raw = engine.execute(&request).await.unwrap();
        assert_eq!(
            raw,
            RawResponse::Items(vec![
                json!({"id": 1}).as_object().unwrap().clone(),
                json!({"id": 2}).as_object().unwrap().clone(),
            ])
        );

        let bodies = script.bodies.lock().unwrap();
        assert_eq!(bodies[0]["applicationKey"], "app");
        assert_eq!(bodies[0]["authenticationToken"], "token");
        assert!(bodies[0].get("startKey").is_none());
        assert_eq!(bodies[1]["startKey"], json!({"id": 1}));
    }

    #[tokio::test]
    async fn test_query_without_limit_follows_every_token() {
        let (engine, script) = engine(vec![
            ok(json!({"items": [{"id": 1}], "stopKey": 1})),
            ok(json!({"items": [{"id": 2}], "stopKey": 2})),
            ok(json!({"items": [{"id": 3}]})),
        ]);
        let request = PendingRequest::for_table(RestOperation::QueryItems, "t");

        match engine.execute(&request).await.unwrap() {
            RawResponse::Items(items) => assert_eq!(items.len(), 3),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(script.bodies.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_list_tables_stops_on_empty_token() {
        let (engine, _) = engine(vec![
            ok(json!({"tables": ["a", "b"], "stopTable": "b"})),
            ok(json!({"tables": ["c"], "stopTable": ""})),
        ]);
        let raw = engine
            .execute(&PendingRequest::new(RestOperation::ListTables))
            .await
            .unwrap();
        assert_eq!(
            raw,
            RawResponse::Tables(vec!["a".into(), "b".into(), "c".into()])
        );
    }

    #[tokio::test]
    async fn test_server_error_stops_pagination() {
        let (engine, script) = engine(vec![
            ok(json!({"items": [{"id": 1}], "stopKey": 1})),
            Ok(json!({"error": {"code": 12, "message": "throttled"}}).to_string()),
            ok(json!({"items": []})),
        ]);
        let err = engine
            .execute(&PendingRequest::for_table(RestOperation::ListItems, "t"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), 12);
        assert_eq!(script.bodies.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unparseable_body_is_decode_error() {
        let (engine, _) = engine(vec![Ok("<html>".to_string())]);
        let err = engine
            .execute(&PendingRequest::for_table(RestOperation::GetItem, "t"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), 1006);
    }

    #[tokio::test]
    async fn test_transport_error_without_cache_is_not_retried() {
        let (engine, script) = engine(vec![Err(StorageLinkError::TransportError("reset".into()))]);
        let err = engine
            .execute(&PendingRequest::for_table(RestOperation::GetItem, "t"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), 1005);
        assert_eq!(script.bodies.lock().unwrap().len(), 1);
    }
}
