//! Integration tests using wiremock to simulate HTTP servers.

use http::Method;
use hyperspace::decoding::{DataContainer, DecodableContainer, DecoderConfig, KeyDecoding};
use hyperspace::recovery::{Recoverable, RecoverOnRetryable, RecoverableRequest};
use hyperspace::{
    Backend, BackendService, CachePolicy, Error, FutureBackendExt, Request, TypedRequest,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct TestData {
    id: u32,
    name: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
struct Contained {
    id: u32,
}

#[derive(Debug, Deserialize)]
struct ElementContainer {
    element: Contained,
}

impl DecodableContainer for ElementContainer {
    type Element = Contained;

    fn element(&self) -> &Contained {
        &self.element
    }

    fn into_element(self) -> Contained {
        self.element
    }
}

fn backend() -> Backend {
    Backend::builder().build().unwrap()
}

fn recovering_backend() -> Backend {
    Backend::builder()
        .recovery_strategy(Box::new(RecoverOnRetryable {
            delay: Duration::from_millis(10),
        }))
        .build()
        .unwrap()
}

fn get(mock_server: &MockServer) -> hyperspace::RequestBuilder {
    TypedRequest::builder(Method::GET, format!("{}/test", mock_server.uri())).unwrap()
}

#[tokio::test]
async fn test_root_key_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/test"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(r#"{"data": {"id": 1, "name": "x"}}"#),
        )
        .mount(&mock_server)
        .await;

    let request = get(&mock_server).decode_root_key::<TestData>("data");
    let data = backend().execute_future(request).await.unwrap();

    assert_eq!(
        data,
        TestData {
            id: 1,
            name: "x".to_string()
        }
    );
}

#[tokio::test]
async fn test_root_key_missing() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/test"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"other": {}}"#))
        .mount(&mock_server)
        .await;

    let request = get(&mock_server).decode_root_key::<TestData>("data");
    let result = backend().execute_future(request).await;

    match result {
        Err(Error::ValueNotFound { key, .. }) => assert_eq!(key, "data"),
        _ => panic!("Expected ValueNotFound, got {:?}", result),
    }
}

#[tokio::test]
async fn test_container_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/test"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"element": {"id": 2}}"#))
        .mount(&mock_server)
        .await;

    let request = get(&mock_server).decode_container::<ElementContainer>();
    let element = backend().execute_future(request).await.unwrap();

    assert_eq!(element, Contained { id: 2 });
}

#[tokio::test]
async fn test_data_container_with_snake_case_keys() {
    let mock_server = MockServer::start().await;

    #[derive(Debug, Clone, Deserialize, PartialEq)]
    #[serde(rename_all = "camelCase")]
    struct Profile {
        display_name: String,
    }

    Mock::given(method("GET"))
        .and(path("/test"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(r#"{"data": {"display_name": "Ada"}}"#),
        )
        .mount(&mock_server)
        .await;

    let request = get(&mock_server)
        .decoder(DecoderConfig::default().with_key_decoding(KeyDecoding::ConvertFromSnakeCase))
        .decode_container::<DataContainer<Profile>>();
    let profile = backend().execute_future(request).await.unwrap();

    assert_eq!(profile.display_name, "Ada");
}

#[tokio::test]
async fn test_deserialization_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/test"))
        .respond_with(ResponseTemplate::new(200).set_body_string("invalid json"))
        .mount(&mock_server)
        .await;

    let request = get(&mock_server).decode::<TestData>();
    let result = backend().execute_future(request).await;

    match result {
        Err(Error::DecodingFailed {
            raw_response,
            serde_error,
        }) => {
            assert_eq!(raw_response, "invalid json");
            assert!(serde_error.contains("expected"));
        }
        _ => panic!("Expected DecodingFailed, got {:?}", result),
    }
}

#[tokio::test]
async fn test_http_error_4xx() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/test"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not found"))
        .mount(&mock_server)
        .await;

    let request = get(&mock_server).decode::<TestData>();
    let result = backend().execute_future(request).await;

    match result {
        Err(Error::HttpError {
            status,
            raw_response,
            ..
        }) => {
            assert_eq!(status.as_u16(), 404);
            assert_eq!(raw_response, "Not found");
        }
        _ => panic!("Expected HttpError, got {:?}", result),
    }
}

#[tokio::test]
async fn test_callback_execution() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/test"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[1, 2, 3]"))
        .mount(&mock_server)
        .await;

    let (tx, rx) = tokio::sync::oneshot::channel();
    let request = get(&mock_server).decode::<Vec<u32>>();
    backend().execute(request, move |result| {
        let _ = tx.send(result);
    });

    assert_eq!(rx.await.unwrap().unwrap(), vec![1, 2, 3]);
}

#[tokio::test]
async fn test_headers_and_cache_policy_are_sent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/test"))
        .and(header("user-agent", "test-agent"))
        .and(header("x-api-key", "secret"))
        .and(header("cache-control", "no-cache"))
        .respond_with(ResponseTemplate::new(200).set_body_string("null"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let backend = Backend::builder()
        .default_header("User-Agent", "test-agent")
        .unwrap()
        .build()
        .unwrap();

    let request = get(&mock_server)
        .header("X-Api-Key", "secret")
        .unwrap()
        .cache_policy(CachePolicy::ReloadIgnoringCacheData)
        .decode::<Option<TestData>>();

    assert_eq!(backend.execute_future(request).await.unwrap(), None);
}

#[tokio::test]
async fn test_post_json_body() {
    let mock_server = MockServer::start().await;

    let payload = TestData {
        id: 0,
        name: "New".to_string(),
    };

    Mock::given(method("POST"))
        .and(path("/test"))
        .and(header("content-type", "application/json"))
        .and(body_json(&payload))
        .respond_with(ResponseTemplate::new(201).set_body_json(&TestData {
            id: 1,
            name: "New".to_string(),
        }))
        .mount(&mock_server)
        .await;

    let request = TypedRequest::builder(Method::POST, format!("{}/test", mock_server.uri()))
        .unwrap()
        .json_body(&payload)
        .unwrap()
        .decode::<TestData>();

    let created = backend().execute_future(request).await.unwrap();
    assert_eq!(created.id, 1);
}

#[tokio::test]
async fn test_request_timeout() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/test"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("1")
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&mock_server)
        .await;

    let request = get(&mock_server)
        .timeout(Duration::from_millis(50))
        .decode::<u32>();
    let result = backend().execute_future(request).await;

    assert!(matches!(result, Err(Error::Timeout)), "got {:?}", result);
}

#[tokio::test]
async fn test_recoverable_request_is_reissued() {
    let mock_server = MockServer::start().await;
    let attempt_count = Arc::new(AtomicUsize::new(0));
    let attempt_count_clone = attempt_count.clone();

    // First two requests fail with 500, third succeeds
    Mock::given(method("GET"))
        .and(path("/test"))
        .respond_with(move |_req: &wiremock::Request| {
            let count = attempt_count_clone.fetch_add(1, Ordering::SeqCst);
            if count < 2 {
                ResponseTemplate::new(500).set_body_string("Server error")
            } else {
                ResponseTemplate::new(200).set_body_string(r#"{"id": 1, "name": "Test"}"#)
            }
        })
        .mount(&mock_server)
        .await;

    let request = get(&mock_server).decode::<TestData>();
    let recoverable = RecoverableRequest::new(request, Some(3));
    let data = recovering_backend()
        .execute_recoverable_future(recoverable)
        .await
        .unwrap();

    assert_eq!(data.id, 1);
    assert_eq!(attempt_count.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_recovery_attempts_exhausted() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/test"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Unavailable"))
        .expect(2)
        .mount(&mock_server)
        .await;

    let request = get(&mock_server).decode::<TestData>();
    let recoverable = RecoverableRequest::new(request, Some(1));
    let result = recovering_backend()
        .execute_recoverable_future(recoverable)
        .await;

    match result {
        Err(Error::HttpError { status, .. }) => assert_eq!(status.as_u16(), 503),
        _ => panic!("Expected HttpError, got {:?}", result),
    }
}

#[tokio::test]
async fn test_decoding_failure_is_not_recovered() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/test"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let request = get(&mock_server).decode_root_key::<TestData>("data");
    let recoverable = RecoverableRequest::new(request, None);
    let result = recovering_backend()
        .execute_recoverable_future(recoverable)
        .await;

    assert!(matches!(result, Err(Error::ValueNotFound { .. })));
}

#[tokio::test]
async fn test_non_retryable_error_is_not_recovered() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/test"))
        .respond_with(ResponseTemplate::new(400).set_body_string("Bad request"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let request = get(&mock_server).decode::<TestData>();
    let result = recovering_backend()
        .execute_recoverable_future(RecoverableRequest::new(request, Some(5)))
        .await;

    assert_eq!(result.unwrap_err().status().map(|s| s.as_u16()), Some(400));
}

#[tokio::test]
async fn test_custom_error_type() {
    #[derive(Debug, Clone, PartialEq)]
    enum ApiError {
        Missing(String),
        Other(String),
    }

    impl From<Error> for ApiError {
        fn from(err: Error) -> Self {
            match err {
                Error::ValueNotFound { key, .. } => ApiError::Missing(key),
                other => ApiError::Other(other.to_string()),
            }
        }
    }

    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/test"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"other": {}}"#))
        .mount(&mock_server)
        .await;

    let request = get(&mock_server)
        .decode_root_key::<TestData>("data")
        .map_err(ApiError::from);
    let result = backend().execute_future(request).await;

    assert_eq!(result, Err(ApiError::Missing("data".to_string())));
}

#[tokio::test]
async fn test_observers_on_resolved_future() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/test"))
        .respond_with(ResponseTemplate::new(200).set_body_string("5"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let future = backend().execute_future(get(&mock_server).decode::<u32>());
    assert_eq!(future.clone().await.unwrap(), 5);

    let seen = Arc::new(AtomicUsize::new(0));
    for _ in 0..3 {
        let seen = seen.clone();
        future.on_success(move |value| {
            seen.fetch_add(*value as usize, Ordering::SeqCst);
        });
    }

    assert_eq!(seen.load(Ordering::SeqCst), 15);
}

/// A transport that accepts requests and never answers.
struct SilentBackend;

impl BackendService for SilentBackend {
    fn execute<R, F>(&self, _request: R, _completion: F)
    where
        R: Request + Send + Sync + 'static,
        R::Response: Send + 'static,
        R::Error: From<Error> + Send + 'static,
        F: FnOnce(Result<R::Response, R::Error>) + Send + 'static,
    {
    }

    fn execute_recoverable<R, F>(&self, _recoverable: R, _completion: F)
    where
        R: Recoverable + Send + Sync + 'static,
        R::Response: Send + 'static,
        R::Error: From<Error> + Send + 'static,
        F: FnOnce(Result<R::Response, R::Error>) + Send + 'static,
    {
    }
}

#[tokio::test]
async fn test_future_never_resolves_without_completion() {
    let request = TypedRequest::builder(Method::GET, "https://api.example.com/never")
        .unwrap()
        .decode::<u32>();
    let future = SilentBackend.execute_future(request);

    let outcome = tokio::time::timeout(Duration::from_millis(50), future.clone()).await;
    assert!(outcome.is_err());
    assert!(!future.is_completed());
}
