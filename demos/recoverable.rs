//! Example demonstrating recoverable requests and future observers.
//!
//! This example shows how to:
//! - Configure transport-owned recovery strategies
//! - Bound the number of re-issues per request
//! - Observe a future with callbacks instead of awaiting it
//!
//! Run with: `cargo run --example recoverable`

use http::Method;
use hyperspace::recovery::{
    FirstOf, RecoverOnRetryable, RecoverableRequest, RecoveryDisposition,
};
use hyperspace::{Backend, Error, FutureBackendExt, TypedRequest};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("hyperspace=info,recoverable=info")
        .init();

    // Retry timeouts immediately, other retryable failures after a short pause
    let backend = Backend::builder()
        .recovery_strategy(Box::new(FirstOf::new(vec![
            Box::new(|error: &Error, _attempt: usize| match error {
                Error::Timeout => RecoveryDisposition::Retry {
                    after: Duration::ZERO,
                },
                _ => RecoveryDisposition::Fail,
            }),
            Box::new(RecoverOnRetryable {
                delay: Duration::from_millis(500),
            }),
        ])))
        .build()?;

    println!("=== Recoverable Request ===");
    // httpbin returns 503 every time, so all attempts fail
    let request = TypedRequest::builder(Method::GET, "https://httpbin.org/status/503")?
        .timeout(Duration::from_secs(5))
        .decode::<serde_json::Value>();

    let future = backend.execute_recoverable_future(RecoverableRequest::new(request, Some(2)));
    future.on_failure(|error| println!("Observer saw failure: {}", error));

    match future.await {
        Ok(value) => println!("Success: {}", value),
        Err(e) => println!("Gave up: {} (retryable: {})", e, e.is_retryable()),
    }

    Ok(())
}
