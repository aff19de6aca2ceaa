//! # Hyperspace - typed requests with pluggable decoding
//!
//! Hyperspace describes an API call once (method, URL, headers, body and the rule
//! for decoding its response) and delivers either a strongly-typed value or a
//! strongly-typed error, through a callback or a future.
//!
//! ## Quick Start
//!
//! ```no_run
//! use hyperspace::{Backend, FutureBackendExt, TypedRequest};
//! use http::Method;
//! use serde::Deserialize;
//!
//! #[derive(Debug, Clone, Deserialize)]
//! struct User {
//!     id: u64,
//!     name: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), hyperspace::Error> {
//!     let backend = Backend::builder()
//!         .default_header("User-Agent", "my-app/1.0")?
//!         .build()?;
//!
//!     // The API wraps every payload as { "data": ... }
//!     let request = TypedRequest::builder(Method::GET, "https://api.example.com/users/123")?
//!         .decode_root_key::<User>("data");
//!
//!     let user = backend.execute_future(request).await?;
//!     println!("User: {}", user.name);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Decoding Strategies
//!
//! Every request carries a transform from raw bytes to `Result<T, E>`. The builder
//! wires in one of the strategies from [`decoding`]:
//!
//! - [`decode`](RequestBuilder::decode) - decode the body directly
//! - [`decode_container`](RequestBuilder::decode_container) - decode an envelope
//!   implementing [`DecodableContainer`](decoding::DecodableContainer) and return its element
//! - [`decode_root_key`](RequestBuilder::decode_root_key) - decode the value under
//!   one top-level key
//! - [`transform`](RequestBuilder::transform) - any custom transform
//!
//! ## Callbacks and Futures
//!
//! Transports implement [`BackendService`], a callback contract. [`FutureBackendExt`]
//! turns any backend into one that returns a [`Future`](future::Future), which can be
//! awaited or observed by any number of callbacks:
//!
//! ```no_run
//! use hyperspace::{Backend, FutureBackendExt, TypedRequest};
//! use hyperspace::recovery::{RecoverOnRetryable, RecoverableRequest};
//! use http::Method;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), hyperspace::Error> {
//! let backend = Backend::builder()
//!     .recovery_strategy(Box::new(RecoverOnRetryable {
//!         delay: Duration::from_millis(100),
//!     }))
//!     .build()?;
//!
//! let request = TypedRequest::builder(Method::GET, "https://api.example.com/feed")?
//!     .decode::<Vec<String>>();
//!
//! let future = backend.execute_recoverable_future(RecoverableRequest::new(request, Some(3)));
//! future.on_success(|items| println!("{} items", items.len()));
//! future.on_failure(|error| eprintln!("Feed failed: {}", error));
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod bridge;
pub mod config;
pub mod decoding;
mod error;
pub mod future;
pub mod recovery;
pub mod request;

pub use backend::{Backend, BackendBuilder, BackendService};
pub use bridge::FutureBackendExt;
pub use config::{CachePolicy, RequestDefaults};
pub use error::{Error, Result};
pub use request::{Request, RequestBuilder, TypedRequest};
