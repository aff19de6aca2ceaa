//! Future-returning execution on top of any [`BackendService`].
//!
//! The bridge only wires a transport's completion handler into a [`Promise`]; it
//! never alters, drops or synthesizes results, and imposes no timeout of its own.

use crate::backend::BackendService;
use crate::future::{Future, Promise};
use crate::recovery::Recoverable;
use crate::request::Request;
use crate::Error;

/// Extension methods returning a [`Future`] instead of taking a completion handler.
///
/// Implemented for every [`BackendService`]. The returned [`Future`] shares its
/// result between all observers, so unlike [`BackendService::execute`] the
/// response and error types must be `Sync` as well as `Send`.
///
/// # Examples
///
/// ```no_run
/// use hyperspace::{Backend, FutureBackendExt, TypedRequest};
/// use http::Method;
/// use serde::Deserialize;
///
/// #[derive(Debug, Clone, Deserialize)]
/// struct User {
///     id: u64,
///     name: String,
/// }
///
/// # async fn example() -> Result<(), hyperspace::Error> {
/// let backend = Backend::builder().build()?;
/// let request = TypedRequest::builder(Method::GET, "https://api.example.com/users/1")?
///     .decode_root_key::<User>("data");
///
/// let user = backend.execute_future(request).await?;
/// println!("User: {}", user.name);
/// # Ok(())
/// # }
/// ```
pub trait FutureBackendExt: BackendService {
    /// Executes `request`, returning a future that resolves with its result.
    ///
    /// Returns immediately. The future resolves exactly once, when the transport
    /// calls its completion handler; if it never does, the future stays pending.
    fn execute_future<R>(&self, request: R) -> Future<R::Response, R::Error>
    where
        R: Request + Send + Sync + 'static,
        R::Response: Send + Sync + 'static,
        R::Error: From<Error> + Send + Sync + 'static,
    {
        let promise = Promise::new();
        let future = promise.future();

        self.execute(request, move |result| {
            promise.complete(result);
        });

        future
    }

    /// Executes a recoverable request, returning a future that resolves with its
    /// final result.
    ///
    /// Any re-issuing happens inside the transport; the future resolves once, after
    /// the last attempt.
    fn execute_recoverable_future<R>(&self, recoverable: R) -> Future<R::Response, R::Error>
    where
        R: Recoverable + Send + Sync + 'static,
        R::Response: Send + Sync + 'static,
        R::Error: From<Error> + Send + Sync + 'static,
    {
        let promise = Promise::new();
        let future = promise.future();

        self.execute_recoverable(recoverable, move |result| {
            promise.complete(result);
        });

        future
    }
}

impl<B: BackendService> FutureBackendExt for B {}
