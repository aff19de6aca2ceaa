//! Example demonstrating the decoding strategies.
//!
//! This example shows how to:
//! - Decode a response directly
//! - Unwrap a `{ "data": ... }` envelope with a container type
//! - Extract a single top-level key
//! - Handle decoding failures
//!
//! Run with: `cargo run --example root_key`

use http::Method;
use hyperspace::decoding::DataContainer;
use hyperspace::{Backend, Error, FutureBackendExt, TypedRequest};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[allow(dead_code)]
struct Post {
    #[serde(rename = "userId")]
    user_id: u32,
    id: u32,
    title: String,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("hyperspace=debug,root_key=info")
        .init();

    let backend = Backend::builder()
        .default_header("Accept", "application/json")?
        .build()?;

    println!("=== Direct Decode ===");
    let request = TypedRequest::builder(Method::GET, "https://jsonplaceholder.typicode.com/posts/1")?
        .decode::<Post>();
    let post = backend.execute_future(request).await?;
    println!("Post {}: {}", post.id, post.title);
    println!();

    println!("=== Root Key Decode ===");
    // reqres.in wraps single resources as { "data": {...}, "support": {...} }
    #[derive(Debug, Clone, Deserialize)]
    struct User {
        id: u32,
        email: String,
    }

    let request = TypedRequest::builder(Method::GET, "https://reqres.in/api/users/2")?
        .decode_root_key::<User>("data");
    match backend.execute_future(request).await {
        Ok(user) => println!("User {}: {}", user.id, user.email),
        Err(e) => println!("Request failed: {}", e),
    }
    println!();

    println!("=== Container Decode ===");
    let request = TypedRequest::builder(Method::GET, "https://reqres.in/api/users/2")?
        .decode_container::<DataContainer<User>>();
    match backend.execute_future(request).await {
        Ok(user) => println!("User {} via container", user.id),
        Err(e) => println!("Request failed: {}", e),
    }
    println!();

    println!("=== Missing Root Key ===");
    let request = TypedRequest::builder(Method::GET, "https://jsonplaceholder.typicode.com/posts/1")?
        .decode_root_key::<Post>("data");
    match backend.execute_future(request).await {
        Err(Error::ValueNotFound { key, path }) => {
            println!("No value for key {:?} in {}", key, path);
        }
        other => println!("Unexpected: {:?}", other.map(|p| p.id)),
    }

    Ok(())
}
