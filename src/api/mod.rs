//! API Module
//!
//! HTTP handlers and routing for the cache server REST API.
//!
//! # Endpoints
//! - `PUT /set` - Store a JSON value with optional ttl and tags
//! - `GET /get/:key` - Retrieve a value by key
//! - `DELETE /del/:key` - Delete a key from both tiers
//! - `POST /invalidate/:tag` - Delete every key under a tag
//! - `POST /incr/:key` - Increment a counter
//! - `DELETE /flush` - Clear both tiers
//! - `GET /stats` - Cache statistics
//! - `GET /health` - Per-tier health check

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
