//! API Module
//!
//! HTTP inspection surface over the active cache.
//!
//! # Endpoints
//! - `PUT /set` - Store a key-value pair
//! - `GET /get/:key` - Retrieve a value by key
//! - `DELETE /del/:key` - Delete a key
//! - `GET /keys?pattern=*` - List keys matching a glob pattern
//! - `POST /incr/:key` - Increment a counter
//! - `POST /expire/:key` - Set a TTL on an existing key
//! - `DELETE /flush` - Remove every key in the namespace
//! - `GET /stats` - Get cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
