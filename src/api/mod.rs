//! API Module
//!
//! HTTP handlers and routing for the cache server REST API.
//!
//! # Endpoints
//! - `PUT /set` - Store a value
//! - `GET /get/:key` - Retrieve a value by key
//! - `DELETE /del/:key` - Delete a key
//! - `POST /add`, `POST /replace`, `POST /touch` - Conditional writes
//! - `POST /sweep` - Delete expired entries
//! - `DELETE /clear` - Empty the store
//! - `GET /raw/:key` - Stored envelope
//! - `GET /stats` - Get cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
