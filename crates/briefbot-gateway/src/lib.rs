//! HTTP gateway: manual trigger and preview endpoints.

pub mod routes;
pub mod server;

pub use server::{AppState, build_router, start};
