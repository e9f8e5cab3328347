//! Order intake backend for a small online store: catalog listing, server
//! side cart pricing, transactional order placement and a best-effort
//! payment request handoff.

pub mod api;
pub mod config;
pub mod context;
pub mod database;
pub mod entities;
pub mod error;
pub mod middleware;
pub mod money;
pub mod services;

#[cfg(test)]
mod test;

pub use api::create_api_router;
pub use config::Config;
pub use context::AppContext;
