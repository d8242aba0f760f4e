//! Supagate Server Library
//!
//! This crate provides the HTTP gateway for self-hosted Supabase,
//! including configuration, the Supabase client, request translation
//! and the API routes.

pub mod config;
pub mod gateway;
pub mod routes;

pub use config::{GatewayConfig, ServerConfig, SupabaseConfig};
pub use gateway::*;
pub use routes::{AppState, router};
