//! Lumi - FAQ-grounded answers for multi-tenant customer messaging
//!
//! This library turns an end-user question plus a tenant's FAQ knowledge base
//! into a token-budgeted prompt, calls an OpenAI-compatible backend with
//! bounded retries, and always returns a complete, accounted response.

pub mod agent;
pub mod cli;
pub mod config;
pub mod logging;
pub mod rag;
pub mod store;
