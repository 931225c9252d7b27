// src/services/mod.rs
//! Lifecycle components and the HTTP shell around them.

pub mod api_server;
pub mod credential_issuer;
pub mod did_resolver;
pub mod presentation;
pub mod verifier;
