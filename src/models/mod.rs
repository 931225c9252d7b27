// src/models/mod.rs
//! Data structures shared by the lifecycle components.

pub mod credential;
pub mod did;
pub mod jwk;
pub mod presentation;
pub mod request;
