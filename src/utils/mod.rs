// src/utils/mod.rs
//! Encoding and cryptographic helpers.

pub mod crypto;
pub mod jws;
pub mod serialization;
