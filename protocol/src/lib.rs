//! Shared protocol definitions for the iServe community service platform
//!
//! This crate contains the data structures exchanged between clients and the
//! iServe backend, split into:
//! - `common`: domain model types shared across endpoints
//! - `api`: per-endpoint request/response DTOs

pub mod api;
pub mod common;
