//! Email inbox ingestion for livechat - Library exports for testing

pub mod api;
pub mod config;
pub mod core;
pub mod infrastructure;
