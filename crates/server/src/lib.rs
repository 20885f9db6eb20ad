//! HTTP server for the insurance cost prediction service

pub mod api;
pub mod config;
