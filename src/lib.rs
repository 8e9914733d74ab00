//! Conditional expression evaluation with pooled engines and cached results.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod engine;
pub mod infra;
