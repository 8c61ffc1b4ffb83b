//! Feed Digest - merges many account feeds into one timeline
//!
//! Fetches every configured feed concurrently, keeps whatever parses, sorts
//! the combined entries newest first and renders an HTML page plus a
//! plain-text digest.

pub mod aggregator;
pub mod config;
pub mod fetcher;
pub mod model;
pub mod orchestrator;
pub mod parser;
pub mod render;
pub mod sources;
