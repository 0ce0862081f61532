pub mod api;
pub mod app;
pub mod chart;
pub mod config;
pub mod domain;
pub mod error;
pub mod export;
pub mod feedback;
pub mod filter;
pub mod output;
pub mod store;
