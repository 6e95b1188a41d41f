pub mod app;
pub mod ccs;
pub mod config;
pub mod error;
pub mod metrics;
pub mod shutdown;
pub mod state;
pub mod storage;
pub mod web;
