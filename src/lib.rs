pub mod activity;
pub mod aggregator;
pub mod app;
pub mod cli;
pub mod configuration;
pub mod context;
pub mod github;
pub mod model;
pub mod rest;
pub mod store;
pub mod sweeper;
pub mod tracing;
