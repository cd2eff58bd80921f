pub mod config;
pub mod error;
pub mod event_match;
pub mod fake_provider;
pub mod issues;
pub mod live;
pub mod odds_book;
pub mod pipeline;
pub mod probability;
pub mod provider;
pub mod recommend;
pub mod schedule;
pub mod service;
pub mod simulate;
pub mod store;
pub mod types;
pub mod window;
