//! cart-engine - event-sourced shopping cart engine
//!
//! Carts are actors whose state is rebuilt from an append-only, shard
//! tagged event log. Tagged consumers tail the log to maintain a report
//! projection and to publish cart views and events onto topics.

pub mod api;
pub mod cart;
pub mod config;
pub mod consumer;
pub mod engine;
pub mod entity;
pub mod projection;
pub mod publisher;
pub mod service;
pub mod storage;
pub mod tagging;
pub mod utils;

pub use engine::CartEngine;
