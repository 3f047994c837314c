// src/lib.rs
//! Sheet-backed CRM dashboards: fetch published CSV sheets, normalize them
//! into typed records, and derive the metrics and tables each dashboard
//! shows.

pub mod aggregate;
pub mod config;
pub mod dashboard;
pub mod dates;
pub mod duration;
pub mod error;
pub mod fetch;
pub mod normalize;
pub mod recording;
pub mod table;
pub mod view;

pub use error::{Error, Result};
