// src/lib.rs

//! feedwatch: polls a syndication feed and keeps a deduplicated store of its entries

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
