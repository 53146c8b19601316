// src/lib.rs

//! Verified-contract listing watcher with GitHub cross-reference

pub mod client;
pub mod error;
pub mod models;
pub mod notify;
pub mod pipeline;
pub mod storage;
pub mod utils;
