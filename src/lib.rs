//! Capper Tracker: pick grading and leaderboards for sports handicappers.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod grading;
pub mod leaderboard;
pub mod storage;
pub mod service;
pub mod api;
