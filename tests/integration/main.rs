//! End-to-end tests against the public library API.

mod fixtures;
mod grading_flow;
mod persistence;
