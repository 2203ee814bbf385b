//! Oracle API client for classification jobs and duplicate judgments.
//!
//! Blocking reqwest client (no Tokio runtime required). The async engine
//! seams are satisfied by running calls on smol's blocking pool.
//!
//! No retries here: timeout, retry and backoff belong to the resilience
//! wrapper at the call site.

mod adapter;
mod client;
mod wire;

pub use client::{OracleClient, OracleError, OracleOptions};
pub use wire::{JobStatus, JudgeRequest, SubmitJobRequest};
