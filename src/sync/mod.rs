// src/sync/mod.rs

//! Synchronization primitives used by the orchestrator.
//!
//! - [`signal`] holds the one-shot, multi-listener completion signal each job
//!   fires when it is done.
//! - [`errgroup`] is the error-propagating join: first error wins and cancels
//!   the shared token; waiting is bounded by an optional deadline.
//! - [`waitgroup`] is the plain join with the same bounded-wait contract but
//!   no error aggregation.

pub mod errgroup;
pub mod signal;
pub mod waitgroup;

pub use errgroup::ErrGroup;
pub use signal::{CompletionSignal, FireGuard};
pub use waitgroup::WaitGroup;
