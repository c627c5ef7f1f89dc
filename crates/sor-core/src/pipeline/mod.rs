//! Message pipeline: the send state machine and its single-slot turn lock.
//!
//! One turn runs at a time, application-wide. The pipeline gates the send
//! through the quota module, folds streamed partial results into the
//! session store, reconciles committed state with durable storage, and
//! settles the cost exactly once on success.

pub mod client;
pub mod turn;

pub use client::ChatClient;
pub use turn::{TurnGuard, TurnLock};
