#![doc = include_str!("../README.md")]

mod aggregator;
mod barrier;
mod cancel;
pub mod channel;
mod collector;
mod config;
mod error;
mod pipeline;
mod producer;
mod stage;
mod types;
mod verifier;
mod worker;

pub use crate::aggregator::aggregate;
pub use crate::barrier::CompletionBarrier;
pub use crate::cancel::deadline_token;
pub use crate::collector::collect;
pub use crate::config::*;
pub use crate::error::*;
pub use crate::pipeline::{Pipeline, RunReport};
pub use crate::producer::{Producer, ProducerBuilder};
pub use crate::stage::{Stage, StageTracker};
pub use crate::types::*;
pub use crate::verifier::verify;
pub use crate::worker::{RelayWorker, RelayWorkerBuilder};
