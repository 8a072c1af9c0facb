//! fahrplan-core — tokens, cancellation, and the task-runner contract.
//!
//! The building blocks consumed by `fahrplan-dispatch`: opaque [`TaskToken`]s
//! and their thread-safe [`TokenGenerator`], the cooperative [`CancelFlag`],
//! and the [`TaskRunner`] / [`RunnerFactory`] / [`CompletionSink`] contracts
//! that concrete work implementations plug into. The core never inspects
//! request or response payloads; it only moves ownership of them.

pub mod cancel;
pub mod runner;
pub mod token;

pub use cancel::CancelFlag;
pub use runner::{CompletionSink, RunnerFactory, TaskContext, TaskRunner};
pub use token::{TaskToken, TokenGenerator};
