//! Key-sequential task execution on a shared worker pool.
//!
//! Tasks submitted under the same key run strictly one at a time and in
//! submission order; tasks under different keys run in parallel on one shared
//! pool. No thread is dedicated to a key: each key with pending work owns a
//! short-lived runner that feeds its queue to the pool one task at a time and
//! disappears when the queue runs dry.
//!
//! A second, composable layer bounds how many tasks may be in flight at once,
//! either blocking or rejecting excess submissions, and offers a `drain`
//! operation for graceful shutdown.
//!
//! Key modules:
//! - `sequential`: `KeySequentialExecutor`, the per-key sequencing engine.
//! - `bounded`: `BoundedExecutor`, admission control over any executor, and
//!   `KeySequentialBoundedExecutor`, the two combined.
//! - `executor`: the `Executor` seam plus the rayon-backed
//!   `ThreadPoolExecutor` and the inline `DirectExecutor`.
//! - `task`: `Task`, `KeyedTask` and the `ExceptionHandler` capability.
//!
//! Quick start:
//! ```
//! use keyseq::{
//!     config::PoolConfig, executor::pool::ThreadPoolExecutor,
//!     sequential::KeySequentialExecutor, task::Task,
//! };
//!
//! let pool = ThreadPoolExecutor::new(&PoolConfig::default().with_num_threads(4)).unwrap();
//! let executor = KeySequentialExecutor::new(pool);
//! executor.submit("trade-327", Task::from_fn(|| { /* first */ })).unwrap();
//! executor.submit("trade-831", Task::from_fn(|| { /* not blocked by trade-327 */ })).unwrap();
//! executor.submit("trade-327", Task::from_fn(|| { /* after first */ })).unwrap();
//! ```
//!
//! Failures of task bodies, returned errors and panics alike, never reach the
//! submitter; they go to the configured `ExceptionHandler`. Refusals to accept
//! a task are reported synchronously as `Rejected`.

/// Admission control: `BoundedExecutor` and `KeySequentialBoundedExecutor`.
///
/// A counting semaphore caps the number of admitted-but-incomplete tasks;
/// excess submissions block or are rejected depending on `BoundedStrategy`.
pub mod bounded;
/// Settings: admission strategy and capacity, worker pool sizing.
pub mod config;
/// `Rejected` and `TaskError`.
pub mod error;
/// The `Executor` trait and the pools implementing it.
pub mod executor;
/// The per-key sequential executor.
///
/// Contains the key registry, the per-key task queues, and the runner chain
/// that keeps at most one task per key in flight and retires idle keys.
pub mod sequential;
mod sync;
/// Units of work and failure reporting.
pub mod task;
/// Common type aliases.
pub mod types;
mod utils;
