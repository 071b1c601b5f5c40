use crate::error::TaskError;
use rustc_hash::FxBuildHasher;
use std::collections::HashMap as _HashMap;

/// Outcome of running a single task body.
pub type TaskResult = Result<(), TaskError>;

/// Boxed error returned by a failing task body.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub(crate) type HashMap<K, V> = _HashMap<K, V, FxBuildHasher>;
