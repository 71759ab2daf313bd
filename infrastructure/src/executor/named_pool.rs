//! Named worker pools.
//!
//! A [`NamedPool`] is a tokio multi-thread runtime with exactly
//! `parallelism` worker threads called `<name>-<n>`, so pools show up by
//! name in thread dumps and profilers.

use phasepool_application::BuildError;
use phasepool_domain::{MAX_POOL_PARALLELISM, PoolSpec};
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::runtime::{Builder, Handle, Runtime};
use tracing::debug;

/// A running pool of named worker threads.
pub struct NamedPool {
    spec: PoolSpec,
    runtime: Option<Runtime>,
}

impl NamedPool {
    /// Start the worker threads for `spec`.
    pub fn start(spec: &PoolSpec) -> Result<Self, BuildError> {
        if spec.parallelism == 0 || spec.parallelism > MAX_POOL_PARALLELISM {
            return Err(BuildError {
                pool: spec.name.clone(),
                source: io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!(
                        "parallelism must be between 1 and {}, got {}",
                        MAX_POOL_PARALLELISM, spec.parallelism
                    ),
                ),
            });
        }

        let name = spec.name.clone();
        let next_id = Arc::new(AtomicUsize::new(0));
        let runtime = Builder::new_multi_thread()
            .worker_threads(spec.parallelism)
            .thread_name_fn(move || {
                let id = next_id.fetch_add(1, Ordering::Relaxed);
                format!("{}-{}", name, id)
            })
            .enable_time()
            .build()
            .map_err(|source| BuildError {
                pool: spec.name.clone(),
                source,
            })?;

        debug!("Started pool {}", spec);
        Ok(Self {
            spec: spec.clone(),
            runtime: Some(runtime),
        })
    }

    pub fn spec(&self) -> &PoolSpec {
        &self.spec
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    /// Handle used to spawn work onto this pool.
    pub fn handle(&self) -> Option<Handle> {
        self.runtime.as_ref().map(|rt| rt.handle().clone())
    }
}

impl Drop for NamedPool {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            // Does not wait for running tasks; callers await quiescence first.
            runtime.shutdown_background();
            debug!("Stopped pool {}", self.spec);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_worker_threads_are_named() {
        let pool = NamedPool::start(&PoolSpec::new("unit-pool", 2)).unwrap();
        let (tx, rx) = mpsc::channel();
        pool.handle().unwrap().spawn(async move {
            let name = std::thread::current().name().map(str::to_string);
            tx.send(name).unwrap();
        });
        let name = rx.recv().unwrap().unwrap();
        assert!(name.starts_with("unit-pool-"), "unexpected thread name {name}");
    }

    #[test]
    fn test_zero_parallelism_is_rejected() {
        let err = NamedPool::start(&PoolSpec::new("empty", 0)).err().unwrap();
        assert_eq!(err.pool, "empty");
        assert_eq!(err.source.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_oversized_parallelism_is_rejected() {
        for parallelism in [MAX_POOL_PARALLELISM + 1, usize::MAX] {
            let err = NamedPool::start(&PoolSpec::new("huge", parallelism))
                .err()
                .unwrap();
            assert_eq!(err.pool, "huge");
            assert_eq!(err.source.kind(), io::ErrorKind::InvalidInput);
        }
    }

    #[test]
    fn test_spec_accessors() {
        let pool = NamedPool::start(&PoolSpec::new("sized", 3)).unwrap();
        assert_eq!(pool.name(), "sized");
        assert_eq!(pool.spec().parallelism, 3);
    }
}
