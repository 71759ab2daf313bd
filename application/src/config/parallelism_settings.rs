//! Server-scoped parallelism settings.
//!
//! [`ParallelismSettings`] lives as long as the hosting process and is
//! refreshed once per command. A refresh resolves a complete new
//! [`ParallelismSnapshot`] and publishes it with a single swap, so a reader
//! sees either the previous snapshot or the new one, never a mixture.
//!
//! Refresh and the reads that follow it are expected to happen on one
//! controlling thread per command; the lock only makes the swap atomic.

use crate::ports::options_provider::OptionsProvider;
use phasepool_domain::{AnalysisOptions, OptionGroup, OptionGroupId, ParallelismSnapshot};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info, warn};

#[derive(Debug)]
struct Versioned {
    version: u64,
    snapshot: Arc<ParallelismSnapshot>,
}

/// Versioned holder of the current [`ParallelismSnapshot`].
#[derive(Debug)]
pub struct ParallelismSettings {
    current: RwLock<Versioned>,
}

impl Default for ParallelismSettings {
    fn default() -> Self {
        Self::new(ParallelismSnapshot::inert())
    }
}

impl ParallelismSettings {
    /// Start from a fixed snapshot (version 0).
    pub fn new(initial: ParallelismSnapshot) -> Self {
        Self {
            current: RwLock::new(Versioned {
                version: 0,
                snapshot: Arc::new(initial),
            }),
        }
    }

    /// Settings with the deterministic test fixture.
    pub fn for_testing() -> Self {
        Self::new(ParallelismSnapshot::for_testing())
    }

    /// The snapshot published by the latest refresh.
    pub fn current(&self) -> Arc<ParallelismSnapshot> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard.snapshot)
    }

    /// Number of refreshes so far.
    pub fn version(&self) -> u64 {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .version
    }

    /// Re-read every option group and publish the resolved snapshot.
    pub fn refresh(&self, options: &dyn OptionsProvider) -> Arc<ParallelismSnapshot> {
        let loading = lookup(options, OptionGroupId::LoadingPhaseThreads, |g| match g {
            OptionGroup::LoadingPhaseThreads(o) => Some(o),
            _ => None,
        });
        let build = lookup(options, OptionGroupId::BuildRequest, |g| match g {
            OptionGroup::BuildRequest(o) => Some(o),
            _ => None,
        });
        let package = lookup(options, OptionGroupId::Package, |g| match g {
            OptionGroup::Package(o) => Some(o),
            _ => None,
        });
        let analysis = lookup(options, OptionGroupId::Analysis, |g| match g {
            OptionGroup::Analysis(o) => Some(o),
            _ => None,
        });

        let snapshot = ParallelismSnapshot::resolve(
            loading.as_ref(),
            build.as_ref(),
            package.as_ref(),
            analysis.as_ref(),
        );
        log_clamp(analysis.as_ref(), &snapshot);

        let snapshot = Arc::new(snapshot);
        let version = self.swap(Arc::clone(&snapshot));
        debug!("Refreshed parallelism settings (version {}): {}", version, snapshot);
        snapshot
    }

    fn swap(&self, snapshot: Arc<ParallelismSnapshot>) -> u64 {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        guard.version += 1;
        guard.snapshot = snapshot;
        guard.version
    }
}

fn lookup<T>(
    options: &dyn OptionsProvider,
    id: OptionGroupId,
    extract: impl FnOnce(OptionGroup) -> Option<T>,
) -> Option<T> {
    let group = options.lookup(id)?;
    let actual = group.id();
    let extracted = extract(group);
    if extracted.is_none() {
        warn!(
            "Options provider returned group '{}' for '{}'; treating it as absent",
            actual, id
        );
    }
    extracted
}

fn log_clamp(analysis: Option<&AnalysisOptions>, snapshot: &ParallelismSnapshot) {
    if let Some(options) = analysis
        && options.cpu_heavy_pool_size != snapshot.cpu_heavy_pool_size()
    {
        info!(
            "Prioritized analysis: cpu_heavy_pool_size {} reduced to analysis_parallelism {}",
            options.cpu_heavy_pool_size,
            snapshot.cpu_heavy_pool_size()
        );
    }
}
