//! Metadata service - one workspace graph per manifest, fetched once.
//!
//! The service is the only shared mutable structure in the crate. Reads go
//! through an `RwLock` fast path; a miss takes the single fetch gate,
//! re-checks, and only then asks the toolchain. Per manifest path the
//! toolchain is therefore invoked at most once per service lifetime, no
//! matter how many threads ask at the same time. Failures are not cached.
//!
//! Entries are never invalidated behind the caller's back: a changed
//! manifest is only picked up after an explicit [`MetadataService::unload`].

pub mod events;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use tokio_util::sync::CancellationToken;

use crate::core::manifest::{is_manifest, is_source_file, resolve_governing_manifest};
use crate::core::package::PackageRef;
use crate::core::path::NormalizedPath;
use crate::core::workspace::Workspace;
use crate::error::{Error, Result};
use crate::toolchain::Toolchain;

pub use events::{SubscriberId, Subscription, WorkspaceEvent};
use events::Subscribers;

/// What a file contributes to the build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileTargetInfo {
    /// The file is a manifest declaring targets, or the root of one
    pub has_targets: bool,
    /// One of those targets can be launched
    pub is_exe: bool,
}

pub struct MetadataService {
    toolchain: Arc<dyn Toolchain>,
    workspace_root: NormalizedPath,
    cache: RwLock<HashMap<NormalizedPath, Arc<Workspace>>>,
    fetch_gate: Mutex<()>,
    // Lock order: `subscribers` before `cache`.
    subscribers: Mutex<Subscribers>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MetadataService {
    pub fn new(toolchain: Arc<dyn Toolchain>, workspace_root: NormalizedPath) -> Self {
        MetadataService {
            toolchain,
            workspace_root,
            cache: RwLock::new(HashMap::new()),
            fetch_gate: Mutex::new(()),
            subscribers: Mutex::new(Subscribers::default()),
        }
    }

    pub fn workspace_root(&self) -> &NormalizedPath {
        &self.workspace_root
    }

    pub fn toolchain(&self) -> &Arc<dyn Toolchain> {
        &self.toolchain
    }

    fn cached(&self, manifest: &NormalizedPath) -> Option<Arc<Workspace>> {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(manifest)
            .cloned()
    }

    /// The workspace graph for a manifest, fetching it on first use.
    pub fn workspace(&self, manifest: &NormalizedPath, cancel: &CancellationToken) -> Result<Arc<Workspace>> {
        if let Some(ws) = self.cached(manifest) {
            return Ok(ws);
        }

        let _gate = lock(&self.fetch_gate);
        if let Some(ws) = self.cached(manifest) {
            return Ok(ws);
        }
        if cancel.is_cancelled() {
            return Err(Error::Canceled);
        }

        tracing::info!("loading metadata for {}", manifest);
        let ws = Arc::new(self.toolchain.fetch_metadata(manifest, cancel)?);
        let package = ws.queried_package();

        let mut subscribers = lock(&self.subscribers);
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(manifest.clone(), Arc::clone(&ws));
        tracing::debug!("loaded {} with {} packages", manifest, ws.packages().len());
        subscribers.publish(&WorkspaceEvent::PackageAdded(package));

        Ok(ws)
    }

    /// The package a manifest describes. A virtual manifest yields its
    /// placeholder package.
    pub fn package(&self, manifest: &NormalizedPath, cancel: &CancellationToken) -> Result<PackageRef> {
        let ws = self.workspace(manifest, cancel)?;
        ws.package_ref(manifest).ok_or_else(|| Error::PackageNotFound {
            manifest: manifest.clone(),
        })
    }

    /// The package whose manifest governs `file`, or `None` when no manifest
    /// under the workspace root does.
    pub fn containing_package(
        &self,
        file: &NormalizedPath,
        cancel: &CancellationToken,
    ) -> Result<Option<PackageRef>> {
        match resolve_governing_manifest(file, &self.workspace_root) {
            Some(manifest) => self.package(&manifest, cancel).map(Some),
            None => {
                tracing::debug!("no manifest governs {}", file);
                Ok(None)
            }
        }
    }

    /// Whether `file` is a manifest with targets or the root source file of a
    /// target, and whether any such target is runnable.
    pub fn target_info(&self, file: &NormalizedPath, cancel: &CancellationToken) -> Result<FileTargetInfo> {
        if !is_manifest(file) && !is_source_file(file) {
            return Ok(FileTargetInfo::default());
        }
        let Some(package) = self.containing_package(file, cancel)? else {
            return Ok(FileTargetInfo::default());
        };

        if package.manifest_path == *file {
            return Ok(FileTargetInfo {
                has_targets: !package.targets().is_empty(),
                is_exe: package.targets().iter().any(|t| t.is_runnable()),
            });
        }

        let mut info = FileTargetInfo::default();
        for target in package.targets().iter().filter(|t| t.src_path == *file) {
            info.has_targets = true;
            info.is_exe |= target.is_runnable();
        }
        Ok(info)
    }

    /// Packages loaded so far, one per cached manifest, ordered by manifest
    /// path.
    pub fn cached_packages(&self) -> Vec<PackageRef> {
        let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
        let mut packages: Vec<_> = cache.values().map(|ws| ws.queried_package()).collect();
        packages.sort_by(|a, b| a.manifest_path.cmp(&b.manifest_path));
        packages
    }

    /// Subscribe to events. No event is both in the snapshot and delivered,
    /// and none falls between the two.
    pub fn subscribe(&self) -> Subscription {
        let mut subscribers = lock(&self.subscribers);
        let snapshot = self.cached_packages();
        let (id, events) = subscribers.add();
        tracing::debug!("subscriber {:?} joined with {} packages", id, snapshot.len());
        Subscription {
            id,
            snapshot,
            events,
        }
    }

    /// Disconnect a subscriber. Its receiver sees the channel close once it
    /// has drained what was already sent.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        lock(&self.subscribers).remove(id)
    }

    /// Announce that a test container was written or deleted.
    pub fn notify_test_container_updated(&self, path: &NormalizedPath) {
        tracing::debug!("test container updated: {}", path);
        lock(&self.subscribers).publish(&WorkspaceEvent::TestContainerUpdated(path.clone()));
    }

    /// Evict a manifest's workspace. The next query fetches it again.
    pub fn unload(&self, manifest: &NormalizedPath) -> bool {
        let mut subscribers = lock(&self.subscribers);
        let removed = self
            .cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(manifest);

        match removed {
            Some(ws) => {
                tracing::info!("unloaded {}", manifest);
                subscribers.publish(&WorkspaceEvent::PackageRemoved(ws.queried_package()));
                true
            }
            None => false,
        }
    }
}
