//! Test container index.
//!
//! Keeps the set of test container files that exist for the packages a
//! [`MetadataService`] has loaded, and tells a listener whenever it may have
//! changed. The set is driven entirely by the service's events: a package
//! being added or removed re-checks that package's container paths, and a
//! container update re-checks one path. Whether a path is in the set only
//! ever depends on whether the file exists when it is checked.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::thread::{self, JoinHandle};

use crossbeam_channel::Receiver;

use crate::core::package::PackageRef;
use crate::core::path::NormalizedPath;
use crate::metadata::{MetadataService, SubscriberId, WorkspaceEvent};
use crate::toolchain::target_info::configured_profile;
use crate::util::config::SettingsProvider;

/// Told when the set of containers may have changed.
///
/// Called while the index is busy; implementations must not load or unload
/// it from inside the callback.
pub trait ContainersListener: Send + Sync {
    fn containers_changed(&self);
}

/// What checking one container path did to the set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerChange {
    Added,
    Removed,
    /// The file exists and was already tracked
    AlreadyTracked,
    /// The file is missing and was not tracked
    NotTracked,
}

struct Session {
    service: Arc<MetadataService>,
    id: SubscriberId,
    events: Receiver<WorkspaceEvent>,
}

pub struct TestContainerIndex {
    settings: Arc<dyn SettingsProvider>,
    listener: Option<Arc<dyn ContainersListener>>,
    containers: RwLock<BTreeSet<NormalizedPath>>,
    session: Mutex<Option<Session>>,
}

impl TestContainerIndex {
    pub fn new(settings: Arc<dyn SettingsProvider>) -> Self {
        TestContainerIndex {
            settings,
            listener: None,
            containers: RwLock::new(BTreeSet::new()),
            session: Mutex::new(None),
        }
    }

    pub fn with_listener(mut self, listener: Arc<dyn ContainersListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Start tracking the packages of `service`, dropping whatever was
    /// tracked before. Packages the service already holds are handled as if
    /// they had just been added.
    ///
    /// The set is cleared before the new subscription exists, and no event
    /// of the previous session is handled once this has started.
    pub fn load(&self, service: Arc<MetadataService>) {
        let mut session = self.lock_session();
        let cleared = self.reset(session.take());

        let subscription = service.subscribe();
        tracing::info!(
            "tracking test containers of {} ({} packages loaded)",
            service.workspace_root(),
            subscription.snapshot.len()
        );

        if cleared {
            self.notify();
        }
        for package in &subscription.snapshot {
            self.package_changed(package);
        }

        *session = Some(Session {
            service,
            id: subscription.id,
            events: subscription.events,
        });
    }

    /// Stop tracking and forget every container.
    pub fn unload(&self) {
        let mut session = self.lock_session();
        let cleared = self.reset(session.take());
        drop(session);

        if cleared {
            self.notify();
        }
    }

    /// Unsubscribe `previous` and empty the set, returning whether it held
    /// anything.
    fn reset(&self, previous: Option<Session>) -> bool {
        if let Some(previous) = previous {
            previous.service.unsubscribe(previous.id);
            tracing::info!("stopped tracking test containers of {}", previous.service.workspace_root());
        }

        let mut containers = self.containers.write().unwrap_or_else(PoisonError::into_inner);
        let had = !containers.is_empty();
        containers.clear();
        had
    }

    fn lock_session(&self) -> MutexGuard<'_, Option<Session>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Tracked container files, in path order.
    pub fn containers(&self) -> Vec<NormalizedPath> {
        self.containers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Handle every event received so far, returning how many there were.
    pub fn process_pending(&self) -> usize {
        let Some((id, events)) = self.current_events() else {
            return 0;
        };

        let mut handled = 0;
        for event in events.try_iter() {
            if !self.handle_for(id, &event) {
                break;
            }
            handled += 1;
        }
        handled
    }

    /// Handle events on a dedicated thread until the index is unloaded or
    /// loaded again.
    pub fn spawn_worker(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let (id, events) = self.current_events()?;
        let index = Arc::clone(self);

        let handle = thread::Builder::new()
            .name("berth-test-containers".to_string())
            .spawn(move || {
                for event in events.iter() {
                    if !index.handle_for(id, &event) {
                        break;
                    }
                }
                tracing::debug!("test container worker for {:?} exiting", id);
            });

        match handle {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::error!("failed to start the test container worker: {}", e);
                None
            }
        }
    }

    fn current_events(&self) -> Option<(SubscriberId, Receiver<WorkspaceEvent>)> {
        self.lock_session()
            .as_ref()
            .map(|s| (s.id, s.events.clone()))
    }

    /// Handle `event` if it belongs to the current session. The session
    /// stays locked while the set changes, so `load` and `unload` cannot
    /// interleave with it.
    fn handle_for(&self, id: SubscriberId, event: &WorkspaceEvent) -> bool {
        let session = self.lock_session();
        if !session.as_ref().is_some_and(|s| s.id == id) {
            tracing::debug!("dropping event of ended session {:?}", id);
            return false;
        }
        self.handle(event);
        true
    }

    fn handle(&self, event: &WorkspaceEvent) {
        match event {
            WorkspaceEvent::PackageAdded(package) | WorkspaceEvent::PackageRemoved(package) => {
                self.package_changed(package)
            }
            WorkspaceEvent::TestContainerUpdated(path) => {
                self.container_updated(path);
            }
        }
    }

    fn package_changed(&self, package: &PackageRef) {
        let profile = configured_profile(self.settings.as_ref(), &package.manifest_path);
        for info in package.test_containers(&profile) {
            self.container_updated(&info.path);
        }
    }

    /// Re-check one container path against the file system.
    pub fn container_updated(&self, path: &NormalizedPath) -> ContainerChange {
        let change = {
            let mut containers = self.containers.write().unwrap_or_else(PoisonError::into_inner);
            if path.is_file() {
                if containers.insert(path.clone()) {
                    ContainerChange::Added
                } else {
                    ContainerChange::AlreadyTracked
                }
            } else if containers.remove(path) {
                ContainerChange::Removed
            } else {
                ContainerChange::NotTracked
            }
        };

        match change {
            ContainerChange::Added => tracing::debug!("test container added: {}", path),
            ContainerChange::Removed => tracing::debug!("test container removed: {}", path),
            ContainerChange::AlreadyTracked => {
                tracing::error!("test container {} is already tracked", path)
            }
            ContainerChange::NotTracked => {
                tracing::error!("test container {} does not exist and is not tracked", path)
            }
        }

        self.notify();
        change
    }

    fn notify(&self) {
        if let Some(listener) = &self.listener {
            listener.containers_changed();
        }
    }
}

impl Drop for TestContainerIndex {
    fn drop(&mut self) {
        self.unload();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{sample_metadata_at, write_file, write_sample_workspace, CountingToolchain};
    use crate::toolchain::Toolchain;
    use crate::util::config::NoSettings;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};
    use tempfile::TempDir;
    use tokio_util::sync::CancellationToken;

    #[derive(Default)]
    struct CountingListener(AtomicUsize);

    impl ContainersListener for CountingListener {
        fn containers_changed(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl CountingListener {
        fn count(&self) -> usize {
            self.0.load(Ordering::SeqCst)
        }
    }

    struct Fixture {
        _tmp: TempDir,
        root: NormalizedPath,
        service: Arc<MetadataService>,
        listener: Arc<CountingListener>,
        index: Arc<TestContainerIndex>,
    }

    fn fixture() -> Fixture {
        let tmp = TempDir::new().unwrap();
        write_sample_workspace(tmp.path());
        let root = NormalizedPath::from_path(tmp.path());

        let toolchain: Arc<dyn Toolchain> =
            Arc::new(CountingToolchain::new().with_metadata(sample_metadata_at(&root)));
        let service = Arc::new(MetadataService::new(toolchain, root.clone()));
        let listener = Arc::new(CountingListener::default());
        let index = Arc::new(
            TestContainerIndex::new(Arc::new(NoSettings)).with_listener(listener.clone()),
        );

        Fixture {
            _tmp: tmp,
            root,
            service,
            listener,
            index,
        }
    }

    fn container(root: &NormalizedPath, name: &str) -> NormalizedPath {
        root.join("target/debug").join(format!("{}.rusttests", name))
    }

    #[test]
    fn test_snapshot_is_indexed_on_load() {
        let f = fixture();
        write_file(container(&f.root, "adder").as_path(), "{}");
        f.service
            .workspace(&f.root.join("adder/Cargo.toml"), &CancellationToken::new())
            .unwrap();

        f.index.load(Arc::clone(&f.service));

        assert_eq!(f.index.containers(), [container(&f.root, "adder")]);
        assert_eq!(f.listener.count(), 1);
    }

    #[test]
    fn test_events_add_and_remove_containers() {
        let f = fixture();
        f.index.load(Arc::clone(&f.service));
        let cancel = CancellationToken::new();

        let add_one = container(&f.root, "add_one");
        write_file(add_one.as_path(), "{}");
        f.service.workspace(&f.root.join("add_one/Cargo.toml"), &cancel).unwrap();
        assert_eq!(f.index.process_pending(), 1);
        assert_eq!(f.index.containers(), [add_one.clone()]);

        std::fs::remove_file(add_one.as_path()).unwrap();
        f.service.notify_test_container_updated(&add_one);
        f.index.process_pending();
        assert!(f.index.containers().is_empty());
    }

    #[test]
    fn test_container_updated_is_idempotent() {
        let f = fixture();
        let path = container(&f.root, "adder");

        assert_eq!(f.index.container_updated(&path), ContainerChange::NotTracked);
        write_file(path.as_path(), "{}");
        assert_eq!(f.index.container_updated(&path), ContainerChange::Added);
        assert_eq!(f.index.container_updated(&path), ContainerChange::AlreadyTracked);
        assert_eq!(f.index.containers().len(), 1);

        std::fs::remove_file(path.as_path()).unwrap();
        assert_eq!(f.index.container_updated(&path), ContainerChange::Removed);
        assert!(f.index.containers().is_empty());
        // One notification per call.
        assert_eq!(f.listener.count(), 4);
    }

    #[test]
    fn test_reload_starts_over() {
        let f = fixture();
        write_file(container(&f.root, "adder").as_path(), "{}");
        f.service
            .workspace(&f.root.join("adder/Cargo.toml"), &CancellationToken::new())
            .unwrap();
        f.index.load(Arc::clone(&f.service));

        let other = fixture();
        f.index.load(Arc::clone(&other.service));
        assert!(f.index.containers().is_empty());

        f.index.unload();
        f.service.notify_test_container_updated(&container(&f.root, "adder"));
        assert_eq!(f.index.process_pending(), 0);
        assert!(f.index.containers().is_empty());
    }

    #[test]
    fn test_load_forgets_untracked_state() {
        let f = fixture();
        let stray = f.root.join("target/debug/stray.rusttests");
        write_file(stray.as_path(), "{}");
        assert_eq!(f.index.container_updated(&stray), ContainerChange::Added);

        f.index.load(Arc::clone(&f.service));
        assert!(f.index.containers().is_empty());
        // Added, then cleared by load.
        assert_eq!(f.listener.count(), 2);
    }

    #[test]
    fn test_events_of_replaced_session_are_dropped() {
        let f = fixture();
        f.index.load(Arc::clone(&f.service));
        let (old_id, _events) = f.index.current_events().unwrap();

        let other = fixture();
        f.index.load(Arc::clone(&other.service));

        let adder = container(&f.root, "adder");
        write_file(adder.as_path(), "{}");
        let event = WorkspaceEvent::TestContainerUpdated(adder);
        assert!(!f.index.handle_for(old_id, &event));
        assert!(f.index.containers().is_empty());

        let (new_id, _events) = f.index.current_events().unwrap();
        assert!(f.index.handle_for(new_id, &event));
        assert_eq!(f.index.containers().len(), 1);
    }

    #[test]
    fn test_worker_follows_events() {
        let f = fixture();
        f.index.load(Arc::clone(&f.service));
        let worker = f.index.spawn_worker().unwrap();

        let adder = container(&f.root, "adder");
        write_file(adder.as_path(), "{}");
        f.service.notify_test_container_updated(&adder);

        let deadline = Instant::now() + Duration::from_secs(5);
        while f.index.containers().is_empty() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(f.index.containers(), [adder]);

        f.index.unload();
        worker.join().unwrap();
    }
}
