#![forbid(unsafe_code)]
use entretiens::{
    permissions::{NoPause, Pause, PermissionNotice, PERMISSIONS_REQUESTED_KEY},
    scheduler::PlatformError,
    Capability, JsonFileStore, KeyValueStore, MemoryStore, PermissionOptions, PermissionPlatform,
    PermissionStatus, PermissionsManager, RequestAllOutcome,
};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::time::Duration;

/// Plateforme simulée : répond selon une table et journalise les dialogues affichés.
#[derive(Default)]
struct DialogPlatform {
    answers: BTreeMap<Capability, PermissionStatus>,
    system: BTreeMap<Capability, PermissionStatus>,
    prompts: Vec<Capability>,
}

impl DialogPlatform {
    fn answering(answers: &[(Capability, PermissionStatus)]) -> Self {
        Self {
            answers: answers.iter().copied().collect(),
            ..Self::default()
        }
    }
}

impl PermissionPlatform for DialogPlatform {
    fn check(&mut self, capability: Capability) -> Result<PermissionStatus, PlatformError> {
        Ok(self.system.get(&capability).copied().unwrap_or_default())
    }

    fn request(&mut self, capability: Capability) -> Result<PermissionStatus, PlatformError> {
        self.prompts.push(capability);
        let status = self.answers.get(&capability).copied().unwrap_or(PermissionStatus::Granted);
        self.system.insert(capability, status);
        Ok(status)
    }
}

#[derive(Default)]
struct RecordingPause {
    calls: RefCell<Vec<Duration>>,
}

impl Pause for &RecordingPause {
    fn pause(&self, duration: Duration) {
        self.calls.borrow_mut().push(duration);
    }
}

#[test]
fn flow_order_delays_and_notices() {
    let store = MemoryStore::new();
    let pause = RecordingPause::default();
    let platform = DialogPlatform::answering(&[(Capability::MediaLibrary, PermissionStatus::Denied)]);
    let mut m = PermissionsManager::new(platform, &store, &pause, PermissionOptions::default());

    let outcome = m.request_all().unwrap();
    let RequestAllOutcome::Completed { statuses, notices } = outcome else {
        panic!("flow should have run");
    };

    assert_eq!(
        m.platform().prompts,
        vec![Capability::Notifications, Capability::MediaLibrary, Capability::Location]
    );
    assert_eq!(statuses[1], (Capability::MediaLibrary, PermissionStatus::Denied));
    assert_eq!(notices, vec![PermissionNotice::denied(Capability::MediaLibrary)]);
    assert_eq!(*pause.calls.borrow(), vec![Duration::from_millis(1000); 2]);

    assert_eq!(m.status(Capability::Notifications), PermissionStatus::Granted);
    assert_eq!(m.status(Capability::Camera), PermissionStatus::Undetermined);
    assert_eq!(store.get(PERMISSIONS_REQUESTED_KEY).unwrap().as_deref(), Some("true"));
}

#[test]
fn flow_never_runs_twice_in_a_session() {
    let store = MemoryStore::new();
    let mut m = PermissionsManager::new(
        DialogPlatform::default(),
        &store,
        NoPause,
        PermissionOptions::default(),
    );
    assert!(matches!(m.request_all().unwrap(), RequestAllOutcome::Completed { .. }));
    assert_eq!(m.request_all().unwrap(), RequestAllOutcome::AlreadyDone);
    assert_eq!(m.platform().prompts.len(), 3);
}

#[test]
fn persisted_flag_skips_flow_on_next_launch_until_reset() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");

    {
        let store = JsonFileStore::open(&path).unwrap();
        let mut m = PermissionsManager::new(
            DialogPlatform::default(),
            &store,
            NoPause,
            PermissionOptions::default(),
        );
        m.request_all().unwrap();
    }

    let store = JsonFileStore::open(&path).unwrap();
    let mut m = PermissionsManager::new(
        DialogPlatform::default(),
        &store,
        NoPause,
        PermissionOptions::default(),
    );
    assert_eq!(m.request_all().unwrap(), RequestAllOutcome::AlreadyDone);
    assert!(m.platform().prompts.is_empty());

    m.reset_flag().unwrap();
    assert!(matches!(m.request_all().unwrap(), RequestAllOutcome::Completed { .. }));
    assert_eq!(m.platform().prompts.len(), 3);
}

#[test]
fn check_reads_platform_and_denial_is_terminal() {
    let store = MemoryStore::new();
    let platform = DialogPlatform::answering(&[(Capability::Camera, PermissionStatus::Denied)]);
    let mut m = PermissionsManager::new(platform, &store, NoPause, PermissionOptions::default());

    assert_eq!(m.check(Capability::Camera), PermissionStatus::Undetermined);
    assert_eq!(m.request(Capability::Camera).unwrap(), PermissionStatus::Denied);
    assert_eq!(m.check(Capability::Camera), PermissionStatus::Denied);
    // une seule demande : aucune relance automatique
    assert_eq!(m.platform().prompts, vec![Capability::Camera]);
}
