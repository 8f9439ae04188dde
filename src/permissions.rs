//! Suivi des autorisations système (notifications, caméra, photothèque, localisation).

use crate::scheduler::PlatformError;
use crate::storage::{KeyValueStore, StorageError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Clé du drapeau « le parcours de demande a déjà été fait ».
pub const PERMISSIONS_REQUESTED_KEY: &str = "permissions_requested";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Notifications,
    Camera,
    MediaLibrary,
    Location,
}

impl Capability {
    pub const ALL: [Capability; 4] = [
        Capability::Notifications,
        Capability::Camera,
        Capability::MediaLibrary,
        Capability::Location,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Capability::Notifications => "notifications",
            Capability::Camera => "camera",
            Capability::MediaLibrary => "media_library",
            Capability::Location => "location",
        }
    }
}

impl FromStr for Capability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "notifications" => Ok(Capability::Notifications),
            "camera" => Ok(Capability::Camera),
            "media_library" | "media" => Ok(Capability::MediaLibrary),
            "location" => Ok(Capability::Location),
            other => Err(format!("unknown capability: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionStatus {
    Granted,
    Denied,
    #[default]
    Undetermined,
}

/// Dialogues d'autorisation de la plateforme.
pub trait PermissionPlatform {
    /// Lit l'état courant sans rien demander.
    fn check(&mut self, capability: Capability) -> Result<PermissionStatus, PlatformError>;
    /// Affiche le dialogue système et renvoie la réponse.
    fn request(&mut self, capability: Capability) -> Result<PermissionStatus, PlatformError>;
}

/// Attente entre deux dialogues.
pub trait Pause {
    fn pause(&self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadPause;

impl Pause for ThreadPause {
    fn pause(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoPause;

impl Pause for NoPause {
    fn pause(&self, _duration: Duration) {}
}

/// Ordre fixe du parcours de première ouverture.
pub const REQUEST_ALL_FLOW: [Capability; 3] = [
    Capability::Notifications,
    Capability::MediaLibrary,
    Capability::Location,
];

#[derive(Debug, Clone)]
pub struct PermissionOptions {
    pub prompt_delay: Duration,
    pub flag_key: String,
}

impl Default for PermissionOptions {
    fn default() -> Self {
        Self {
            prompt_delay: Duration::from_millis(1000),
            flag_key: PERMISSIONS_REQUESTED_KEY.to_string(),
        }
    }
}

/// Message informatif affiché après un refus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionNotice {
    pub capability: Capability,
    pub message: String,
}

impl PermissionNotice {
    pub fn denied(capability: Capability) -> Self {
        let what = match capability {
            Capability::Notifications => {
                "Notifications désactivées : vous ne recevrez pas les rappels d'entretien."
            }
            Capability::Camera => "Caméra refusée : les entretiens vidéo ne seront pas disponibles.",
            Capability::MediaLibrary => {
                "Photothèque refusée : vous ne pourrez pas joindre de documents depuis vos photos."
            }
            Capability::Location => {
                "Localisation refusée : la recherche d'établissements autour de vous est désactivée."
            }
        };
        Self {
            capability,
            message: format!("{what} Vous pouvez modifier ce choix dans les réglages."),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestAllOutcome {
    /// Le parcours a déjà été fait (drapeau persistant ou session courante).
    AlreadyDone,
    Completed {
        statuses: Vec<(Capability, PermissionStatus)>,
        notices: Vec<PermissionNotice>,
    },
}

#[derive(Error, Debug)]
pub enum PermissionError {
    #[error(transparent)]
    Platform(#[from] PlatformError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// État local des quatre autorisations.
pub struct PermissionsManager<P, S, Z = ThreadPause> {
    platform: P,
    store: S,
    pause: Z,
    opts: PermissionOptions,
    statuses: BTreeMap<Capability, PermissionStatus>,
    flow_ran: bool,
}

impl<P: PermissionPlatform, S: KeyValueStore, Z: Pause> PermissionsManager<P, S, Z> {
    pub fn new(platform: P, store: S, pause: Z, opts: PermissionOptions) -> Self {
        Self {
            platform,
            store,
            pause,
            opts,
            statuses: Capability::ALL
                .iter()
                .map(|c| (*c, PermissionStatus::Undetermined))
                .collect(),
            flow_ran: false,
        }
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// État connu localement, sans interroger la plateforme.
    pub fn status(&self, capability: Capability) -> PermissionStatus {
        self.statuses.get(&capability).copied().unwrap_or_default()
    }

    /// Relit l'état auprès de la plateforme ; en cas d'échec l'état local est conservé.
    pub fn check(&mut self, capability: Capability) -> PermissionStatus {
        match self.platform.check(capability) {
            Ok(status) => {
                self.statuses.insert(capability, status);
                status
            }
            Err(err) => {
                warn!(capability = capability.as_str(), %err, "permission check failed");
                self.status(capability)
            }
        }
    }

    pub fn check_all(&mut self) -> Vec<(Capability, PermissionStatus)> {
        Capability::ALL.iter().map(|c| (*c, self.check(*c))).collect()
    }

    /// Affiche le dialogue système. Un refus est définitif : pas de relance.
    pub fn request(&mut self, capability: Capability) -> Result<PermissionStatus, PermissionError> {
        let status = self.platform.request(capability)?;
        debug!(capability = capability.as_str(), ?status, "permission answered");
        self.statuses.insert(capability, status);
        Ok(status)
    }

    /// `true` si le parcours a déjà été fait, dans cette session ou une précédente.
    pub fn has_requested_once(&self) -> Result<bool, PermissionError> {
        if self.flow_ran {
            return Ok(true);
        }
        Ok(self.store.get(&self.opts.flag_key)?.as_deref() == Some("true"))
    }

    /// Parcours de première ouverture : notifications, photothèque puis localisation.
    pub fn request_all(&mut self) -> Result<RequestAllOutcome, PermissionError> {
        if self.has_requested_once()? {
            return Ok(RequestAllOutcome::AlreadyDone);
        }
        self.flow_ran = true;
        info!("running first-launch permission flow");

        let mut statuses = Vec::new();
        let mut notices = Vec::new();
        for (idx, capability) in REQUEST_ALL_FLOW.iter().copied().enumerate() {
            if idx > 0 {
                self.pause.pause(self.opts.prompt_delay);
            }
            let status = match self.request(capability) {
                Ok(status) => status,
                Err(err) => {
                    warn!(capability = capability.as_str(), %err, "permission request failed");
                    self.status(capability)
                }
            };
            if status == PermissionStatus::Denied {
                notices.push(PermissionNotice::denied(capability));
            }
            statuses.push((capability, status));
        }

        self.store.set(&self.opts.flag_key, "true")?;
        Ok(RequestAllOutcome::Completed { statuses, notices })
    }

    /// Efface le drapeau persistant ; le prochain `request_all` refera le parcours.
    pub fn reset_flag(&mut self) -> Result<(), PermissionError> {
        self.store.remove(&self.opts.flag_key)?;
        self.flow_ran = false;
        Ok(())
    }
}
