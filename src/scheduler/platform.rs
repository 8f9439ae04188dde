use super::types::{NotificationId, NotificationRequest, PendingNotification, PlatformError};
use crate::notification::ReminderKind;
use crate::storage::write_atomic;
use anyhow::Context;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Planificateur de notifications locales de la plateforme.
pub trait NotificationPlatform {
    /// Programme une notification et renvoie son identifiant.
    fn schedule(&mut self, request: &NotificationRequest) -> Result<NotificationId, PlatformError>;
    /// Annule une notification ; un identifiant inconnu n'est pas une erreur.
    fn cancel(&mut self, id: &NotificationId) -> Result<(), PlatformError>;
    /// Liste les notifications encore en attente.
    fn pending(&self) -> Result<Vec<PendingNotification>, PlatformError>;
}

/// Planificateur en mémoire.
#[derive(Debug, Default)]
pub struct MemoryNotificationPlatform {
    pending: Vec<PendingNotification>,
    cancelled: Vec<NotificationId>,
    scheduled_total: usize,
    refuse_kind: Option<ReminderKind>,
    offline: bool,
}

impl MemoryNotificationPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse toute programmation du type donné.
    pub fn refusing(kind: ReminderKind) -> Self {
        Self {
            refuse_kind: Some(kind),
            ..Self::default()
        }
    }

    /// Hors ligne, annulation et listage échouent ; la programmation reste possible.
    pub fn set_offline(&mut self, offline: bool) {
        self.offline = offline;
    }

    pub fn pending_notifications(&self) -> &[PendingNotification] {
        &self.pending
    }

    /// Historique des annulations, dans l'ordre.
    pub fn cancelled(&self) -> &[NotificationId] {
        &self.cancelled
    }

    /// Nombre total de programmations acceptées depuis la création.
    pub fn scheduled_total(&self) -> usize {
        self.scheduled_total
    }

    /// Ajoute directement une notification, hors de tout planificateur de rappels.
    pub fn inject(&mut self, request: NotificationRequest) -> NotificationId {
        let id = NotificationId::new(Uuid::new_v4().to_string());
        self.pending.push(PendingNotification {
            id: id.clone(),
            request,
        });
        id
    }
}

impl NotificationPlatform for MemoryNotificationPlatform {
    fn schedule(&mut self, request: &NotificationRequest) -> Result<NotificationId, PlatformError> {
        if self.refuse_kind == Some(request.kind) {
            return Err(PlatformError::Refused(request.kind.as_str().to_string()));
        }
        self.scheduled_total += 1;
        Ok(self.inject(request.clone()))
    }

    fn cancel(&mut self, id: &NotificationId) -> Result<(), PlatformError> {
        if self.offline {
            return Err(PlatformError::Unavailable("cancel".to_string()));
        }
        self.pending.retain(|p| &p.id != id);
        self.cancelled.push(id.clone());
        Ok(())
    }

    fn pending(&self) -> Result<Vec<PendingNotification>, PlatformError> {
        if self.offline {
            return Err(PlatformError::Unavailable("pending".to_string()));
        }
        Ok(self.pending.clone())
    }
}

/// Boîte d'envoi JSON : les notifications en attente sont gardées dans un fichier.
pub struct JsonOutboxPlatform {
    path: PathBuf,
}

impl JsonOutboxPlatform {
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }

    fn load(&self) -> anyhow::Result<Vec<PendingNotification>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let data = fs::read(&self.path)
            .with_context(|| format!("reading {}", self.path.display()))?;
        serde_json::from_slice(&data).with_context(|| format!("parsing {}", self.path.display()))
    }

    fn save(&self, pending: &[PendingNotification]) -> anyhow::Result<()> {
        let json = serde_json::to_vec_pretty(pending)?;
        write_atomic(&self.path, &json)
    }
}

impl NotificationPlatform for JsonOutboxPlatform {
    fn schedule(&mut self, request: &NotificationRequest) -> Result<NotificationId, PlatformError> {
        let mut pending = self.load()?;
        let id = NotificationId::new(Uuid::new_v4().to_string());
        pending.push(PendingNotification {
            id: id.clone(),
            request: request.clone(),
        });
        pending.sort_by_key(|p| p.request.trigger_at);
        self.save(&pending)?;
        Ok(id)
    }

    fn cancel(&mut self, id: &NotificationId) -> Result<(), PlatformError> {
        let mut pending = self.load()?;
        let before = pending.len();
        pending.retain(|p| &p.id != id);
        if pending.len() != before {
            self.save(&pending)?;
        }
        Ok(())
    }

    fn pending(&self) -> Result<Vec<PendingNotification>, PlatformError> {
        Ok(self.load()?)
    }
}
