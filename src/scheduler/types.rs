use crate::model::InterviewId;
use crate::notification::ReminderKind;
use crate::storage::StorageError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifiant opaque renvoyé par le planificateur de la plateforme.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(String);

impl NotificationId {
    pub fn new<S: AsRef<str>>(s: S) -> Self {
        Self(s.as_ref().to_owned())
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Notification locale à programmer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRequest {
    pub trigger_at: DateTime<Utc>,
    pub title: String,
    pub body: String,
    /// Marqueur permettant de retrouver nos notifications parmi celles de l'app.
    pub tag: String,
    pub interview_id: InterviewId,
    pub kind: ReminderKind,
}

/// Notification en attente côté plateforme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingNotification {
    pub id: NotificationId,
    #[serde(flatten)]
    pub request: NotificationRequest,
}

#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("platform refused the call: {0}")]
    Refused(String),
    #[error("platform unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Error, Debug)]
pub enum SchedError {
    #[error("corrupt persisted reminder list: {0}")]
    CorruptState(#[source] serde_json::Error),
    #[error("cannot encode reminder list: {0}")]
    Encode(#[source] serde_json::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Bilan d'un (re)chargement de la liste d'entretiens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScheduleReport {
    /// Notifications annulées avant reprogrammation.
    pub cancelled: usize,
    /// Annulations refusées ; ces identifiants restent suivis et seront retentés.
    pub cancel_failed: usize,
    pub scheduled: usize,
    /// Échecs de programmation, ignorés un par un.
    pub failed: usize,
}
