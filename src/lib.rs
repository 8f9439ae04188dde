#![forbid(unsafe_code)]
//! Entretiens — logique locale du client mobile de recrutement.
//!
//! - Rappels d'entretien (24 h, 2 h, 15 min, confirmation de présence).
//! - Vue calendrier : regroupement par jour et catégorie dominante.
//! - Autorisations système, avec parcours de première ouverture unique.
//! - Les services de la plateforme sont des traits ; tout est séquentiel.

pub mod calendar;
pub mod io;
pub mod model;
pub mod notification;
pub mod permissions;
pub mod scheduler;
pub mod storage;

pub use calendar::{categorize, upcoming, CalendarView, DayCategory, DayCell, MonthGrid};
pub use model::{ApiEnvelope, Interview, InterviewId, InterviewKind};
pub use notification::{
    plan_reminders, PlannedReminder, ReminderKind, ReminderOptions, ReminderRenderer, TextReminder,
};
pub use permissions::{
    Capability, PermissionOptions, PermissionPlatform, PermissionStatus, PermissionsManager,
    RequestAllOutcome,
};
pub use scheduler::{
    JsonOutboxPlatform, MemoryNotificationPlatform, NotificationPlatform, ReminderScheduler,
    ScheduleReport,
};
pub use storage::{JsonFileStore, KeyValueStore, MemoryStore};
