mod cancel;
mod platform;
mod types;

pub use platform::{JsonOutboxPlatform, MemoryNotificationPlatform, NotificationPlatform};
pub use types::{
    NotificationId, NotificationRequest, PendingNotification, PlatformError, SchedError,
    ScheduleReport,
};

use crate::model::Interview;
use crate::notification::{plan_reminders, ReminderOptions, ReminderRenderer, TextReminder};
use crate::storage::KeyValueStore;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

/// Clé de stockage de la liste JSON des identifiants programmés.
pub const SCHEDULED_IDS_KEY: &str = "scheduled_reminder_ids";

/// Planificateur de rappels : garde au plus un jeu de notifications actif.
pub struct ReminderScheduler<P, S> {
    platform: P,
    store: S,
    opts: ReminderOptions,
    renderer: Box<dyn ReminderRenderer>,
    active: Vec<NotificationId>,
}

impl<P: NotificationPlatform, S: KeyValueStore> ReminderScheduler<P, S> {
    /// Crée le planificateur en reprenant les identifiants persistés d'une session précédente.
    pub fn new(platform: P, store: S, opts: ReminderOptions) -> Result<Self, SchedError> {
        let active = match store.get(SCHEDULED_IDS_KEY)? {
            Some(raw) => serde_json::from_str(&raw).map_err(SchedError::CorruptState)?,
            None => Vec::new(),
        };
        Ok(Self {
            platform,
            store,
            opts,
            renderer: Box::new(TextReminder),
            active,
        })
    }

    pub fn with_renderer<R: ReminderRenderer + 'static>(mut self, renderer: R) -> Self {
        self.renderer = Box::new(renderer);
        self
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    pub fn options(&self) -> &ReminderOptions {
        &self.opts
    }

    pub fn active_ids(&self) -> &[NotificationId] {
        &self.active
    }

    /// Remplace tous les rappels par ceux dérivés de `interviews`.
    ///
    /// Tout ce qui était programmé est annulé d'abord ; un échec de la plateforme
    /// sur un rappel est journalisé et n'interrompt pas les suivants.
    pub fn reschedule(
        &mut self,
        interviews: &[Interview],
        now: DateTime<Utc>,
    ) -> Result<ScheduleReport, SchedError> {
        let outcome = cancel::cancel_all(self);
        let mut report = ScheduleReport {
            cancelled: outcome.cancelled,
            cancel_failed: outcome.failed,
            ..ScheduleReport::default()
        };

        let planned = plan_reminders(interviews, now, &self.opts, self.renderer.as_ref());
        for reminder in planned {
            let request = NotificationRequest {
                trigger_at: reminder.trigger_at,
                title: reminder.title,
                body: reminder.body,
                tag: self.opts.tag.clone(),
                interview_id: reminder.interview_id,
                kind: reminder.kind,
            };
            match self.platform.schedule(&request) {
                Ok(id) => {
                    debug!(
                        id = id.as_str(),
                        interview = request.interview_id.as_str(),
                        kind = request.kind.as_str(),
                        at = %request.trigger_at,
                        "reminder scheduled"
                    );
                    self.active.push(id);
                    report.scheduled += 1;
                }
                Err(err) => {
                    warn!(
                        interview = request.interview_id.as_str(),
                        kind = request.kind.as_str(),
                        %err,
                        "reminder not scheduled"
                    );
                    report.failed += 1;
                }
            }
        }

        self.persist()?;
        Ok(report)
    }

    /// Annule tous les rappels de la session ; à appeler à la fermeture de l'écran.
    ///
    /// Renvoie le nombre d'annulations réussies. Les échecs restent persistés.
    pub fn teardown(&mut self) -> Result<usize, SchedError> {
        let outcome = cancel::cancel_all(self);
        if self.active.is_empty() {
            self.store.remove(SCHEDULED_IDS_KEY)?;
        } else {
            self.persist()?;
        }
        Ok(outcome.cancelled)
    }

    fn persist(&self) -> Result<(), SchedError> {
        let raw = serde_json::to_string(&self.active).map_err(SchedError::Encode)?;
        self.store.set(SCHEDULED_IDS_KEY, &raw)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{InterviewId, InterviewKind};
    use crate::notification::ReminderKind;
    use crate::storage::MemoryStore;
    use chrono::{NaiveDate, NaiveTime, TimeZone};

    fn opts() -> ReminderOptions {
        ReminderOptions::default()
    }

    fn at(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, d, h, 0, 0).unwrap()
    }

    fn interview(id: &str, d: u32, h: u32) -> Interview {
        Interview::new(
            id,
            NaiveDate::from_ymd_opt(2025, 10, d).unwrap(),
            NaiveTime::from_hms_opt(h, 0, 0).unwrap(),
            "Préparateur en pharmacie",
            "Pharmacie Centrale",
            InterviewKind::Final,
        )
    }

    #[test]
    fn platform_failure_skips_only_that_reminder() {
        let store = MemoryStore::new();
        let mut s = ReminderScheduler::new(
            MemoryNotificationPlatform::refusing(ReminderKind::TwoHoursBefore),
            &store,
            ReminderOptions::default(),
        )
        .unwrap();

        let report = s.reschedule(&[interview("a", 10, 14)], at(1, 8)).unwrap();
        assert_eq!(report.scheduled, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(s.active_ids().len(), 2);
    }

    #[test]
    fn stray_tagged_notifications_are_cleared_but_others_kept() {
        let mut platform = MemoryNotificationPlatform::new();
        let foreign = platform.inject(NotificationRequest {
            trigger_at: at(5, 9),
            title: "Nouvelle mission".into(),
            body: "Une mission correspond à votre profil".into(),
            tag: "missions".into(),
            interview_id: InterviewId::new("-"),
            kind: ReminderKind::DayBefore,
        });
        let stray = platform.inject(NotificationRequest {
            trigger_at: at(5, 9),
            title: "Entretien demain".into(),
            body: "oublié par une session précédente".into(),
            tag: crate::notification::REMINDER_TAG.into(),
            interview_id: InterviewId::new("old"),
            kind: ReminderKind::DayBefore,
        });

        let store = MemoryStore::new();
        let mut s = ReminderScheduler::new(platform, &store, ReminderOptions::default()).unwrap();
        let report = s.reschedule(&[], at(1, 8)).unwrap();

        assert_eq!(report.cancelled, 1);
        let ids: Vec<_> = s
            .platform()
            .pending_notifications()
            .iter()
            .map(|p| p.id.clone())
            .collect();
        assert_eq!(ids, vec![foreign]);
        assert_eq!(s.platform().cancelled(), &[stray]);
    }

    #[test]
    fn persisted_ids_survive_restart_and_are_cancelled() {
        let store = MemoryStore::new();
        let mut first =
            ReminderScheduler::new(MemoryNotificationPlatform::new(), &store, opts()).unwrap();
        first.reschedule(&[interview("a", 10, 14)], at(1, 8)).unwrap();
        let previous = first.active_ids().to_vec();
        assert!(store.get(SCHEDULED_IDS_KEY).unwrap().is_some());

        // nouvelle session, plateforme vide : les anciens ids sont quand même annulés
        let mut second =
            ReminderScheduler::new(MemoryNotificationPlatform::new(), &store, opts()).unwrap();
        assert_eq!(second.active_ids(), previous.as_slice());
        assert_eq!(second.teardown().unwrap(), 3);
        assert_eq!(second.platform().cancelled(), previous.as_slice());
        assert!(store.get(SCHEDULED_IDS_KEY).unwrap().is_none());
    }

    #[test]
    fn failed_cancellations_are_kept_and_retried() {
        let store = MemoryStore::new();
        let mut s =
            ReminderScheduler::new(MemoryNotificationPlatform::new(), &store, opts()).unwrap();
        let list = [interview("a", 10, 14)];
        s.reschedule(&list, at(1, 8)).unwrap();
        let first_set = s.active_ids().to_vec();

        s.platform_mut().set_offline(true);
        let report = s.reschedule(&list, at(1, 8)).unwrap();
        assert_eq!(report.cancelled, 0);
        assert_eq!(report.cancel_failed, 3);
        assert_eq!(report.scheduled, 3);
        // l'ancien jeu reste suivi et persisté à côté du nouveau
        assert_eq!(s.active_ids().len(), 6);
        assert!(first_set.iter().all(|id| s.active_ids().contains(id)));
        let persisted: Vec<NotificationId> =
            serde_json::from_str(&store.get(SCHEDULED_IDS_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(persisted.len(), 6);

        // teardown hors ligne : rien n'est perdu
        assert_eq!(s.teardown().unwrap(), 0);
        assert_eq!(s.active_ids().len(), 6);
        assert!(store.get(SCHEDULED_IDS_KEY).unwrap().is_some());

        s.platform_mut().set_offline(false);
        let report = s.reschedule(&list, at(1, 8)).unwrap();
        assert_eq!(report.cancelled, 6);
        assert_eq!(report.cancel_failed, 0);
        assert_eq!(s.platform().pending_notifications().len(), 3);
        assert_eq!(s.active_ids().len(), 3);
    }

    #[test]
    fn corrupt_persisted_list_is_reported() {
        let store = MemoryStore::new();
        store.set(SCHEDULED_IDS_KEY, "{oops").unwrap();
        let res = ReminderScheduler::new(
            MemoryNotificationPlatform::new(),
            &store,
            ReminderOptions::default(),
        );
        assert!(matches!(res, Err(SchedError::CorruptState(_))));
    }
}
