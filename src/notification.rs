use crate::model::{Interview, InterviewId};
use chrono::{DateTime, Duration, FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Marqueur posé sur chaque notification programmée par ce module.
pub const REMINDER_TAG: &str = "interview-reminder";

/// Type de rappel dérivé d'un entretien.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderKind {
    /// 24 h avant.
    DayBefore,
    /// 2 h avant.
    TwoHoursBefore,
    /// 15 min avant.
    FifteenMinutesBefore,
    /// Demande de confirmation, quelques minutes après le chargement.
    ConfirmAttendance,
}

impl ReminderKind {
    /// Décalage avant le début de l'entretien, pour les rappels à échéance fixe.
    pub fn lead_time(self) -> Option<Duration> {
        match self {
            ReminderKind::DayBefore => Some(Duration::hours(24)),
            ReminderKind::TwoHoursBefore => Some(Duration::hours(2)),
            ReminderKind::FifteenMinutesBefore => Some(Duration::minutes(15)),
            ReminderKind::ConfirmAttendance => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReminderKind::DayBefore => "day_before",
            ReminderKind::TwoHoursBefore => "two_hours_before",
            ReminderKind::FifteenMinutesBefore => "fifteen_minutes_before",
            ReminderKind::ConfirmAttendance => "confirm_attendance",
        }
    }
}

const FIXED_KINDS: [ReminderKind; 3] = [
    ReminderKind::DayBefore,
    ReminderKind::TwoHoursBefore,
    ReminderKind::FifteenMinutesBefore,
];

/// Options de calcul des rappels.
#[derive(Debug, Clone)]
pub struct ReminderOptions {
    /// Fuseau de l'appareil, dans lequel sont exprimées date et heure des entretiens.
    pub utc_offset: FixedOffset,
    /// Délai entre le chargement et la demande de confirmation.
    pub confirm_delay: Duration,
    /// Fenêtre `[min, max]` avant l'entretien où la confirmation est demandée.
    pub confirm_window: (Duration, Duration),
    pub tag: String,
}

impl Default for ReminderOptions {
    fn default() -> Self {
        Self {
            utc_offset: Utc.fix(),
            confirm_delay: Duration::minutes(5),
            confirm_window: (Duration::hours(24), Duration::hours(48)),
            tag: REMINDER_TAG.to_string(),
        }
    }
}

/// Rappel calculé, prêt à être soumis au planificateur de la plateforme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedReminder {
    pub interview_id: InterviewId,
    pub kind: ReminderKind,
    pub trigger_at: DateTime<Utc>,
    pub title: String,
    pub body: String,
}

/// Permet de customiser le texte des notifications.
pub trait ReminderRenderer {
    fn render(&self, interview: &Interview, kind: ReminderKind) -> (String, String);
}

/// Textes par défaut de l'application.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextReminder;

impl ReminderRenderer for TextReminder {
    fn render(&self, interview: &Interview, kind: ReminderKind) -> (String, String) {
        let at = interview.time.format("%H:%M");
        let offer = &interview.offer_title;
        let company = if interview.company.is_empty() {
            String::new()
        } else {
            format!(" chez {}", interview.company)
        };
        match kind {
            ReminderKind::DayBefore => (
                "Entretien demain".to_string(),
                format!("Rappel : entretien pour \"{offer}\"{company} demain à {at}."),
            ),
            ReminderKind::TwoHoursBefore => (
                "Entretien dans 2 heures".to_string(),
                format!("Votre entretien pour \"{offer}\"{company} commence à {at}."),
            ),
            ReminderKind::FifteenMinutesBefore => (
                "Entretien dans 15 minutes".to_string(),
                format!("Préparez-vous : \"{offer}\"{company} à {at}. Vérifiez votre connexion."),
            ),
            ReminderKind::ConfirmAttendance => (
                "Confirmez votre présence".to_string(),
                format!(
                    "Serez-vous présent à l'entretien \"{offer}\"{company} le {} à {at} ?",
                    interview.date.format("%d/%m/%Y")
                ),
            ),
        }
    }
}

/// Calcule les rappels à programmer pour une liste d'entretiens.
///
/// Seuls les déclenchements strictement postérieurs à `now` sont gardés.
pub fn plan_reminders(
    interviews: &[Interview],
    now: DateTime<Utc>,
    opts: &ReminderOptions,
    renderer: &dyn ReminderRenderer,
) -> Vec<PlannedReminder> {
    let mut out = Vec::new();

    for interview in interviews {
        let Some(start) = interview.starts_at(&opts.utc_offset) else {
            warn!(interview = interview.id.as_str(), "cannot resolve interview start, skipped");
            continue;
        };
        if start <= now {
            continue;
        }

        let mut push = |kind: ReminderKind, trigger_at: DateTime<Utc>| {
            if trigger_at <= now {
                return;
            }
            let (title, body) = renderer.render(interview, kind);
            out.push(PlannedReminder {
                interview_id: interview.id.clone(),
                kind,
                trigger_at,
                title,
                body,
            });
        };

        for kind in FIXED_KINDS {
            if let Some(lead) = kind.lead_time() {
                push(kind, start - lead);
            }
        }

        let until = start - now;
        let (min, max) = opts.confirm_window;
        if min <= until && until <= max {
            push(ReminderKind::ConfirmAttendance, now + opts.confirm_delay);
        }
    }

    out.sort_by(|a, b| {
        a.trigger_at
            .cmp(&b.trigger_at)
            .then_with(|| a.interview_id.cmp(&b.interview_id))
            .then_with(|| a.kind.cmp(&b.kind))
    });
    out
}
