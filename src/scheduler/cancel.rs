use super::{NotificationPlatform, ReminderScheduler};
use crate::storage::KeyValueStore;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Bilan d'une passe d'annulation.
#[derive(Debug, Default, Clone, Copy)]
pub(super) struct CancelOutcome {
    pub cancelled: usize,
    pub failed: usize,
}

/// Annule les identifiants retenus puis les notifications orphelines portant notre marqueur.
///
/// Les identifiants dont l'annulation échoue restent dans `active` pour être
/// retentés au prochain rechargement ou à la fermeture.
pub(super) fn cancel_all<P: NotificationPlatform, S: KeyValueStore>(
    scheduler: &mut ReminderScheduler<P, S>,
) -> CancelOutcome {
    let mut done = HashSet::new();
    let mut kept = Vec::new();

    for id in std::mem::take(&mut scheduler.active) {
        match scheduler.platform.cancel(&id) {
            Ok(()) => {
                done.insert(id);
            }
            Err(err) => {
                warn!(id = id.as_str(), %err, "failed to cancel reminder, kept for retry");
                kept.push(id);
            }
        }
    }

    let pending = match scheduler.platform.pending() {
        Ok(list) => list,
        Err(err) => {
            warn!(%err, "cannot list pending notifications");
            Vec::new()
        }
    };
    let strays: Vec<_> = pending
        .into_iter()
        .filter(|p| {
            p.request.tag == scheduler.opts.tag && !done.contains(&p.id) && !kept.contains(&p.id)
        })
        .collect();
    for stray in strays {
        match scheduler.platform.cancel(&stray.id) {
            Ok(()) => {
                debug!(id = stray.id.as_str(), "cancelled stray reminder");
                done.insert(stray.id);
            }
            Err(err) => {
                warn!(
                    id = stray.id.as_str(),
                    %err,
                    "failed to cancel stray reminder, kept for retry"
                );
                kept.push(stray.id);
            }
        }
    }

    let failed = kept.len();
    scheduler.active = kept;
    CancelOutcome {
        cancelled: done.len(),
        failed,
    }
}
