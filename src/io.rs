use crate::model::{ApiEnvelope, Interview};
use crate::notification::PlannedReminder;
use anyhow::Context;
use csv::WriterBuilder;
use std::fs;
use std::path::Path;

/// Décode la réponse `{success, data}` de l'endpoint des entretiens.
pub fn parse_interviews(bytes: &[u8]) -> anyhow::Result<Vec<Interview>> {
    let envelope: ApiEnvelope<Vec<Interview>> =
        serde_json::from_slice(bytes).context("parsing interviews response")?;
    Ok(envelope.into_result()?)
}

/// Import des entretiens depuis un fichier de réponse API.
pub fn import_interviews_json<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<Interview>> {
    let path = path.as_ref();
    let data = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    parse_interviews(&data).with_context(|| format!("could not load interviews from {}", path.display()))
}

/// Export CSV des rappels: header `interview_id,kind,trigger_at,title`
pub fn export_reminders_csv<P: AsRef<Path>>(
    path: P,
    reminders: &[PlannedReminder],
) -> anyhow::Result<()> {
    let mut w = WriterBuilder::new().has_headers(true).from_path(path)?;
    w.write_record(["interview_id", "kind", "trigger_at", "title"])?;
    for r in reminders {
        let trigger = r.trigger_at.to_rfc3339();
        w.write_record([
            r.interview_id.as_str(),
            r.kind.as_str(),
            trigger.as_str(),
            r.title.as_str(),
        ])?;
    }
    w.flush()?;
    Ok(())
}
