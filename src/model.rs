use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Identifiant fort pour Interview
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct InterviewId(String);

/// L'API renvoie l'identifiant tantôt en texte, tantôt en nombre.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Int(i64),
    Uint(u64),
}

impl<'de> Deserialize<'de> for InterviewId {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        Ok(match RawId::deserialize(d)? {
            RawId::Text(s) => Self(s),
            RawId::Int(n) => Self(n.to_string()),
            RawId::Uint(n) => Self(n.to_string()),
        })
    }
}

impl InterviewId {
    pub fn new<S: AsRef<str>>(s: S) -> Self {
        Self(s.as_ref().to_owned())
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Type d'entretien tel que renvoyé par l'API.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum InterviewKind {
    Final,
    #[default]
    Selection,
    Custom(String),
}

impl InterviewKind {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "final" | "finale" => InterviewKind::Final,
            "selection" | "sélection" | "" => InterviewKind::Selection,
            other => InterviewKind::Custom(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            InterviewKind::Final => "final",
            InterviewKind::Selection => "selection",
            InterviewKind::Custom(raw) => raw,
        }
    }
}

impl Serialize for InterviewKind {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for InterviewKind {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(d)?;
        Ok(raw.as_deref().map(InterviewKind::parse).unwrap_or_default())
    }
}

/// Entretien planifié (date et heure locales à l'appareil).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interview {
    pub id: InterviewId,
    #[serde(deserialize_with = "de_loose_date")]
    pub date: NaiveDate,
    #[serde(deserialize_with = "de_loose_time")]
    pub time: NaiveTime,
    pub offer_title: String,
    #[serde(default)]
    pub company: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_link: Option<String>,
    #[serde(default)]
    pub kind: InterviewKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Fenêtre d'accès au lien de visio avant le début.
pub const JOIN_OPENS_BEFORE_MINUTES: i64 = 15;
/// Fenêtre d'accès au lien de visio après le début.
pub const JOIN_CLOSES_AFTER_HOURS: i64 = 2;

impl Interview {
    pub fn new<T: Into<String>, C: Into<String>>(
        id: &str,
        date: NaiveDate,
        time: NaiveTime,
        offer_title: T,
        company: C,
        kind: InterviewKind,
    ) -> Self {
        Self {
            id: InterviewId::new(id),
            date,
            time,
            offer_title: offer_title.into(),
            company: company.into(),
            join_link: None,
            kind,
            status: None,
        }
    }

    /// Clé jour `YYYY-MM-DD`, utilisée pour le regroupement du calendrier.
    pub fn day_key(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }

    /// Instant de début, en interprétant date+heure dans le fuseau donné.
    ///
    /// `None` si l'heure locale n'existe pas ou est ambiguë (changement d'heure).
    pub fn starts_at(&self, offset: &FixedOffset) -> Option<DateTime<Utc>> {
        offset
            .from_local_datetime(&NaiveDateTime::new(self.date, self.time))
            .single()
            .map(|dt| dt.with_timezone(&Utc))
    }

    pub fn is_final(&self) -> bool {
        self.kind == InterviewKind::Final
    }

    /// Le lien de visio est utilisable 15 min avant le début et jusqu'à 2 h après.
    pub fn is_joinable(&self, now: DateTime<Utc>, offset: &FixedOffset) -> bool {
        if self.join_link.is_none() {
            return false;
        }
        let Some(start) = self.starts_at(offset) else {
            return false;
        };
        let opens = start - Duration::minutes(JOIN_OPENS_BEFORE_MINUTES);
        let closes = start + Duration::hours(JOIN_CLOSES_AFTER_HOURS);
        opens <= now && now <= closes
    }
}

fn de_loose_date<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDate, D::Error> {
    let raw = String::deserialize(d)?;
    parse_loose_date(&raw).map_err(serde::de::Error::custom)
}

fn de_loose_time<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
    let raw = String::deserialize(d)?;
    parse_loose_time(&raw).map_err(serde::de::Error::custom)
}

/// Accepte `YYYY-MM-DD` ou un horodatage RFC3339 (seule la partie date est gardée).
pub fn parse_loose_date(raw: &str) -> Result<NaiveDate, String> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.date_naive())
        .map_err(|_| format!("invalid date: {raw}"))
}

/// Accepte `HH:MM` ou `HH:MM:SS`.
pub fn parse_loose_time(raw: &str) -> Result<NaiveTime, String> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .map_err(|_| format!("invalid time: {raw}"))
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("request unsuccessful: {}", .0.as_deref().unwrap_or("no message"))]
    Unsuccessful(Option<String>),
    #[error("response has no data")]
    MissingData,
}

/// Enveloppe `{success, data, message}` renvoyée par l'API distante.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiEnvelope<T> {
    pub fn into_result(self) -> Result<T, ApiError> {
        if !self.success {
            return Err(ApiError::Unsuccessful(self.message));
        }
        self.data.ok_or(ApiError::MissingData)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paris() -> FixedOffset {
        FixedOffset::east_opt(2 * 3600).unwrap()
    }

    #[test]
    fn kind_parsing_is_lenient() {
        assert_eq!(InterviewKind::parse("Finale"), InterviewKind::Final);
        assert_eq!(InterviewKind::parse(" sélection "), InterviewKind::Selection);
        assert_eq!(
            InterviewKind::parse("technique"),
            InterviewKind::Custom("technique".into())
        );
    }

    #[test]
    fn loose_date_and_time() {
        let d = parse_loose_date("2025-10-01T00:00:00.000Z").unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2025, 10, 1).unwrap());
        assert_eq!(
            parse_loose_time("09:30").unwrap(),
            NaiveTime::from_hms_opt(9, 30, 0).unwrap()
        );
        assert!(parse_loose_time("9h30").is_err());
    }

    #[test]
    fn starts_at_applies_offset() {
        let i = Interview::new(
            "1",
            NaiveDate::from_ymd_opt(2025, 10, 1).unwrap(),
            NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            "Infirmier",
            "CHU",
            InterviewKind::Selection,
        );
        let start = i.starts_at(&paris()).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 10, 1, 8, 0, 0).unwrap());
        assert_eq!(i.day_key(), "2025-10-01");
    }

    #[test]
    fn joinable_window() {
        let mut i = Interview::new(
            "1",
            NaiveDate::from_ymd_opt(2025, 10, 1).unwrap(),
            NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            "Infirmier",
            "CHU",
            InterviewKind::Final,
        );
        let utc = FixedOffset::east_opt(0).unwrap();
        let at = |h, m| Utc.with_ymd_and_hms(2025, 10, 1, h, m, 0).unwrap();
        assert!(!i.is_joinable(at(9, 50), &utc));
        i.join_link = Some("https://visio.example/room/1".into());
        assert!(!i.is_joinable(at(9, 44), &utc));
        assert!(i.is_joinable(at(9, 45), &utc));
        assert!(i.is_joinable(at(12, 0), &utc));
        assert!(!i.is_joinable(at(12, 1), &utc));
    }

    #[test]
    fn id_accepts_text_or_number() {
        let ids: Vec<InterviewId> =
            serde_json::from_str(r#"["a-7", 12, 18446744073709551615]"#).unwrap();
        assert_eq!(
            ids.iter().map(InterviewId::as_str).collect::<Vec<_>>(),
            vec!["a-7", "12", "18446744073709551615"]
        );
        assert!(serde_json::from_str::<InterviewId>("1.5").is_err());
    }

    #[test]
    fn envelope_results() {
        let ok: ApiEnvelope<u8> = serde_json::from_str(r#"{"success":true,"data":3}"#).unwrap();
        assert_eq!(ok.into_result().unwrap(), 3);
        let ko: ApiEnvelope<u8> =
            serde_json::from_str(r#"{"success":false,"message":"boom"}"#).unwrap();
        assert!(matches!(ko.into_result(), Err(ApiError::Unsuccessful(Some(m))) if m == "boom"));
        let empty: ApiEnvelope<u8> = serde_json::from_str(r#"{"success":true}"#).unwrap();
        assert!(matches!(empty.into_result(), Err(ApiError::MissingData)));
    }
}
