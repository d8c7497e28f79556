use crate::error::AppError;
use chrono::{DateTime, NaiveDate, Utc};
use mongodb::bson::oid::ObjectId;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static CANONICAL_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid date regex"));
static CANONICAL_TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([01]?\d|2[0-3]):[0-5]\d$").expect("valid time regex"));
static TIME_PARTS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d{1,2}):([0-5]\d)\s*(am|pm)?").expect("valid time regex"));
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));
static NON_SLUG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s-]").expect("valid slug regex"));
static WHITESPACE_RUN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));
static HYPHEN_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"-+").expect("valid hyphen regex"));

// Fallback formats tried when a date is not already canonical and not an
// RFC 3339/2822 timestamp.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%Y/%m/%d",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
    "%A, %B %d, %Y",
    "%a %b %d, %Y",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub overview: String,
    pub image: String,
    pub venue: String,
    pub location: String,
    pub date: String,
    pub time: String,
    pub mode: String,
    pub audience: String,
    pub agenda: Vec<String>,
    pub organizer: String,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub event_id: ObjectId,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Returns a normalized copy of this event, ready to persist, or the
    /// first validation error. `previous` is the stored document on update
    /// and `None` on create; a field counts as changed when it differs from
    /// `previous`. The receiver is never mutated, so a failed write leaves
    /// nothing half-applied.
    pub fn normalized(&self, previous: Option<&Event>) -> Result<Event, AppError> {
        let mut event = self.clone();
        for field in [
            &mut event.title,
            &mut event.slug,
            &mut event.description,
            &mut event.overview,
            &mut event.image,
            &mut event.venue,
            &mut event.location,
            &mut event.date,
            &mut event.time,
            &mut event.mode,
            &mut event.audience,
            &mut event.organizer,
        ] {
            *field = field.trim().to_string();
        }

        // Regenerate the slug only when the title changed or no slug exists;
        // a manually assigned slug survives unrelated-field updates.
        let title_changed = previous.is_none_or(|prev| prev.title != event.title);
        if !event.title.is_empty() && (title_changed || event.slug.is_empty()) {
            let slug = derive_slug(&event.title);
            if slug.is_empty() {
                return Err(AppError::Validation {
                    field: "slug",
                    reason: format!("cannot be derived from title '{}'", event.title),
                });
            }
            event.slug = slug;
        }

        if !event.date.is_empty() && previous.is_none_or(|prev| prev.date != event.date) {
            event.date = normalize_date(&event.date)?;
        }
        if !event.time.is_empty() && previous.is_none_or(|prev| prev.time != event.time) {
            event.time = normalize_time(&event.time);
        }

        event.validate_required()?;
        Ok(event)
    }

    fn validate_required(&self) -> Result<(), AppError> {
        let required = [
            ("title", &self.title),
            ("description", &self.description),
            ("overview", &self.overview),
            ("image", &self.image),
            ("venue", &self.venue),
            ("location", &self.location),
            ("date", &self.date),
            ("time", &self.time),
            ("mode", &self.mode),
            ("audience", &self.audience),
            ("organizer", &self.organizer),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(AppError::Validation {
                    field,
                    reason: "cannot be empty".to_string(),
                });
            }
        }
        if self.agenda.is_empty() {
            return Err(AppError::Validation {
                field: "agenda",
                reason: "must be a non-empty list".to_string(),
            });
        }
        if self.tags.is_empty() {
            return Err(AppError::Validation {
                field: "tags",
                reason: "must be a non-empty list".to_string(),
            });
        }
        Ok(())
    }
}

impl Booking {
    pub fn normalized(&self) -> Result<Booking, AppError> {
        let mut booking = self.clone();
        booking.email = booking.email.trim().to_lowercase();
        if !EMAIL_RE.is_match(&booking.email) {
            return Err(AppError::Validation {
                field: "email",
                reason: "must be a valid email address".to_string(),
            });
        }
        Ok(booking)
    }
}

/// Derives a URL-safe slug from an event title: lowercase, strip everything
/// that is not a word character, whitespace, or hyphen, then collapse
/// whitespace runs to a single hyphen and hyphen runs to one.
pub fn derive_slug(title: &str) -> String {
    let lowered = title.to_lowercase();
    let stripped = NON_SLUG_RE.replace_all(lowered.trim(), "");
    let hyphenated = WHITESPACE_RUN_RE.replace_all(&stripped, "-");
    HYPHEN_RUN_RE.replace_all(&hyphenated, "-").into_owned()
}

/// Canonicalizes a date to `YYYY-MM-DD`. Values already in that shape pass
/// through untouched; anything else must parse as one of the recognized
/// date representations or the write is rejected.
fn normalize_date(raw: &str) -> Result<String, AppError> {
    if CANONICAL_DATE_RE.is_match(raw) {
        return Ok(raw.to_string());
    }
    if let Ok(stamp) = DateTime::parse_from_rfc3339(raw) {
        return Ok(stamp.date_naive().format("%Y-%m-%d").to_string());
    }
    if let Ok(stamp) = DateTime::parse_from_rfc2822(raw) {
        return Ok(stamp.date_naive().format("%Y-%m-%d").to_string());
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Ok(date.format("%Y-%m-%d").to_string());
        }
    }
    Err(AppError::Validation {
        field: "date",
        reason: "must be YYYY-MM-DD or a recognizable date string".to_string(),
    })
}

/// Canonicalizes a time to zero-padded `HH:MM`, keeping the meridiem token
/// (uppercased) when one is present. Bare 24-hour values pass through
/// untouched. A value the pattern cannot read at all is left in place,
/// unlike an unreadable date.
fn normalize_time(raw: &str) -> String {
    if CANONICAL_TIME_RE.is_match(raw) {
        return raw.to_string();
    }
    let Some(parts) = TIME_PARTS_RE.captures(raw) else {
        return raw.to_string();
    };
    let mut hours: u32 = parts[1].parse().unwrap_or(0);
    let minutes = parts[2].to_string();
    let meridiem = parts.get(3).map(|m| m.as_str().to_ascii_uppercase());
    // hour < 12 (not != 12) keeps already-converted values fixed points
    match meridiem.as_deref() {
        Some("PM") if hours < 12 => hours += 12,
        Some("AM") if hours == 12 => hours = 0,
        _ => {}
    }
    match meridiem {
        Some(meridiem) => format!("{hours:02}:{minutes} {meridiem}"),
        None => format!("{hours:02}:{minutes}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event() -> Event {
        Event {
            id: None,
            slug: String::new(),
            title: "Rust Meetup 2025".to_string(),
            description: "An evening of talks".to_string(),
            overview: "Three talks and open hacking".to_string(),
            image: "https://cdn.example.com/rust-meetup.png".to_string(),
            venue: "Main Hall".to_string(),
            location: "Berlin".to_string(),
            date: "2025-10-07".to_string(),
            time: "18:30".to_string(),
            mode: "in-person".to_string(),
            audience: "developers".to_string(),
            agenda: vec!["Doors open".to_string(), "Talks".to_string()],
            organizer: "Rust Berlin".to_string(),
            tags: vec!["rust".to_string(), "meetup".to_string()],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn slug_derivation_is_deterministic() {
        assert_eq!(derive_slug("Rust Meetup 2025"), derive_slug("Rust Meetup 2025"));
        assert_eq!(derive_slug("Rust Meetup 2025"), "rust-meetup-2025");
    }

    #[test]
    fn slug_strips_and_collapses() {
        assert_eq!(derive_slug("  Hello,   World!  "), "hello-world");
        assert_eq!(derive_slug("Rust & Async -- Deep Dive"), "rust-async-deep-dive");
        assert_eq!(derive_slug("snake_case stays"), "snake_case-stays");
    }

    #[test]
    fn slug_from_stripped_only_title_fails() {
        let mut event = sample_event();
        event.title = "!!! ???".to_string();
        let err = event.normalized(None).unwrap_err();
        match err {
            AppError::Validation { field, .. } => assert_eq!(field, "slug"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn create_derives_slug_from_title() {
        let event = sample_event().normalized(None).unwrap();
        assert_eq!(event.slug, "rust-meetup-2025");
    }

    #[test]
    fn manual_slug_survives_unrelated_update() {
        let mut stored = sample_event().normalized(None).unwrap();
        stored.slug = "hand-picked".to_string();
        let mut update = stored.clone();
        update.venue = "Side Hall".to_string();
        let updated = update.normalized(Some(&stored)).unwrap();
        assert_eq!(updated.slug, "hand-picked");
    }

    #[test]
    fn title_change_regenerates_slug() {
        let stored = sample_event().normalized(None).unwrap();
        let mut update = stored.clone();
        update.title = "Rust Meetup 2026".to_string();
        let updated = update.normalized(Some(&stored)).unwrap();
        assert_eq!(updated.slug, "rust-meetup-2026");
    }

    #[test]
    fn canonical_date_passes_through() {
        assert_eq!(normalize_date("2025-10-07").unwrap(), "2025-10-07");
    }

    #[test]
    fn loose_dates_are_reformatted() {
        assert_eq!(normalize_date("10/7/2025").unwrap(), "2025-10-07");
        assert_eq!(normalize_date("October 7, 2025").unwrap(), "2025-10-07");
        assert_eq!(normalize_date("Tue Oct 7, 2025").unwrap(), "2025-10-07");
        assert_eq!(normalize_date("2025-10-07T18:30:00Z").unwrap(), "2025-10-07");
    }

    #[test]
    fn unreadable_date_is_rejected() {
        let err = normalize_date("sometime next week").unwrap_err();
        match err {
            AppError::Validation { field, .. } => assert_eq!(field, "date"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn canonical_times_are_identity() {
        assert_eq!(normalize_time("18:30"), "18:30");
        assert_eq!(normalize_time("9:05"), "9:05");
        assert_eq!(normalize_time("14:30 PM"), "14:30 PM");
        assert_eq!(normalize_time("00:15 AM"), "00:15 AM");
    }

    #[test]
    fn twelve_hour_times_are_converted() {
        assert_eq!(normalize_time("2:30 PM"), "14:30 PM");
        assert_eq!(normalize_time("12:15 AM"), "00:15 AM");
        assert_eq!(normalize_time("12:30 PM"), "12:30 PM");
        assert_eq!(normalize_time("9:05 am"), "09:05 AM");
    }

    #[test]
    fn time_normalization_is_idempotent() {
        for raw in ["2:30 PM", "12:15 AM", "18:30", "7:45 pm"] {
            let once = normalize_time(raw);
            assert_eq!(normalize_time(&once), once);
        }
    }

    #[test]
    fn unmatched_time_is_left_alone() {
        assert_eq!(normalize_time("around sunset"), "around sunset");
    }

    #[test]
    fn empty_agenda_fails_validation() {
        let mut event = sample_event();
        event.agenda.clear();
        let err = event.normalized(None).unwrap_err();
        match err {
            AppError::Validation { field, .. } => assert_eq!(field, "agenda"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn blank_required_field_fails_validation() {
        let mut event = sample_event();
        event.venue = "   ".to_string();
        let err = event.normalized(None).unwrap_err();
        match err {
            AppError::Validation { field, .. } => assert_eq!(field, "venue"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn complete_event_normalizes_cleanly() {
        let mut event = sample_event();
        event.date = "October 7, 2025".to_string();
        event.time = "6:30 pm".to_string();
        let normalized = event.normalized(None).unwrap();
        assert_eq!(normalized.date, "2025-10-07");
        assert_eq!(normalized.time, "18:30 PM");
        assert_eq!(normalized.slug, "rust-meetup-2025");
    }

    #[test]
    fn email_is_trimmed_and_lowercased() {
        let booking = Booking {
            id: None,
            event_id: ObjectId::new(),
            email: "  Attendee@Example.COM ".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(booking.normalized().unwrap().email, "attendee@example.com");
    }

    #[test]
    fn malformed_email_is_rejected() {
        let booking = Booking {
            id: None,
            event_id: ObjectId::new(),
            email: "not-an-email".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let err = booking.normalized().unwrap_err();
        match err {
            AppError::Validation { field, .. } => assert_eq!(field, "email"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
