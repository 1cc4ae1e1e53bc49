use crate::{
    db::query::QueryMode,
    error::Error,
    record::Record,
    types::Timestamp,
};
use serde::{Deserialize, Serialize};

///
/// PublicationStatus
///
/// State machine over a record's publication lifecycle. There is no
/// background ticker: Scheduled records become visible when a query
/// compares their `publishedAt` against the current time.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PublicationStatus {
    Draft,
    Published,
    Unpublished,
    Scheduled,
}

impl PublicationStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Unpublished => "unpublished",
            Self::Scheduled => "scheduled",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(Self::Draft),
            "published" => Some(Self::Published),
            "unpublished" => Some(Self::Unpublished),
            "scheduled" => Some(Self::Scheduled),
            _ => None,
        }
    }
}

impl std::fmt::Display for PublicationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Initial status for a fresh insert.
#[must_use]
pub fn initial_status(publication_enabled: bool) -> PublicationStatus {
    if publication_enabled {
        PublicationStatus::Draft
    } else {
        PublicationStatus::Published
    }
}

/// Apply a publication-settings change to a record.
///
/// Transitions: anything → Published (explicit publish), anything →
/// Unpublished, anything → Scheduled (requires a `publishedAt`). Moving a
/// record back to Draft is not a transition of the state machine.
pub fn apply_settings(
    record: &mut Record,
    status: PublicationStatus,
    published_at: Option<Timestamp>,
    now: Timestamp,
) -> Result<(), Error> {
    match status {
        PublicationStatus::Published => {
            record.set_publication_status(status);
            record.set_published_at(Some(published_at.unwrap_or(now)));
        }
        PublicationStatus::Unpublished => {
            record.set_publication_status(status);
        }
        PublicationStatus::Scheduled => {
            let at = published_at.ok_or_else(|| {
                Error::ValidationFailure(
                    "scheduled publication requires a publishedAt timestamp".to_string(),
                )
            })?;
            record.set_publication_status(status);
            record.set_published_at(Some(at));
        }
        PublicationStatus::Draft => {
            return Err(Error::ValidationFailure(
                "a record cannot be moved back to draft".to_string(),
            ));
        }
    }

    Ok(())
}

/// Whether a record is visible to a query in the given mode.
///
/// Default and sandbox modes see published content only (sandbox relaxes
/// the schema side, not data visibility); preview additionally sees
/// drafts, unpublished records, and not-yet-due scheduled records.
#[must_use]
pub fn visible(record: &Record, mode: QueryMode, now: Timestamp) -> bool {
    if mode == QueryMode::Preview {
        return true;
    }

    match record.publication_status() {
        Some(PublicationStatus::Published) => true,
        Some(PublicationStatus::Scheduled) => {
            record.published_at().is_some_and(|at| at <= now)
        }
        // Records without a status predate publication being enabled on
        // the entity; treat them as published.
        None => true,
        _ => false,
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    fn record(status: PublicationStatus, published_at: Option<Timestamp>) -> Record {
        let mut record = Record::new();
        record.set_publication_status(status);
        record.set_published_at(published_at);
        record
    }

    #[test]
    fn publish_stamps_published_at() {
        let mut rec = record(PublicationStatus::Draft, None);
        let now = Timestamp::from_seconds(1_000);
        apply_settings(&mut rec, PublicationStatus::Published, None, now).unwrap();
        assert_eq!(rec.publication_status(), Some(PublicationStatus::Published));
        assert_eq!(rec.published_at(), Some(now));
    }

    #[test]
    fn schedule_requires_a_timestamp() {
        let mut rec = record(PublicationStatus::Published, None);
        let err =
            apply_settings(&mut rec, PublicationStatus::Scheduled, None, Timestamp::EPOCH)
                .unwrap_err();
        assert!(matches!(err, Error::ValidationFailure(_)));

        let at = Timestamp::from_seconds(2_000);
        apply_settings(&mut rec, PublicationStatus::Scheduled, Some(at), Timestamp::EPOCH)
            .unwrap();
        assert_eq!(rec.published_at(), Some(at));
    }

    #[test]
    fn draft_is_not_a_target_state() {
        let mut rec = record(PublicationStatus::Published, None);
        let err = apply_settings(&mut rec, PublicationStatus::Draft, None, Timestamp::EPOCH)
            .unwrap_err();
        assert!(matches!(err, Error::ValidationFailure(_)));
    }

    #[test]
    fn scheduled_visibility_flips_when_due() {
        let due = Timestamp::from_seconds(100);
        let rec = record(PublicationStatus::Scheduled, Some(due));

        let before = Timestamp::from_seconds(99);
        let after = Timestamp::from_seconds(101);
        assert!(!visible(&rec, QueryMode::Default, before));
        assert!(visible(&rec, QueryMode::Default, after));
        assert!(visible(&rec, QueryMode::Default, due));
        assert!(visible(&rec, QueryMode::Preview, before));
    }

    #[test]
    fn sandbox_does_not_relax_data_visibility() {
        let rec = record(PublicationStatus::Draft, None);
        assert!(!visible(&rec, QueryMode::Sandbox, Timestamp::EPOCH));
        assert!(visible(&rec, QueryMode::Preview, Timestamp::EPOCH));
    }
}
