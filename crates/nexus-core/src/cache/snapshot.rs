use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Consider a snapshot stale after 1 hour.
const SNAPSHOT_STALE_MINUTES: i64 = 60;

/// A collection as written: the records together with the write time.
#[derive(Debug, Serialize)]
pub(crate) struct SnapshotRef<'a, T> {
    pub written_at: DateTime<Utc>,
    pub records: &'a [T],
}

impl<'a, T> SnapshotRef<'a, T> {
    pub fn new(records: &'a [T]) -> Self {
        Self {
            written_at: Utc::now(),
            records,
        }
    }
}

/// Age bookkeeping for a write stamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotAge {
    pub written_at: DateTime<Utc>,
}

impl SnapshotAge {
    pub fn age_minutes(&self) -> i64 {
        (Utc::now() - self.written_at).num_minutes()
    }

    pub fn age_display(&self) -> String {
        let minutes = self.age_minutes();
        if minutes < 1 {
            // Also covers clock skew
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            let hours = minutes / 60;
            if minutes % 60 >= 30 {
                format!("{}h ago", hours + 1)
            } else {
                format!("{}h ago", hours)
            }
        } else {
            let days = minutes / 1440;
            if (minutes % 1440) / 60 >= 12 {
                format!("{}d ago", days + 1)
            } else {
                format!("{}d ago", days)
            }
        }
    }

    pub fn is_stale(&self) -> bool {
        self.age_minutes() > SNAPSHOT_STALE_MINUTES
    }
}

/// What may be found under a collection key.
///
/// Earlier dashboard builds stored the bare array; it is still readable and
/// gets upgraded to the envelope on the next write.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum StoredCollection {
    Envelope {
        written_at: Option<DateTime<Utc>>,
        records: Vec<Value>,
    },
    Bare(Vec<Value>),
}

impl StoredCollection {
    pub(crate) fn into_parts(self) -> (Option<DateTime<Utc>>, Vec<Value>) {
        match self {
            StoredCollection::Envelope { written_at, records } => (written_at, records),
            StoredCollection::Bare(records) => (None, records),
        }
    }
}
