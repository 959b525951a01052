use serde::{de::DeserializeOwned, Serialize};

/// The entity collections the cache knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Leads,
    Categories,
    Companies,
    Tasks,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Leads,
        EntityKind::Categories,
        EntityKind::Companies,
        EntityKind::Tasks,
    ];

    /// Remote table backing this collection.
    pub fn table(self) -> &'static str {
        match self {
            EntityKind::Leads => "leads",
            EntityKind::Categories => "categories",
            EntityKind::Companies => "companies",
            EntityKind::Tasks => "tasks",
        }
    }

    /// Whether local deletions of this kind are remembered as tombstones.
    pub fn supports_tombstones(self) -> bool {
        matches!(self, EntityKind::Leads)
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.table())
    }
}

/// A record that can live in the local cache.
///
/// Records are stored as JSON, so the wire names produced by `Serialize`
/// are the storage format as well.
pub trait Record: Serialize + DeserializeOwned + Clone {
    const KIND: EntityKind;

    fn id(&self) -> &str;

    /// Timestamp used for newest-first display ordering. Never used to
    /// resolve conflicts.
    fn created_at(&self) -> Option<&str> {
        None
    }

    /// Records seeded into an empty collection on first read.
    fn defaults() -> Vec<Self> {
        Vec::new()
    }
}
