//! Storage keys, one per collection plus the lead tombstone set.

use crate::models::EntityKind;

pub const LEADS: &str = "nexus_leads_data";
pub const CATEGORIES: &str = "nexus_categories_data";
pub const COMPANIES: &str = "nexus_companies_data";
pub const TASKS: &str = "nexus_tasks_data";
pub const DELETED_LEADS: &str = "nexus_deleted_leads_ids";

pub fn collection_key(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Leads => LEADS,
        EntityKind::Categories => CATEGORIES,
        EntityKind::Companies => COMPANIES,
        EntityKind::Tasks => TASKS,
    }
}

/// Key of the tombstone set, for kinds that keep one.
pub fn tombstone_key(kind: EntityKind) -> Option<&'static str> {
    match kind {
        EntityKind::Leads => Some(DELETED_LEADS),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_distinct() {
        let mut keys: Vec<&str> = EntityKind::ALL.iter().map(|k| collection_key(*k)).collect();
        keys.push(DELETED_LEADS);
        let count = keys.len();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), count);
    }

    #[test]
    fn test_only_leads_keep_tombstones() {
        for kind in EntityKind::ALL {
            assert_eq!(tombstone_key(kind).is_some(), kind.supports_tombstones());
        }
    }
}
