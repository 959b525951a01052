use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::de::null_as_default;
use super::{EntityKind, Record};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Category {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub color: String,
    #[serde(flatten)]
    #[cfg_attr(feature = "ts", ts(skip))]
    pub extra: Map<String, Value>,
}

impl Category {
    pub fn new(id: impl Into<String>, name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            color: color.into(),
            extra: Map::new(),
        }
    }
}

impl Record for Category {
    const KIND: EntityKind = EntityKind::Categories;

    fn id(&self) -> &str {
        &self.id
    }

    fn defaults() -> Vec<Self> {
        vec![
            Category::new("1", "VIP", "#f59e0b"),
            Category::new("2", "Recorrente", "#10b981"),
            Category::new("3", "Projeto", "#8b5cf6"),
        ]
    }
}
