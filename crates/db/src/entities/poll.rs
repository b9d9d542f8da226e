//! Poll entity.

use sea_orm::FromJsonQueryResult;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "poll")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Creator of the poll; never changes after insert
    #[sea_orm(indexed)]
    pub owner_id: String,

    pub question: String,

    /// Ordered options; votes reference them by index
    #[sea_orm(column_type = "JsonBinary")]
    pub options: PollOptions,

    pub created_at: DateTimeWithTimeZone,
}

/// Ordered list of poll options, stored as a JSON array of strings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
#[serde(transparent)]
pub struct PollOptions(pub Vec<String>);

impl PollOptions {
    /// Number of options.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no options at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `index` refers to an existing option.
    #[must_use]
    pub fn contains_index(&self, index: i32) -> bool {
        usize::try_from(index).is_ok_and(|i| i < self.0.len())
    }
}

impl Model {
    /// Number of options on this poll.
    #[must_use]
    pub fn option_count(&self) -> usize {
        self.options.len()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::poll_vote::Entity")]
    PollVote,
}

impl Related<super::poll_vote::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PollVote.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_index_bounds() {
        let options = PollOptions(vec!["Red".to_string(), "Blue".to_string()]);

        assert!(options.contains_index(0));
        assert!(options.contains_index(1));
        assert!(!options.contains_index(2));
        assert!(!options.contains_index(-1));
    }

    #[test]
    fn test_options_serialize_as_plain_array() {
        let options = PollOptions(vec!["Red".to_string(), "Blue".to_string()]);
        let json = serde_json::to_value(&options).unwrap_or_default();
        assert_eq!(json, serde_json::json!(["Red", "Blue"]));
    }

    #[test]
    fn test_options_bind_as_json_column() {
        let options = PollOptions(vec!["Red".to_string(), "Blue".to_string()]);
        let value: sea_orm::Value = options.into();

        assert!(matches!(value, sea_orm::Value::Json(Some(_))));
    }
}
