//! Untyped entity record and hydration contract.
//!
//! # Responsibility
//! - Hold one row as an ordered column -> value map.
//! - Convert raw rows into caller entity types (hydration).
//!
//! # Invariants
//! - Record columns are exactly the projected columns of the producing query.

use crate::model::value::Value;
use crate::repo::error::{RepoError, RepoResult};
use rusqlite::Row;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Column name -> value mapping used for writes and raw reads.
pub type Attributes = BTreeMap<String, Value>;

/// One hydrated row with dynamic attributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    attributes: Attributes,
}

impl Record {
    pub fn new(attributes: Attributes) -> Self {
        Self { attributes }
    }

    /// Reads every column of `row` into a record.
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let stmt = row.as_ref();
        let mut attributes = Attributes::new();
        for index in 0..stmt.column_count() {
            let name = stmt.column_name(index)?.to_string();
            attributes.insert(name, row.get::<_, Value>(index)?);
        }
        Ok(Self { attributes })
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.attributes.get(column)
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn into_attributes(self) -> Attributes {
        self.attributes
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Deserializes the record into a serde-backed entity struct.
    ///
    /// # Errors
    /// - `InvalidData` when attribute names or types do not fit `T`.
    pub fn deserialize_into<T: DeserializeOwned>(&self) -> RepoResult<T> {
        let json = serde_json::to_value(&self.attributes)
            .map_err(|err| RepoError::InvalidData(format!("record is not serializable: {err}")))?;
        serde_json::from_value(json)
            .map_err(|err| RepoError::InvalidData(format!("record does not fit entity: {err}")))
    }
}

/// Hydration contract for entity types bound to a repository.
pub trait Entity: Sized {
    /// Builds one entity from a fetched record.
    fn from_record(record: Record) -> RepoResult<Self>;
}

impl Entity for Record {
    fn from_record(record: Record) -> RepoResult<Self> {
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::{Attributes, Record};
    use crate::model::value::Value;
    use crate::repo::error::RepoError;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Role {
        id: i64,
        title: String,
        note: Option<String>,
    }

    fn role_record() -> Record {
        let mut attributes = Attributes::new();
        attributes.insert("id".to_string(), Value::Integer(7));
        attributes.insert("title".to_string(), Value::from("admin"));
        attributes.insert("note".to_string(), Value::Null);
        Record::new(attributes)
    }

    #[test]
    fn deserialize_into_maps_attributes_to_fields() {
        let role: Role = role_record().deserialize_into().unwrap();
        assert_eq!(
            role,
            Role {
                id: 7,
                title: "admin".to_string(),
                note: None,
            }
        );
    }

    #[test]
    fn deserialize_into_reports_shape_mismatch() {
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Wrong {
            title: i64,
        }

        let err = role_record().deserialize_into::<Wrong>().unwrap_err();
        assert!(matches!(err, RepoError::InvalidData(_)));
    }
}
