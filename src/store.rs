//! Record storage by table and predicate.
//!
//! Handlers only talk to [`Store`]; [`MemoryStore`] is the implementation the binary
//! and the tests run against.

use std::{collections::HashMap, error::Error};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

/// A stored row: field name to JSON value. Every stored record carries a numeric `id`.
pub type Record = Map<String, Value>;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("value for {table}.{field} must be unique")]
    UniqueViolation { table: String, field: String },
    #[error("storage backend failure")]
    Backend {
        #[from]
        source: Box<dyn Error + Send + Sync>,
    },
}

/// Conjunction of field equalities. An empty predicate matches every record.
#[derive(Debug, Clone, Default)]
pub struct Predicate {
    clauses: Vec<(String, Value)>,
}

impl Predicate {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::all().and(field, value)
    }

    pub fn and(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.clauses.push((field.into(), value.into()));
        self
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.clauses
            .iter()
            .all(|(field, value)| record.get(field) == Some(value))
    }
}

#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// First record in `table` matching `predicate`, if any.
    async fn find_one(&self, table: &str, predicate: &Predicate)
        -> Result<Option<Record>, StoreError>;

    /// Every record in `table` matching `predicate`, in insertion order.
    async fn find_all(&self, table: &str, predicate: &Predicate) -> Result<Vec<Record>, StoreError>;

    /// Insert a new record and return it as stored, `id` assigned.
    async fn create(&self, table: &str, fields: Record) -> Result<Record, StoreError>;

    /// Overwrite `fields` on every matching record. Returns how many records matched.
    async fn update(
        &self,
        table: &str,
        predicate: &Predicate,
        fields: Record,
    ) -> Result<u64, StoreError>;

    /// Remove every matching record. Returns how many were removed.
    async fn destroy(&self, table: &str, predicate: &Predicate) -> Result<u64, StoreError>;
}

#[derive(Default)]
struct Table {
    next_id: u64,
    rows: Vec<Record>,
}

/// In-process [`Store`]. Each operation holds the lock for its whole duration and
/// either applies completely or, on error, not at all.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Table>>,
    unique: HashMap<String, Vec<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `field` unique within `table`. Creates and updates that would duplicate
    /// an existing value fail with [`StoreError::UniqueViolation`].
    pub fn with_unique(mut self, table: &str, field: &str) -> Self {
        self.unique
            .entry(table.to_owned())
            .or_default()
            .push(field.to_owned());
        self
    }

    fn check_unique(
        &self,
        table: &str,
        rows: &[Record],
        candidate: &Record,
        skip_id: Option<&Value>,
    ) -> Result<(), StoreError> {
        let Some(fields) = self.unique.get(table) else {
            return Ok(());
        };

        for field in fields {
            let Some(value) = candidate.get(field) else {
                continue;
            };
            let taken = rows
                .iter()
                .filter(|row| skip_id.is_none() || row.get("id") != skip_id)
                .any(|row| row.get(field) == Some(value));
            if taken {
                return Err(StoreError::UniqueViolation {
                    table: table.to_owned(),
                    field: field.clone(),
                });
            }
        }

        Ok(())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_one(
        &self,
        table: &str,
        predicate: &Predicate,
    ) -> Result<Option<Record>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .get(table)
            .and_then(|t| t.rows.iter().find(|row| predicate.matches(row)))
            .cloned())
    }

    async fn find_all(&self, table: &str, predicate: &Predicate) -> Result<Vec<Record>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .get(table)
            .map(|t| {
                t.rows
                    .iter()
                    .filter(|row| predicate.matches(row))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn create(&self, table: &str, mut fields: Record) -> Result<Record, StoreError> {
        let mut tables = self.tables.write().await;
        let entry = tables.entry(table.to_owned()).or_default();

        fields.remove("id");
        self.check_unique(table, &entry.rows, &fields, None)?;

        entry.next_id += 1;
        fields.insert("id".to_owned(), Value::from(entry.next_id));
        entry.rows.push(fields.clone());

        Ok(fields)
    }

    async fn update(
        &self,
        table: &str,
        predicate: &Predicate,
        mut fields: Record,
    ) -> Result<u64, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(entry) = tables.get_mut(table) else {
            return Ok(0);
        };

        fields.remove("id");
        let matching: Vec<usize> = entry
            .rows
            .iter()
            .enumerate()
            .filter(|(_, row)| predicate.matches(row))
            .map(|(index, _)| index)
            .collect();

        // Constraints are checked against the fully updated table before anything is
        // written, so a failed update leaves every row untouched.
        let mut staged = entry.rows.clone();
        for &index in &matching {
            staged[index].extend(fields.clone());
        }
        for &index in &matching {
            let row = &staged[index];
            self.check_unique(table, &staged, row, row.get("id"))?;
        }
        entry.rows = staged;

        Ok(matching.len() as u64)
    }

    async fn destroy(&self, table: &str, predicate: &Predicate) -> Result<u64, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(entry) = tables.get_mut(table) else {
            return Ok(0);
        };

        let before = entry.rows.len();
        entry.rows.retain(|row| !predicate.matches(row));

        Ok((before - entry.rows.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[tokio::test]
    async fn create_assigns_increasing_ids_and_ignores_client_id() {
        let store = MemoryStore::new();

        let first = store
            .create("companies", record(json!({"id": 99, "name": "Acme"})))
            .await
            .unwrap();
        let second = store
            .create("companies", record(json!({"name": "Globex"})))
            .await
            .unwrap();

        assert_eq!(first["id"], json!(1));
        assert_eq!(second["id"], json!(2));
    }

    #[tokio::test]
    async fn unique_field_rejects_duplicates() {
        let store = MemoryStore::new().with_unique("users", "email");

        store
            .create("users", record(json!({"email": "a@b.com"})))
            .await
            .unwrap();
        let err = store
            .create("users", record(json!({"email": "a@b.com"})))
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::UniqueViolation { ref field, .. } if field == "email"));
        assert_eq!(
            store.find_all("users", &Predicate::all()).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn update_and_destroy_report_affected_counts() {
        let store = MemoryStore::new();
        store
            .create("jobs", record(json!({"title": "a", "CompanyId": 1})))
            .await
            .unwrap();
        store
            .create("jobs", record(json!({"title": "b", "CompanyId": 1})))
            .await
            .unwrap();
        store
            .create("jobs", record(json!({"title": "c", "CompanyId": 2})))
            .await
            .unwrap();

        let updated = store
            .update(
                "jobs",
                &Predicate::eq("CompanyId", 1),
                record(json!({"description": "remote"})),
            )
            .await
            .unwrap();
        assert_eq!(updated, 2);

        let remote = store
            .find_all("jobs", &Predicate::eq("description", "remote"))
            .await
            .unwrap();
        assert_eq!(remote.len(), 2);

        assert_eq!(store.destroy("jobs", &Predicate::eq("id", 3)).await.unwrap(), 1);
        assert_eq!(store.destroy("jobs", &Predicate::eq("id", 3)).await.unwrap(), 0);
        assert_eq!(
            store.update("missing", &Predicate::all(), Record::new()).await.unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn failed_update_changes_nothing() {
        let store = MemoryStore::new().with_unique("users", "email");
        store
            .create("users", record(json!({"email": "a"})))
            .await
            .unwrap();
        store
            .create("users", record(json!({"email": "b"})))
            .await
            .unwrap();

        let err = store
            .update("users", &Predicate::all(), record(json!({"email": "z"})))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation { .. }));

        let emails: Vec<Value> = store
            .find_all("users", &Predicate::all())
            .await
            .unwrap()
            .into_iter()
            .map(|row| row["email"].clone())
            .collect();
        assert_eq!(emails, vec![json!("a"), json!("b")]);
    }

    #[tokio::test]
    async fn update_may_keep_a_row_its_own_unique_value() {
        let store = MemoryStore::new().with_unique("users", "email");
        store
            .create("users", record(json!({"email": "a"})))
            .await
            .unwrap();

        let updated = store
            .update(
                "users",
                &Predicate::eq("id", 1),
                record(json!({"email": "a", "password": "x"})),
            )
            .await
            .unwrap();

        assert_eq!(updated, 1);
    }

    #[tokio::test]
    async fn predicate_clauses_are_conjunctive() {
        let store = MemoryStore::new();
        store
            .create("jobs", record(json!({"title": "a", "CompanyId": 1})))
            .await
            .unwrap();

        let hit = Predicate::eq("title", "a").and("CompanyId", 1);
        let miss = Predicate::eq("title", "a").and("CompanyId", 2);

        assert!(store.find_one("jobs", &hit).await.unwrap().is_some());
        assert!(store.find_one("jobs", &miss).await.unwrap().is_none());
    }
}
