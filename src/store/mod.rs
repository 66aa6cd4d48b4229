//! In-memory persistence for users and products.
//!
//! Nothing here survives a restart. The stores exist so the CRUD handlers
//! have something real to call; each one is a [`Table`] keyed by a UUID
//! string, plus validation of incoming payloads.

pub mod product;
pub mod user;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

pub use product::{NewProduct, Product, ProductStore, UpdateProduct};
pub use user::{NewUser, UpdateUser, User, UserStore};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("not found")]
    NotFound,

    #[error("ID is not in its proper form: {0}")]
    InvalidId(String),

    #[error("validating data: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// A 1-based page of results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: usize,
    pub rows: usize,
}

impl Default for Page {
    fn default() -> Self {
        Self { number: 1, rows: 20 }
    }
}

/// Records that live in a [`Table`].
pub trait Record: Clone {
    fn id(&self) -> &str;
    fn date_created(&self) -> DateTime<Utc>;
}

/// A lock-protected map from id to record.
#[derive(Debug)]
pub struct Table<T> {
    rows: RwLock<HashMap<String, T>>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self { rows: RwLock::new(HashMap::new()) }
    }
}

impl<T: Record> Table<T> {
    pub fn insert(&self, record: T) {
        self.rows.write().insert(record.id().to_owned(), record);
    }

    pub fn get(&self, id: &str) -> Result<T, StoreError> {
        check_id(id)?;
        self.rows.read().get(id).cloned().ok_or(StoreError::NotFound)
    }

    /// Apply `f` to the record in place and return the updated copy.
    pub fn update(&self, id: &str, f: impl FnOnce(&mut T)) -> Result<T, StoreError> {
        check_id(id)?;
        let mut rows = self.rows.write();
        let record = rows.get_mut(id).ok_or(StoreError::NotFound)?;
        f(record);
        Ok(record.clone())
    }

    pub fn remove(&self, id: &str) -> Result<(), StoreError> {
        check_id(id)?;
        self.rows.write().remove(id).map(drop).ok_or(StoreError::NotFound)
    }

    /// Records ordered by creation time, then id.
    pub fn page(&self, page: Page) -> Vec<T> {
        let mut all: Vec<T> = self.rows.read().values().cloned().collect();
        all.sort_by(|a, b| {
            a.date_created()
                .cmp(&b.date_created())
                .then_with(|| a.id().cmp(b.id()))
        });
        all.into_iter()
            .skip(page.number.saturating_sub(1).saturating_mul(page.rows))
            .take(page.rows)
            .collect()
    }
}

pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

pub fn check_id(id: &str) -> Result<(), StoreError> {
    Uuid::parse_str(id)
        .map(drop)
        .map_err(|_| StoreError::InvalidId(id.to_owned()))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        id: String,
        at: DateTime<Utc>,
    }

    impl Record for Row {
        fn id(&self) -> &str { &self.id }
        fn date_created(&self) -> DateTime<Utc> { self.at }
    }

    fn row(secs: i64) -> Row {
        Row { id: generate_id(), at: Utc.timestamp_opt(secs, 0).unwrap() }
    }

    #[test]
    fn pages_in_creation_order() {
        let table = Table::default();
        let rows: Vec<Row> = (0..5).map(row).collect();
        for r in rows.iter().rev() {
            table.insert(r.clone());
        }

        assert_eq!(table.page(Page { number: 1, rows: 2 }), rows[0..2]);
        assert_eq!(table.page(Page { number: 3, rows: 2 }), rows[4..5]);
        assert!(table.page(Page { number: 4, rows: 2 }).is_empty());
    }

    #[test]
    fn ids_must_be_uuids() {
        let table: Table<Row> = Table::default();
        assert!(matches!(table.get("42"), Err(StoreError::InvalidId(_))));
        assert!(matches!(table.get(&generate_id()), Err(StoreError::NotFound)));
        assert!(matches!(table.remove(&generate_id()), Err(StoreError::NotFound)));
    }
}
