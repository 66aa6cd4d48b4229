//! Product records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use super::{Page, Record, StoreError, Table, generate_id};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub cost: i64,
    pub quantity: i64,
    pub date_created: DateTime<Utc>,
    pub date_updated: DateTime<Utc>,
}

impl Record for Product {
    fn id(&self) -> &str { &self.id }
    fn date_created(&self) -> DateTime<Utc> { self.date_created }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct NewProduct {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(range(min = 0))]
    pub cost: i64,
    #[validate(range(min = 1))]
    pub quantity: i64,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UpdateProduct {
    #[validate(length(min = 1))]
    pub name: Option<String>,
    #[validate(range(min = 0))]
    pub cost: Option<i64>,
    #[validate(range(min = 1))]
    pub quantity: Option<i64>,
}

#[derive(Debug, Default)]
pub struct ProductStore {
    table: Table<Product>,
}

impl ProductStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, np: NewProduct, now: DateTime<Utc>) -> Result<Product, StoreError> {
        np.validate()?;

        let prd = Product {
            id: generate_id(),
            name: np.name,
            cost: np.cost,
            quantity: np.quantity,
            date_created: now,
            date_updated: now,
        };
        info!(id = %prd.id, "product created");
        self.table.insert(prd.clone());
        Ok(prd)
    }

    pub fn update(
        &self,
        id: &str,
        up: UpdateProduct,
        now: DateTime<Utc>,
    ) -> Result<Product, StoreError> {
        up.validate()?;

        self.table.update(id, |prd| {
            if let Some(name) = up.name {
                prd.name = name;
            }
            if let Some(cost) = up.cost {
                prd.cost = cost;
            }
            if let Some(quantity) = up.quantity {
                prd.quantity = quantity;
            }
            prd.date_updated = now;
        })
    }

    pub fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.table.remove(id)
    }

    pub fn query(&self, page: Page) -> Vec<Product> {
        self.table.page(page)
    }

    pub fn query_by_id(&self, id: &str) -> Result<Product, StoreError> {
        self.table.get(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_product() -> NewProduct {
        NewProduct { name: "Comic Books".into(), cost: 50, quantity: 42 }
    }

    #[test]
    fn crud() {
        let store = ProductStore::new();
        let now = Utc::now();

        let prd = store.create(new_product(), now).unwrap();
        assert_eq!(store.query_by_id(&prd.id).unwrap(), prd);

        let upd = UpdateProduct { cost: Some(10), ..Default::default() };
        let saved = store.update(&prd.id, upd, now).unwrap();
        assert_eq!(saved.cost, 10);
        assert_eq!(saved.name, "Comic Books");

        store.delete(&prd.id).unwrap();
        assert!(matches!(store.delete(&prd.id), Err(StoreError::NotFound)));
    }

    #[test]
    fn quantity_must_be_positive() {
        let store = ProductStore::new();
        let bad = NewProduct { quantity: 0, ..new_product() };
        assert!(matches!(store.create(bad, Utc::now()), Err(StoreError::Validation(_))));

        let prd = store.create(new_product(), Utc::now()).unwrap();
        let upd = UpdateProduct { cost: Some(-1), ..Default::default() };
        assert!(matches!(store.update(&prd.id, upd, Utc::now()), Err(StoreError::Validation(_))));
    }
}
