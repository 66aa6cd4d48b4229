//! User records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use super::{Page, Record, StoreError, Table, generate_id};

/// An individual user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub roles: Vec<String>,
    pub date_created: DateTime<Utc>,
    pub date_updated: DateTime<Utc>,
}

impl Record for User {
    fn id(&self) -> &str { &self.id }
    fn date_created(&self) -> DateTime<Utc> { self.date_created }
}

/// What a client must send to create a user.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct NewUser {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub roles: Vec<String>,
}

/// Fields a client may change on an existing user.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UpdateUser {
    #[validate(length(min = 1))]
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 1))]
    pub roles: Option<Vec<String>>,
}

#[derive(Debug, Default)]
pub struct UserStore {
    table: Table<User>,
}

impl UserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, nu: NewUser, now: DateTime<Utc>) -> Result<User, StoreError> {
        nu.validate()?;

        let usr = User {
            id: generate_id(),
            name: nu.name,
            email: nu.email,
            roles: nu.roles,
            date_created: now,
            date_updated: now,
        };
        info!(id = %usr.id, "user created");
        self.table.insert(usr.clone());
        Ok(usr)
    }

    pub fn update(&self, id: &str, uu: UpdateUser, now: DateTime<Utc>) -> Result<User, StoreError> {
        uu.validate()?;

        self.table.update(id, |usr| {
            if let Some(name) = uu.name {
                usr.name = name;
            }
            if let Some(email) = uu.email {
                usr.email = email;
            }
            if let Some(roles) = uu.roles {
                usr.roles = roles;
            }
            usr.date_updated = now;
        })
    }

    pub fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.table.remove(id)
    }

    pub fn query(&self, page: Page) -> Vec<User> {
        self.table.page(page)
    }

    pub fn query_by_id(&self, id: &str) -> Result<User, StoreError> {
        self.table.get(id)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn new_user() -> NewUser {
        NewUser {
            name: "Fii".into(),
            email: "fii@fii.com".into(),
            roles: vec!["ADMIN".into()],
        }
    }

    #[test]
    fn crud() {
        let store = UserStore::new();
        let now = Utc.with_ymd_and_hms(2021, 10, 1, 0, 0, 0).unwrap();

        let usr = store.create(new_user(), now).unwrap();
        assert_eq!(store.query_by_id(&usr.id).unwrap(), usr);

        let later = now + chrono::Duration::hours(1);
        let upd = UpdateUser {
            name: Some("Updated Fii".into()),
            email: Some("updated@fii.com".into()),
            roles: None,
        };
        store.update(&usr.id, upd, later).unwrap();

        let saved = store.query_by_id(&usr.id).unwrap();
        assert_eq!(saved.name, "Updated Fii");
        assert_eq!(saved.email, "updated@fii.com");
        assert_eq!(saved.roles, vec!["ADMIN".to_owned()]);
        assert_eq!(saved.date_created, now);
        assert_eq!(saved.date_updated, later);

        assert_eq!(store.query(Page::default()).len(), 1);

        store.delete(&usr.id).unwrap();
        assert!(matches!(store.query_by_id(&usr.id), Err(StoreError::NotFound)));
    }

    #[test]
    fn rejects_invalid_users() {
        let store = UserStore::new();
        let bad = NewUser { email: "not-an-email".into(), roles: vec![], ..new_user() };

        match store.create(bad, Utc::now()) {
            Err(StoreError::Validation(errs)) => {
                let fields = errs.field_errors();
                assert!(fields.contains_key("email"));
                assert!(fields.contains_key("roles"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
        assert!(store.query(Page::default()).is_empty());
    }
}
