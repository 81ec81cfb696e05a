use serde::{Deserialize, Serialize};

use crate::model::{
    common::password::{hash_password, verify_password},
    mongodb::Coll,
};

/// Username of the admin created when the database has none.
pub const DEFAULT_ADMIN_USERNAME: &str = "admin";
/// Initial password of the default admin. Change it after first login.
pub const DEFAULT_ADMIN_PASSWORD: &str = "change-me-now";

/// Core admin user data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminCore {
    pub username: String,
    pub password_hash: String,
}

impl AdminCore {
    /// Check whether the given password is correct.
    pub fn verify_password(&self, password: &str) -> bool {
        verify_password(&self.password_hash, password)
    }
}

/// An admin without an ID.
pub type NewAdmin = AdminCore;

with_id! {
    /// An admin user from the database, with its unique ID.
    Admin { admin: AdminCore }
}

/// Ensure at least one admin exists, creating the default admin if necessary.
pub async fn ensure_admin_exists(admins: &Coll<NewAdmin>) -> crate::error::Result<()> {
    let count = admins.count_documents(None, None).await?;
    if count == 0 {
        warn!("No admins found, creating default admin '{DEFAULT_ADMIN_USERNAME}'");
        let admin = NewAdmin {
            username: DEFAULT_ADMIN_USERNAME.to_string(),
            password_hash: hash_password(DEFAULT_ADMIN_PASSWORD)?,
        };
        admins.insert_one(admin, None).await?;
    }
    Ok(())
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    use crate::model::api::admin::AdminCredentials;

    impl AdminCore {
        pub fn example() -> Self {
            AdminCredentials::example1().try_into().unwrap()
        }

        pub fn example2() -> Self {
            AdminCredentials::example2().try_into().unwrap()
        }
    }
}
