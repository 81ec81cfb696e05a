use std::fmt::Display;

use serde::de::DeserializeOwned;
use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::model::{
    db::{admin::Admin, voter::Voter},
    mongodb::{Id, MongoCollection},
};

/// A user of our application, having defined rights.
pub trait User: MongoCollection + DeserializeOwned + Unpin + Send + Sync {
    /// The rights of this user type.
    const RIGHTS: Rights;

    /// Get the user's ID.
    fn id(&self) -> Id;

    /// Name shown next to things the user writes.
    fn display_name(&self) -> String;
}

/// Different privilege levels.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum Rights {
    Voter = 0,
    Admin = 1,
}

impl Display for Rights {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Voter => write!(f, "voter"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

impl User for Voter {
    const RIGHTS: Rights = Rights::Voter;

    fn id(&self) -> Id {
        self.id
    }

    fn display_name(&self) -> String {
        self.voter.display_name()
    }
}

impl User for Admin {
    const RIGHTS: Rights = Rights::Admin;

    fn id(&self) -> Id {
        self.id
    }

    fn display_name(&self) -> String {
        self.username.clone()
    }
}
