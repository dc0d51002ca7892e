//! API client identities and their capability flags.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;

/// A coarse-grained API consumer identity.
///
/// Clients are keyed by name and carry four independent capability flags.
/// A client referenced for the first time is created on the fly with the
/// default flags (read and vote granted, write and delete not).
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct Client {
    pub id: i64,
    pub name: String,
    pub read_access: bool,
    pub write_access: bool,
    pub delete_access: bool,
    pub vote_access: bool,
}

impl Client {
    /// Answers whether this client holds the given capability.
    pub fn grants(&self, permission: Permission) -> bool {
        match permission {
            Permission::Read => self.read_access,
            Permission::Write => self.write_access,
            Permission::Delete => self.delete_access,
            Permission::Vote => self.vote_access,
        }
    }
}

/// The capability kinds a client can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Read,
    Write,
    Delete,
    Vote,
}

/// Raised when a permission string is not one of the four known kinds.
///
/// This is a programming error in the caller, not a client mistake.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("`{0}` is not a recognized permission")]
pub struct InvalidPermissionError(pub String);

impl FromStr for Permission {
    type Err = InvalidPermissionError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "read" => Ok(Self::Read),
            "write" => Ok(Self::Write),
            "delete" => Ok(Self::Delete),
            "vote" => Ok(Self::Vote),
            other => Err(InvalidPermissionError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_four_permission_kinds() {
        assert_eq!("read".parse(), Ok(Permission::Read));
        assert_eq!("write".parse(), Ok(Permission::Write));
        assert_eq!("delete".parse(), Ok(Permission::Delete));
        assert_eq!("vote".parse(), Ok(Permission::Vote));
    }

    #[test]
    fn rejects_anything_else() {
        assert_eq!(
            "asdf".parse::<Permission>(),
            Err(InvalidPermissionError("asdf".to_string()))
        );
        assert!("Read".parse::<Permission>().is_err());
    }
}
