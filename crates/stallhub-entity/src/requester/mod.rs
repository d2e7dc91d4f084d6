//! The party asking for stalls.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role of the requester, which selects the discount list and the booking
/// source channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "requester_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RequesterRole {
    /// Back-office staff booking on behalf of an exhibitor.
    Operator,
    /// Exhibitor booking through the self-service portal.
    Exhibitor,
}

impl RequesterRole {
    /// Return the role as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Operator => "operator",
            Self::Exhibitor => "exhibitor",
        }
    }
}

impl fmt::Display for RequesterRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identity of whoever is asking for an allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requester {
    /// User or exhibitor id.
    pub id: Uuid,
    /// Role the request is made under.
    pub role: RequesterRole,
}

impl Requester {
    /// Creates an operator requester.
    pub fn operator(id: Uuid) -> Self {
        Self {
            id,
            role: RequesterRole::Operator,
        }
    }

    /// Creates a self-service exhibitor requester.
    pub fn exhibitor(id: Uuid) -> Self {
        Self {
            id,
            role: RequesterRole::Exhibitor,
        }
    }
}
