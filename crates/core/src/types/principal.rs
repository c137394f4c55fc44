//! The authenticated principal attached to a request.
//!
//! Authentication itself (login, sessions, OAuth) lives upstream; the
//! services in this workspace only ever see an already-resolved [`Principal`].
//! Resolution happens exactly once at the access boundary - core operations
//! take the principal as an explicit parameter, never from ambient state.

use serde::{Deserialize, Serialize};

use super::id::UserId;

/// Role attached to a principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// A regular shopper; may only touch their own orders.
    #[default]
    Customer,
    /// Back-office staff; may read any order and drive fulfillment.
    Staff,
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Self::Customer),
            "staff" => Ok(Self::Staff),
            _ => Err(format!("invalid role: {s}")),
        }
    }
}

/// Which identity system authenticated the principal.
///
/// A single tagged variant instead of per-operation "check one user
/// collection, then fall back to the other" lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IdentityProvider {
    /// Email/password account held locally.
    #[default]
    Local,
    /// Federated Google account.
    Google,
}

impl std::str::FromStr for IdentityProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(Self::Local),
            "google" => Ok(Self::Google),
            _ => Err(format!("invalid identity provider: {s}")),
        }
    }
}

/// The authenticated caller of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Unique user ID, stable across identity providers.
    pub id: UserId,
    /// Authorization role.
    pub role: Role,
    /// Identity system that authenticated this principal.
    pub provider: IdentityProvider,
}

impl Principal {
    /// Construct a principal.
    #[must_use]
    pub const fn new(id: UserId, role: Role, provider: IdentityProvider) -> Self {
        Self { id, role, provider }
    }

    /// Whether this principal carries the staff role.
    #[must_use]
    pub const fn is_staff(&self) -> bool {
        matches!(self.role, Role::Staff)
    }
}
