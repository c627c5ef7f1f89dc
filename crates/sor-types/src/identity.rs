//! User identity and subscription plan types for Sor.
//!
//! A `User` is a registered identity with a point balance and a plan tier.
//! Anonymous (guest) usage has no `User` at all; the one-time guest
//! allowance is tracked by a separate persisted flag, not here.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// Subscription plan tier, ordered from cheapest to most capable.
///
/// `Unlimited` is special: the point balance of an unlimited user is
/// treated as inexhaustible and is never decremented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Free,
    Basic,
    Advanced,
    Unlimited,
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Plan::Free => write!(f, "free"),
            Plan::Basic => write!(f, "basic"),
            Plan::Advanced => write!(f, "advanced"),
            Plan::Unlimited => write!(f, "unlimited"),
        }
    }
}

impl FromStr for Plan {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "free" => Ok(Plan::Free),
            "basic" => Ok(Plan::Basic),
            "advanced" => Ok(Plan::Advanced),
            "unlimited" => Ok(Plan::Unlimited),
            other => Err(format!("invalid plan: '{other}'")),
        }
    }
}

impl Default for Plan {
    fn default() -> Self {
        Plan::Free
    }
}

/// A registered Sor user.
///
/// `points` is the remaining usage balance; it is ignored entirely when
/// `plan` is `Unlimited`. `credential` is an opaque reference used only
/// to re-validate a cached login on startup -- this crate never inspects it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub credential: Option<String>,
    pub points: u32,
    pub is_pro: bool,
    pub plan: Plan,
    pub avatar: Option<String>,
}

impl User {
    /// Balance assigned when a user upgrades to the unlimited plan.
    ///
    /// Display-only sentinel; the charging path never touches it.
    pub const UNLIMITED_POINTS: u32 = 9_999_999;

    /// Create a new free-plan user with the given starting balance.
    pub fn new(username: String, credential: Option<String>, points: u32) -> Self {
        Self {
            id: Uuid::now_v7(),
            username,
            credential,
            points,
            is_pro: false,
            plan: Plan::Free,
            avatar: None,
        }
    }
}
