//! Value Objects for the storefront

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// A field in a partial-update payload.
///
/// `Missing` means the key was absent from the JSON body, `Null` means it was
/// sent as `null`, `Value` carries the new value. Use with `#[serde(default)]`
/// so absent keys deserialize to `Missing`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Patch<T> {
    #[default]
    Missing,
    Null,
    Value(T),
}

impl<T> Patch<T> {
    pub fn is_missing(&self) -> bool { matches!(self, Patch::Missing) }

    /// `None` when the field should be left untouched, `Some(None)` to clear it.
    pub fn into_update(self) -> Option<Option<T>> {
        match self {
            Patch::Missing => None,
            Patch::Null => Some(None),
            Patch::Value(v) => Some(Some(v)),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<T>::deserialize(deserializer).map(|v| v.map_or(Patch::Null, Patch::Value))
    }
}

/// Account role carried in access tokens.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Customer,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self { Role::Customer => "customer", Role::Admin => "admin" }
    }
    pub fn is_admin(&self) -> bool { *self == Role::Admin }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for Role {
    type Err = UnknownRole;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Role::Customer),
            "admin" => Ok(Role::Admin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = UnknownRole;
    fn try_from(value: String) -> Result<Self, Self::Error> { value.parse() }
}

#[derive(Debug, Clone)] pub struct UnknownRole(pub String);
impl std::error::Error for UnknownRole {}
impl fmt::Display for UnknownRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "unknown role '{}'", self.0) }
}

/// Page window for list endpoints.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pagination { page: u32, limit: u32 }

impl Pagination {
    pub const DEFAULT_LIMIT: u32 = 10;
    pub const MAX_LIMIT: u32 = 100;

    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        let page = page.unwrap_or(1).max(1);
        let limit = match limit { Some(0) | None => Self::DEFAULT_LIMIT, Some(l) => l.min(Self::MAX_LIMIT) };
        Self { page, limit }
    }
    pub fn page(&self) -> u32 { self.page }
    pub fn limit(&self) -> i64 { i64::from(self.limit) }
    pub fn offset(&self) -> i64 { i64::from(self.page - 1) * i64::from(self.limit) }
}

impl Default for Pagination { fn default() -> Self { Self::new(None, None) } }

#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> { pub data: Vec<T>, pub total: i64, pub page: u32 }
