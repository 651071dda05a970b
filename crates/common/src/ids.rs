//! Identifier grammars.
//!
//! ```text
//! store     <2 uppercase letters>             QC
//! item      <store><4 digits>                 QC1001
//! customer  <2 uppercase letters>U<4 digits>  QCU1111
//! manager   <store>M<4 digits>                QCM0001
//! ```
//!
//! The first two characters of every item, customer and manager ID name a
//! store. For items that is the owning store; for customers it is the home
//! store used by the foreign-purchase limit.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::IdError;

fn is_store_prefix(s: &str) -> bool {
    s.len() == 2 && s.bytes().all(|b| b.is_ascii_uppercase())
}

fn is_four_digits(s: &str) -> bool {
    s.len() == 4 && s.bytes().all(|b| b.is_ascii_digit())
}

/// Checks `<2 letters><marker?><4 digits>` without allocating.
fn matches_role(s: &str, marker: Option<u8>) -> bool {
    let marker_len = usize::from(marker.is_some());
    if !s.is_ascii() || s.len() != 6 + marker_len {
        return false;
    }
    if !is_store_prefix(&s[..2]) {
        return false;
    }
    if let Some(marker) = marker
        && s.as_bytes()[2] != marker
    {
        return false;
    }
    is_four_digits(&s[2 + marker_len..])
}

/// Two-letter code naming a store node.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StoreCode(String);

impl StoreCode {
    /// Parses a store code.
    pub fn new(code: impl Into<String>) -> Result<Self, IdError> {
        let code = code.into();
        if is_store_prefix(&code) {
            Ok(Self(code))
        } else {
            Err(IdError::InvalidStoreCode(code))
        }
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn from_prefix(id: &str) -> Self {
        Self(id[..2].to_string())
    }
}

/// Unique identifier of an inventory item, prefixed by its owning store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ItemId(String);

impl ItemId {
    /// Parses an item ID.
    pub fn new(id: impl Into<String>) -> Result<Self, IdError> {
        let id = id.into();
        if matches_role(&id, None) {
            Ok(Self(id))
        } else {
            Err(IdError::InvalidItemId(id))
        }
    }

    /// Returns the store that owns this item.
    pub fn store(&self) -> StoreCode {
        StoreCode::from_prefix(&self.0)
    }

    /// Returns true if the item belongs to `store`.
    pub fn belongs_to(&self, store: &StoreCode) -> bool {
        self.0.starts_with(store.as_str())
    }

    /// Returns the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Customer identifier: any two-letter home store, `U`, four digits.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CustomerId(String);

impl CustomerId {
    /// Parses a customer ID.
    pub fn new(id: impl Into<String>) -> Result<Self, IdError> {
        let id = id.into();
        if matches_role(&id, Some(b'U')) {
            Ok(Self(id))
        } else {
            Err(IdError::InvalidCustomerId(id))
        }
    }

    /// Returns the customer's home store.
    pub fn home_store(&self) -> StoreCode {
        StoreCode::from_prefix(&self.0)
    }

    /// Returns the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Manager identifier: the managed store's code, `M`, four digits.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ManagerId(String);

impl ManagerId {
    /// Parses a manager ID.
    pub fn new(id: impl Into<String>) -> Result<Self, IdError> {
        let id = id.into();
        if matches_role(&id, Some(b'M')) {
            Ok(Self(id))
        } else {
            Err(IdError::InvalidManagerId(id))
        }
    }

    /// Returns the store this manager administers.
    pub fn store(&self) -> StoreCode {
        StoreCode::from_prefix(&self.0)
    }

    /// Returns true if this manager administers `store`.
    pub fn manages(&self, store: &StoreCode) -> bool {
        self.0.starts_with(store.as_str())
    }

    /// Returns the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StoreCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Display for CustomerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Display for ManagerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for StoreCode {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl FromStr for ItemId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl FromStr for CustomerId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl FromStr for ManagerId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for StoreCode {
    type Error = IdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl TryFrom<String> for ItemId {
    type Error = IdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl TryFrom<String> for CustomerId {
    type Error = IdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl TryFrom<String> for ManagerId {
    type Error = IdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<StoreCode> for String {
    fn from(code: StoreCode) -> Self {
        code.0
    }
}

impl From<ItemId> for String {
    fn from(id: ItemId) -> Self {
        id.0
    }
}

impl From<CustomerId> for String {
    fn from(id: CustomerId) -> Self {
        id.0
    }
}

impl From<ManagerId> for String {
    fn from(id: ManagerId) -> Self {
        id.0
    }
}
