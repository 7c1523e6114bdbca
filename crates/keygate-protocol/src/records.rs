//! Resource API rows: bonds, their cash flows, and their metrics.
//!
//! Only the columns the client filters or orders on are typed. Every
//! other column is carried in `fields` so a row read from the API can be
//! written back without losing data.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::UserId;

/// Primary key of a bond row.
///
/// The resource API may use integer or text keys; both are accepted and
/// written back in the form they arrived in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BondId {
    Int(i64),
    Text(String),
}

impl fmt::Display for BondId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for BondId {
    fn from(id: i64) -> Self {
        Self::Int(id)
    }
}

impl From<&str> for BondId {
    fn from(id: &str) -> Self {
        Self::Text(id.to_owned())
    }
}

/// A bond owned by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bond {
    /// Assigned by the server; absent on rows that have not been created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<BondId>,

    /// The owning user.
    pub user_id: UserId,

    /// Every other column.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Bond {
    /// Creates an unsaved bond for `owner`.
    pub fn new(owner: UserId) -> Self {
        Self {
            id: None,
            user_id: owner,
            fields: Map::new(),
        }
    }

    /// Sets a column, builder style.
    pub fn with(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(column.to_owned(), value.into());
        self
    }
}

/// One period of a bond's cash-flow schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BondFlow {
    /// The bond this flow belongs to.
    pub bond_id: BondId,

    /// Sequence number of the period; flows are listed in ascending order.
    #[serde(rename = "periodo")]
    pub period: i64,

    /// Every other column (amounts, dates, ...).
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// Computed indicators for a bond.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BondMetric {
    /// The bond these metrics describe.
    pub bond_id: BondId,

    /// The metric columns.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}
