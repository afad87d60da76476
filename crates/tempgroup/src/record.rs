use crate::TempId;
use core::fmt;

/// Immutable primary key of a [`Record`]; scans are ordered by it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(transparent)
)]
pub struct RecordId(pub i64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// An address-like row as persisted in the record store.
///
/// Only `account_id` drives grouping. `org_id` and `group_key` are carried
/// through untouched so that whole-record writes do not lose them.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Record {
    pub id: RecordId,
    pub org_id: String,
    pub group_key: String,
    pub account_id: String,
    pub temp_id: Option<TempId>,
}

impl Record {
    /// Materializes a [`NewRecord`] under the given primary key.
    pub fn from_new(id: RecordId, new: NewRecord) -> Self {
        Self {
            id,
            org_id: new.org_id,
            group_key: new.group_key,
            account_id: new.account_id,
            temp_id: None,
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "OrgID: {}, GroupKey: {}, AccountID: {}, TempID: ",
            self.org_id, self.group_key, self.account_id
        )?;
        match self.temp_id {
            Some(temp_id) => write!(f, "{temp_id}"),
            None => f.write_str("null"),
        }
    }
}

/// A record that has not been assigned a primary key yet.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NewRecord {
    pub org_id: String,
    pub group_key: String,
    pub account_id: String,
}

impl NewRecord {
    pub fn new(
        org_id: impl Into<String>,
        group_key: impl Into<String>,
        account_id: impl Into<String>,
    ) -> Self {
        Self {
            org_id: org_id.into(),
            group_key: group_key.into(),
            account_id: account_id.into(),
        }
    }
}
