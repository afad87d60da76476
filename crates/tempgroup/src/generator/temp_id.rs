use core::{fmt, str::FromStr};

/// Leading character of every rendered [`TempId`].
pub const TEMP_ID_PREFIX: char = 'T';

/// Number of zero-padded decimal digits following [`TEMP_ID_PREFIX`].
pub const TEMP_ID_DIGITS: usize = 14;

/// Total length of a rendered [`TempId`].
pub const TEMP_ID_LEN: usize = 1 + TEMP_ID_DIGITS;

/// A temporary grouping identifier.
///
/// Internally a plain counter value; rendered as `T` followed by exactly 14
/// zero-padded decimal digits (`T00000000000042`). Ordering follows the
/// numeric suffix, which is also the order in which a generator mints them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "String", into = "String")
)]
pub struct TempId(u64);

impl TempId {
    /// Wraps a raw counter value.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the numeric suffix.
    pub const fn to_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TempId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{TEMP_ID_PREFIX}{:0width$}", self.0, width = TEMP_ID_DIGITS)
    }
}

/// Reasons a string is not a valid rendered [`TempId`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ParseTempIdError {
    #[error("expected 15 characters, found {0}")]
    InvalidLength(usize),
    #[error("expected leading `T`")]
    MissingPrefix,
    #[error("suffix must be ASCII decimal digits")]
    InvalidDigit,
}

impl FromStr for TempId {
    type Err = ParseTempIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != TEMP_ID_LEN {
            return Err(ParseTempIdError::InvalidLength(s.len()));
        }
        let digits = s
            .strip_prefix(TEMP_ID_PREFIX)
            .ok_or(ParseTempIdError::MissingPrefix)?;
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseTempIdError::InvalidDigit);
        }
        // 14 digits always fit in a u64.
        digits
            .parse()
            .map(Self)
            .map_err(|_| ParseTempIdError::InvalidDigit)
    }
}

impl TryFrom<String> for TempId {
    type Error = ParseTempIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TempId> for String {
    fn from(id: TempId) -> Self {
        id.to_string()
    }
}
