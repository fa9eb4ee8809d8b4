use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Identifier of the single pre-provisioned progress row.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProgressRowId(Uuid);

impl ProgressRowId {
    /// The production row provisioned alongside the `progress` table.
    pub const DEFAULT: ProgressRowId =
        ProgressRowId(Uuid::from_u128(0xa45e_94bf_2558_485f_91da_8037_6e40_87f6));

    #[must_use]
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// A fresh random id, for tests and throwaway rows.
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub fn value(&self) -> Uuid {
        self.0
    }
}

impl Default for ProgressRowId {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Debug for ProgressRowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProgressRowId({})", self.0)
    }
}

impl fmt::Display for ProgressRowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error type for parsing a row id from string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseRowIdError {
    raw: String,
}

impl fmt::Display for ParseRowIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse progress row id from {:?}", self.raw)
    }
}

impl std::error::Error for ParseRowIdError {}

impl FromStr for ProgressRowId {
    type Err = ParseRowIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(ProgressRowId::new)
            .map_err(|_| ParseRowIdError { raw: s.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_row_matches_provisioned_uuid() {
        assert_eq!(
            ProgressRowId::DEFAULT.to_string(),
            "a45e94bf-2558-485f-91da-80376e4087f6"
        );
    }

    #[test]
    fn parses_and_rejects() {
        let parsed: ProgressRowId = " a45e94bf-2558-485f-91da-80376e4087f6 ".parse().unwrap();
        assert_eq!(parsed, ProgressRowId::DEFAULT);
        assert!("not-a-uuid".parse::<ProgressRowId>().is_err());
    }
}
