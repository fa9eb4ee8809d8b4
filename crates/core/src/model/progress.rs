use serde::{Deserialize, Serialize};
use std::fmt;

/// Project completion as an integer percentage, always within `0..=100`.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "RawProgress", into = "u8")]
pub struct Progress(u8);

/// Wire form of a stored percentage. Some stores hand back `42.0` for an
/// integer column.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawProgress {
    Int(i64),
    Float(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
#[error("progress must be a finite number, got {0}")]
pub struct NonFiniteProgress(pub f64);

impl Progress {
    pub const ZERO: Progress = Progress(0);
    pub const COMPLETE: Progress = Progress(100);

    /// Clamp an arbitrary integer into `0..=100`.
    #[must_use]
    pub fn clamped(raw: i64) -> Self {
        // Lossless: the clamp bounds the value to 0..=100.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Self(raw.clamp(0, 100) as u8)
    }

    /// Round a fractional percentage, then clamp. `None` for NaN or infinity.
    #[must_use]
    pub fn rounded(raw: f64) -> Option<Self> {
        if !raw.is_finite() {
            return None;
        }
        // Saturating float-to-int cast, then clamped.
        #[allow(clippy::cast_possible_truncation)]
        Some(Self::clamped(raw.round() as i64))
    }

    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }

    #[must_use]
    pub fn is_complete(self) -> bool {
        self.0 == 100
    }
}

impl From<i64> for Progress {
    fn from(raw: i64) -> Self {
        Self::clamped(raw)
    }
}

impl TryFrom<RawProgress> for Progress {
    type Error = NonFiniteProgress;

    fn try_from(raw: RawProgress) -> Result<Self, Self::Error> {
        match raw {
            RawProgress::Int(raw) => Ok(Self::clamped(raw)),
            RawProgress::Float(raw) => Self::rounded(raw).ok_or(NonFiniteProgress(raw)),
        }
    }
}

impl From<Progress> for u8 {
    fn from(progress: Progress) -> Self {
        progress.0
    }
}

impl From<Progress> for i64 {
    fn from(progress: Progress) -> Self {
        i64::from(progress.0)
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_out_of_range_values() {
        assert_eq!(Progress::clamped(150).value(), 100);
        assert_eq!(Progress::clamped(-5).value(), 0);
        assert_eq!(Progress::clamped(i64::MIN).value(), 0);
        assert_eq!(Progress::clamped(i64::MAX).value(), 100);
        assert_eq!(Progress::clamped(42).value(), 42);
    }

    #[test]
    fn clamp_is_idempotent() {
        for raw in [-1_000, -1, 0, 1, 50, 99, 100, 101, 1_000] {
            let once = Progress::clamped(raw);
            let twice = Progress::clamped(i64::from(once));
            assert_eq!(once, twice, "clamp not idempotent for {raw}");
            assert!(once.value() <= 100);
        }
    }

    #[test]
    fn deserializing_clamps() {
        let progress: Progress = serde_json::from_str("250").unwrap();
        assert_eq!(progress, Progress::COMPLETE);
        assert_eq!(serde_json::to_string(&Progress::clamped(35)).unwrap(), "35");
    }

    #[test]
    fn deserializing_rounds_fractional_values() {
        let progress: Progress = serde_json::from_str("41.6").unwrap();
        assert_eq!(progress, Progress::clamped(42));
        let progress: Progress = serde_json::from_str("-3.2").unwrap();
        assert_eq!(progress, Progress::ZERO);
        let progress: Progress = serde_json::from_str("1e30").unwrap();
        assert_eq!(progress, Progress::COMPLETE);
        assert!(serde_json::from_str::<Progress>("\"50\"").is_err());
    }

    #[test]
    fn rounded_rejects_non_finite() {
        assert_eq!(Progress::rounded(89.5), Some(Progress::clamped(90)));
        assert_eq!(Progress::rounded(f64::NAN), None);
        assert_eq!(Progress::rounded(f64::INFINITY), None);
    }

    #[test]
    fn displays_as_percentage() {
        assert_eq!(Progress::clamped(85).to_string(), "85%");
    }
}
