use std::fmt;

use serde::{Deserialize, Serialize};

/// Epoch of coordinator work.
///
/// Every result is tagged with the generation it was produced under; once the
/// coordinator moves past that generation the result is stale and is dropped.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Generation(u64);

impl Generation {
    /// Generation a freshly constructed coordinator starts in.
    pub const INITIAL: Generation = Generation(0);

    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn value(&self) -> u64 {
        self.0
    }

    /// The generation directly after this one.
    pub const fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl From<u64> for Generation {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::Generation;

    #[test]
    fn initial_is_zero_and_next_increments() {
        assert_eq!(Generation::INITIAL.value(), 0);
        assert_eq!(Generation::INITIAL.next(), Generation::new(1));
        assert!(Generation::new(3) > Generation::new(2));
    }

    #[test]
    fn serde_is_transparent() {
        let json = serde_json::to_string(&Generation::new(7)).unwrap();
        assert_eq!(json, "7");

        let back: Generation = serde_json::from_str("7").unwrap();
        assert_eq!(back, Generation::new(7));
    }

    #[test]
    fn display_is_prefixed() {
        assert_eq!(Generation::new(4).to_string(), "g4");
    }
}
