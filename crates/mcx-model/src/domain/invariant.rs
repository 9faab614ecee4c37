use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// Temporal relation between two event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvariantKind {
    /// Every `first` is eventually followed by a `second`.
    AlwaysFollowedBy,
    /// No `first` is ever followed by a `second`.
    NeverFollowedBy,
    /// Every `second` is preceded by a `first`.
    AlwaysPrecedes,
}

impl InvariantKind {
    /// Short connector used in textual form and in checker input names.
    pub fn connector(&self) -> &'static str {
        match self {
            InvariantKind::AlwaysFollowedBy => "AFby",
            InvariantKind::NeverFollowedBy => "NFby",
            InvariantKind::AlwaysPrecedes => "AP",
        }
    }
}

impl FromStr for InvariantKind {
    type Err = ModelError;
    fn from_str(s: &str) -> ModelResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "afby" => Ok(InvariantKind::AlwaysFollowedBy),
            "nfby" => Ok(InvariantKind::NeverFollowedBy),
            "ap" => Ok(InvariantKind::AlwaysPrecedes),
            other => Err(ModelError::UnknownConnector(other.to_string())),
        }
    }
}

impl fmt::Display for InvariantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.connector())
    }
}

/// Binary invariant over two event types, e.g. `send AFby recv`.
///
/// Serialized as its textual form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
#[serde(into = "String")]
pub struct Invariant {
    first: String,
    kind: InvariantKind,
    second: String,
}

impl Invariant {
    pub fn new(first: impl Into<String>, kind: InvariantKind, second: impl Into<String>) -> Self {
        Self {
            first: first.into(),
            kind,
            second: second.into(),
        }
    }

    pub fn first(&self) -> &str {
        &self.first
    }

    pub fn second(&self) -> &str {
        &self.second
    }

    pub fn kind(&self) -> InvariantKind {
        self.kind
    }

    /// Connector string of the relation (`AFby`, `NFby`, `AP`).
    pub fn connector(&self) -> &'static str {
        self.kind.connector()
    }
}

impl fmt::Display for Invariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.first, self.kind, self.second)
    }
}

impl FromStr for Invariant {
    type Err = ModelError;
    fn from_str(s: &str) -> ModelResult<Self> {
        let mut parts = s.split_whitespace();
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(first), Some(connector), Some(second), None) => {
                Ok(Self::new(first, connector.parse()?, second))
            }
            _ => Err(ModelError::MalformedInvariant(s.to_string())),
        }
    }
}

impl TryFrom<String> for Invariant {
    type Error = ModelError;
    fn try_from(s: String) -> ModelResult<Self> {
        s.parse()
    }
}

impl From<Invariant> for String {
    fn from(inv: Invariant) -> Self {
        inv.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_textual_form() {
        let inv: Invariant = "send AFby recv".parse().unwrap();
        assert_eq!(inv.first(), "send");
        assert_eq!(inv.kind(), InvariantKind::AlwaysFollowedBy);
        assert_eq!(inv.second(), "recv");
        assert_eq!(inv.to_string(), "send AFby recv");
    }

    #[test]
    fn connector_is_case_insensitive() {
        let inv: Invariant = "a nfby b".parse().unwrap();
        assert_eq!(inv.connector(), "NFby");
    }

    #[test]
    fn rejects_malformed_input() {
        for bad in ["", "a AFby", "a AFby b c", "a XX b"] {
            assert!(
                bad.parse::<Invariant>().is_err(),
                "expected error for {bad:?}"
            );
        }
    }

    #[test]
    fn serde_uses_textual_form() {
        let inv = Invariant::new("open", InvariantKind::AlwaysPrecedes, "close");
        let json = serde_json::to_string(&inv).unwrap();
        assert_eq!(json, r#""open AP close""#);

        let back: Invariant = serde_json::from_str(&json).unwrap();
        assert_eq!(back, inv);
    }
}
