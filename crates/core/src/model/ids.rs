use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Identifies one quiz panel on the board.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PanelId(u32);

impl PanelId {
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the underlying value.
    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }

    /// Position of the panel on the board.
    #[must_use]
    pub fn index(&self) -> usize {
        usize::try_from(self.0).unwrap_or(usize::MAX)
    }
}

impl fmt::Debug for PanelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PanelId({})", self.0)
    }
}

impl fmt::Display for PanelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error returned when a panel id cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    raw: String,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse panel id from {:?}", self.raw)
    }
}

impl std::error::Error for ParseIdError {}

impl FromStr for PanelId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u32>()
            .map(PanelId::new)
            .map_err(|_| ParseIdError { raw: s.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panel_id_display_and_parse() {
        let id: PanelId = " 3 ".parse().unwrap();
        assert_eq!(id, PanelId::new(3));
        assert_eq!(id.to_string(), "3");
        assert_eq!(id.index(), 3);
    }

    #[test]
    fn panel_id_rejects_garbage() {
        let err = "left".parse::<PanelId>().unwrap_err();
        assert!(err.to_string().contains("left"));
    }
}
