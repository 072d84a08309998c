use serde::Serialize;

/// Declared command type of a classified statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatementKind {
    Select,
    NonSelect,
    Unknown
}

impl std::fmt::Display for StatementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Select => write!(f, "SELECT"),
            Self::NonSelect => write!(f, "NON_SELECT"),
            Self::Unknown => write!(f, "UNKNOWN")
        }
    }
}

/// Outcome of classifying a candidate statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassificationResult {
    pub statement_count: usize,
    pub primary_kind:    StatementKind,
    pub parse_succeeded: bool
}

impl ClassificationResult {
    pub(crate) fn unparseable() -> Self {
        Self {
            statement_count: 0,
            primary_kind:    StatementKind::Unknown,
            parse_succeeded: false
        }
    }

    /// True when the text holds exactly one SELECT statement
    pub fn is_single_select(&self) -> bool {
        self.parse_succeeded
            && self.statement_count == 1
            && self.primary_kind == StatementKind::Select
    }
}
