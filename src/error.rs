use thiserror::Error;

/// How many lines of an underlying grammar diagnostic a syntax error keeps.
const DIAGNOSTIC_LINES: usize = 3;

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Parse error in '{query}': {message}")]
    Syntax { query: String, message: String },

    #[error("Operator '{operator}' is not supported for {kind} values")]
    UnsupportedOperator { operator: String, kind: &'static str },

    #[error("Adapter error: {0}")]
    Adapter(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl QueryError {
    /// Builds a syntax error, truncating the grammar diagnostic to its first lines.
    pub fn syntax(query: impl Into<String>, diagnostic: impl Into<String>) -> Self {
        let diagnostic = diagnostic.into();
        let message = diagnostic
            .lines()
            .take(DIAGNOSTIC_LINES)
            .collect::<Vec<_>>()
            .join("\n");
        Self::Syntax {
            query: query.into(),
            message,
        }
    }

    pub fn unsupported_operator(operator: impl std::fmt::Display, kind: &'static str) -> Self {
        Self::UnsupportedOperator {
            operator: operator.to_string(),
            kind,
        }
    }
}
