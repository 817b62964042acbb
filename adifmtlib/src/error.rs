//! Error types for adifmtlib

use std::fmt;

use thiserror::Error;

/// Where in an input a problem was found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Position {
    /// 1-based record ordinal
    pub record: Option<usize>,
    /// Field name, uppercase
    pub field: Option<String>,
    /// 1-based line number, for line-oriented formats
    pub line: Option<usize>,
}

impl Position {
    pub fn record(record: usize) -> Self {
        Self {
            record: Some(record),
            ..Self::default()
        }
    }

    pub fn line(line: usize) -> Self {
        Self {
            line: Some(line),
            ..Self::default()
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(l) = self.line {
            parts.push(format!("line {l}"));
        }
        if let Some(r) = self.record {
            parts.push(format!("record {r}"));
        }
        if let Some(name) = &self.field {
            parts.push(format!("field {name}"));
        }
        if parts.is_empty() {
            f.write_str("start of input")
        } else {
            f.write_str(&parts.join(", "))
        }
    }
}

/// Errors that can occur while reading, writing or transforming a logbook
#[derive(Error, Debug)]
pub enum AdifError {
    /// Malformed input in the given format
    #[error("{format} syntax error at {position}: {message}")]
    Syntax {
        format: &'static str,
        position: Position,
        message: String,
    },

    /// Structurally valid input that breaks a format rule
    #[error("{format}: {message}")]
    Schema {
        format: &'static str,
        message: String,
    },

    /// Field name that is empty or contains forbidden characters
    #[error("invalid field name {0:?}")]
    InvalidFieldName(String),

    /// Bad user-defined field declaration
    #[error("user-defined field {name}: {message}")]
    Userdef { name: String, message: String },

    /// Conflicting or unusable options
    #[error("configuration error: {0}")]
    Config(String),

    /// One or more records failed validation
    #[error("validation failed:\n{}", .0.join("\n"))]
    Validation(Vec<String>),

    /// Format could not be determined or is not supported
    #[error("unknown format: {0}")]
    UnknownFormat(String),

    /// A value could not be written in the requested format
    #[error("{format} cannot encode {position}: {message}")]
    Encode {
        format: &'static str,
        position: Position,
        message: String,
    },

    /// Error attributed to a named input
    #[error("{input}: {source}")]
    Input {
        input: String,
        #[source]
        source: Box<AdifError>,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// XML error
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
}

impl AdifError {
    pub(crate) fn syntax(
        format: &'static str,
        position: Position,
        message: impl Into<String>,
    ) -> Self {
        AdifError::Syntax {
            format,
            position,
            message: message.into(),
        }
    }

    pub(crate) fn schema(format: &'static str, message: impl Into<String>) -> Self {
        AdifError::Schema {
            format,
            message: message.into(),
        }
    }

    pub(crate) fn encode(
        format: &'static str,
        position: Position,
        message: impl Into<String>,
    ) -> Self {
        AdifError::Encode {
            format,
            position,
            message: message.into(),
        }
    }

    /// Attach an input identifier such as a file name or `(standard input)`.
    ///
    /// Errors that already name an input are returned unchanged.
    pub fn with_input(self, input: impl Into<String>) -> Self {
        match self {
            e @ AdifError::Input { .. } => e,
            e => AdifError::Input {
                input: input.into(),
                source: Box::new(e),
            },
        }
    }
}

impl From<quick_xml::events::attributes::AttrError> for AdifError {
    fn from(e: quick_xml::events::attributes::AttrError) -> Self {
        AdifError::Xml(quick_xml::Error::from(e))
    }
}

impl From<quick_xml::escape::EscapeError> for AdifError {
    fn from(e: quick_xml::escape::EscapeError) -> Self {
        AdifError::Xml(quick_xml::Error::from(e))
    }
}
