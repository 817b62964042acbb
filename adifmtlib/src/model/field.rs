//! Field values and their data type indicators.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AdifError;

/// Data type carried alongside a field value.
///
/// ADI and ADX may annotate a field with a single-letter indicator; most
/// fields leave it off and get their type from the ADIF specification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// No indicator given; validated as a string.
    #[default]
    Unspecified,
    /// ASCII text without line breaks.
    String,
    /// Unicode text without line breaks.
    IntlString,
    /// ASCII text which may contain line breaks.
    MultilineString,
    /// Unicode text which may contain line breaks.
    IntlMultilineString,
    /// One of a closed set of values.
    Enumeration,
    /// `Y` or `N`.
    Boolean,
    /// Decimal number.
    Number,
    /// `YYYYMMDD`.
    Date,
    /// `HHMM` or `HHMMSS`.
    Time,
    /// `XDDD MM.mmm` latitude or longitude.
    Location,
}

impl DataType {
    /// All types, in indicator-table order.
    pub const ALL: [DataType; 11] = [
        DataType::Unspecified,
        DataType::String,
        DataType::IntlString,
        DataType::MultilineString,
        DataType::IntlMultilineString,
        DataType::Enumeration,
        DataType::Boolean,
        DataType::Number,
        DataType::Date,
        DataType::Time,
        DataType::Location,
    ];

    /// Single-letter indicator, empty for [`DataType::Unspecified`].
    pub fn indicator(&self) -> &'static str {
        match self {
            DataType::Unspecified => "",
            DataType::String => "S",
            DataType::IntlString => "I",
            DataType::MultilineString => "M",
            DataType::IntlMultilineString => "G",
            DataType::Enumeration => "E",
            DataType::Boolean => "B",
            DataType::Number => "N",
            DataType::Date => "D",
            DataType::Time => "T",
            DataType::Location => "L",
        }
    }

    /// Name used by the ADIF specification tables.
    pub fn name(&self) -> &'static str {
        match self {
            DataType::Unspecified => "",
            DataType::String => "String",
            DataType::IntlString => "IntlString",
            DataType::MultilineString => "MultilineString",
            DataType::IntlMultilineString => "IntlMultilineString",
            DataType::Enumeration => "Enumeration",
            DataType::Boolean => "Boolean",
            DataType::Number => "Number",
            DataType::Date => "Date",
            DataType::Time => "Time",
            DataType::Location => "Location",
        }
    }

    /// Look up a type by indicator letter, case-insensitively.
    pub fn from_indicator(indicator: &str) -> Option<Self> {
        let ind = indicator.trim();
        if ind.is_empty() {
            return Some(DataType::Unspecified);
        }
        DataType::ALL
            .into_iter()
            .find(|t| !t.indicator().is_empty() && t.indicator().eq_ignore_ascii_case(ind))
    }

    /// Look up a type by indicator letter or full specification name.
    pub fn lookup(s: &str) -> Option<Self> {
        if let Some(t) = Self::from_indicator(s) {
            return Some(t);
        }
        DataType::ALL
            .into_iter()
            .find(|t| !t.name().is_empty() && t.name().eq_ignore_ascii_case(s.trim()))
    }

    /// True for the two types which permit line breaks.
    pub fn is_multiline(&self) -> bool {
        matches!(
            self,
            DataType::MultilineString | DataType::IntlMultilineString
        )
    }

    /// True for the two international (non-ASCII) string types.
    pub fn is_international(&self) -> bool {
        matches!(self, DataType::IntlString | DataType::IntlMultilineString)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DataType {
    type Err = AdifError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::lookup(s).ok_or_else(|| AdifError::Config(format!("unknown data type {s:?}")))
    }
}

/// A named, typed value in a record or header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Canonical uppercase name
    pub name: String,
    /// Raw value; interpretation depends on `data_type` and the field's specification
    pub value: String,
    /// Type indicator, usually [`DataType::Unspecified`]
    pub data_type: DataType,
}

impl Field {
    /// Create an untyped field, normalizing the name to uppercase.
    pub fn new(name: impl AsRef<str>, value: impl Into<String>) -> Self {
        Self {
            name: normalize_name(name.as_ref()),
            value: value.into(),
            data_type: DataType::Unspecified,
        }
    }

    /// Create a field with an explicit type indicator.
    pub fn typed(name: impl AsRef<str>, value: impl Into<String>, data_type: DataType) -> Self {
        Self {
            data_type,
            ..Self::new(name, value)
        }
    }

    /// True if the value is the empty string.
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// True if the name starts with `APP_`.
    pub fn is_app_defined(&self) -> bool {
        is_app_defined(&self.name)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.data_type {
            DataType::Unspecified => write!(f, "{}={}", self.name, self.value),
            t => write!(f, "{}:{}={}", self.name, t.indicator(), self.value),
        }
    }
}

/// Canonical form of a field name: trimmed and uppercased.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_ascii_uppercase()
}

/// True if `name` is made only of ASCII letters, digits, `_` and `/`.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'/')
}

/// True if `name` starts with `APP_`, case-insensitively.
pub fn is_app_defined(name: &str) -> bool {
    name.len() > 4
        && name
            .get(..4)
            .is_some_and(|p| p.eq_ignore_ascii_case("APP_"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indicator_roundtrip() {
        for t in DataType::ALL {
            assert_eq!(DataType::from_indicator(t.indicator()), Some(t));
        }
        assert_eq!(DataType::from_indicator("n"), Some(DataType::Number));
        assert_eq!(DataType::from_indicator("X"), None);
    }

    #[test]
    fn test_lookup_by_name() {
        assert_eq!(DataType::lookup("Location"), Some(DataType::Location));
        assert_eq!(DataType::lookup("intlstring"), Some(DataType::IntlString));
        assert!("Bogus".parse::<DataType>().is_err());
    }

    #[test]
    fn test_field_name_normalized() {
        let f = Field::new(" call ", "W1AW");
        assert_eq!(f.name, "CALL");
        assert_eq!(f.data_type, DataType::Unspecified);
        assert_eq!(f.to_string(), "CALL=W1AW");
        assert_eq!(
            Field::typed("freq", "14.2", DataType::Number).to_string(),
            "FREQ:N=14.2"
        );
    }

    #[test]
    fn test_name_rules() {
        assert!(is_valid_name("MY_SIG_INFO"));
        assert!(is_valid_name("A/B"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("BAD NAME"));
        assert!(is_app_defined("app_monolog_foo"));
        assert!(!is_app_defined("APP_"));
        assert!(!is_app_defined("CALL"));
    }
}
