//! User-defined field declarations.

use serde::{Deserialize, Serialize};

use super::field::{is_app_defined, DataType};
use crate::error::AdifError;
use crate::Result;

/// A field declared in a logfile header rather than the ADIF specification.
///
/// A declaration may restrict values to a numeric range or to a list of
/// enumerated values, but not both.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UserdefField {
    pub name: String,
    pub data_type: DataType,
    /// Inclusive numeric bounds
    pub range: Option<(f64, f64)>,
    pub enum_values: Vec<String>,
}

impl UserdefField {
    pub fn new(name: impl AsRef<str>, data_type: DataType) -> Self {
        Self {
            name: name.as_ref().trim().to_ascii_uppercase(),
            data_type,
            ..Self::default()
        }
    }

    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.range = Some((min, max));
        self
    }

    pub fn with_enum_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enum_values = values.into_iter().map(Into::into).collect();
        self
    }

    /// Check the declaration itself, not any value.
    pub fn validate(&self) -> Result<()> {
        let fail = |message: String| AdifError::Userdef {
            name: self.name.clone(),
            message,
        };
        if self.name.is_empty() {
            return Err(fail("empty name".into()));
        }
        if self.name.trim() != self.name {
            return Err(fail("leading or trailing space".into()));
        }
        if let Some(c) = self
            .name
            .chars()
            .find(|c| !is_printable_ascii(*c) || ",:<>{}".contains(*c))
        {
            return Err(fail(format!("invalid character {c:?} in name")));
        }
        if is_app_defined(&self.name) {
            return Err(fail("name may not start with APP_".into()));
        }
        if let Some((min, max)) = self.range {
            if min.is_nan() || max.is_nan() {
                return Err(fail("range bound is not a number".into()));
            }
            if min > max {
                return Err(fail(format!("range minimum {min} exceeds maximum {max}")));
            }
            if !self.enum_values.is_empty() {
                return Err(fail("cannot have both a range and enumerated values".into()));
            }
        }
        for v in &self.enum_values {
            if v.is_empty() || v.chars().any(|c| !is_printable_ascii(c) || ",{}".contains(c)) {
                return Err(fail(format!("invalid enumeration value {v:?}")));
            }
        }
        Ok(())
    }

    /// Check a value against the declared range or enumeration.
    pub fn check_value(&self, value: &str) -> std::result::Result<(), String> {
        if value.is_empty() {
            return Ok(());
        }
        if let Some((min, max)) = self.range {
            let n: f64 = value
                .parse()
                .map_err(|_| format!("{} value {value:?} is not a number", self.name))?;
            if n < min || n > max {
                return Err(format!(
                    "{} value {value} outside range {min} to {max}",
                    self.name
                ));
            }
        }
        if !self.enum_values.is_empty()
            && !self
                .enum_values
                .iter()
                .any(|v| v.eq_ignore_ascii_case(value))
        {
            return Err(format!(
                "{} value {value:?} not in {{{}}}",
                self.name,
                self.enum_values.join(",")
            ));
        }
        Ok(())
    }

    /// Parse the ADI header form: `NAME`, `NAME,{A,B,C}` or `NAME,{min:max}`.
    pub fn parse_declaration(text: &str, data_type: DataType) -> Result<Self> {
        let (name, constraint) = match text.split_once(',') {
            Some((n, c)) => (n, Some(c.trim())),
            None => (text, None),
        };
        let mut def = UserdefField::new(name, data_type);
        if let Some(c) = constraint {
            let inner = c
                .strip_prefix('{')
                .and_then(|c| c.strip_suffix('}'))
                .ok_or_else(|| AdifError::Userdef {
                    name: def.name.clone(),
                    message: format!("constraint {c:?} is not enclosed in braces"),
                })?;
            match inner.split_once(':') {
                Some((lo, hi)) if !inner.contains(',') => {
                    let parse = |s: &str| {
                        s.trim().parse::<f64>().map_err(|_| AdifError::Userdef {
                            name: def.name.clone(),
                            message: format!("range bound {s:?} is not a number"),
                        })
                    };
                    def.range = Some((parse(lo)?, parse(hi)?));
                }
                _ => {
                    def.enum_values = inner.split(',').map(|v| v.trim().to_string()).collect();
                }
            }
        }
        def.validate()?;
        Ok(def)
    }

    /// Inverse of [`UserdefField::parse_declaration`].
    pub fn declaration(&self) -> String {
        if let Some((min, max)) = self.range {
            format!("{},{{{min}:{max}}}", self.name)
        } else if !self.enum_values.is_empty() {
            format!("{},{{{}}}", self.name, self.enum_values.join(","))
        } else {
            self.name.clone()
        }
    }
}

fn is_printable_ascii(c: char) -> bool {
    (' '..='~').contains(&c)
}
