//! Check every record against the specification.

use std::collections::HashMap;

use crate::error::{AdifError, Position};
use crate::model::{DataType, Field, Logfile};
use crate::spec::{validate_field, ValidationContext, Validity};

/// How strictly to validate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidateOptions {
    /// Fields every record must have
    pub required_fields: Vec<String>,
    /// Append warnings to record comments when there are no errors
    pub attach_warnings: bool,
    /// Latest acceptable year in dates; defaults to next year
    pub max_year: Option<i32>,
}

impl ValidateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_required_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.required_fields = fields
            .into_iter()
            .map(|f| f.as_ref().trim().to_ascii_uppercase())
            .filter(|f| !f.is_empty())
            .collect();
        self
    }

    pub fn with_attach_warnings(mut self, attach: bool) -> Self {
        self.attach_warnings = attach;
        self
    }

    pub fn with_max_year(mut self, year: i32) -> Self {
        self.max_year = Some(year);
        self
    }
}

/// Problems found, each prefixed with its position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// Errors become [`AdifError::Validation`].
    pub fn into_result(self) -> crate::Result<Vec<String>> {
        if self.errors.is_empty() {
            Ok(self.warnings)
        } else {
            Err(AdifError::Validation(self.errors))
        }
    }
}

/// Validate all records. Records are only changed when warnings are
/// attached, which happens only if nothing failed.
pub fn validate(log: &mut Logfile, options: &ValidateOptions) -> ValidationReport {
    let mut report = ValidationReport::default();
    let mut app_types: HashMap<String, DataType> = HashMap::new();
    let mut attach: Vec<(usize, String)> = Vec::new();
    for (i, record) in log.records.iter().enumerate() {
        let mut ctx = ValidationContext::new()
            .with_record(record)
            .with_userdefs(log.userdefs());
        if let Some(year) = options.max_year {
            ctx = ctx.with_max_year(year);
        }
        for name in &options.required_fields {
            if record.is_blank(name) {
                let pos = Position::record(i + 1).with_field(name.as_str());
                report.errors.push(format!("{pos}: missing required field"));
            }
        }
        for field in record.fields() {
            let typed;
            let field = if field.is_app_defined() {
                match (field.data_type, app_types.get(&field.name)) {
                    (DataType::Unspecified, Some(t)) => {
                        typed = Field::typed(&field.name, field.value.clone(), *t);
                        &typed
                    }
                    (t, None) if t != DataType::Unspecified => {
                        app_types.insert(field.name.clone(), t);
                        field
                    }
                    _ => field,
                }
            } else {
                field
            };
            let pos = Position::record(i + 1).with_field(field.name.as_str());
            match validate_field(field, &ctx) {
                Validity::Valid => {}
                Validity::Warning(msg) => {
                    attach.push((i, format!("{}: {msg}", field.name)));
                    report.warnings.push(format!("{pos}: {msg}"));
                }
                Validity::Error(msg) => report.errors.push(format!("{pos}: {msg}")),
            }
        }
    }
    if options.attach_warnings && report.is_ok() {
        for (i, msg) in attach {
            log.records[i].append_comment(&msg);
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Record;

    fn log(records: &[&[(&str, &str)]]) -> Logfile {
        let mut log = Logfile::new();
        for fields in records {
            log.records
                .push(Record::from_fields(fields.iter().map(|(n, v)| Field::new(n, *v))).unwrap());
        }
        log
    }

    #[test]
    fn test_valid_log() {
        let mut l = log(&[&[("CALL", "W1AW"), ("QSO_DATE", "19870605"), ("BAND", "40M")]]);
        let report = validate(&mut l, &ValidateOptions::new());
        assert!(report.is_ok(), "{report:?}");
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_errors_carry_position() {
        let mut l = log(&[&[("CALL", "W1AW")], &[("CALL", "K1ABC"), ("QSO_DATE", "20231399")]]);
        let report = validate(&mut l, &ValidateOptions::new().with_required_fields(["call", "band"]));
        assert_eq!(report.errors.len(), 3);
        assert!(report.errors[0].starts_with("record 1, field BAND"));
        assert!(report.errors.iter().any(|e| e.starts_with("record 2, field QSO_DATE")));
        assert!(report.into_result().is_err());
    }

    #[test]
    fn test_attach_warnings() {
        let mut l = log(&[&[("CALL", "W1AW"), ("CONTEST_ID", "MY-PARTY")]]);
        let options = ValidateOptions::new().with_attach_warnings(true);
        let report = validate(&mut l, &options);
        assert!(report.is_ok());
        assert_eq!(report.warnings.len(), 1);
        assert!(l.records[0].comment().starts_with("CONTEST_ID: "));
        let mut again = l.clone();
        validate(&mut again, &ValidateOptions::new());
        assert!(again.records[0].equal(&l.records[0]));
    }

    #[test]
    fn test_app_field_uses_first_seen_type() {
        let mut l = Logfile::new();
        l.records.push(
            Record::from_fields([Field::typed("APP_X_COUNT", "12", DataType::Number)]).unwrap(),
        );
        l.records.push(Record::from_fields([Field::new("APP_X_COUNT", "twelve")]).unwrap());
        let report = validate(&mut l, &ValidateOptions::new());
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].starts_with("record 2, field APP_X_COUNT"));
    }
}
