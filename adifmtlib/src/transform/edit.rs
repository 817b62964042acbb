//! Adding, replacing and removing fields, and shifting times between zones.

use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use chrono_tz::Tz;

use crate::error::AdifError;
use crate::model::{is_valid_name, Field, Logfile, Record};
use crate::Result;

/// `NAME=VALUE` from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub name: String,
    pub value: String,
}

impl FromStr for Assignment {
    type Err = AdifError;

    fn from_str(s: &str) -> Result<Self> {
        let (name, value) = s
            .split_once('=')
            .ok_or_else(|| AdifError::Config(format!("expected NAME=VALUE, got {s:?}")))?;
        let name = name.trim().to_ascii_uppercase();
        if !is_valid_name(&name) {
            return Err(AdifError::InvalidFieldName(name));
        }
        Ok(Assignment {
            name,
            value: value.to_string(),
        })
    }
}

/// Source and target zones for rewriting QSO times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeShift {
    pub from: Tz,
    pub to: Tz,
}

impl TimeShift {
    pub fn new(from: &str, to: &str) -> Result<Self> {
        let zone = |name: &str| {
            name.parse::<Tz>()
                .map_err(|_| AdifError::Config(format!("unknown time zone {name:?}")))
        };
        Ok(TimeShift {
            from: zone(from)?,
            to: zone(to)?,
        })
    }

    /// Rewrite one date/time pair in place, keeping the time's width.
    fn shift(&self, record: &mut Record, date_field: &str, time_field: &str) -> std::result::Result<(), String> {
        let (date, time) = (record.value(date_field).trim(), record.value(time_field).trim());
        if date.is_empty() || time.is_empty() {
            return Ok(());
        }
        let day = NaiveDate::parse_from_str(date, "%Y%m%d")
            .map_err(|_| format!("{date_field} {date:?} is not a valid date"))?;
        let (clock, format) = match time.len() {
            4 => (NaiveTime::parse_from_str(time, "%H%M"), "%H%M"),
            6 => (NaiveTime::parse_from_str(time, "%H%M%S"), "%H%M%S"),
            _ => return Err(format!("{time_field} {time:?} is not a valid time")),
        };
        let clock = clock.map_err(|_| format!("{time_field} {time:?} is not a valid time"))?;
        let local = NaiveDateTime::new(day, clock);
        let moment = self
            .from
            .from_local_datetime(&local)
            .earliest()
            .ok_or_else(|| format!("{date} {time} does not exist in {}", self.from))?;
        let shifted = moment.with_timezone(&self.to).naive_local();
        let set = |record: &mut Record, name: &str, value: String| {
            record.set(Field::new(name, value)).map_err(|e| e.to_string())
        };
        set(record, date_field, shifted.format("%Y%m%d").to_string())?;
        set(record, time_field, shifted.format(format).to_string())
    }
}

/// What an edit does to every record.
#[derive(Debug, Clone, Default)]
pub struct EditOptions {
    /// Set only when the field is absent or blank
    pub add: Vec<Assignment>,
    /// Set unconditionally
    pub set: Vec<Assignment>,
    pub remove: Vec<String>,
    /// Drop fields with empty values
    pub remove_blank: bool,
    pub time_shift: Option<TimeShift>,
}

impl EditOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_add(mut self, a: Assignment) -> Self {
        self.add.push(a);
        self
    }

    pub fn with_set(mut self, a: Assignment) -> Self {
        self.set.push(a);
        self
    }

    pub fn with_remove(mut self, name: impl AsRef<str>) -> Self {
        self.remove.push(name.as_ref().trim().to_ascii_uppercase());
        self
    }

    pub fn with_remove_blank(mut self, remove_blank: bool) -> Self {
        self.remove_blank = remove_blank;
        self
    }

    pub fn with_time_shift(mut self, shift: TimeShift) -> Self {
        self.time_shift = Some(shift);
        self
    }
}

/// Validated edit, ready to apply.
#[derive(Debug, Clone)]
pub struct Editor {
    options: EditOptions,
}

impl Editor {
    /// Fails when one field is named by more than one of add, set and remove.
    pub fn new(options: EditOptions) -> Result<Self> {
        let mut seen: Vec<(&str, &str)> = Vec::new();
        let named = options
            .add
            .iter()
            .map(|a| (a.name.as_str(), "add"))
            .chain(options.set.iter().map(|a| (a.name.as_str(), "set")))
            .chain(options.remove.iter().map(|n| (n.as_str(), "remove")));
        for (name, action) in named {
            if let Some((_, earlier)) = seen.iter().find(|(n, _)| *n == name) {
                return Err(AdifError::Config(format!(
                    "field {name} given to both {earlier} and {action}"
                )));
            }
            seen.push((name, action));
        }
        Ok(Editor { options })
    }

    pub fn apply(&self, record: &mut Record) -> Result<()> {
        for a in &self.options.add {
            if record.is_blank(&a.name) {
                record.set(Field::new(&a.name, a.value.clone()))?;
            }
        }
        for a in &self.options.set {
            record.set(Field::new(&a.name, a.value.clone()))?;
        }
        for name in &self.options.remove {
            record.remove(name);
        }
        if self.options.remove_blank {
            record.retain(|f| !f.value.is_empty());
        }
        if let Some(shift) = &self.options.time_shift {
            for (date, time) in [("QSO_DATE", "TIME_ON"), ("QSO_DATE_OFF", "TIME_OFF")] {
                shift
                    .shift(record, date, time)
                    .map_err(|msg| AdifError::Validation(vec![msg]))?;
            }
        }
        Ok(())
    }

    /// Apply to every record, naming the failing record on error.
    pub fn edit(&self, log: &mut Logfile) -> Result<()> {
        for (i, record) in log.records.iter_mut().enumerate() {
            self.apply(record).map_err(|e| match e {
                AdifError::Validation(msgs) => {
                    AdifError::Validation(msgs.into_iter().map(|m| format!("record {}: {m}", i + 1)).collect())
                }
                e => e,
            })?;
        }
        for name in &self.options.remove {
            log.field_order.retain(|f| f != name);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(fields: &[(&str, &str)]) -> Record {
        Record::from_fields(fields.iter().map(|(n, v)| Field::new(n, *v))).unwrap()
    }

    fn assign(s: &str) -> Assignment {
        s.parse().unwrap()
    }

    #[test]
    fn test_add_set_remove() {
        let editor = Editor::new(
            EditOptions::new()
                .with_add(assign("my_gridsquare=FN31"))
                .with_add(assign("NAME=Hiram"))
                .with_set(assign("BAND=20m"))
                .with_remove("comment")
                .with_remove_blank(true),
        )
        .unwrap();
        let mut r = record(&[("CALL", "W1AW"), ("NAME", "Maxim"), ("BAND", "40m"), ("COMMENT", "x"), ("QTH", "")]);
        editor.apply(&mut r).unwrap();
        assert_eq!(r.value("MY_GRIDSQUARE"), "FN31");
        assert_eq!(r.value("NAME"), "Maxim");
        assert_eq!(r.value("BAND"), "20m");
        assert!(r.get("COMMENT").is_none());
        assert!(r.get("QTH").is_none());
        let names: Vec<&str> = r.names().collect();
        assert_eq!(names, vec!["CALL", "NAME", "BAND", "MY_GRIDSQUARE"]);
    }

    #[test]
    fn test_conflicts() {
        let err = Editor::new(EditOptions::new().with_set(assign("BAND=20m")).with_remove("band")).unwrap_err();
        assert!(err.to_string().contains("BAND"));
        assert!(Editor::new(EditOptions::new().with_add(assign("A=1")).with_set(assign("A=2"))).is_err());
        assert!("NOEQUALS".parse::<Assignment>().is_err());
        assert_eq!(assign("X=a=b").value, "a=b");
    }

    #[test]
    fn test_time_shift_crosses_midnight() {
        let shift = TimeShift::new("America/New_York", "UTC").unwrap();
        let editor = Editor::new(EditOptions::new().with_time_shift(shift)).unwrap();
        let mut r = record(&[
            ("QSO_DATE", "20201231"),
            ("TIME_ON", "231545"),
            ("QSO_DATE_OFF", "20201231"),
            ("TIME_OFF", "2330"),
        ]);
        editor.apply(&mut r).unwrap();
        assert_eq!(r.value("QSO_DATE"), "20210101");
        assert_eq!(r.value("TIME_ON"), "041545");
        assert_eq!(r.value("QSO_DATE_OFF"), "20210101");
        assert_eq!(r.value("TIME_OFF"), "0430");
    }

    #[test]
    fn test_time_shift_errors() {
        assert!(TimeShift::new("Mars/Olympus", "UTC").is_err());
        let shift = TimeShift::new("UTC", "Asia/Tokyo").unwrap();
        let editor = Editor::new(EditOptions::new().with_time_shift(shift)).unwrap();
        let mut log = Logfile::new();
        log.records.push(record(&[("QSO_DATE", "20201301"), ("TIME_ON", "1200")]));
        let err = editor.edit(&mut log).unwrap_err();
        assert!(err.to_string().contains("record 1"));
        let mut r = record(&[("TIME_ON", "1200")]);
        editor.apply(&mut r).unwrap();
        assert_eq!(r.value("TIME_ON"), "1200");
    }
}
