//! Normalize near-miss values to ADIF formats.

use crate::geo::{format_location, Axis};
use crate::model::{DataType, Field, Logfile, Record};
use crate::spec::{self, FieldSpec};
use crate::Result;

/// Fix every record, returning how many fields changed.
pub fn fix(log: &mut Logfile) -> Result<usize> {
    let mut changed = 0;
    for record in &mut log.records {
        changed += fix_record(record)?;
    }
    Ok(changed)
}

/// Fix one record, returning how many fields changed.
pub fn fix_record(record: &mut Record) -> Result<usize> {
    let updates: Vec<Field> = record
        .fields()
        .iter()
        .filter_map(|f| {
            let spec = spec::field(&f.name)?;
            let fixed = fix_value(spec, f.value.trim())?;
            (fixed != f.value).then(|| Field::typed(&f.name, fixed, f.data_type))
        })
        .collect();
    let n = updates.len();
    for field in updates {
        record.set(field)?;
    }
    Ok(n)
}

fn fix_value(spec: &FieldSpec, value: &str) -> Option<String> {
    if value.is_empty() {
        return None;
    }
    match spec.data_type.primitive() {
        DataType::Date => fix_date(value),
        DataType::Time => fix_time(value),
        DataType::Location => Axis::for_field(spec.name).and_then(|axis| fix_location(value, axis)),
        DataType::Boolean => fix_boolean(value),
        DataType::Enumeration | DataType::String => fix_enumeration(spec, value),
        _ => None,
    }
}

/// `YYYY-MM-DD`, `YYYY/MM/DD` and `YYYY.MM.DD` become `YYYYMMDD`.
fn fix_date(value: &str) -> Option<String> {
    let parts: Vec<&str> = value.split(['-', '/', '.']).collect();
    match parts.as_slice() {
        [y, m, d] if y.len() == 4 && m.len() <= 2 && d.len() <= 2 => {
            let all_digits = parts.iter().all(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()));
            all_digits.then(|| format!("{y}{m:0>2}{d:0>2}"))
        }
        _ => None,
    }
}

/// `HH:MM` and `HH:MM:SS` lose their colons; one-digit hours are padded.
fn fix_time(value: &str) -> Option<String> {
    let parts: Vec<&str> = value.split(':').collect();
    if parts.len() < 2 || parts.len() > 3 {
        return None;
    }
    let ok = parts.iter().enumerate().all(|(i, p)| {
        let width_ok = if i == 0 { (1..=2).contains(&p.len()) } else { p.len() == 2 };
        width_ok && p.bytes().all(|b| b.is_ascii_digit())
    });
    ok.then(|| format!("{:0>2}{}", parts[0], parts[1..].concat()))
}

/// Signed decimal degrees become `XDDD MM.mmm`.
fn fix_location(value: &str, axis: Axis) -> Option<String> {
    if value.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return None;
    }
    let degrees: f64 = value.parse().ok()?;
    let limit = match axis {
        Axis::Latitude => 90.0,
        Axis::Longitude => 180.0,
    };
    (degrees.is_finite() && degrees.abs() <= limit).then(|| format_location(degrees, axis))
}

fn fix_boolean(value: &str) -> Option<String> {
    match value.to_ascii_lowercase().as_str() {
        "y" | "yes" | "true" | "t" => Some("Y".to_string()),
        "n" | "no" | "false" | "f" => Some("N".to_string()),
        _ => None,
    }
}

/// Enumerated values take their table spelling.
fn fix_enumeration(spec: &FieldSpec, value: &str) -> Option<String> {
    let e = spec::enumeration(spec.enumeration?)?;
    let found = e.get(value)?;
    found.key().eq_ignore_ascii_case(value).then(|| found.key().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed(name: &str, value: &str) -> String {
        let mut r = Record::from_fields([Field::new(name, value)]).unwrap();
        fix_record(&mut r).unwrap();
        r.value(name).to_string()
    }

    #[test]
    fn test_dates_and_times() {
        assert_eq!(fixed("QSO_DATE", "2023-10-31"), "20231031");
        assert_eq!(fixed("QSO_DATE", "2023/1/5"), "20230105");
        assert_eq!(fixed("QSO_DATE", "31-10-2023"), "31-10-2023");
        assert_eq!(fixed("TIME_ON", "12:34"), "1234");
        assert_eq!(fixed("TIME_ON", "9:05:30"), "090530");
        assert_eq!(fixed("TIME_ON", "1234"), "1234");
    }

    #[test]
    fn test_locations() {
        assert_eq!(fixed("LAT", "41.5"), "N041 30.000");
        assert_eq!(fixed("MY_LON", "-72.25"), "W072 15.000");
        assert_eq!(fixed("LAT", "95"), "95");
        assert_eq!(fixed("LAT", "N041 30.000"), "N041 30.000");
    }

    #[test]
    fn test_booleans_and_enumerations() {
        assert_eq!(fixed("QSO_RANDOM", "yes"), "Y");
        assert_eq!(fixed("FORCE_INIT", "False"), "N");
        assert_eq!(fixed("BAND", "20M"), "20m");
        assert_eq!(fixed("MODE", "cw"), "CW");
        assert_eq!(fixed("BAND", "21m"), "21m");
    }

    #[test]
    fn test_counts_changes() {
        let mut log = Logfile::new();
        log.records.push(
            Record::from_fields([
                Field::new("BAND", "40M"),
                Field::new("CALL", "w1aw"),
                Field::new("QSO_DATE", "1987-06-05"),
            ])
            .unwrap(),
        );
        assert_eq!(fix(&mut log).unwrap(), 2);
        assert_eq!(log.records[0].value("CALL"), "w1aw");
        assert_eq!(fix(&mut log).unwrap(), 0);
    }
}
