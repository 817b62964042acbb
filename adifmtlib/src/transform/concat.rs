//! Merging logfiles and projecting their records.

use crate::error::AdifError;
use crate::model::{Logfile, Record};
use crate::Result;

/// Append logfiles in order.
///
/// Header fields keep the first value seen. A userdef declared twice must
/// be declared identically.
pub fn concat(logs: impl IntoIterator<Item = Logfile>) -> Result<Logfile> {
    let mut out = Logfile::new();
    for log in logs {
        for field in log.header.fields() {
            if out.header.is_blank(&field.name) {
                out.header.set(field.clone())?;
            }
        }
        if out.header.comment().is_empty() {
            out.header.set_comment(log.header.comment());
        }
        for def in log.userdefs() {
            match out.userdef(&def.name) {
                Some(existing) if existing == def => {}
                Some(_) => {
                    return Err(AdifError::Userdef {
                        name: def.name.clone(),
                        message: "declared differently in two inputs".to_string(),
                    })
                }
                None => out.add_userdef(def.clone())?,
            }
        }
        for name in &log.field_order {
            if !out.field_order.contains(name) {
                out.field_order.push(name.clone());
            }
        }
        out.append_comment(&log.comment);
        out.records.extend(log.records);
    }
    Ok(out)
}

/// Keep only the named fields, in the given order.
pub fn select(log: &mut Logfile, fields: &[String]) -> Result<()> {
    let names: Vec<String> = fields.iter().map(|f| f.trim().to_ascii_uppercase()).collect();
    if let Some(bad) = names.iter().find(|n| n.is_empty()) {
        return Err(AdifError::InvalidFieldName(bad.clone()));
    }
    for record in &mut log.records {
        let mut projected = Record::new();
        for name in &names {
            if let Some(field) = record.get(name) {
                projected.set(field.clone())?;
            }
        }
        projected.set_comment(record.comment());
        *record = projected;
    }
    log.field_order = names;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DataType, Field, UserdefField};

    fn log_of(calls: &[&str]) -> Logfile {
        let mut log = Logfile::new();
        for call in calls {
            log.records
                .push(Record::from_fields([Field::new("CALL", *call), Field::new("BAND", "20m")]).unwrap());
        }
        log
    }

    #[test]
    fn test_concat_appends_in_order() {
        let mut a = log_of(&["K1A", "K1B"]);
        a.header.set(Field::new("PROGRAMID", "first")).unwrap();
        a.field_order = vec!["CALL".into()];
        let mut b = log_of(&["K1C"]);
        b.header.set(Field::new("PROGRAMID", "second")).unwrap();
        b.header.set(Field::new("ADIF_VER", "3.1.4")).unwrap();
        b.field_order = vec!["BAND".into(), "CALL".into()];
        let merged = concat([a, b]).unwrap();
        let calls: Vec<&str> = merged.records.iter().map(|r| r.value("CALL")).collect();
        assert_eq!(calls, vec!["K1A", "K1B", "K1C"]);
        assert_eq!(merged.header.value("PROGRAMID"), "first");
        assert_eq!(merged.header.value("ADIF_VER"), "3.1.4");
        assert_eq!(merged.field_order, vec!["CALL", "BAND"]);
    }

    #[test]
    fn test_concat_userdef_conflict() {
        let mut a = Logfile::new();
        a.add_userdef(UserdefField::new("EPOCH", DataType::Number)).unwrap();
        let mut b = Logfile::new();
        b.add_userdef(UserdefField::new("EPOCH", DataType::Number)).unwrap();
        assert_eq!(concat([a.clone(), b]).unwrap().userdefs().len(), 1);
        let mut c = Logfile::new();
        c.add_userdef(UserdefField::new("EPOCH", DataType::String)).unwrap();
        assert!(concat([a, c]).is_err());
    }

    #[test]
    fn test_select_projects_and_orders() {
        let mut log = log_of(&["K1A"]);
        log.records[0].set_comment("note");
        select(&mut log, &["band".to_string(), "NAME".to_string(), "CALL".to_string()]).unwrap();
        let names: Vec<&str> = log.records[0].names().collect();
        assert_eq!(names, vec!["BAND", "CALL"]);
        assert_eq!(log.records[0].comment(), "note");
        assert_eq!(log.field_order, vec!["BAND", "NAME", "CALL"]);
    }
}
