//! A whole logbook: header, records and user-defined fields.

use super::field::normalize_name;
use super::record::Record;
use super::userdef::UserdefField;
use crate::error::AdifError;
use crate::spec;
use crate::Result;

/// An in-memory logbook, independent of its encoding.
#[derive(Debug, Clone, Default)]
pub struct Logfile {
    /// Header fields such as `ADIF_VER` and `PROGRAMID`, plus the header comment
    pub header: Record,
    pub records: Vec<Record>,
    userdefs: Vec<UserdefField>,
    /// Preferred leading column order for writers
    pub field_order: Vec<String>,
    /// Free text outside any header or record
    pub comment: String,
}

impl Logfile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declared user-defined fields, in declaration order.
    pub fn userdefs(&self) -> &[UserdefField] {
        &self.userdefs
    }

    /// Find a user-defined field by name, case-insensitively.
    pub fn userdef(&self, name: &str) -> Option<&UserdefField> {
        let name = normalize_name(name);
        self.userdefs.iter().find(|u| u.name == name)
    }

    /// Declare a user-defined field.
    ///
    /// Fails if the declaration is invalid or the name is already a
    /// specification field or another user-defined field.
    pub fn add_userdef(&mut self, def: UserdefField) -> Result<()> {
        def.validate()?;
        if spec::field(&def.name).is_some() {
            return Err(AdifError::Userdef {
                name: def.name,
                message: "conflicts with an ADIF specification field".into(),
            });
        }
        if self.userdef(&def.name).is_some() {
            return Err(AdifError::Userdef {
                name: def.name,
                message: "declared more than once".into(),
            });
        }
        self.userdefs.push(def);
        Ok(())
    }

    /// Append a line to the logfile comment.
    pub fn append_comment(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if !self.comment.is_empty() {
            self.comment.push('\n');
        }
        self.comment.push_str(text);
    }

    /// Field order hint followed by every other record field name in first-seen order.
    pub fn column_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        let mut push = |n: &str| {
            let n = normalize_name(n);
            if !n.is_empty() && !names.contains(&n) {
                names.push(n);
            }
        };
        for n in &self.field_order {
            push(n);
        }
        for r in &self.records {
            for n in r.names() {
                push(n);
            }
        }
        names
    }

    /// Fields of `record` ordered by the field order hint, then record order.
    pub fn ordered_fields<'a>(&self, record: &'a Record) -> Vec<&'a super::Field> {
        let mut out: Vec<&super::Field> = self
            .field_order
            .iter()
            .filter_map(|n| record.get(n))
            .collect();
        for f in record.fields() {
            if !out.iter().any(|o| o.name == f.name) {
                out.push(f);
            }
        }
        out
    }

    /// True when the header carries anything a writer would need to emit.
    pub fn has_header_content(&self) -> bool {
        !self.header.is_empty() || !self.header.comment().is_empty() || !self.userdefs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DataType, Field};

    #[test]
    fn test_add_userdef_collisions() {
        let mut l = Logfile::new();
        l.add_userdef(UserdefField::new("SWEATERS", DataType::String))
            .unwrap();
        assert!(l
            .add_userdef(UserdefField::new("sweaters", DataType::Number))
            .is_err());
        assert!(l
            .add_userdef(UserdefField::new("CALL", DataType::String))
            .is_err());
        assert_eq!(l.userdefs().len(), 1);
        assert!(l.userdef("Sweaters").is_some());
    }

    #[test]
    fn test_column_names_union() {
        let mut l = Logfile::new();
        l.field_order = vec!["band".into(), "CALL".into()];
        l.records.push(
            Record::from_fields([Field::new("CALL", "W1AW"), Field::new("MODE", "CW")]).unwrap(),
        );
        l.records
            .push(Record::from_fields([Field::new("FREQ", "7.1"), Field::new("CALL", "K1A")]).unwrap());
        assert_eq!(l.column_names(), vec!["BAND", "CALL", "MODE", "FREQ"]);
    }

    #[test]
    fn test_ordered_fields() {
        let mut l = Logfile::new();
        l.field_order = vec!["MODE".into(), "NOPE".into()];
        let r = Record::from_fields([Field::new("CALL", "W1AW"), Field::new("MODE", "CW")]).unwrap();
        let names: Vec<_> = l.ordered_fields(&r).iter().map(|f| f.name.clone()).collect();
        assert_eq!(names, vec!["MODE", "CALL"]);
    }
}
