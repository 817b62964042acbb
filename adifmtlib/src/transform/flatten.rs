//! Split list-valued fields into one record per item.

use crate::error::AdifError;
use crate::model::{Field, Logfile};
use crate::spec;
use crate::Result;

/// Fields to flatten and any explicit delimiters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlattenOptions {
    pub fields: Vec<String>,
    /// Delimiters for fields the specification does not describe
    pub delimiters: Vec<(String, String)>,
}

impl FlattenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, name: impl AsRef<str>) -> Self {
        self.fields.push(name.as_ref().trim().to_ascii_uppercase());
        self
    }

    /// Parse `FIELD=DELIM`.
    pub fn with_delimiter_spec(mut self, text: &str) -> Result<Self> {
        let (name, delim) = text
            .split_once('=')
            .ok_or_else(|| AdifError::Config(format!("expected FIELD=DELIMITER, got {text:?}")))?;
        if delim.is_empty() {
            return Err(AdifError::Config(format!("empty delimiter for {name}")));
        }
        self.delimiters
            .push((name.trim().to_ascii_uppercase(), delim.to_string()));
        Ok(self)
    }

    fn delimiter(&self, field: &str) -> Result<String> {
        if let Some((_, d)) = self.delimiters.iter().find(|(n, _)| n == field) {
            return Ok(d.clone());
        }
        let type_name = spec::field(field).map(|f| f.type_name()).unwrap_or("");
        match type_name {
            "SecondarySubdivisionList" => Ok(":".to_string()),
            "SecondaryAdministrativeSubdivisionListAlt" => Ok(";".to_string()),
            t if t.ends_with("List") => Ok(",".to_string()),
            _ => Err(AdifError::Config(format!(
                "{field} is not a list field; give a delimiter as {field}=DELIMITER"
            ))),
        }
    }
}

/// Replace each record with the cross product of its list items.
///
/// A record with no items in a flattened field passes through unchanged
/// for that field.
pub fn flatten(log: &mut Logfile, options: &FlattenOptions) -> Result<()> {
    let splits: Vec<(String, String)> = options
        .fields
        .iter()
        .map(|f| options.delimiter(f).map(|d| (f.clone(), d)))
        .collect::<Result<_>>()?;
    let mut out = Vec::with_capacity(log.records.len());
    for record in log.records.drain(..) {
        let mut expanded = vec![record];
        for (field, delim) in &splits {
            let mut next = Vec::with_capacity(expanded.len());
            for base in expanded {
                let items: Vec<String> = base
                    .value(field)
                    .split(delim.as_str())
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
                if items.len() <= 1 {
                    let mut base = base;
                    if let Some(item) = items.into_iter().next() {
                        let data_type = base.get(field).map(|f| f.data_type).unwrap_or_default();
                        base.set(Field::typed(field, item, data_type))?;
                    }
                    next.push(base);
                    continue;
                }
                let data_type = base.get(field).map(|f| f.data_type).unwrap_or_default();
                for item in items {
                    let mut copy = base.clone();
                    copy.set(Field::typed(field, item, data_type))?;
                    next.push(copy);
                }
            }
            expanded = next;
        }
        out.extend(expanded);
    }
    log.records = out;
    Ok(())
}
