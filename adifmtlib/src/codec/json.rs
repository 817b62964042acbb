//! JSON: `{"HEADER": {...}, "RECORDS": [{...}, ...]}`.

use std::io::{BufRead, Write};

use serde_json::{Map, Number, Value};

use super::{JsonOptions, LogReader, LogWriter};
use crate::error::{AdifError, Position};
use crate::model::{DataType, Field, Logfile, Record};
use crate::spec;
use crate::Result;

const FORMAT: &str = "JSON";

/// JSON reader and writer.
#[derive(Debug, Clone, Default)]
pub struct JsonCodec {
    options: JsonOptions,
}

impl JsonCodec {
    pub fn new(options: JsonOptions) -> Self {
        Self { options }
    }
}

fn object_to_record(obj: &Map<String, Value>, position: Position) -> Result<Record> {
    let mut record = Record::new();
    for (name, value) in obj {
        let field = match value {
            Value::Null => continue,
            Value::String(s) => Field::new(name, s.as_str()),
            // Numbers keep their literal text, so 14.250 stays 14.250.
            Value::Number(n) => Field::typed(name, n.to_string(), DataType::Number),
            Value::Bool(b) => Field::typed(name, if *b { "Y" } else { "N" }, DataType::Boolean),
            Value::Array(_) | Value::Object(_) => {
                return Err(AdifError::syntax(
                    FORMAT,
                    position.with_field(name.to_ascii_uppercase()),
                    "field values must be strings, numbers or booleans",
                ))
            }
        };
        record.set(field)?;
    }
    Ok(record)
}

fn get_key<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    obj.iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v)
}

impl LogReader for JsonCodec {
    fn read(&self, input: &mut dyn BufRead) -> Result<Logfile> {
        let doc: Value = serde_json::from_reader(input)?;
        let Value::Object(doc) = doc else {
            return Err(AdifError::schema(FORMAT, "top level must be an object"));
        };
        let mut log = Logfile::new();
        match get_key(&doc, "HEADER") {
            None | Some(Value::Null) => {}
            Some(Value::Object(h)) => log.header = object_to_record(h, Position::default())?,
            Some(_) => return Err(AdifError::schema(FORMAT, "HEADER must be an object")),
        }
        match get_key(&doc, "RECORDS") {
            None | Some(Value::Null) => {}
            Some(Value::Array(records)) => {
                for (i, r) in records.iter().enumerate() {
                    let Value::Object(obj) = r else {
                        return Err(AdifError::syntax(FORMAT, Position::record(i + 1), "record must be an object"));
                    };
                    let record = object_to_record(obj, Position::record(i + 1))?;
                    if !record.is_empty() {
                        log.records.push(record);
                    }
                }
            }
            Some(_) => return Err(AdifError::schema(FORMAT, "RECORDS must be an array")),
        }
        Ok(log)
    }
}

impl JsonCodec {
    fn value_of(&self, field: &Field) -> Value {
        if self.options.typed_output {
            let data_type = match field.data_type {
                DataType::Unspecified => spec::field(&field.name)
                    .map(|s| s.data_type.primitive())
                    .unwrap_or(DataType::Unspecified),
                t => t,
            };
            match data_type {
                DataType::Number if spec::is_number(&field.value) => {
                    if let Ok(n) = serde_json::from_str::<Number>(&normalize_number(&field.value)) {
                        return Value::Number(n);
                    }
                }
                DataType::Boolean => match field.value.as_str() {
                    "Y" | "y" => return Value::Bool(true),
                    "N" | "n" => return Value::Bool(false),
                    _ => {}
                },
                _ => {}
            }
        }
        Value::String(field.value.clone())
    }

    fn object(&self, fields: &[&Field]) -> Value {
        let map: Map<String, Value> = fields
            .iter()
            .map(|f| (f.name.clone(), self.value_of(f)))
            .collect();
        Value::Object(map)
    }
}

/// ADIF allows `.5` and `7.`, which JSON does not.
fn normalize_number(value: &str) -> String {
    let (sign, digits) = match value.strip_prefix('-') {
        Some(d) => ("-", d),
        None => ("", value),
    };
    let mut s = String::from(sign);
    if digits.starts_with('.') {
        s.push('0');
    }
    s.push_str(digits);
    if s.ends_with('.') {
        s.push('0');
    }
    s
}

impl LogWriter for JsonCodec {
    fn write(&self, log: &Logfile, out: &mut dyn Write) -> Result<()> {
        let header: Vec<&Field> = log.header.fields().iter().collect();
        let records: Vec<Value> = log
            .records
            .iter()
            .map(|r| self.object(&log.ordered_fields(r)))
            .collect();
        let mut doc = Map::new();
        doc.insert("HEADER".into(), self.object(&header));
        doc.insert("RECORDS".into(), Value::Array(records));
        let mut text = serde_json::to_string_pretty(&Value::Object(doc))?;
        if self.options.html_safe {
            text = text
                .replace('<', "\\u003c")
                .replace('>', "\\u003e")
                .replace('&', "\\u0026");
        }
        out.write_all(text.as_bytes())?;
        out.write_all(b"\n")?;
        out.flush()?;
        Ok(())
    }
}
