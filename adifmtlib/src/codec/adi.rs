//! ADI: the tag-delimited ADIF text encoding.
//!
//! A field is `<NAME:LENGTH>` or `<NAME:LENGTH:TYPE>` followed by exactly
//! `LENGTH` bytes of value. `<EOH>` ends the header and `<EOR>` ends each
//! record. Any other text between tags is a comment.

use std::collections::HashMap;
use std::io::{BufRead, Read, Write};

use tracing::{debug, warn};

use super::{AdiOptions, LogReader, LogWriter};
use crate::error::{AdifError, Position};
use crate::model::{DataType, Field, Logfile, Record, UserdefField};
use crate::spec;
use crate::Result;

const FORMAT: &str = "ADI";

/// ADI reader and writer.
#[derive(Debug, Clone, Default)]
pub struct AdiCodec {
    options: AdiOptions,
}

impl AdiCodec {
    pub fn new(options: AdiOptions) -> Self {
        Self { options }
    }
}

/// Incremental parse state for one input.
#[derive(Default)]
struct ReadState {
    log: Logfile,
    current: Record,
    /// Text before the first tag
    prefix: String,
    seen_tag: bool,
    header_done: bool,
    app_types: HashMap<String, DataType>,
}

impl ReadState {
    fn position(&self) -> Position {
        Position::record(self.log.records.len() + 1)
    }

    fn comment(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        if self.seen_tag {
            self.current.append_comment(text);
        } else {
            self.prefix = text.to_string();
        }
    }

    fn end_header(&mut self) -> Result<()> {
        if self.header_done {
            return Err(AdifError::syntax(FORMAT, Position::default(), "duplicate <EOH>"));
        }
        if !self.log.records.is_empty() {
            return Err(AdifError::syntax(FORMAT, self.position(), "<EOH> after <EOR>"));
        }
        let mut header = std::mem::take(&mut self.current);
        let mut comment = std::mem::take(&mut self.prefix);
        if !header.comment().is_empty() {
            if !comment.is_empty() {
                comment.push('\n');
            }
            comment.push_str(header.comment());
        }
        header.set_comment(comment);
        self.register_userdefs(&mut header)?;
        self.log.header = header;
        self.header_done = true;
        Ok(())
    }

    fn register_userdefs(&mut self, header: &mut Record) -> Result<()> {
        let mut decls: Vec<(u32, Field)> = header
            .fields()
            .iter()
            .filter_map(|f| userdef_number(&f.name).map(|n| (n, f.clone())))
            .collect();
        decls.sort_by_key(|(n, _)| *n);
        for (_, f) in decls {
            header.remove(&f.name);
            let def = UserdefField::parse_declaration(&f.value, f.data_type)?;
            debug!(name = %def.name, "declared user-defined field");
            self.log.add_userdef(def)?;
        }
        Ok(())
    }

    fn end_record(&mut self) {
        let record = std::mem::take(&mut self.current);
        if !self.header_done && !self.prefix.is_empty() {
            let prefix = std::mem::take(&mut self.prefix);
            self.log.append_comment(&prefix);
        }
        if record.is_empty() {
            // no fields: keep any comment text at logfile level, as at end of input
            debug!(record = self.log.records.len() + 1, "skipping record without fields");
            self.log.append_comment(record.comment());
            return;
        }
        self.log.records.push(record);
    }

    fn add_field(&mut self, mut field: Field) -> Result<()> {
        if field.is_app_defined() && field.data_type != DataType::Unspecified {
            match self.app_types.get(&field.name) {
                Some(&first) if first != field.data_type => {
                    warn!(
                        field = %field.name,
                        first = first.indicator(),
                        found = field.data_type.indicator(),
                        "application field changed type, keeping the first"
                    );
                    field.data_type = first;
                }
                Some(_) => {}
                None => {
                    self.app_types.insert(field.name.clone(), field.data_type);
                }
            }
        }
        let name = field.name.clone();
        self.current
            .set(field)
            .map_err(|_| AdifError::syntax(FORMAT, self.position().with_field(name), "empty field name"))
    }
}

/// `USERDEF3` → `Some(3)`.
fn userdef_number(name: &str) -> Option<u32> {
    name.strip_prefix("USERDEF")
        .filter(|n| !n.is_empty())
        .and_then(|n| n.parse().ok())
}

fn decode_utf8(bytes: Vec<u8>, position: &Position) -> String {
    match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            warn!(%position, "invalid UTF-8, replacing undecodable bytes");
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    }
}

impl LogReader for AdiCodec {
    fn read(&self, input: &mut dyn BufRead) -> Result<Logfile> {
        let mut st = ReadState::default();
        let mut buf = Vec::new();
        loop {
            buf.clear();
            input.read_until(b'<', &mut buf)?;
            let found_tag = buf.last() == Some(&b'<');
            if found_tag {
                buf.pop();
            }
            let text = decode_utf8(std::mem::take(&mut buf), &st.position());
            if !found_tag {
                let text = text.trim();
                if !st.current.is_empty() {
                    return Err(AdifError::syntax(FORMAT, st.position(), "missing <EOR> at end of input"));
                }
                if st.seen_tag {
                    let pending = st.current.comment().to_string();
                    st.log.append_comment(&pending);
                    st.log.append_comment(text);
                } else {
                    st.log.append_comment(text);
                }
                break;
            }
            st.comment(&text);

            input.read_until(b'>', &mut buf)?;
            if buf.last() != Some(&b'>') {
                return Err(AdifError::syntax(FORMAT, st.position(), "unfinished tag at end of input"));
            }
            buf.pop();
            let tag = decode_utf8(std::mem::take(&mut buf), &st.position());
            if tag.trim().is_empty() {
                return Err(AdifError::syntax(FORMAT, st.position(), "empty tag <>"));
            }
            st.seen_tag = true;
            let parts: Vec<&str> = tag.split(':').collect();
            if parts.len() == 1 {
                match tag.trim().to_ascii_uppercase().as_str() {
                    "EOH" => st.end_header()?,
                    "EOR" => st.end_record(),
                    other => {
                        if !self.options.allow_unknown_tag {
                            return Err(AdifError::syntax(
                                FORMAT,
                                st.position(),
                                format!("unknown tag <{other}>"),
                            ));
                        }
                        warn!(tag = other, "ignoring unknown tag");
                        st.current.append_comment(&format!("[{other}]"));
                    }
                }
                continue;
            }
            if parts.len() > 3 {
                return Err(AdifError::syntax(FORMAT, st.position(), format!("malformed tag <{tag}>")));
            }
            let name = parts[0].trim().to_ascii_uppercase();
            let pos = st.position().with_field(name.clone());
            let len: usize = parts[1].trim().parse().map_err(|_| {
                AdifError::syntax(FORMAT, pos.clone(), format!("invalid length {:?}", parts[1]))
            })?;
            let data_type = match parts.get(2) {
                Some(t) => DataType::from_indicator(t.trim()).ok_or_else(|| {
                    AdifError::syntax(FORMAT, pos.clone(), format!("unknown type indicator {t:?}"))
                })?,
                None => DataType::Unspecified,
            };
            let mut value = Vec::with_capacity(len);
            input.take(len as u64).read_to_end(&mut value)?;
            if value.len() < len {
                return Err(AdifError::syntax(
                    FORMAT,
                    pos,
                    format!("expected {len} bytes of value, found {}", value.len()),
                ));
            }
            let value = decode_utf8(value, &pos);
            st.add_field(Field::typed(name, value, data_type))?;
        }
        Ok(st.log)
    }
}

impl AdiCodec {
    fn write_field(&self, out: &mut dyn Write, field: &Field, position: Position) -> Result<()> {
        let spec_type = spec::field(&field.name).map(|s| s.data_type.primitive());
        let effective = spec_type.unwrap_or(field.data_type);
        let value = if effective.is_multiline() || field.data_type.is_multiline() {
            crlf_lines(&field.value)
        } else {
            field.value.clone()
        };
        if self.options.ascii_only && !effective.is_international() && !value.is_ascii() {
            return Err(AdifError::encode(
                FORMAT,
                position.with_field(field.name.clone()),
                format!("non-ASCII value {value:?}"),
            ));
        }
        let name = if self.options.lower_case {
            field.name.to_ascii_lowercase()
        } else {
            field.name.clone()
        };
        match field.data_type {
            DataType::Unspecified => write!(out, "<{}:{}>", name, value.len())?,
            t => write!(out, "<{}:{}:{}>", name, value.len(), t.indicator())?,
        }
        out.write_all(value.as_bytes())?;
        out.write_all(self.options.field_separator.as_str().as_bytes())?;
        Ok(())
    }

    fn tag(&self, name: &str) -> String {
        if self.options.lower_case {
            format!("<{}>", name.to_ascii_lowercase())
        } else {
            format!("<{name}>")
        }
    }
}

fn crlf_lines(value: &str) -> String {
    value.replace("\r\n", "\n").replace('\n', "\r\n")
}

fn escape_comment(text: &str) -> String {
    text.replace('<', "&lt;").replace('>', "&gt;")
}

impl LogWriter for AdiCodec {
    fn write(&self, log: &Logfile, out: &mut dyn Write) -> Result<()> {
        let record_sep = self.options.record_separator.as_str();
        if log.has_header_content() {
            let comment = log.header.comment();
            if !comment.is_empty() {
                let line: Vec<&str> = comment.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
                writeln!(out, "{}", escape_comment(&line.join(" ")))?;
            } else {
                // A header must not start with '<'.
                writeln!(out)?;
            }
            for f in log.header.fields() {
                self.write_field(out, f, Position::default())?;
            }
            for (i, def) in log.userdefs().iter().enumerate() {
                let decl = Field::typed(format!("USERDEF{}", i + 1), def.declaration(), def.data_type);
                self.write_field(out, &decl, Position::default())?;
            }
            write!(out, "{}{}", self.tag("EOH"), record_sep)?;
        }
        for (i, record) in log.records.iter().enumerate() {
            if !record.comment().is_empty() {
                writeln!(out, "{}", escape_comment(record.comment()))?;
            }
            for f in log.ordered_fields(record) {
                self.write_field(out, f, Position::record(i + 1))?;
            }
            write!(out, "{}{}", self.tag("EOR"), record_sep)?;
        }
        if !log.comment.is_empty() {
            writeln!(out, "{}", escape_comment(&log.comment))?;
        }
        out.flush()?;
        Ok(())
    }
}
