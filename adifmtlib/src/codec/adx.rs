//! ADX: the XML encoding of ADIF.

use std::borrow::Cow;
use std::io::{BufRead, Write};

use quick_xml::escape::escape;
use quick_xml::events::{BytesDecl, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use tracing::debug;

use super::{AdxOptions, LogReader, LogWriter};
use crate::error::{AdifError, Position};
use crate::model::{DataType, Field, Logfile, Record, UserdefField};
use crate::Result;

const FORMAT: &str = "ADX";

/// ADX reader and writer.
#[derive(Debug, Clone, Default)]
pub struct AdxCodec {
    options: AdxOptions,
}

impl AdxCodec {
    pub fn new(options: AdxOptions) -> Self {
        Self { options }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Outside,
    Adx,
    Header,
    Records,
    Record,
}

/// The element whose text is being collected.
struct OpenField {
    name: String,
    data_type: DataType,
    /// Header `USERDEF` declaration: field id and constraints
    declaration: Option<(u32, Option<String>, Option<String>)>,
    text: String,
}

#[derive(Default)]
struct Attrs {
    pairs: Vec<(String, String)>,
}

impl Attrs {
    fn parse(e: &BytesStart<'_>) -> Result<Self> {
        let mut pairs = Vec::new();
        for a in e.attributes() {
            let a = a?;
            let key = String::from_utf8_lossy(a.key.as_ref()).to_ascii_uppercase();
            pairs.push((key, a.unescape_value()?.into_owned()));
        }
        Ok(Attrs { pairs })
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn data_type(&self, position: &Position) -> Result<DataType> {
        match self.get("TYPE") {
            None => Ok(DataType::Unspecified),
            Some(t) => DataType::from_indicator(t).ok_or_else(|| {
                AdifError::syntax(FORMAT, position.clone(), format!("unknown TYPE {t:?}"))
            }),
        }
    }
}

struct ReadState {
    log: Logfile,
    section: Section,
    record: Record,
    field: Option<OpenField>,
    declarations: Vec<(u32, UserdefField)>,
}

impl ReadState {
    fn position(&self) -> Position {
        match self.section {
            Section::Record => Position::record(self.log.records.len() + 1),
            _ => Position::default(),
        }
    }

    fn open(&mut self, name: &str, attrs: Attrs) -> Result<()> {
        let position = self.position().with_field(name.to_string());
        let unexpected = || AdifError::syntax(FORMAT, position.clone(), format!("unexpected element <{name}>"));
        if self.field.is_some() {
            return Err(unexpected());
        }
        match (self.section, name) {
            (Section::Outside, "ADX") => self.section = Section::Adx,
            (Section::Adx, "HEADER") => self.section = Section::Header,
            (Section::Adx, "RECORDS") => self.section = Section::Records,
            (Section::Records, "RECORD") => self.section = Section::Record,
            (Section::Header, "USERDEF") => {
                let id = attrs
                    .get("FIELDID")
                    .and_then(|v| v.trim().parse().ok())
                    .ok_or_else(|| AdifError::syntax(FORMAT, position.clone(), "USERDEF without numeric FIELDID"))?;
                self.field = Some(OpenField {
                    name: String::new(),
                    data_type: attrs.data_type(&position)?,
                    declaration: Some((
                        id,
                        attrs.get("ENUM").map(str::to_string),
                        attrs.get("RANGE").map(str::to_string),
                    )),
                    text: String::new(),
                });
            }
            (Section::Record, "USERDEF") => {
                let field_name = attrs
                    .get("FIELDNAME")
                    .ok_or_else(|| AdifError::syntax(FORMAT, position.clone(), "USERDEF without FIELDNAME"))?;
                self.field = Some(OpenField {
                    name: field_name.trim().to_ascii_uppercase(),
                    data_type: attrs.data_type(&position)?,
                    declaration: None,
                    text: String::new(),
                });
            }
            (Section::Header | Section::Record, "APP") => {
                let (Some(program), Some(field_name)) = (attrs.get("PROGRAMID"), attrs.get("FIELDNAME")) else {
                    return Err(AdifError::syntax(FORMAT, position.clone(), "APP without PROGRAMID and FIELDNAME"));
                };
                self.field = Some(OpenField {
                    name: format!("APP_{}_{}", program.trim(), field_name.trim()).to_ascii_uppercase(),
                    data_type: attrs.data_type(&position)?,
                    declaration: None,
                    text: String::new(),
                });
            }
            (Section::Header | Section::Record, _) => {
                self.field = Some(OpenField {
                    name: name.to_string(),
                    data_type: attrs.data_type(&position)?,
                    declaration: None,
                    text: String::new(),
                });
            }
            _ => return Err(unexpected()),
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(open) = self.field.take() {
            let position = self.position();
            if let Some((id, enum_values, range)) = open.declaration {
                let mut text = open.text.trim().to_string();
                if let Some(c) = enum_values.or(range) {
                    text = format!("{text},{}", c.trim());
                }
                let def = UserdefField::parse_declaration(&text, open.data_type)?;
                self.declarations.push((id, def));
                return Ok(());
            }
            let name = open.name.clone();
            let target = match self.section {
                Section::Header => &mut self.log.header,
                _ => &mut self.record,
            };
            return target
                .set(Field::typed(open.name, open.text, open.data_type))
                .map_err(|_| AdifError::syntax(FORMAT, position.with_field(name), "empty field name"));
        }
        match self.section {
            Section::Record => {
                let record = std::mem::take(&mut self.record);
                if !record.is_empty() {
                    self.log.records.push(record);
                }
                self.section = Section::Records;
            }
            Section::Header => {
                self.declarations.sort_by_key(|(id, _)| *id);
                for (_, def) in std::mem::take(&mut self.declarations) {
                    self.log.add_userdef(def)?;
                }
                self.section = Section::Adx;
            }
            Section::Records => self.section = Section::Adx,
            Section::Adx => self.section = Section::Outside,
            Section::Outside => {}
        }
        Ok(())
    }

    fn comment(&mut self, text: &str) {
        let text = text.trim();
        match self.section {
            Section::Record => self.record.append_comment(text),
            Section::Header => self.log.header.append_comment(text),
            Section::Adx | Section::Records => self.log.append_comment(text),
            Section::Outside => debug!("ignoring comment outside <ADX>"),
        }
    }
}

impl LogReader for AdxCodec {
    fn read(&self, input: &mut dyn BufRead) -> Result<Logfile> {
        let mut reader = Reader::from_reader(input);
        let mut st = ReadState {
            log: Logfile::new(),
            section: Section::Outside,
            record: Record::new(),
            field: None,
            declarations: Vec::new(),
        };
        let mut buf = Vec::new();
        loop {
            let event = reader.read_event_into(&mut buf)?;
            match event {
                Event::Start(e) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).to_ascii_uppercase();
                    st.open(&name, Attrs::parse(&e)?)?;
                }
                Event::Empty(e) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).to_ascii_uppercase();
                    st.open(&name, Attrs::parse(&e)?)?;
                    st.close()?;
                }
                Event::End(_) => st.close()?,
                Event::Text(e) => {
                    let text = e.unescape()?;
                    push_text(&mut st, text);
                }
                Event::CData(e) => {
                    let text = String::from_utf8_lossy(&e).into_owned();
                    push_text(&mut st, Cow::Owned(text));
                }
                Event::Comment(e) => st.comment(&String::from_utf8_lossy(&e)),
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }
        if st.section != Section::Outside {
            return Err(AdifError::syntax(FORMAT, st.position(), "document ends inside an element"));
        }
        Ok(st.log)
    }
}

fn push_text(st: &mut ReadState, text: Cow<'_, str>) {
    match st.field.as_mut() {
        Some(open) => open.text.push_str(&text),
        None if !text.trim().is_empty() => debug!("ignoring text between ADX elements"),
        None => {}
    }
}

/// Escape markup and line breaks so they survive XML line-end normalization.
fn escape_value(value: &str) -> String {
    escape(value).replace('\r', "&#13;").replace('\n', "&#10;")
}

fn comment_text(text: &str) -> String {
    format!(" {} ", text.replace("--", "- -"))
}

/// Split `APP_PROGRAM_FIELD` into program and field name.
fn split_app_name(name: &str) -> Option<(&str, &str)> {
    let rest = name.strip_prefix("APP_")?;
    let (program, field) = rest.split_once('_')?;
    (!program.is_empty() && !field.is_empty()).then_some((program, field))
}

impl AdxCodec {
    fn write_field<W: Write>(&self, w: &mut Writer<W>, log: &Logfile, field: &Field) -> Result<()> {
        let type_attr = field.data_type.indicator();
        let text = escape_value(&field.value);
        let content = BytesText::from_escaped(text.as_str());
        let mut element = if let Some((program, name)) = split_app_name(&field.name) {
            w.create_element("APP")
                .with_attribute(("PROGRAMID", program))
                .with_attribute(("FIELDNAME", name))
        } else if log.userdef(&field.name).is_some() {
            w.create_element("USERDEF").with_attribute(("FIELDNAME", field.name.as_str()))
        } else {
            w.create_element(field.name.as_str())
        };
        if !type_attr.is_empty() {
            element = element.with_attribute(("TYPE", type_attr));
        }
        element.write_text_content(content)?;
        Ok(())
    }
}

impl LogWriter for AdxCodec {
    fn write(&self, log: &Logfile, out: &mut dyn Write) -> Result<()> {
        let mut w = if self.options.indent > 0 {
            Writer::new_with_indent(&mut *out, b' ', self.options.indent)
        } else {
            Writer::new(&mut *out)
        };
        w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        w.write_event(Event::Start(BytesStart::new("ADX")))?;
        if !log.comment.is_empty() {
            w.write_event(Event::Comment(BytesText::from_escaped(comment_text(&log.comment))))?;
        }
        w.write_event(Event::Start(BytesStart::new("HEADER")))?;
        if !log.header.comment().is_empty() {
            w.write_event(Event::Comment(BytesText::from_escaped(comment_text(log.header.comment()))))?;
        }
        for f in log.header.fields() {
            self.write_field(&mut w, log, f)?;
        }
        for (i, def) in log.userdefs().iter().enumerate() {
            let id = (i + 1).to_string();
            let mut element = w.create_element("USERDEF").with_attribute(("FIELDID", id.as_str()));
            if def.data_type != DataType::Unspecified {
                element = element.with_attribute(("TYPE", def.data_type.indicator()));
            }
            let constraint;
            if let Some((min, max)) = def.range {
                constraint = format!("{{{min}:{max}}}");
                element = element.with_attribute(("RANGE", constraint.as_str()));
            } else if !def.enum_values.is_empty() {
                constraint = format!("{{{}}}", def.enum_values.join(","));
                element = element.with_attribute(("ENUM", constraint.as_str()));
            }
            element.write_text_content(BytesText::new(&def.name))?;
        }
        w.write_event(Event::End(quick_xml::events::BytesEnd::new("HEADER")))?;
        w.write_event(Event::Start(BytesStart::new("RECORDS")))?;
        for (i, record) in log.records.iter().enumerate() {
            w.write_event(Event::Start(BytesStart::new("RECORD")))?;
            if !record.comment().is_empty() {
                w.write_event(Event::Comment(BytesText::from_escaped(comment_text(record.comment()))))?;
            }
            for f in log.ordered_fields(record) {
                if f.name.is_empty() {
                    return Err(AdifError::encode(FORMAT, Position::record(i + 1), "empty field name"));
                }
                self.write_field(&mut w, log, f)?;
            }
            w.write_event(Event::End(quick_xml::events::BytesEnd::new("RECORD")))?;
        }
        w.write_event(Event::End(quick_xml::events::BytesEnd::new("RECORDS")))?;
        w.write_event(Event::End(quick_xml::events::BytesEnd::new("ADX")))?;
        drop(w);
        out.write_all(b"\n")?;
        out.flush()?;
        Ok(())
    }
}
