//! Tab-separated values without quoting.
//!
//! Tabs and line breaks cannot appear literally, so names and values may
//! use `\t`, `\r`, `\n` and `\\` escapes when escaping is enabled.

use std::io::{BufRead, Write};

use super::{LogReader, LogWriter, TsvOptions};
use crate::error::{AdifError, Position};
use crate::model::{Field, Logfile, Record};
use crate::Result;

const FORMAT: &str = "TSV";

/// TSV reader and writer.
#[derive(Debug, Clone, Default)]
pub struct TsvCodec {
    options: TsvOptions,
}

impl TsvCodec {
    pub fn new(options: TsvOptions) -> Self {
        Self { options }
    }

    fn decode(&self, cell: &str) -> String {
        if !self.options.escape_special || !cell.contains('\\') {
            return cell.to_string();
        }
        let mut out = String::with_capacity(cell.len());
        let mut chars = cell.chars();
        while let Some(c) = chars.next() {
            if c != '\\' {
                out.push(c);
                continue;
            }
            match chars.next() {
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some('n') => out.push('\n'),
                Some('\\') => out.push('\\'),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            }
        }
        out
    }

    fn encode(&self, text: &str, position: impl FnOnce() -> Position) -> Result<String> {
        if self.options.escape_special {
            let mut out = String::with_capacity(text.len());
            for c in text.chars() {
                match c {
                    '\t' => out.push_str("\\t"),
                    '\r' => out.push_str("\\r"),
                    '\n' => out.push_str("\\n"),
                    '\\' => out.push_str("\\\\"),
                    c => out.push(c),
                }
            }
            return Ok(out);
        }
        if text.contains(&['\t', '\r', '\n'][..]) {
            return Err(AdifError::encode(
                FORMAT,
                position(),
                format!("{text:?} contains a tab or line break; enable escaping"),
            ));
        }
        Ok(text.to_string())
    }
}

impl LogReader for TsvCodec {
    fn read(&self, input: &mut dyn BufRead) -> Result<Logfile> {
        let mut log = Logfile::new();
        // Column index to field name; None for skipped empty headers.
        let mut header: Option<Vec<Option<String>>> = None;
        let mut line_no = 0;
        for line in input.lines() {
            let line = line?;
            line_no += 1;
            let line = line.strip_suffix('\r').unwrap_or(&line);
            if line.trim().is_empty() {
                continue;
            }
            let cells: Vec<String> = line.split('\t').map(|c| self.decode(c)).collect();
            let Some(names) = header.as_ref() else {
                let mut names = Vec::with_capacity(cells.len());
                for (i, c) in cells.iter().enumerate() {
                    let name = c.trim().to_ascii_uppercase();
                    if name.is_empty() {
                        if !self.options.ignore_empty_headers {
                            return Err(AdifError::schema(FORMAT, format!("empty name in header column {}", i + 1)));
                        }
                        names.push(None);
                        continue;
                    }
                    if names.iter().flatten().any(|n: &String| *n == name) {
                        return Err(AdifError::schema(FORMAT, format!("duplicate header column {name}")));
                    }
                    names.push(Some(name));
                }
                log.field_order = names.iter().flatten().cloned().collect();
                header = Some(names);
                continue;
            };
            if cells.len() > names.len() {
                return Err(AdifError::syntax(
                    FORMAT,
                    Position::record(log.records.len() + 1).with_line(line_no),
                    format!("{} fields but header has {}", cells.len(), names.len()),
                ));
            }
            let mut record = Record::new();
            for (name, value) in names.iter().zip(cells) {
                if let Some(name) = name {
                    if !value.is_empty() {
                        record.set(Field::new(name, value))?;
                    }
                }
            }
            if !record.is_empty() {
                log.records.push(record);
            }
        }
        Ok(log)
    }
}

impl LogWriter for TsvCodec {
    fn write(&self, log: &Logfile, out: &mut dyn Write) -> Result<()> {
        let columns = log.column_names();
        if columns.is_empty() {
            return Ok(());
        }
        let eol = if self.options.crlf { "\r\n" } else { "\n" };
        let header = columns
            .iter()
            .map(|c| self.encode(c, || Position::default().with_field(c.clone())))
            .collect::<Result<Vec<_>>>()?;
        write!(out, "{}{eol}", header.join("\t"))?;
        for (i, record) in log.records.iter().enumerate() {
            let cells = columns
                .iter()
                .map(|c| self.encode(record.value(c), || Position::record(i + 1).with_field(c.clone())))
                .collect::<Result<Vec<_>>>()?;
            write!(out, "{}{eol}", cells.join("\t"))?;
        }
        out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_with(options: TsvOptions, text: &str) -> Result<Logfile> {
        TsvCodec::new(options).read(&mut text.as_bytes())
    }

    fn log_with(value: &str) -> Logfile {
        let mut log = Logfile::new();
        log.records
            .push(Record::from_fields([Field::new("CALL", "W1AW"), Field::new("NOTES", value)]).unwrap());
        log
    }

    #[test]
    fn test_read_basic() {
        let log = read_with(TsvOptions::default(), "call\tband\r\nW1AW\t20m\r\n\r\nK1A\n").unwrap();
        assert_eq!(log.field_order, vec!["CALL", "BAND"]);
        assert_eq!(log.records.len(), 2);
        assert_eq!(log.records[0].value("BAND"), "20m");
        assert_eq!(log.records[1].value("BAND"), "");
        assert!(read_with(TsvOptions::default(), "CALL\nW1AW\t20m\n").is_err());
    }

    #[test]
    fn test_empty_headers() {
        assert!(read_with(TsvOptions::default(), "CALL\t\tBAND\nW1AW\tx\t20m\n").is_err());
        let opts = TsvOptions::new().with_ignore_empty_headers(true);
        let log = read_with(opts, "CALL\t\tBAND\nW1AW\tx\t20m\n").unwrap();
        assert_eq!(log.field_order, vec!["CALL", "BAND"]);
        assert_eq!(log.records[0].len(), 2);
        assert!(read_with(TsvOptions::default(), "CALL\tcall\n").is_err());
    }

    #[test]
    fn test_escapes() {
        let opts = TsvOptions::new().with_escape_special(true);
        let log = read_with(opts.clone(), "CALL\tNOTES\nW1AW\ta\\tb\\nc\\\\d\n").unwrap();
        assert_eq!(log.records[0].value("NOTES"), "a\tb\nc\\d");
        let mut out = Vec::new();
        TsvCodec::new(opts).write(&log, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "CALL\tNOTES\nW1AW\ta\\tb\\nc\\\\d\n");
    }

    #[test]
    fn test_unescaped_special_rejected() {
        for bad in ["a\tb", "a\rb", "a\nb"] {
            assert!(TsvCodec::default().write(&log_with(bad), &mut Vec::new()).is_err());
        }
        let mut out = Vec::new();
        TsvCodec::new(TsvOptions::new().with_crlf(true))
            .write(&log_with("back\\slash"), &mut out)
            .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "CALL\tNOTES\r\nW1AW\tback\\slash\r\n");
    }
}
