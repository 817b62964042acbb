//! CSV with a header row naming the fields.

use std::io::{BufRead, Read, Write};

use ::csv::{ByteRecord, ReaderBuilder, Terminator, WriterBuilder};

use super::{CsvOptions, LogReader, LogWriter};
use crate::error::{AdifError, Position};
use crate::model::{Field, Logfile, Record};
use crate::Result;

const FORMAT: &str = "CSV";

/// CSV reader and writer.
#[derive(Debug, Clone, Default)]
pub struct CsvCodec {
    options: CsvOptions,
}

impl CsvCodec {
    pub fn new(options: CsvOptions) -> Self {
        Self { options }
    }

    /// Reject stray quotes the way a strict RFC 4180 reader would.
    fn check_quotes(&self, raw: &[u8], line: usize) -> Result<()> {
        let delim = self.options.delimiter;
        let mut at_field_start = true;
        let mut in_quotes = false;
        let mut quoted_field = false;
        let mut i = 0;
        while i < raw.len() {
            let b = raw[i];
            let line_start = i == 0 || raw[i - 1] == b'\n';
            if !in_quotes && line_start && Some(b) == self.options.comment {
                i += raw[i..].iter().position(|&c| c == b'\n').map_or(raw.len() - i, |p| p + 1);
                continue;
            }
            if in_quotes {
                if b == b'"' {
                    if raw.get(i + 1) == Some(&b'"') {
                        i += 1;
                    } else {
                        in_quotes = false;
                    }
                }
            } else if b == delim || b == b'\n' || b == b'\r' {
                at_field_start = true;
                quoted_field = false;
                i += 1;
                continue;
            } else if b == b'"' {
                if !at_field_start {
                    return Err(AdifError::syntax(
                        FORMAT,
                        Position::line(line),
                        "bare \" in non-quoted field",
                    ));
                }
                in_quotes = true;
                quoted_field = true;
            } else if quoted_field {
                return Err(AdifError::syntax(
                    FORMAT,
                    Position::line(line),
                    "extraneous or missing \" in quoted field",
                ));
            } else if at_field_start && self.options.trim_leading_space && b.is_ascii_whitespace() {
                i += 1;
                continue;
            }
            at_field_start = false;
            i += 1;
        }
        Ok(())
    }
}

/// Keeps the bytes the CSV parser consumes until the records they hold
/// have been checked.
struct Captured<R> {
    inner: R,
    bytes: Vec<u8>,
    /// Input offset of `bytes[0]`
    base: usize,
}

impl<R: Read> Read for Captured<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.bytes.extend_from_slice(&buf[..n]);
        Ok(n)
    }
}

impl<R> Captured<R> {
    /// Bytes from input offset `start` to `end`, dropping everything before `end`.
    fn take(&mut self, start: usize, end: Option<usize>) -> Vec<u8> {
        let from = start.saturating_sub(self.base).min(self.bytes.len());
        let to = end.map_or(self.bytes.len(), |e| e.saturating_sub(self.base).min(self.bytes.len()));
        let raw = self.bytes[from..to.max(from)].to_vec();
        self.bytes.drain(..to.max(from));
        self.base += to.max(from);
        raw
    }
}

impl CsvCodec {
    fn add_row(
        &self,
        log: &mut Logfile,
        header: &mut Option<Vec<String>>,
        line: usize,
        row: &ByteRecord,
    ) -> Result<()> {
        let values: Vec<String> = row
            .iter()
            .map(|v| {
                let s = String::from_utf8_lossy(v);
                if self.options.trim_leading_space {
                    s.trim_start().to_string()
                } else {
                    s.into_owned()
                }
            })
            .collect();
        let Some(names) = header.as_ref() else {
            let names: Vec<String> = values.iter().map(|v| v.trim().to_ascii_uppercase()).collect();
            for (j, n) in names.iter().enumerate() {
                if n.is_empty() {
                    return Err(AdifError::schema(FORMAT, format!("empty name in header column {}", j + 1)));
                }
                if names[..j].contains(n) {
                    return Err(AdifError::schema(FORMAT, format!("duplicate header column {n}")));
                }
            }
            log.field_order = names.clone();
            *header = Some(names);
            return Ok(());
        };
        let position = Position::record(log.records.len() + 1).with_line(line);
        let short = self.options.require_full_record && values.len() < names.len();
        if values.len() > names.len() || short {
            return Err(AdifError::syntax(
                FORMAT,
                position,
                format!("{} fields but header has {}", values.len(), names.len()),
            ));
        }
        let mut rec = Record::new();
        for (name, value) in names.iter().zip(values) {
            if !value.is_empty() {
                rec.set(Field::new(name, value))?;
            }
        }
        if !rec.is_empty() {
            log.records.push(rec);
        }
        Ok(())
    }
}

impl LogReader for CsvCodec {
    fn read(&self, input: &mut dyn BufRead) -> Result<Logfile> {
        let mut reader = ReaderBuilder::new()
            .delimiter(self.options.delimiter)
            .comment(self.options.comment)
            .flexible(true)
            .has_headers(false)
            .from_reader(Captured {
                inner: input,
                bytes: Vec::new(),
                base: 0,
            });

        let mut log = Logfile::new();
        let mut header: Option<Vec<String>> = None;
        // the parser accepts any stray quote, so strict mode checks each
        // record's raw bytes once the next record's offset is known
        let mut pending: Option<(usize, usize, ByteRecord)> = None;
        let mut record = ByteRecord::new();
        loop {
            let more = reader.read_byte_record(&mut record)?;
            let next = more.then(|| {
                let pos = record.position().cloned().unwrap_or_else(::csv::Position::new);
                (pos.byte() as usize, pos.line() as usize)
            });
            if let Some((start, line, row)) = pending.take() {
                let raw = reader.get_mut().take(start, next.map(|(b, _)| b));
                if !self.options.lazy_quotes {
                    self.check_quotes(&raw, line)?;
                }
                self.add_row(&mut log, &mut header, line, &row)?;
            }
            let Some((start, line)) = next else {
                break;
            };
            pending = Some((start, line, record.clone()));
        }
        Ok(log)
    }
}

impl LogWriter for CsvCodec {
    fn write(&self, log: &Logfile, out: &mut dyn Write) -> Result<()> {
        let columns = log.column_names();
        if columns.is_empty() {
            return Ok(());
        }
        let terminator = if self.options.crlf {
            Terminator::CRLF
        } else {
            Terminator::Any(b'\n')
        };
        let mut writer = WriterBuilder::new()
            .delimiter(self.options.delimiter)
            .terminator(terminator)
            .from_writer(&mut *out);
        writer.write_record(&columns)?;
        for record in &log.records {
            writer.write_record(columns.iter().map(|c| record.value(c)))?;
        }
        writer.flush()?;
        drop(writer);
        out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_with(options: CsvOptions, text: &str) -> Result<Logfile> {
        CsvCodec::new(options).read(&mut text.as_bytes())
    }

    fn read(text: &str) -> Result<Logfile> {
        read_with(CsvOptions::default(), text)
    }

    fn write(log: &Logfile, options: CsvOptions) -> String {
        let mut out = Vec::new();
        CsvCodec::new(options).write(log, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_read_basic() {
        let log = read("call,qso_date,band\nW1AW,19870605,40M\nK1ABC,,20m\n").unwrap();
        assert_eq!(log.field_order, vec!["CALL", "QSO_DATE", "BAND"]);
        assert_eq!(log.records.len(), 2);
        assert_eq!(log.records[0].value("BAND"), "40M");
        assert!(log.records[1].get("QSO_DATE").is_none());
    }

    #[test]
    fn test_short_and_long_rows() {
        let log = read("CALL,BAND,MODE\nW1AW,20m\n").unwrap();
        assert_eq!(log.records[0].value("MODE"), "");
        assert!(read("CALL,BAND\nW1AW,20m,CW\n").is_err());
        let strict = CsvOptions::new().with_require_full_record(true);
        assert!(read_with(strict, "CALL,BAND,MODE\nW1AW,20m\n").is_err());
    }

    #[test]
    fn test_quotes() {
        let log = read("CALL,NOTES\nW1AW,\"hello, \"\"world\"\"\"\n").unwrap();
        assert_eq!(log.records[0].value("NOTES"), "hello, \"world\"");
        assert!(read("CALL,NOTES\nW1AW,say \"hi\"\n").is_err());
        let lazy = CsvOptions::new().with_lazy_quotes(true);
        let log = read_with(lazy, "CALL,NOTES\nW1AW,say \"hi\"\n").unwrap();
        assert_eq!(log.records[0].value("NOTES"), "say \"hi\"");
    }

    #[test]
    fn test_delimiter_comment_trim() {
        let opts = CsvOptions::new()
            .with_delimiter(b';')
            .with_comment(Some(b'#'))
            .with_trim_leading_space(true);
        let log = read_with(opts, "# exported\nCALL; BAND\nW1AW;  20m\n").unwrap();
        assert_eq!(log.field_order, vec!["CALL", "BAND"]);
        assert_eq!(log.records[0].value("BAND"), "20m");
    }

    #[test]
    fn test_quote_error_reports_line_across_buffers() {
        let mut text = String::from("CALL,NOTES\n");
        for i in 0..2000 {
            text.push_str(&format!("K{i}A,\"quoted, fine\"\n"));
        }
        text.push_str("W1AW,bad \"quote\"\n");
        let err = read(&text).unwrap_err();
        assert!(err.to_string().contains("line 2002"), "{err}");
        let lazy = CsvOptions::new().with_lazy_quotes(true);
        assert_eq!(read_with(lazy, &text).unwrap().records.len(), 2001);
    }

    #[test]
    fn test_header_errors() {
        assert!(read("CALL,,BAND\nW1AW,x,20m\n").is_err());
        assert!(read("CALL,call\nW1AW,K1A\n").is_err());
    }

    #[test]
    fn test_write_columns() {
        let mut log = Logfile::new();
        log.field_order = vec!["CALL".into()];
        log.records
            .push(Record::from_fields([Field::new("BAND", "20m"), Field::new("CALL", "W1AW")]).unwrap());
        log.records
            .push(Record::from_fields([Field::new("CALL", "K1A"), Field::new("NOTES", "a,b")]).unwrap());
        assert_eq!(
            write(&log, CsvOptions::default()),
            "CALL,BAND,NOTES\nW1AW,20m,\nK1A,,\"a,b\"\n"
        );
        assert!(write(&log, CsvOptions::new().with_crlf(true)).ends_with("\r\n"));
    }

    #[test]
    fn test_round_trip() {
        let text = "CALL,QSO_DATE,BAND\nW1AW,19870605,40M\nK1ABC,20200101,20m\n";
        let log = read(text).unwrap();
        assert_eq!(write(&log, CsvOptions::default()), text);
    }
}
