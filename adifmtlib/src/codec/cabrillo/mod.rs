//! Cabrillo: the line-oriented contest log submission format.
//!
//! A log opens with `START-OF-LOG: 3.0`, carries `KEY: value` header
//! lines, one `QSO:` line per contact and closes with `END-OF-LOG:`.
//! Header lines are kept as `APP_CABRILLO_<KEY>` header fields so a
//! round trip preserves them.

mod layout;

use std::collections::BTreeSet;
use std::io::{BufRead, Write};
use std::ops::Range;

use tracing::debug;

pub use layout::{
    adif_mode, band_by_adif, band_by_name, band_for_freq, mode_code, CabrilloBand, CabrilloField,
    ColumnKind, Layout, CABRILLO_BANDS,
};

use super::{CabrilloOptions, LogReader, LogWriter};
use crate::error::{AdifError, Position};
use crate::model::{Field, Logfile, Record};
use crate::Result;

const FORMAT: &str = "Cabrillo";

/// Prefix of header fields holding Cabrillo header lines.
pub const HEADER_PREFIX: &str = "APP_CABRILLO_";

/// Record field set on contacts read from `X-QSO:` lines.
pub const XQSO_FIELD: &str = "APP_CABRILLO_XQSO";

/// Header keys in the order they are written.
const HEADER_ORDER: &[&str] = &[
    "CALLSIGN",
    "CONTEST",
    "CATEGORY-OPERATOR",
    "CATEGORY-ASSISTED",
    "CATEGORY-BAND",
    "CATEGORY-MODE",
    "CATEGORY-POWER",
    "CATEGORY-STATION",
    "CATEGORY-TIME",
    "CATEGORY-TRANSMITTER",
    "CATEGORY-OVERLAY",
    "CERTIFICATE",
    "CLAIMED-SCORE",
    "CLUB",
    "LOCATION",
    "GRID-LOCATOR",
    "CREATED-BY",
    "EMAIL",
    "NAME",
    "ADDRESS",
    "ADDRESS-CITY",
    "ADDRESS-STATE-PROVINCE",
    "ADDRESS-POSTALCODE",
    "ADDRESS-COUNTRY",
    "OPERATORS",
    "OFFTIME",
    "SOAPBOX",
];

/// Comment lines labelling the QSO columns; skipped on read.
const RULER_KEY: &str = "X-Q";

/// Narrowest `--info sent--` or `--info rcvd--` block.
const RULER_MIN_WIDTH: usize = 13;

/// Keys whose repeated lines accumulate instead of replacing.
const MULTILINE_KEYS: &[&str] = &["ADDRESS", "SOAPBOX"];

/// Cabrillo reader and writer.
#[derive(Debug, Clone, Default)]
pub struct CabrilloCodec {
    options: CabrilloOptions,
}

impl CabrilloCodec {
    pub fn new(options: CabrilloOptions) -> Self {
        Self { options }
    }

    fn layout(&self) -> Result<Layout> {
        Layout::new(
            &self.options.my_exchange,
            &self.options.their_exchange,
            &self.options.extra_fields,
        )
    }
}

/// `CATEGORY-OPERATOR` becomes `APP_CABRILLO_CATEGORY_OPERATOR`.
pub fn header_field_name(key: &str) -> String {
    format!("{HEADER_PREFIX}{}", key.trim().to_ascii_uppercase().replace('-', "_"))
}

fn header_key(field_name: &str) -> Option<String> {
    let key = field_name.strip_prefix(HEADER_PREFIX)?;
    if field_name == XQSO_FIELD || key.ends_with("TRANSMITTER_ID") {
        return None;
    }
    Some(key.replace('_', "-"))
}

impl LogReader for CabrilloCodec {
    fn read(&self, input: &mut dyn BufRead) -> Result<Logfile> {
        let layout = self.layout()?;
        let mut log = Logfile::new();
        let mut started = false;
        let mut raw = Vec::new();
        let mut line_no = 0;
        loop {
            raw.clear();
            if input.read_until(b'\n', &mut raw)? == 0 {
                break;
            }
            line_no += 1;
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let position = Position::line(line_no);
            let Some((key, value)) = line.split_once(':') else {
                return Err(AdifError::syntax(FORMAT, position, format!("expected KEY: value, found {line:?}")));
            };
            let key = key.trim().to_ascii_uppercase();
            let value = value.trim();
            if !started {
                if key != "START-OF-LOG" {
                    return Err(AdifError::syntax(FORMAT, position, "log must begin with START-OF-LOG"));
                }
                if value != "3.0" {
                    return Err(AdifError::syntax(
                        FORMAT,
                        position,
                        format!("unsupported Cabrillo version {value:?}"),
                    ));
                }
                started = true;
                continue;
            }
            match key.as_str() {
                "END-OF-LOG" => break,
                "START-OF-LOG" => {
                    return Err(AdifError::syntax(FORMAT, position, "duplicate START-OF-LOG"));
                }
                "QSO" | "X-QSO" => {
                    let mut record = decode_qso(&layout, value)
                        .map_err(|msg| AdifError::syntax(FORMAT, position.clone(), msg))?;
                    if key == "X-QSO" {
                        record.set(Field::new(XQSO_FIELD, "Y"))?;
                    }
                    log.records.push(record);
                }
                RULER_KEY => {}
                _ => add_header_line(&mut log.header, &key, value)?,
            }
        }
        if !started {
            return Err(AdifError::schema(FORMAT, "missing START-OF-LOG"));
        }
        project_header(&mut log)?;
        debug!(records = log.records.len(), "read Cabrillo log");
        Ok(log)
    }
}

fn decode_qso(layout: &Layout, text: &str) -> std::result::Result<Record, String> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.len() > layout.columns.len() {
        return Err(format!(
            "QSO line has {} values but the layout has {} columns",
            tokens.len(),
            layout.columns.len()
        ));
    }
    let mut record = Record::new();
    for (i, column) in layout.columns.iter().enumerate() {
        let token = tokens.get(i).copied().unwrap_or("");
        column
            .decode(token, &mut record)
            .map_err(|msg| format!("column {} ({}): {msg}", i + 1, column.label))?;
    }
    Ok(record)
}

fn add_header_line(header: &mut Record, key: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Ok(());
    }
    let name = header_field_name(key);
    let existing = header.value(&name);
    let value = if existing.is_empty() {
        value.to_string()
    } else if MULTILINE_KEYS.contains(&key) {
        format!("{existing}\n{value}")
    } else if key == "OPERATORS" {
        format!("{existing} {value}")
    } else {
        value.to_string()
    };
    header.set(Field::new(name, value))
}

/// Fill record fields implied by header lines.
fn project_header(log: &mut Logfile) -> Result<()> {
    let operators: Vec<String> = log
        .header
        .value(&header_field_name("OPERATORS"))
        .split_whitespace()
        .map(|op| op.trim_start_matches('@').to_string())
        .collect();
    let mut projections = Vec::new();
    if let [op] = operators.as_slice() {
        projections.push(("OPERATOR", op.clone()));
    }
    for (key, field) in [("CONTEST", "CONTEST_ID"), ("GRID-LOCATOR", "MY_GRIDSQUARE")] {
        let value = log.header.value(&header_field_name(key));
        if !value.is_empty() {
            projections.push((field, value.to_string()));
        }
    }
    for record in &mut log.records {
        for (field, value) in &projections {
            if record.is_blank(field) {
                record.set(Field::new(*field, value.clone()))?;
            }
        }
    }
    Ok(())
}

/// Distinct non-empty values of a field, in first-seen order.
fn distinct<'a>(records: &'a [Record], field: &str) -> Vec<&'a str> {
    let mut seen = Vec::new();
    for r in records {
        let v = r.value(field).trim();
        if !v.is_empty() && !seen.contains(&v) {
            seen.push(v);
        }
    }
    seen
}

fn only<'a>(values: &[&'a str]) -> Option<&'a str> {
    match values {
        [one] => Some(*one),
        _ => None,
    }
}

impl CabrilloCodec {
    /// Header values derived from the contacts.
    fn inferred_headers(&self, log: &Logfile) -> Vec<(String, String)> {
        let records = &log.records;
        let mut out = Vec::new();
        let mut push = |key: &str, value: String| out.push((key.to_string(), value));

        let stations = distinct(records, "STATION_CALLSIGN");
        let operators = distinct(records, "OPERATOR");
        if let Some(call) = only(&stations).or_else(|| only(&operators)) {
            push("CALLSIGN", call.to_string());
        }
        if let Some(contest) = only(&distinct(records, "CONTEST_ID")) {
            push("CONTEST", contest.to_string());
        }
        if !operators.is_empty() {
            let category = if operators.len() > 1 { "MULTI-OP" } else { "SINGLE-OP" };
            push("CATEGORY-OPERATOR", category.to_string());
        }

        let bands: BTreeSet<String> = records
            .iter()
            .filter_map(|r| {
                let freq = r.value("FREQ").trim().parse::<f64>().ok();
                freq.and_then(band_for_freq)
                    .or_else(|| band_by_adif(r.value("BAND")))
                    .map(|b| b.category())
            })
            .collect();
        match bands.len() {
            0 => {}
            1 => push("CATEGORY-BAND", bands.into_iter().next().unwrap_or_default()),
            _ => push("CATEGORY-BAND", "ALL".to_string()),
        }

        let modes: BTreeSet<&str> = records
            .iter()
            .filter(|r| !r.is_blank("MODE") || !r.is_blank("SUBMODE"))
            .map(|r| mode_code(r.value("MODE"), r.value("SUBMODE")))
            .collect();
        let category_mode = match modes.len() {
            0 => None,
            1 => modes.iter().next().map(|m| match *m {
                "PH" => "SSB",
                "RY" => "RTTY",
                "DG" => "DIGI",
                other => other,
            }),
            _ => Some("MIXED"),
        };
        if let Some(mode) = category_mode {
            push("CATEGORY-MODE", mode.to_string());
        }

        let max_power = records
            .iter()
            .filter_map(|r| r.value("TX_PWR").trim().parse::<f64>().ok())
            .fold(None, |max: Option<f64>, p| Some(max.map_or(p, |m| m.max(p))));
        if let Some(power) = max_power {
            let category = if power <= self.options.qrp_max_power {
                "QRP"
            } else if power <= self.options.low_max_power {
                "LOW"
            } else {
                "HIGH"
            };
            push("CATEGORY-POWER", category.to_string());
        }

        if let Some(grid) = only(&distinct(records, "MY_GRIDSQUARE")) {
            push("GRID-LOCATOR", grid.to_string());
        }
        if !operators.is_empty() {
            push("OPERATORS", operators.join(" "));
        }
        let program = log.header.value("PROGRAMID");
        if !program.is_empty() {
            let version = log.header.value("PROGRAMVERSION");
            let created = if version.is_empty() {
                program.to_string()
            } else {
                format!("{program} {version}")
            };
            push("CREATED-BY", created);
        }
        out
    }

    /// Header lines to write: options override the logfile, which
    /// overrides inferred values.
    fn headers(&self, log: &Logfile) -> Vec<(String, String)> {
        let mut merged: Vec<(String, String)> = Vec::new();
        let mut put = |key: String, value: String| {
            match merged.iter_mut().find(|(k, _)| *k == key) {
                Some(slot) => slot.1 = value,
                None => merged.push((key, value)),
            }
        };
        for (k, v) in self.inferred_headers(log) {
            put(k, v);
        }
        for field in log.header.fields() {
            if let Some(key) = header_key(&field.name) {
                if !field.value.is_empty() {
                    put(key, field.value.clone());
                }
            }
        }
        for (k, v) in &self.options.headers {
            put(k.to_ascii_uppercase(), v.clone());
        }
        let rank = |key: &str| {
            HEADER_ORDER
                .iter()
                .position(|k| *k == key)
                .unwrap_or(HEADER_ORDER.len())
        };
        merged.sort_by_key(|(k, _)| rank(k));
        merged
    }
}

/// Widest cell or label of each column. The sent and received blocks are
/// widened to the same width, at least wide enough for their ruler.
fn column_widths<'a>(layout: &Layout, rows: impl Iterator<Item = &'a [String]>) -> Vec<usize> {
    let mut widths: Vec<usize> = layout.columns.iter().map(|c| c.label.len()).collect();
    for cells in rows {
        for (w, cell) in widths.iter_mut().zip(cells) {
            *w = (*w).max(cell.chars().count());
        }
    }
    let block = |widths: &[usize], r: &Range<usize>| widths[r.clone()].iter().sum::<usize>() + r.len().saturating_sub(1);
    let target = block(&widths, &layout.sent)
        .max(block(&widths, &layout.received))
        .max(RULER_MIN_WIDTH);
    for range in [&layout.sent, &layout.received] {
        let short = target - block(&widths, range);
        if let Some(last) = range.clone().last() {
            widths[last] += short;
        }
    }
    widths
}

/// Dashed block markers over the exchanges, then the column labels.
fn ruler_lines(layout: &Layout, widths: &[usize]) -> [String; 2] {
    let dashes = |label: &str, width: usize| {
        let pad = width.saturating_sub(label.len());
        format!("{}{label}{}", "-".repeat(pad / 2), "-".repeat(pad - pad / 2))
    };
    let offset: usize = widths[..layout.sent.start].iter().map(|w| w + 1).sum();
    let block = |r: &Range<usize>| widths[r.clone()].iter().sum::<usize>() + r.len().saturating_sub(1);
    let ruler = format!(
        "{:offset$}{} {}",
        "",
        dashes("info sent", block(&layout.sent)),
        dashes("info rcvd", block(&layout.received)),
    );
    let labels = layout
        .columns
        .iter()
        .zip(widths)
        .map(|(c, &w)| format!("{:<w$}", c.label))
        .collect::<Vec<_>>()
        .join(" ");
    [ruler, labels]
}

impl LogWriter for CabrilloCodec {
    fn write(&self, log: &Logfile, out: &mut dyn Write) -> Result<()> {
        let layout = self.layout()?;
        let mut rows = Vec::with_capacity(log.records.len());
        for (i, record) in log.records.iter().enumerate() {
            let mut cells = Vec::with_capacity(layout.columns.len());
            for column in &layout.columns {
                let cell = column.encode(record).ok_or_else(|| {
                    AdifError::encode(
                        FORMAT,
                        Position::record(i + 1),
                        format!("missing value for {} column ({})", column.label, column.sources.join("/")),
                    )
                })?;
                cells.push(cell);
            }
            let tag = if record.value(XQSO_FIELD).eq_ignore_ascii_case("Y") {
                "X-QSO"
            } else {
                "QSO"
            };
            rows.push((tag, cells));
        }

        writeln!(out, "START-OF-LOG: 3.0")?;
        for (key, value) in self.headers(log) {
            for line in value.lines().map(str::trim).filter(|l| !l.is_empty()) {
                writeln!(out, "{key}: {line}")?;
            }
        }

        let widths = if self.options.tab_delimiter || rows.is_empty() {
            Vec::new()
        } else {
            let widths = column_widths(&layout, rows.iter().map(|(_, cells)| cells.as_slice()));
            for line in ruler_lines(&layout, &widths) {
                writeln!(out, "{RULER_KEY}: {}", line.trim_end())?;
            }
            widths
        };
        for (tag, cells) in &rows {
            let line = if self.options.tab_delimiter {
                cells.join("\t")
            } else {
                cells
                    .iter()
                    .zip(&widths)
                    .map(|(cell, &w)| format!("{cell:<w$}"))
                    .collect::<Vec<_>>()
                    .join(" ")
            };
            writeln!(out, "{tag}: {}", line.trim_end())?;
        }
        writeln!(out, "END-OF-LOG:")?;
        out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{read_bytes, write_string, CodecOptions, Format};

    const LOG: &str = "START-OF-LOG: 3.0\n\
CONTEST: ARRL-SS-SSB\n\
OPERATORS: W1AW\n\
SOAPBOX: first line\n\
SOAPBOX: second line\n\
QSO: 14234 PH 2023-10-31 1234 W1AW 57 CT AA1A 48 PAC 0\n\
X-QSO: 146520 FM 2023-10-31 1300 W1AW 59 CT K1ABC 59 - 0\n\
END-OF-LOG:\n";

    fn read(text: &str) -> Result<Logfile> {
        read_bytes(Format::Cabrillo, &CodecOptions::default(), text.as_bytes())
    }

    #[test]
    fn test_read_qso_line() {
        let log = read(LOG).unwrap();
        assert_eq!(log.records.len(), 2);
        let r = &log.records[0];
        for (name, value) in [
            ("FREQ", "14.234"),
            ("BAND", "20m"),
            ("MODE", "SSB"),
            ("QSO_DATE", "20231031"),
            ("TIME_ON", "1234"),
            ("STATION_CALLSIGN", "W1AW"),
            ("RST_SENT", "57"),
            ("MY_ARRL_SECT", "CT"),
            ("CALL", "AA1A"),
            ("RST_RCVD", "48"),
            ("ARRL_SECT", "PAC"),
            ("APP_CABRILLO_TRANSMITTER_ID", "0"),
            ("CONTEST_ID", "ARRL-SS-SSB"),
            ("OPERATOR", "W1AW"),
        ] {
            assert_eq!(r.value(name), value, "{name}");
        }
        let x = &log.records[1];
        assert_eq!(x.value("BAND"), "2m");
        assert_eq!(x.value(XQSO_FIELD), "Y");
        assert!(x.is_blank("ARRL_SECT"));
        assert_eq!(
            log.header.value("APP_CABRILLO_SOAPBOX"),
            "first line\nsecond line"
        );
    }

    #[test]
    fn test_read_errors() {
        assert!(read("CONTEST: X\n").is_err());
        assert!(read("START-OF-LOG: 2.0\n").is_err());
        assert!(read("").is_err());
        assert!(read("START-OF-LOG: 3.0\nQSO: 14000 ZZ 2023-01-01 0000 W1AW 59 CT K1A 59 CT 0\n").is_err());
        assert!(read("START-OF-LOG: 3.0\nbogus line\n").is_err());
    }

    #[test]
    fn test_write_round_trip() {
        let log = read(LOG).unwrap();
        let text = write_string(Format::Cabrillo, &CodecOptions::default(), &log).unwrap();
        assert!(text.starts_with("START-OF-LOG: 3.0\n"));
        assert!(text.contains("CONTEST: ARRL-SS-SSB\n"));
        assert!(text.contains("CATEGORY-MODE: MIXED\n"));
        assert!(text.contains("CATEGORY-BAND: ALL\n"));
        assert!(text.contains("SOAPBOX: first line\nSOAPBOX: second line\n"));
        assert!(text.ends_with("END-OF-LOG:\n"));
        let qso = text.lines().find(|l| l.starts_with("QSO:")).unwrap();
        let tokens: Vec<&str> = qso.split_whitespace().collect();
        assert_eq!(
            tokens,
            vec!["QSO:", "14234", "PH", "2023-10-31", "1234", "W1AW", "57", "CT", "AA1A", "48", "PAC", "0"]
        );
        assert!(text.contains("X-QSO: 144 "));
        let again = read(&text).unwrap();
        assert!(again.records[0].equal(&log.records[0]));
    }

    #[test]
    fn test_single_band_category() {
        let mut log = Logfile::new();
        log.records.push(
            Record::from_fields([
                Field::new("FREQ", "14.025"),
                Field::new("MODE", "CW"),
                Field::new("QSO_DATE", "20231031"),
                Field::new("TIME_ON", "1234"),
                Field::new("STATION_CALLSIGN", "W1AW"),
                Field::new("CALL", "K1ABC"),
            ])
            .unwrap(),
        );
        let text = write_string(Format::Cabrillo, &CodecOptions::default(), &log).unwrap();
        assert!(text.contains("CATEGORY-BAND: 20M\n"), "{text}");
        assert!(text.contains("CATEGORY-MODE: CW\n"));
    }

    #[test]
    fn test_columns_align_under_ruler() {
        let log = read(LOG).unwrap();
        let text = write_string(Format::Cabrillo, &CodecOptions::default(), &log).unwrap();
        let ruler = text.lines().find(|l| l.contains("info sent")).unwrap();
        assert!(ruler.starts_with("X-Q: "));
        let sent = ruler.find('-').unwrap();
        let rcvd = ruler[..ruler.find("info rcvd").unwrap()].trim_end_matches('-').len();
        assert_eq!(&ruler[rcvd - 1..rcvd], " ");

        let qso = text.lines().find(|l| l.starts_with("QSO:")).unwrap();
        assert_eq!(qso.find("W1AW"), Some(sent));
        assert_eq!(qso.find("AA1A"), Some(rcvd));

        let labels = text.lines().find(|l| l.starts_with("X-Q: freq")).unwrap();
        assert_eq!(labels.find("call"), Some(sent));
        assert_eq!(labels.rfind("call"), Some(rcvd));

        let again = read(&text).unwrap();
        assert!(again.header.get("APP_CABRILLO_X_Q").is_none());
        assert_eq!(again.records.len(), 2);
    }

    #[test]
    fn test_write_requires_core_columns() {
        let mut log = Logfile::new();
        log.records.push(Record::from_fields([Field::new("CALL", "K1ABC")]).unwrap());
        let err = write_string(Format::Cabrillo, &CodecOptions::default(), &log).unwrap_err();
        assert!(err.to_string().contains("freq"));
    }

    #[test]
    fn test_header_option_overrides() {
        let mut options = CodecOptions::default();
        options.cabrillo = CabrilloOptions::default()
            .with_header("category-power", "LOW")
            .with_tab_delimiter(true);
        let mut log = read(LOG).unwrap();
        log.records[0].set(Field::new("TX_PWR", "1500")).unwrap();
        let text = write_string(Format::Cabrillo, &options, &log).unwrap();
        assert!(text.contains("CATEGORY-POWER: LOW\n"));
        assert!(text.contains("QSO: 14234\tPH\t"));
    }

    #[test]
    fn test_header_field_name() {
        assert_eq!(header_field_name("category-operator"), "APP_CABRILLO_CATEGORY_OPERATOR");
        assert_eq!(header_key("APP_CABRILLO_GRID_LOCATOR").as_deref(), Some("GRID-LOCATOR"));
        assert_eq!(header_key(XQSO_FIELD), None);
        assert_eq!(header_key("PROGRAMID"), None);
    }
}
