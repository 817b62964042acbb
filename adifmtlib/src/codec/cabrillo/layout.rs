//! Declarative QSO line layout: one rule per column.

use std::ops::Range;

use crate::error::AdifError;
use crate::model::{Field, Record};
use crate::spec;
use crate::Result;

/// A Cabrillo band designator and the frequencies it covers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CabrilloBand {
    /// Name used in QSO lines, e.g. `14000` or `1.2G`
    pub name: &'static str,
    /// ADIF band name
    pub band: &'static str,
    pub lower_mhz: f64,
    pub upper_mhz: f64,
}

const fn cb(name: &'static str, band: &'static str, lower_mhz: f64, upper_mhz: f64) -> CabrilloBand {
    CabrilloBand {
        name,
        band,
        lower_mhz,
        upper_mhz,
    }
}

/// Sorted by frequency.
pub const CABRILLO_BANDS: [CabrilloBand; 24] = [
    cb("1800", "160m", 1.8, 2.0),
    cb("3500", "80m", 3.5, 4.0),
    cb("7000", "40m", 7.0, 7.3),
    cb("14000", "20m", 14.0, 14.35),
    cb("21000", "15m", 21.0, 21.45),
    cb("28000", "10m", 28.0, 29.7),
    cb("50", "6m", 50.0, 54.0),
    cb("70", "4m", 70.0, 71.0),
    cb("144", "2m", 144.0, 148.0),
    cb("222", "1.25m", 222.0, 225.0),
    cb("432", "70cm", 420.0, 450.0),
    cb("902", "33cm", 902.0, 928.0),
    cb("1.2G", "23cm", 1240.0, 1300.0),
    cb("2.3G", "13cm", 2300.0, 2450.0),
    cb("3.4G", "9cm", 3300.0, 3500.0),
    cb("5.7G", "6cm", 5650.0, 5925.0),
    cb("10G", "3cm", 10000.0, 10500.0),
    cb("24G", "1.25cm", 24000.0, 24250.0),
    cb("47G", "6mm", 47000.0, 47200.0),
    cb("75G", "4mm", 75500.0, 81000.0),
    cb("122G", "2.5mm", 119980.0, 123000.0),
    cb("134G", "2mm", 134000.0, 149000.0),
    cb("241G", "1mm", 241000.0, 250000.0),
    cb("LIGHT", "submm", 300000.0, 7500000.0),
];

impl CabrilloBand {
    /// Value for the `CATEGORY-BAND` header: the band in meters up to
    /// 2m, the frequency designator above.
    pub fn category(&self) -> String {
        if self.lower_mhz < 150.0 {
            self.band.to_ascii_uppercase()
        } else {
            self.name.to_string()
        }
    }
}

/// The Cabrillo band containing a frequency in MHz.
pub fn band_for_freq(mhz: f64) -> Option<&'static CabrilloBand> {
    let i = CABRILLO_BANDS.partition_point(|b| b.upper_mhz < mhz);
    CABRILLO_BANDS.get(i).filter(|b| b.lower_mhz <= mhz)
}

/// Look up a band by Cabrillo designator.
pub fn band_by_name(name: &str) -> Option<&'static CabrilloBand> {
    CABRILLO_BANDS.iter().find(|b| b.name.eq_ignore_ascii_case(name))
}

/// Look up a band by ADIF band name.
pub fn band_by_adif(band: &str) -> Option<&'static CabrilloBand> {
    CABRILLO_BANDS.iter().find(|b| b.band.eq_ignore_ascii_case(band))
}

/// Cabrillo mode code for an ADIF mode and submode.
pub fn mode_code(mode: &str, submode: &str) -> &'static str {
    let mode = mode.trim().to_ascii_uppercase();
    let parent = if mode.is_empty() {
        spec::mode_for_submode(submode).unwrap_or("")
    } else {
        mode.as_str()
    };
    match parent {
        "CW" => "CW",
        "SSB" | "AM" | "USB" | "LSB" | "PH" => "PH",
        "FM" => "FM",
        "RTTY" | "RY" => "RY",
        _ => "DG",
    }
}

/// ADIF mode for a Cabrillo mode code.
pub fn adif_mode(code: &str) -> Option<&'static str> {
    match code.to_ascii_uppercase().as_str() {
        "CW" => Some("CW"),
        "PH" => Some("SSB"),
        "FM" => Some("FM"),
        "RY" => Some("RTTY"),
        "DG" => Some("DIGITAL"),
        _ => None,
    }
}

/// How a column converts between ADIF fields and text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Frequency in kHz or a band designator
    Frequency,
    Mode,
    /// `yyyy-mm-dd`
    Date,
    /// `hhmm`
    Time,
    /// Value copied to or from the first suitable source field
    Plain,
}

/// One column of a QSO line.
#[derive(Debug, Clone, PartialEq)]
pub struct CabrilloField {
    /// ADIF fields to try, in order
    pub sources: Vec<String>,
    /// Written when every source is empty
    pub default: Option<String>,
    /// Column heading, informational only
    pub label: String,
    /// Empty values are written as `-`
    pub allow_empty: bool,
    pub kind: ColumnKind,
}

impl CabrilloField {
    pub fn new(kind: ColumnKind, label: &str, sources: &[&str]) -> Self {
        Self {
            sources: sources.iter().map(|s| s.to_string()).collect(),
            default: None,
            label: label.to_string(),
            allow_empty: false,
            kind,
        }
    }

    /// Parse `FIELD[/FIELD...][=DEFAULT]`.
    pub fn parse(text: &str) -> Result<Self> {
        let (names, default) = match text.split_once('=') {
            Some((n, d)) => (n, Some(d.trim().to_string())),
            None => (text, None),
        };
        let sources: Vec<String> = names
            .split('/')
            .map(|s| s.trim().to_ascii_uppercase())
            .filter(|s| !s.is_empty())
            .collect();
        let Some(first) = sources.first() else {
            return Err(AdifError::Config(format!("Cabrillo column {text:?} names no field")));
        };
        if let Some(bad) = sources.iter().find(|s| !crate::model::is_valid_name(s)) {
            return Err(AdifError::Config(format!("Cabrillo column {text:?} has invalid field {bad:?}")));
        }
        let label = if first.starts_with("RST_") {
            "rst".to_string()
        } else if first.ends_with("TRANSMITTER_ID") {
            "t".to_string()
        } else {
            "exch".to_string()
        };
        Ok(Self {
            sources,
            default,
            label,
            allow_empty: true,
            kind: ColumnKind::Plain,
        })
    }

    /// Column text for a record, `None` if empty and not allowed to be.
    pub fn encode(&self, record: &Record) -> Option<String> {
        let first = |names: &[String]| {
            names
                .iter()
                .map(|n| record.value(n).trim())
                .find(|v| !v.is_empty())
        };
        let text = match self.kind {
            ColumnKind::Frequency => {
                let freq = record.value("FREQ").trim().parse::<f64>().ok();
                match freq {
                    Some(mhz) if mhz < 30.0 => Some(format!("{}", (mhz * 1000.0).round() as i64)),
                    Some(mhz) => band_for_freq(mhz)
                        .map(|b| b.name.to_string())
                        .or_else(|| Some(format!("{}", (mhz * 1000.0).round() as i64))),
                    None => band_by_adif(record.value("BAND")).map(|b| b.name.to_string()),
                }
            }
            ColumnKind::Mode => {
                let (mode, submode) = (record.value("MODE"), record.value("SUBMODE"));
                (!mode.is_empty() || !submode.is_empty()).then(|| mode_code(mode, submode).to_string())
            }
            ColumnKind::Date => first(&self.sources).and_then(|d| {
                (d.len() == 8).then(|| format!("{}-{}-{}", &d[..4], &d[4..6], &d[6..]))
            }),
            ColumnKind::Time => first(&self.sources).and_then(|t| t.get(..4)).map(str::to_string),
            ColumnKind::Plain => first(&self.sources)
                .map(|v| v.split_whitespace().collect::<Vec<_>>().join("_")),
        };
        match text.or_else(|| self.default.clone()) {
            Some(t) if !t.is_empty() => Some(t),
            _ if self.allow_empty => Some("-".to_string()),
            _ => None,
        }
    }

    /// Set fields on `record` from one column of a QSO line.
    pub fn decode(&self, token: &str, record: &mut Record) -> std::result::Result<(), String> {
        if token == "-" || token.is_empty() {
            return if self.allow_empty {
                Ok(())
            } else {
                Err(format!("{} may not be empty", self.label))
            };
        }
        let set = |record: &mut Record, name: &str, value: String| {
            record.set(Field::new(name, value)).map_err(|e| e.to_string())
        };
        match self.kind {
            ColumnKind::Frequency => {
                let numeric = token.bytes().all(|b| b.is_ascii_digit() || b == b'.');
                match token.parse::<f64>() {
                    Ok(khz) if numeric && khz >= 1000.0 => {
                        let mhz = khz / 1000.0;
                        set(record, "FREQ", mhz.to_string())?;
                        if let Some(b) = spec::band_for_freq(mhz) {
                            set(record, "BAND", b.name.to_string())?;
                        }
                        Ok(())
                    }
                    _ => {
                        let b = band_by_name(token).ok_or_else(|| format!("unknown band or frequency {token:?}"))?;
                        set(record, "BAND", b.band.to_string())
                    }
                }
            }
            ColumnKind::Mode => {
                let mode = adif_mode(token).ok_or_else(|| format!("unknown mode {token:?}"))?;
                set(record, "MODE", mode.to_string())
            }
            ColumnKind::Date => {
                let digits: String = token.chars().filter(|c| *c != '-').collect();
                if token.len() != 10 || digits.len() != 8 || !digits.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(format!("date {token:?} is not yyyy-mm-dd"));
                }
                set(record, &self.sources[0], digits)
            }
            ColumnKind::Time => {
                if token.len() != 4 || !token.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(format!("time {token:?} is not hhmm"));
                }
                set(record, &self.sources[0], token.to_string())
            }
            ColumnKind::Plain => {
                let target = self
                    .sources
                    .iter()
                    .find(|name| accepts(name, token, record))
                    .unwrap_or(&self.sources[0]);
                set(record, target, token.to_string())
            }
        }
    }
}

/// True if `value` would be acceptable in the named field.
fn accepts(name: &str, value: &str, record: &Record) -> bool {
    match spec::field(name) {
        Some(f) => {
            let ctx = spec::ValidationContext::new().with_record(record);
            !spec::validate_spec_field(f, value, &ctx).is_error()
        }
        None => true,
    }
}

/// Ordered column rules for QSO lines.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub columns: Vec<CabrilloField>,
    /// Columns under the `info sent` ruler: station call and my exchange
    pub sent: Range<usize>,
    /// Columns under the `info rcvd` ruler: their call and exchange
    pub received: Range<usize>,
}

impl Layout {
    /// Core columns around the configured exchanges.
    pub fn new(my_exchange: &[String], their_exchange: &[String], extra: &[String]) -> Result<Self> {
        let mut columns = vec![
            CabrilloField::new(ColumnKind::Frequency, "freq", &["FREQ", "BAND"]),
            CabrilloField::new(ColumnKind::Mode, "mo", &["MODE"]),
            CabrilloField::new(ColumnKind::Date, "date", &["QSO_DATE"]),
            CabrilloField::new(ColumnKind::Time, "time", &["TIME_ON"]),
            CabrilloField::new(ColumnKind::Plain, "call", &["STATION_CALLSIGN", "OPERATOR"]),
        ];
        for c in my_exchange {
            columns.push(CabrilloField::parse(c)?);
        }
        let sent = 4..columns.len();
        columns.push(CabrilloField::new(ColumnKind::Plain, "call", &["CALL"]));
        for c in their_exchange {
            columns.push(CabrilloField::parse(c)?);
        }
        let received = sent.end..columns.len();
        for c in extra {
            columns.push(CabrilloField::parse(c)?);
        }
        Ok(Layout {
            columns,
            sent,
            received,
        })
    }
}
