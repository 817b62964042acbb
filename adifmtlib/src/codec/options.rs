//! Options controlling how each encoding is read and written.
//!
//! Every struct has a [`Default`] matching the conventional form of its
//! encoding and `with_*` builders for the rest.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Supported logbook encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Format {
    /// Tag-delimited ADIF text
    Adi,
    /// ADIF XML
    Adx,
    /// Contest submission format
    Cabrillo,
    Csv,
    Json,
    Tsv,
}

impl Format {
    pub const ALL: [Format; 6] = [
        Format::Adi,
        Format::Adx,
        Format::Cabrillo,
        Format::Csv,
        Format::Json,
        Format::Tsv,
    ];

    /// Lowercase name, as accepted by [`Format::from_str`].
    pub fn name(&self) -> &'static str {
        match self {
            Format::Adi => "adi",
            Format::Adx => "adx",
            Format::Cabrillo => "cabrillo",
            Format::Csv => "csv",
            Format::Json => "json",
            Format::Tsv => "tsv",
        }
    }

    /// Conventional file extension.
    pub fn extension(&self) -> &'static str {
        match self {
            Format::Cabrillo => "log",
            other => other.name(),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "adi" | "adif" => Ok(Format::Adi),
            "adx" | "xml" => Ok(Format::Adx),
            "cabrillo" | "cbr" | "log" => Ok(Format::Cabrillo),
            "csv" => Ok(Format::Csv),
            "json" => Ok(Format::Json),
            "tsv" => Ok(Format::Tsv),
            _ => Err(format!("Unknown format: {}", s)),
        }
    }
}

/// Text placed between ADI fields or records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Separator {
    Empty,
    #[default]
    Space,
    Tab,
    Newline,
    TwoNewlines,
    Crlf,
    TwoCrlf,
}

impl Separator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Separator::Empty => "",
            Separator::Space => " ",
            Separator::Tab => "\t",
            Separator::Newline => "\n",
            Separator::TwoNewlines => "\n\n",
            Separator::Crlf => "\r\n",
            Separator::TwoCrlf => "\r\n\r\n",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Separator::Empty => "empty",
            Separator::Space => "space",
            Separator::Tab => "tab",
            Separator::Newline => "newline",
            Separator::TwoNewlines => "2newline",
            Separator::Crlf => "crlf",
            Separator::TwoCrlf => "2crlf",
        }
    }
}

impl FromStr for Separator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "empty" | "none" => Ok(Separator::Empty),
            "space" => Ok(Separator::Space),
            "tab" => Ok(Separator::Tab),
            "newline" | "lf" => Ok(Separator::Newline),
            "2newline" => Ok(Separator::TwoNewlines),
            "crlf" => Ok(Separator::Crlf),
            "2crlf" => Ok(Separator::TwoCrlf),
            _ => Err(format!(
                "Unknown separator: {} (expected empty, space, tab, newline, 2newline, crlf or 2crlf)",
                s
            )),
        }
    }
}

/// ADI reading and writing options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdiOptions {
    /// Written after each field
    pub field_separator: Separator,
    /// Written after each `<EOH>` and `<EOR>`
    pub record_separator: Separator,
    /// Write field names in lowercase
    pub lower_case: bool,
    /// Keep unknown bare tags as `[name]` comments instead of failing
    pub allow_unknown_tag: bool,
    /// Refuse to write non-ASCII characters in string fields
    pub ascii_only: bool,
}

impl Default for AdiOptions {
    fn default() -> Self {
        Self {
            field_separator: Separator::Space,
            record_separator: Separator::Newline,
            lower_case: false,
            allow_unknown_tag: false,
            ascii_only: false,
        }
    }
}

impl AdiOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field_separator(mut self, sep: Separator) -> Self {
        self.field_separator = sep;
        self
    }

    pub fn with_record_separator(mut self, sep: Separator) -> Self {
        self.record_separator = sep;
        self
    }

    pub fn with_lower_case(mut self, lower: bool) -> Self {
        self.lower_case = lower;
        self
    }

    pub fn with_allow_unknown_tag(mut self, allow: bool) -> Self {
        self.allow_unknown_tag = allow;
        self
    }

    pub fn with_ascii_only(mut self, ascii_only: bool) -> Self {
        self.ascii_only = ascii_only;
        self
    }
}

/// ADX writing options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdxOptions {
    /// Spaces per nesting level; zero writes the document on one line
    pub indent: usize,
}

impl Default for AdxOptions {
    fn default() -> Self {
        Self { indent: 1 }
    }
}

impl AdxOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }
}

/// CSV reading and writing options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsvOptions {
    /// Field delimiter byte
    pub delimiter: u8,
    /// Lines starting with this byte are skipped on read
    pub comment: Option<u8>,
    /// Accept quotes appearing inside unquoted fields
    pub lazy_quotes: bool,
    /// Remove leading white space from each field on read
    pub trim_leading_space: bool,
    /// Every row must have as many fields as the header
    pub require_full_record: bool,
    /// End lines with CRLF on write
    pub crlf: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            comment: None,
            lazy_quotes: false,
            trim_leading_space: false,
            require_full_record: false,
            crlf: false,
        }
    }
}

impl CsvOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_comment(mut self, comment: Option<u8>) -> Self {
        self.comment = comment;
        self
    }

    pub fn with_lazy_quotes(mut self, lazy: bool) -> Self {
        self.lazy_quotes = lazy;
        self
    }

    pub fn with_trim_leading_space(mut self, trim: bool) -> Self {
        self.trim_leading_space = trim;
        self
    }

    pub fn with_require_full_record(mut self, require: bool) -> Self {
        self.require_full_record = require;
        self
    }

    pub fn with_crlf(mut self, crlf: bool) -> Self {
        self.crlf = crlf;
        self
    }
}

/// TSV reading and writing options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TsvOptions {
    /// End lines with CRLF on write
    pub crlf: bool,
    /// Use `\t`, `\r`, `\n` and `\\` escapes for special characters
    pub escape_special: bool,
    /// Skip empty header columns instead of failing
    pub ignore_empty_headers: bool,
}

impl TsvOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_crlf(mut self, crlf: bool) -> Self {
        self.crlf = crlf;
        self
    }

    pub fn with_escape_special(mut self, escape: bool) -> Self {
        self.escape_special = escape;
        self
    }

    pub fn with_ignore_empty_headers(mut self, ignore: bool) -> Self {
        self.ignore_empty_headers = ignore;
        self
    }
}

/// JSON writing options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonOptions {
    /// Write numbers and booleans as JSON numbers and booleans
    pub typed_output: bool,
    /// Escape `<`, `>` and `&` as unicode escapes
    pub html_safe: bool,
}

impl JsonOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_typed_output(mut self, typed: bool) -> Self {
        self.typed_output = typed;
        self
    }

    pub fn with_html_safe(mut self, safe: bool) -> Self {
        self.html_safe = safe;
        self
    }
}

/// Cabrillo column layout and header options.
///
/// Exchange and extra columns are written as `FIELD[/FIELD...][=DEFAULT]`:
/// a column is read into the first listed field whose validation accepts
/// it and written from the first listed field with a value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CabrilloOptions {
    /// Columns sent, after the station callsign
    pub my_exchange: Vec<String>,
    /// Columns received, after the contacted callsign
    pub their_exchange: Vec<String>,
    /// Columns after the received exchange
    pub extra_fields: Vec<String>,
    /// Header values, overriding anything in the logfile
    pub headers: Vec<(String, String)>,
    /// Separate columns with tabs instead of aligned spaces
    pub tab_delimiter: bool,
    /// Highest power in watts categorized as QRP
    pub qrp_max_power: f64,
    /// Highest power in watts categorized as LOW
    pub low_max_power: f64,
}

impl Default for CabrilloOptions {
    fn default() -> Self {
        Self {
            my_exchange: vec![
                "RST_SENT".into(),
                "MY_ARRL_SECT/MY_STATE/STX_STRING".into(),
            ],
            their_exchange: vec!["RST_RCVD".into(), "ARRL_SECT/STATE/SRX_STRING".into()],
            extra_fields: vec!["APP_CABRILLO_TRANSMITTER_ID=0".into()],
            headers: Vec::new(),
            tab_delimiter: false,
            qrp_max_power: 5.0,
            low_max_power: 100.0,
        }
    }
}

impl CabrilloOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_my_exchange<I: IntoIterator<Item = S>, S: Into<String>>(mut self, cols: I) -> Self {
        self.my_exchange = cols.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_their_exchange<I: IntoIterator<Item = S>, S: Into<String>>(mut self, cols: I) -> Self {
        self.their_exchange = cols.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_extra_fields<I: IntoIterator<Item = S>, S: Into<String>>(mut self, cols: I) -> Self {
        self.extra_fields = cols.into_iter().map(Into::into).collect();
        self
    }

    /// Set a header value; keys are uppercased.
    pub fn with_header(mut self, key: impl AsRef<str>, value: impl Into<String>) -> Self {
        let key = key.as_ref().trim().to_uppercase();
        self.headers.retain(|(k, _)| *k != key);
        self.headers.push((key, value.into()));
        self
    }

    pub fn with_tab_delimiter(mut self, tab: bool) -> Self {
        self.tab_delimiter = tab;
        self
    }

    pub fn with_power_limits(mut self, qrp_max: f64, low_max: f64) -> Self {
        self.qrp_max_power = qrp_max;
        self.low_max_power = low_max;
        self
    }
}

/// Options for every encoding, as passed to [`crate::codec::read`] and
/// [`crate::codec::write`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CodecOptions {
    pub adi: AdiOptions,
    pub adx: AdxOptions,
    pub cabrillo: CabrilloOptions,
    pub csv: CsvOptions,
    pub json: JsonOptions,
    pub tsv: TsvOptions,
}

impl CodecOptions {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_str() {
        assert_eq!("ADI".parse::<Format>(), Ok(Format::Adi));
        assert_eq!("cbr".parse::<Format>(), Ok(Format::Cabrillo));
        assert!("xls".parse::<Format>().is_err());
        assert_eq!(Format::Cabrillo.extension(), "log");
    }

    #[test]
    fn test_separator_names() {
        for sep in [
            Separator::Empty,
            Separator::Space,
            Separator::Tab,
            Separator::Newline,
            Separator::TwoNewlines,
            Separator::Crlf,
            Separator::TwoCrlf,
        ] {
            assert_eq!(sep.name().parse::<Separator>(), Ok(sep));
        }
        assert_eq!(Separator::TwoCrlf.as_str(), "\r\n\r\n");
        assert!("comma".parse::<Separator>().is_err());
    }

    #[test]
    fn test_defaults() {
        let adi = AdiOptions::default();
        assert_eq!(adi.field_separator, Separator::Space);
        assert_eq!(adi.record_separator, Separator::Newline);
        assert_eq!(CsvOptions::default().delimiter, b',');
        let cab = CabrilloOptions::default();
        assert_eq!(cab.qrp_max_power, 5.0);
        assert_eq!(cab.my_exchange.len(), 2);
    }

    #[test]
    fn test_cabrillo_header_builder() {
        let opts = CabrilloOptions::new()
            .with_header("contest", "ARRL-SS-CW")
            .with_header("CONTEST", "ARRL-SS-SSB");
        assert_eq!(opts.headers, vec![("CONTEST".to_string(), "ARRL-SS-SSB".to_string())]);
    }
}
