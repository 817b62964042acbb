//! Subcommand handlers: read inputs, apply one operation, write the result.

use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;
use std::process::ExitCode;

use adifmtlib::codec::{
    self, detect, AdiOptions, CabrilloOptions, CodecOptions, CsvOptions, Format, JsonOptions,
    Separator, TsvOptions,
};
use adifmtlib::transform::{
    self, Condition, EditOptions, Editor, Filter, FlattenOptions, SortKey, TimeShift,
    ValidateOptions,
};
use adifmtlib::{AdifError, Logfile};
use anyhow::{anyhow, bail, Context as _};
use clap::ArgMatches;
use tracing::{debug, info};

use crate::render;

/// Name used for standard input in messages.
pub const STDIN_NAME: &str = "(standard input)";

/// Settings shared by every subcommand, taken from the global flags
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub codec: CodecOptions,
    pub input: Option<Format>,
    pub output: Option<Format>,
    pub field_order: Vec<String>,
}

fn strings(matches: &ArgMatches, id: &str) -> Vec<String> {
    matches
        .get_many::<String>(id)
        .map(|v| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
        .unwrap_or_default()
}

fn string<'a>(matches: &'a ArgMatches, id: &str) -> Option<&'a str> {
    matches.get_one::<String>(id).map(String::as_str)
}

fn parse_flag<T: std::str::FromStr<Err = String>>(matches: &ArgMatches, id: &str) -> anyhow::Result<Option<T>> {
    string(matches, id)
        .map(|s| s.parse::<T>().map_err(|e| anyhow!("--{id}: {e}")))
        .transpose()
}

fn parse_byte(id: &str, text: &str) -> anyhow::Result<u8> {
    match text {
        "tab" | "\\t" => Ok(b'\t'),
        t if t.len() == 1 => Ok(t.as_bytes()[0]),
        _ => bail!("--{id} must be a single ASCII character, got {text:?}"),
    }
}

fn parse_power(matches: &ArgMatches, id: &str, default: f64) -> anyhow::Result<f64> {
    match string(matches, id) {
        Some(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| anyhow!("--{id} must be a number of watts, got {s:?}")),
        None => Ok(default),
    }
}

impl Settings {
    pub fn from_matches(matches: &ArgMatches) -> anyhow::Result<Self> {
        let mut adi = AdiOptions::new()
            .with_lower_case(matches.get_flag("adi-lower-case"))
            .with_allow_unknown_tag(matches.get_flag("adi-allow-unknown-tag"))
            .with_ascii_only(matches.get_flag("adi-ascii-only"));
        if let Some(sep) = parse_flag::<Separator>(matches, "adi-field-separator")? {
            adi = adi.with_field_separator(sep);
        }
        if let Some(sep) = parse_flag::<Separator>(matches, "adi-record-separator")? {
            adi = adi.with_record_separator(sep);
        }

        let mut csv = CsvOptions::new()
            .with_lazy_quotes(matches.get_flag("csv-lazy-quotes"))
            .with_trim_leading_space(matches.get_flag("csv-trim-space"))
            .with_require_full_record(matches.get_flag("csv-require-full-record"))
            .with_crlf(matches.get_flag("csv-crlf"));
        if let Some(d) = string(matches, "csv-delimiter") {
            csv = csv.with_delimiter(parse_byte("csv-delimiter", d)?);
        }
        if let Some(c) = string(matches, "csv-comment") {
            csv = csv.with_comment(Some(parse_byte("csv-comment", c)?));
        }

        let tsv = TsvOptions::new()
            .with_crlf(matches.get_flag("tsv-crlf"))
            .with_escape_special(matches.get_flag("tsv-escape-special"))
            .with_ignore_empty_headers(matches.get_flag("tsv-ignore-empty-headers"));

        let json = JsonOptions::new()
            .with_typed_output(matches.get_flag("json-typed-output"))
            .with_html_safe(matches.get_flag("json-html-safe"));

        let defaults = CabrilloOptions::default();
        let mut cabrillo = CabrilloOptions::new()
            .with_tab_delimiter(matches.get_flag("cabrillo-tab-delimiter"))
            .with_power_limits(
                parse_power(matches, "cabrillo-qrp-max-power", defaults.qrp_max_power)?,
                parse_power(matches, "cabrillo-low-max-power", defaults.low_max_power)?,
            );
        let mine = strings(matches, "cabrillo-my-exchange");
        if !mine.is_empty() {
            cabrillo = cabrillo.with_my_exchange(mine);
        }
        let theirs = strings(matches, "cabrillo-their-exchange");
        if !theirs.is_empty() {
            cabrillo = cabrillo.with_their_exchange(theirs);
        }
        let extra = strings(matches, "cabrillo-extra-field");
        if !extra.is_empty() {
            cabrillo = cabrillo.with_extra_fields(extra);
        }
        for header in strings(matches, "cabrillo-header") {
            let (key, value) = header
                .split_once('=')
                .ok_or_else(|| anyhow!("--cabrillo-header expects KEY=VALUE, got {header:?}"))?;
            cabrillo = cabrillo.with_header(key, value.trim());
        }

        Ok(Settings {
            codec: CodecOptions {
                adi,
                csv,
                tsv,
                json,
                cabrillo,
                ..CodecOptions::default()
            },
            input: parse_flag::<Format>(matches, "input")?,
            output: parse_flag::<Format>(matches, "output")?,
            field_order: strings(matches, "field-order")
                .into_iter()
                .map(|f| f.to_ascii_uppercase())
                .collect(),
        })
    }

    /// Read one input, `-` meaning standard input.
    pub fn read_input(&self, name: &str) -> adifmtlib::Result<Logfile> {
        if name == "-" {
            return self.read_stream(io::stdin().lock(), None).map_err(|e| e.with_input(STDIN_NAME));
        }
        let file = File::open(name).map_err(|e| AdifError::from(e).with_input(name))?;
        let by_name = self.input.or_else(|| detect::guess_by_name(name).ok());
        self.read_stream(file, by_name).map_err(|e| e.with_input(name))
    }

    fn read_stream<R: io::Read>(&self, input: R, format: Option<Format>) -> adifmtlib::Result<Logfile> {
        match self.input.or(format) {
            Some(format) => codec::read(format, &self.codec, &mut BufReader::new(input)),
            None => {
                let (format, mut rewound) = detect::guess_by_content(input)?;
                codec::read(format, &self.codec, &mut rewound)
            }
        }
    }

    /// Read every input named on the command line, in order.
    pub fn read_inputs(&self, names: &[String]) -> anyhow::Result<Vec<(String, Logfile)>> {
        let names: Vec<String> = if names.is_empty() {
            vec!["-".to_string()]
        } else {
            names.to_vec()
        };
        names
            .into_iter()
            .map(|name| {
                let log = self.read_input(&name)?;
                debug!(input = %name, records = log.records.len(), "read input");
                let label = if name == "-" { STDIN_NAME.to_string() } else { name };
                Ok((label, log))
            })
            .collect()
    }

    /// Stamp the header and write `log` in the output format.
    pub fn write(&self, mut log: Logfile, format: Format, out: &mut dyn Write) -> anyhow::Result<()> {
        if !self.field_order.is_empty() {
            log.field_order = self.field_order.clone();
        }
        render::stamp_header(&mut log)?;
        codec::write(format, &self.codec, &log, out)?;
        Ok(())
    }

    fn write_stdout(&self, log: Logfile) -> anyhow::Result<ExitCode> {
        let stdout = io::stdout();
        let mut out = BufWriter::new(stdout.lock());
        self.write(log, self.output.unwrap_or(Format::Adi), &mut out)?;
        out.flush()?;
        Ok(ExitCode::SUCCESS)
    }
}

/// Dispatch a subcommand.
pub fn run(name: &str, matches: &ArgMatches) -> anyhow::Result<ExitCode> {
    let settings = Settings::from_matches(matches)?;
    let files = strings(matches, "files");
    match name {
        "save" => return save(&settings, matches, &files),
        "validate" => return validate(&settings, matches, &files),
        _ => {}
    }
    let inputs = settings.read_inputs(&files)?;
    let mut log = transform::concat(inputs.into_iter().map(|(_, log)| log))?;
    match name {
        "cat" => {}
        "edit" => edit(&mut log, matches)?,
        "find" => find(matches)?.apply(&mut log),
        "fix" => {
            let changed = transform::fix(&mut log)?;
            info!(changed, "fixed fields");
        }
        "select" => transform::select(&mut log, &strings(matches, "fields"))?,
        "sort" => {
            let keys = strings(matches, "fields")
                .iter()
                .map(|k| k.parse::<SortKey>())
                .collect::<adifmtlib::Result<Vec<_>>>()?;
            transform::sort(&mut log, &keys)?;
        }
        "count" => {
            let count_field = string(matches, "count-field-name").unwrap_or("COUNT");
            log = transform::count(&log, &strings(matches, "fields"), count_field)?;
        }
        "flatten" => {
            let mut options = FlattenOptions::new();
            for field in strings(matches, "fields") {
                options = options.with_field(field);
            }
            for spec in strings(matches, "delimiter") {
                options = options.with_delimiter_spec(&spec)?;
            }
            transform::flatten(&mut log, &options)?;
        }
        "infer" => {
            let filled = transform::infer(&mut log, &strings(matches, "fields"))?;
            info!(filled, "inferred fields");
        }
        other => bail!("unknown command {other}"),
    }
    settings.write_stdout(log)
}

fn edit(log: &mut Logfile, matches: &ArgMatches) -> anyhow::Result<()> {
    let mut options = EditOptions::new().with_remove_blank(matches.get_flag("remove-blank"));
    for a in strings(matches, "add") {
        options = options.with_add(a.parse()?);
    }
    for a in strings(matches, "set") {
        options = options.with_set(a.parse()?);
    }
    for name in strings(matches, "remove") {
        options = options.with_remove(name);
    }
    let from = string(matches, "time-zone-from");
    let to = string(matches, "time-zone-to");
    if from.is_some() || to.is_some() {
        let shift = TimeShift::new(from.unwrap_or("UTC"), to.unwrap_or("UTC"))?;
        if shift.from != shift.to {
            options = options.with_time_shift(shift);
        }
    }
    Editor::new(options)?.edit(log)?;
    Ok(())
}

/// Conditions from all four flags, in command-line order.
fn find(matches: &ArgMatches) -> anyhow::Result<Filter> {
    let mut terms: Vec<(usize, &str, &str)> = Vec::new();
    for id in ["if", "if-not", "or-if", "or-if-not"] {
        if let (Some(indices), Some(values)) = (matches.indices_of(id), matches.get_many::<String>(id)) {
            terms.extend(indices.zip(values).map(|(i, v)| (i, id, v.as_str())));
        }
    }
    terms.sort_by_key(|(i, _, _)| *i);
    let mut filter = Filter::new();
    for (_, id, text) in terms {
        let mut condition: Condition = text.parse().with_context(|| format!("--{id} {text}"))?;
        if id.ends_with("not") {
            condition = condition.negate();
        }
        filter = if id.starts_with("or") {
            filter.or(condition)
        } else {
            filter.and(condition)
        };
    }
    Ok(filter)
}

fn validate(settings: &Settings, matches: &ArgMatches, files: &[String]) -> anyhow::Result<ExitCode> {
    let options = ValidateOptions::new()
        .with_required_fields(strings(matches, "required-fields"))
        .with_attach_warnings(matches.get_flag("attach-warnings"));
    let mut logs = Vec::new();
    let mut failed = false;
    for (name, mut log) in settings.read_inputs(files)? {
        let report = transform::validate(&mut log, &options);
        for w in &report.warnings {
            render::warning(&name, w);
        }
        for e in &report.errors {
            render::error(&format!("{name}: {e}"));
        }
        failed |= !report.is_ok();
        logs.push(log);
    }
    if failed {
        return Ok(ExitCode::FAILURE);
    }
    settings.write_stdout(transform::concat(logs)?)
}

fn save(settings: &Settings, matches: &ArgMatches, files: &[String]) -> anyhow::Result<ExitCode> {
    let Some((target, inputs)) = files.split_last() else {
        bail!("save needs an output file");
    };
    let format = match settings.output {
        Some(f) => f,
        None => detect::guess_by_name(target)?,
    };
    let log = transform::concat(settings.read_inputs(inputs)?.into_iter().map(|(_, log)| log))?;
    if log.records.is_empty() && !matches.get_flag("write-if-empty") {
        render::warning(target, "no records, not writing (use --write-if-empty)");
        return Ok(ExitCode::SUCCESS);
    }
    let overwrite = matches.get_flag("overwrite-existing");
    let path = Path::new(target);
    let file = if overwrite {
        File::create(path)
    } else {
        OpenOptions::new().write(true).create_new(true).open(path)
    };
    let file = file.map_err(|e| match e.kind() {
        io::ErrorKind::AlreadyExists => {
            anyhow!("{target} already exists (use --overwrite-existing to replace it)")
        }
        _ => anyhow!(e).context(format!("cannot create {target}")),
    })?;
    let records = log.records.len();
    let mut out = BufWriter::new(file);
    settings.write(log, format, &mut out)?;
    out.flush()?;
    info!(%target, %format, records, "saved");
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build_command;

    fn sub(args: &[&str]) -> ArgMatches {
        let m = build_command().try_get_matches_from(args).unwrap();
        m.subcommand().unwrap().1.clone()
    }

    #[test]
    fn test_settings_from_flags() {
        let m = sub(&[
            "adifmt",
            "cat",
            "--output",
            "tsv",
            "--csv-delimiter",
            "tab",
            "--adi-record-separator",
            "2newline",
            "--cabrillo-header",
            "contest=CQ-WW-CW",
            "--field-order",
            "call,band",
        ]);
        let s = Settings::from_matches(&m).unwrap();
        assert_eq!(s.output, Some(Format::Tsv));
        assert_eq!(s.input, None);
        assert_eq!(s.codec.csv.delimiter, b'\t');
        assert_eq!(s.codec.adi.record_separator, Separator::TwoNewlines);
        assert_eq!(s.codec.cabrillo.headers, vec![("CONTEST".to_string(), "CQ-WW-CW".to_string())]);
        assert_eq!(s.field_order, vec!["CALL", "BAND"]);
    }

    #[test]
    fn test_bad_flags() {
        assert!(Settings::from_matches(&sub(&["adifmt", "cat", "--output", "xls"])).is_err());
        assert!(Settings::from_matches(&sub(&["adifmt", "cat", "--csv-delimiter", "ab"])).is_err());
        assert!(Settings::from_matches(&sub(&["adifmt", "cat", "--cabrillo-header", "NOPE"])).is_err());
    }

    #[test]
    fn test_find_keeps_flag_order() {
        let m = sub(&["adifmt", "find", "--if", "BAND=20m", "--or-if-not", "MODE=CW", "--if", "CALL=K*"]);
        let filter = find(&m).unwrap();
        let rec = |fields: &[(&str, &str)]| {
            adifmtlib::Record::from_fields(fields.iter().map(|(n, v)| adifmtlib::Field::new(n, *v))).unwrap()
        };
        assert!(filter.matches(&rec(&[("BAND", "20m"), ("MODE", "CW")])));
        assert!(filter.matches(&rec(&[("MODE", "SSB"), ("CALL", "K1ABC")])));
        assert!(!filter.matches(&rec(&[("MODE", "SSB"), ("CALL", "W1AW")])));
        assert!(!filter.matches(&rec(&[("BAND", "40m"), ("MODE", "CW")])));
    }
}
