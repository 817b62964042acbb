//! Fill empty fields from other fields in the same record.
//!
//! Each [`Inferrer`] produces one target field. Targets that already hold
//! a value are never changed, so inference is idempotent.

use std::fmt;

use crate::error::AdifError;
use crate::geo::{format_location, from_maidenhead, parse_location, to_maidenhead, Axis};
use crate::model::{Field, Logfile, Record};
use crate::spec::{self, ValidationContext};
use crate::Result;

/// Derives one field's value from others.
#[derive(Clone, Copy)]
pub struct Inferrer {
    pub target: &'static str,
    /// `MY_` for inferrers working on the station's own fields
    prefix: &'static str,
    compute: fn(&Record, &str) -> Option<String>,
}

impl fmt::Debug for Inferrer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inferrer").field("target", &self.target).finish_non_exhaustive()
    }
}

impl Inferrer {
    const fn new(target: &'static str, prefix: &'static str, compute: fn(&Record, &str) -> Option<String>) -> Self {
        Inferrer {
            target,
            prefix,
            compute,
        }
    }

    /// The value this inferrer would set, if the target is empty.
    pub fn infer(&self, record: &Record) -> Option<String> {
        if !record.is_blank(self.target) {
            return None;
        }
        (self.compute)(record, self.prefix).filter(|v| !v.is_empty())
    }
}

/// Every inferrer, in the order they run for [`infer_record`].
pub const INFERRERS: &[Inferrer] = &[
    Inferrer::new("BAND", "", |r, _| band_from(r, "FREQ")),
    Inferrer::new("BAND_RX", "", |r, _| band_from(r, "FREQ_RX")),
    Inferrer::new("MODE", "", |r, _| spec::mode_for_submode(r.value("SUBMODE")).map(str::to_string)),
    Inferrer::new("OPERATOR", "", |r, _| first_of(r, &["STATION_CALLSIGN"])),
    Inferrer::new("STATION_CALLSIGN", "", |r, _| first_of(r, &["OPERATOR", "OWNER_CALLSIGN"])),
    Inferrer::new("OWNER_CALLSIGN", "", |r, _| first_of(r, &["STATION_CALLSIGN", "OPERATOR"])),
    Inferrer::new("DXCC", "", dxcc_from_country),
    Inferrer::new("MY_DXCC", "MY_", dxcc_from_country),
    Inferrer::new("COUNTRY", "", country_from_dxcc),
    Inferrer::new("MY_COUNTRY", "MY_", country_from_dxcc),
    Inferrer::new("GRIDSQUARE", "", grid_from_location),
    Inferrer::new("MY_GRIDSQUARE", "MY_", grid_from_location),
    Inferrer::new("GRIDSQUARE_EXT", "", grid_ext_from_location),
    Inferrer::new("MY_GRIDSQUARE_EXT", "MY_", grid_ext_from_location),
    Inferrer::new("LAT", "", |r, p| location_from_grid(r, p, Axis::Latitude)),
    Inferrer::new("MY_LAT", "MY_", |r, p| location_from_grid(r, p, Axis::Latitude)),
    Inferrer::new("LON", "", |r, p| location_from_grid(r, p, Axis::Longitude)),
    Inferrer::new("MY_LON", "MY_", |r, p| location_from_grid(r, p, Axis::Longitude)),
    Inferrer::new("USACA_COUNTIES", "", |r, p| us_county(r, p, "CNTY")),
    Inferrer::new("MY_USACA_COUNTIES", "MY_", |r, p| us_county(r, p, "CNTY")),
    Inferrer::new("CNTY", "", |r, p| us_county(r, p, "USACA_COUNTIES")),
    Inferrer::new("MY_CNTY", "MY_", |r, p| us_county(r, p, "USACA_COUNTIES")),
    Inferrer::new("SIG", "", |r, p| program_ref(r, p).map(|(sig, _)| sig.to_string())),
    Inferrer::new("MY_SIG", "MY_", |r, p| program_ref(r, p).map(|(sig, _)| sig.to_string())),
    Inferrer::new("SIG_INFO", "", |r, p| program_ref(r, p).map(|(_, info)| info)),
    Inferrer::new("MY_SIG_INFO", "MY_", |r, p| program_ref(r, p).map(|(_, info)| info)),
    Inferrer::new("IOTA", "", |r, p| ref_from_sig(r, p, "IOTA")),
    Inferrer::new("MY_IOTA", "MY_", |r, p| ref_from_sig(r, p, "IOTA")),
    Inferrer::new("POTA_REF", "", |r, p| ref_from_sig(r, p, "POTA")),
    Inferrer::new("MY_POTA_REF", "MY_", |r, p| ref_from_sig(r, p, "POTA")),
    Inferrer::new("SOTA_REF", "", |r, p| ref_from_sig(r, p, "SOTA")),
    Inferrer::new("MY_SOTA_REF", "MY_", |r, p| ref_from_sig(r, p, "SOTA")),
    Inferrer::new("WWFF_REF", "", |r, p| ref_from_sig(r, p, "WWFF")),
    Inferrer::new("MY_WWFF_REF", "MY_", |r, p| ref_from_sig(r, p, "WWFF")),
];

/// Activity programs and their reference fields, without `MY_`.
const PROGRAMS: [(&str, &str); 4] = [
    ("IOTA", "IOTA"),
    ("POTA", "POTA_REF"),
    ("SOTA", "SOTA_REF"),
    ("WWFF", "WWFF_REF"),
];

/// DXCC entities whose counties use `USACA_COUNTIES`.
const US_ENTITIES: [u32; 3] = [6, 110, 291];

fn band_from(r: &Record, freq_field: &str) -> Option<String> {
    let mhz: f64 = r.value(freq_field).trim().parse().ok()?;
    spec::band_for_freq(mhz).map(|b| b.name.to_string())
}

fn first_of(r: &Record, names: &[&str]) -> Option<String> {
    names
        .iter()
        .map(|n| r.value(n).trim())
        .find(|v| !v.is_empty())
        .map(str::to_string)
}

fn dxcc_from_country(r: &Record, prefix: &str) -> Option<String> {
    let country = r.value(&format!("{prefix}COUNTRY")).trim();
    if country.is_empty() {
        return None;
    }
    spec::dxcc_by_name(country)
        .or_else(|| spec::dxcc_for_iso(country))
        .map(|e| e.code.to_string())
}

fn country_from_dxcc(r: &Record, prefix: &str) -> Option<String> {
    let code: u32 = r.value(&format!("{prefix}DXCC")).trim().parse().ok()?;
    spec::dxcc_by_code(code)
        .filter(|e| !e.deleted && e.code != 0)
        .map(|e| e.name.to_string())
}

fn location(r: &Record, prefix: &str) -> Option<(f64, f64)> {
    let lat = parse_location(r.value(&format!("{prefix}LAT")), Some(Axis::Latitude)).ok()?;
    let lon = parse_location(r.value(&format!("{prefix}LON")), Some(Axis::Longitude)).ok()?;
    Some((lat, lon))
}

fn grid_from_location(r: &Record, prefix: &str) -> Option<String> {
    location(r, prefix).map(|(lat, lon)| to_maidenhead(lat, lon).0)
}

/// Only extends a locator that matches the location, and never from a
/// location that is just the centre of that locator.
fn grid_ext_from_location(r: &Record, prefix: &str) -> Option<String> {
    let (grid, ext) = location(r, prefix).map(|(lat, lon)| to_maidenhead(lat, lon))?;
    let existing = r.value(&format!("{prefix}GRIDSQUARE")).trim();
    if existing.is_empty() {
        return Some(ext);
    }
    if !existing.eq_ignore_ascii_case(&grid) || is_grid_centre(r, prefix, existing) {
        return None;
    }
    Some(ext)
}

fn is_grid_centre(r: &Record, prefix: &str, grid: &str) -> bool {
    let Some((lat, lon)) = from_maidenhead(grid, "") else {
        return false;
    };
    r.value(&format!("{prefix}LAT")).trim() == format_location(lat, Axis::Latitude)
        && r.value(&format!("{prefix}LON")).trim() == format_location(lon, Axis::Longitude)
}

fn location_from_grid(r: &Record, prefix: &str, axis: Axis) -> Option<String> {
    let grid = r.value(&format!("{prefix}GRIDSQUARE")).trim();
    let ext = r.value(&format!("{prefix}GRIDSQUARE_EXT")).trim();
    let (lat, lon) = from_maidenhead(grid, ext).or_else(|| from_maidenhead(grid, ""))?;
    Some(match axis {
        Axis::Latitude => format_location(lat, axis),
        Axis::Longitude => format_location(lon, axis),
    })
}

/// Copy between `CNTY` and `USACA_COUNTIES` for US entities when the value
/// is a single `SS,county` pair.
fn us_county(r: &Record, prefix: &str, source: &str) -> Option<String> {
    let dxcc: u32 = r.value(&format!("{prefix}DXCC")).trim().parse().ok()?;
    if !US_ENTITIES.contains(&dxcc) {
        return None;
    }
    let value = r.value(&format!("{prefix}{source}")).trim();
    let (state, county) = value.split_once(',')?;
    let single = state.len() == 2
        && state.bytes().all(|b| b.is_ascii_alphabetic())
        && !county.trim().is_empty()
        && !value.contains(':');
    single.then(|| value.to_string())
}

/// The one program reference present, as `(SIG, SIG_INFO)`.
fn program_ref(r: &Record, prefix: &str) -> Option<(&'static str, String)> {
    let present: Vec<(&'static str, &str)> = PROGRAMS
        .iter()
        .map(|(sig, field)| (*sig, r.value(&format!("{prefix}{field}")).trim()))
        .filter(|(_, v)| !v.is_empty())
        .collect();
    let [(sig, info)] = present.as_slice() else {
        return None;
    };
    if info.contains(',') {
        return None;
    }
    let existing_sig = r.value(&format!("{prefix}SIG")).trim();
    let existing_info = r.value(&format!("{prefix}SIG_INFO")).trim();
    let sig_ok = existing_sig.is_empty() || existing_sig.eq_ignore_ascii_case(sig);
    let info_ok = existing_info.is_empty() || existing_info.eq_ignore_ascii_case(info);
    (sig_ok && info_ok).then(|| (*sig, info.to_string()))
}

fn ref_from_sig(r: &Record, prefix: &str, program: &str) -> Option<String> {
    if !r.value(&format!("{prefix}SIG")).trim().eq_ignore_ascii_case(program) {
        return None;
    }
    let info = r.value(&format!("{prefix}SIG_INFO")).trim();
    let field = PROGRAMS.iter().find(|(sig, _)| *sig == program)?.1;
    let spec = spec::field(&format!("{prefix}{field}"))?;
    let ctx = ValidationContext::new().with_record(r);
    (!info.is_empty() && spec::validate_spec_field(spec, info, &ctx).is_valid()).then(|| info.to_string())
}

/// Fill the named fields where possible, returning the names set.
pub fn infer_record(record: &mut Record, targets: &[String]) -> Result<Vec<String>> {
    let mut filled = Vec::new();
    for target in targets {
        let target = target.trim().to_ascii_uppercase();
        let candidates: Vec<&Inferrer> = INFERRERS.iter().filter(|i| i.target == target).collect();
        if candidates.is_empty() {
            return Err(AdifError::Config(format!("no way to infer {target}")));
        }
        if let Some(value) = candidates.iter().find_map(|i| i.infer(record)) {
            record.set(Field::new(&target, value))?;
            filled.push(target);
        }
    }
    Ok(filled)
}

/// Infer fields across a logfile, returning how many values were set.
///
/// With no targets every inferrer runs.
pub fn infer(log: &mut Logfile, targets: &[String]) -> Result<usize> {
    let targets: Vec<String> = if targets.is_empty() {
        INFERRERS.iter().map(|i| i.target.to_string()).collect()
    } else {
        targets.to_vec()
    };
    let mut count = 0;
    for record in &mut log.records {
        count += infer_record(record, &targets)?.len();
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(fields: &[(&str, &str)]) -> Record {
        Record::from_fields(fields.iter().map(|(n, v)| Field::new(n, *v))).unwrap()
    }

    fn inferred(fields: &[(&str, &str)], target: &str) -> String {
        let mut r = record(fields);
        infer_record(&mut r, &[target.to_string()]).unwrap();
        r.value(target).to_string()
    }

    #[test]
    fn test_infer_twice_changes_nothing() {
        let mut log = Logfile::new();
        log.records.push(record(&[("GRIDSQUARE", "FN31pr45"), ("FREQ", "14.025")]));
        log.records.push(record(&[("LAT", "N041 43.123"), ("LON", "W072 43.456")]));
        infer(&mut log, &[]).unwrap();
        let once = log.records.clone();
        assert_eq!(once[0].value("LAT"), "N041 43.875");
        assert!(once[0].is_blank("GRIDSQUARE_EXT"));
        assert_eq!(infer(&mut log, &[]).unwrap(), 0);
        for (a, b) in once.iter().zip(&log.records) {
            assert!(a.equal(b));
            assert_eq!(a.fields(), b.fields());
        }
    }

    #[test]
    fn test_band_from_freq() {
        assert_eq!(inferred(&[("FREQ", "146.52")], "BAND"), "2m");
        assert_eq!(inferred(&[("FREQ", "0.1378")], "BAND"), "2190m");
        assert_eq!(inferred(&[("FREQ", "300000")], "BAND"), "submm");
        assert_eq!(inferred(&[("FREQ", "10.5")], "BAND"), "");
        assert_eq!(inferred(&[("FREQ", "14.2"), ("BAND", "40m")], "BAND"), "40m");
    }

    #[test]
    fn test_mode_and_callsigns() {
        assert_eq!(inferred(&[("SUBMODE", "USB")], "MODE"), "SSB");
        assert_eq!(inferred(&[("OPERATOR", "W1AW")], "STATION_CALLSIGN"), "W1AW");
        assert_eq!(inferred(&[("OWNER_CALLSIGN", "K1ABC")], "STATION_CALLSIGN"), "K1ABC");
        assert_eq!(inferred(&[("STATION_CALLSIGN", "W1AW")], "OWNER_CALLSIGN"), "W1AW");
    }

    #[test]
    fn test_dxcc_and_country() {
        assert_eq!(inferred(&[("COUNTRY", "Canada")], "DXCC"), "1");
        assert_eq!(inferred(&[("COUNTRY", "US")], "DXCC"), "291");
        assert_eq!(inferred(&[("MY_COUNTRY", "USA")], "MY_DXCC"), "291");
        assert_eq!(inferred(&[("DXCC", "6")], "COUNTRY"), "ALASKA");
        assert_eq!(inferred(&[("DXCC", "0")], "COUNTRY"), "");
    }

    #[test]
    fn test_grid_and_location() {
        let origin = [("LAT", "N000 00.000"), ("LON", "E000 00.000")];
        assert_eq!(inferred(&origin, "GRIDSQUARE"), "JJ00aa00");
        assert_eq!(inferred(&origin, "GRIDSQUARE_EXT"), "aa00");
        let mut r = record(&[("MY_LAT", "S000 00.001"), ("MY_LON", "W000 00.001")]);
        infer_record(&mut r, &["MY_GRIDSQUARE".into(), "MY_GRIDSQUARE_EXT".into()]).unwrap();
        assert_eq!(r.value("MY_GRIDSQUARE"), "II99xx99");
        assert_eq!(r.value("MY_GRIDSQUARE_EXT"), "xx99");
        assert_eq!(inferred(&[("GRIDSQUARE", "FN31")], "LAT"), "N041 30.000");
        assert_eq!(inferred(&[("GRIDSQUARE", "FN31")], "LON"), "W073 00.000");
        assert_eq!(inferred(&[("GRIDSQUARE", "FN31"), ("LAT", "N041 00.000")], "GRIDSQUARE_EXT"), "");
    }

    #[test]
    fn test_us_counties() {
        let us = [("DXCC", "291"), ("CNTY", "MA,Franklin")];
        assert_eq!(inferred(&us, "USACA_COUNTIES"), "MA,Franklin");
        assert_eq!(inferred(&[("DXCC", "1"), ("CNTY", "MA,Franklin")], "USACA_COUNTIES"), "");
        let multi = [("DXCC", "291"), ("USACA_COUNTIES", "MA,Franklin:MA,Hampshire")];
        assert_eq!(inferred(&multi, "CNTY"), "");
    }

    #[test]
    fn test_programs() {
        assert_eq!(inferred(&[("POTA_REF", "K-0001")], "SIG"), "POTA");
        assert_eq!(inferred(&[("POTA_REF", "K-0001")], "SIG_INFO"), "K-0001");
        assert_eq!(inferred(&[("POTA_REF", "K-0001"), ("SOTA_REF", "W1/HA-001")], "SIG"), "");
        assert_eq!(inferred(&[("POTA_REF", "K-0001,K-0002")], "SIG"), "");
        assert_eq!(inferred(&[("MY_SIG", "sota"), ("MY_SIG_INFO", "W1/HA-001")], "MY_SOTA_REF"), "W1/HA-001");
        assert_eq!(inferred(&[("SIG", "POTA"), ("SIG_INFO", "not a ref")], "POTA_REF"), "");
    }

    #[test]
    fn test_unknown_target_and_idempotence() {
        let mut r = record(&[]);
        assert!(infer_record(&mut r, &["CALL".to_string()]).is_err());
        let mut log = Logfile::new();
        log.records.push(record(&[("FREQ", "7.074"), ("SUBMODE", "USB"), ("OPERATOR", "W1AW")]));
        let first = infer(&mut log, &[]).unwrap();
        assert!(first >= 3);
        let snapshot = log.records[0].clone();
        assert_eq!(infer(&mut log, &[]).unwrap(), 0);
        assert!(log.records[0].equal(&snapshot));
    }
}
