//! Per-type value checks driven by the specification tables.

use chrono::{Datelike, NaiveDate, Utc};

use super::enums::enumeration;
use super::tables::{field as spec_field, FieldSpec};
use crate::geo::{is_valid_gridsquare, is_valid_gridsquare_ext, parse_location, Axis};
use crate::model::{DataType, Field, Record, UserdefField};

/// Earliest date the ADIF specification accepts.
pub const MIN_DATE: &str = "19300101";

/// Outcome of checking one value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validity {
    Valid,
    Warning(String),
    Error(String),
}

impl Validity {
    pub fn is_valid(&self) -> bool {
        matches!(self, Validity::Valid)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Validity::Error(_))
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Validity::Valid => None,
            Validity::Warning(m) | Validity::Error(m) => Some(m),
        }
    }
}

/// Everything a value check may consult besides the value itself.
#[derive(Debug, Clone)]
pub struct ValidationContext<'a> {
    /// Record the field belongs to, used for enumeration scopes
    pub record: Option<&'a Record>,
    pub userdefs: &'a [UserdefField],
    /// Latest acceptable year for Date values
    pub max_year: i32,
}

impl Default for ValidationContext<'_> {
    fn default() -> Self {
        Self {
            record: None,
            userdefs: &[],
            max_year: Utc::now().year() + 1,
        }
    }
}

impl<'a> ValidationContext<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(mut self, record: &'a Record) -> Self {
        self.record = Some(record);
        self
    }

    pub fn with_userdefs(mut self, userdefs: &'a [UserdefField]) -> Self {
        self.userdefs = userdefs;
        self
    }

    pub fn with_max_year(mut self, year: i32) -> Self {
        self.max_year = year;
        self
    }

    fn scope_value(&self, name: &str) -> &'a str {
        self.record.map(|r| r.value(name)).unwrap_or("")
    }
}

/// Check a field against its specification entry, user-defined declaration
/// or, failing both, its own type indicator.
pub fn validate_field(field: &Field, ctx: &ValidationContext<'_>) -> Validity {
    if field.value.is_empty() {
        return Validity::Valid;
    }
    if let Some(spec) = spec_field(&field.name) {
        return validate_spec_field(spec, &field.value, ctx);
    }
    if let Some(def) = ctx.userdefs.iter().find(|u| u.name == field.name) {
        let by_type = validate_primitive(def.data_type, &field.name, &field.value, ctx);
        if !by_type.is_valid() {
            return by_type;
        }
        return match def.check_value(&field.value) {
            Ok(()) => Validity::Valid,
            Err(m) => Validity::Error(m),
        };
    }
    validate_primitive(field.data_type, &field.name, &field.value, ctx)
}

/// Check a value as though it were stored in the named specification field.
pub fn validate_spec_field(spec: &FieldSpec, value: &str, ctx: &ValidationContext<'_>) -> Validity {
    if value.is_empty() {
        return Validity::Valid;
    }
    let result = validate_typed(spec, value, ctx);
    if result.is_valid() && spec.import_only {
        return Validity::Warning(format!("{} is import-only", spec.name));
    }
    result
}

fn validate_primitive(
    data_type: DataType,
    name: &str,
    value: &str,
    ctx: &ValidationContext<'_>,
) -> Validity {
    let type_name = match data_type {
        DataType::Unspecified => "String",
        t => t.name(),
    };
    check_type(type_name, name, value, None, None, ctx)
}

fn validate_typed(spec: &FieldSpec, value: &str, ctx: &ValidationContext<'_>) -> Validity {
    match (spec.type_name(), spec.enumeration) {
        ("Enumeration", Some(e)) => check_enumeration(e, spec.name, value, ctx),
        // String fields with a suggested list, such as CONTEST_ID and SUBMODE.
        ("String", Some(e)) => match check_type("String", spec.name, value, None, None, ctx) {
            Validity::Valid => match check_enumeration(e, spec.name, value, ctx) {
                Validity::Error(m) => Validity::Warning(m),
                other => other,
            },
            base => base,
        },
        (t, _) => check_type(t, spec.name, value, spec.min(), spec.max(), ctx),
    }
}

fn check_type(
    type_name: &str,
    name: &str,
    value: &str,
    min: Option<f64>,
    max: Option<f64>,
    ctx: &ValidationContext<'_>,
) -> Validity {
    let err = |m: String| Validity::Error(format!("{name} {m}"));
    match type_name {
        "String" => check_chars(name, value, false, false),
        "MultilineString" => check_chars(name, value, false, true),
        "IntlString" => check_chars(name, value, true, false),
        "IntlMultilineString" => check_chars(name, value, true, true),
        "Character" | "IntlCharacter" => {
            if value.chars().count() != 1 {
                err(format!("value {value:?} must be a single character"))
            } else {
                check_chars(name, value, type_name == "IntlCharacter", false)
            }
        }
        "Number" => check_number(name, value, min, max, false),
        "Integer" => check_number(name, value, min, max, true),
        "PositiveInteger" => check_number(name, value, min.or(Some(1.0)), max, true),
        "Digit" => check_number(name, value, Some(0.0), Some(9.0), true),
        "Boolean" => match value {
            "Y" | "y" | "N" | "n" => Validity::Valid,
            _ => err(format!("value {value:?} is not Y or N")),
        },
        "Date" => check_date(name, value, ctx.max_year),
        "Time" => check_time(name, value),
        "Location" => match parse_location(value, Axis::for_field(name)) {
            Ok(_) => Validity::Valid,
            Err(m) => err(m),
        },
        "GridSquare" => ok_if(
            is_valid_gridsquare(value),
            || err(format!("value {value:?} is not a Maidenhead locator")),
        ),
        "GridSquareExt" => ok_if(
            is_valid_gridsquare_ext(value),
            || err(format!("value {value:?} is not a locator extension")),
        ),
        "GridSquareList" => ok_if(
            value.split(',').all(|g| is_valid_gridsquare(g.trim())),
            || err(format!("value {value:?} is not a list of locators")),
        ),
        "IOTARefNo" => ok_if(is_iota_ref(value), || {
            err(format!("value {value:?} is not an IOTA reference like NA-001"))
        }),
        "POTARef" => ok_if(is_pota_ref(value), || {
            err(format!("value {value:?} is not a POTA reference like K-0059"))
        }),
        "POTARefList" => ok_if(value.split(',').all(|v| is_pota_ref(v.trim())), || {
            err(format!("value {value:?} is not a list of POTA references"))
        }),
        "SOTARef" => ok_if(is_sota_ref(value), || {
            err(format!("value {value:?} is not a SOTA reference like W4C/CM-001"))
        }),
        "WWFFRef" => ok_if(is_wwff_ref(value), || {
            err(format!("value {value:?} is not a WWFF reference like KFF-4655"))
        }),
        "SecondarySubdivisionList" => ok_if(
            value
                .split(':')
                .all(|v| v.split_once(',').is_some_and(|(s, c)| !s.trim().is_empty() && !c.trim().is_empty())),
            || err(format!("value {value:?} is not a list of SS,county entries")),
        ),
        "CreditList" => check_credit_list(name, value),
        "SponsoredAwardList" => check_sponsored_awards(name, value),
        "AwardList" => Validity::Warning(format!("{name} uses the import-only AwardList type")),
        _ => check_chars(name, value, true, true),
    }
}

fn ok_if(ok: bool, otherwise: impl FnOnce() -> Validity) -> Validity {
    if ok {
        Validity::Valid
    } else {
        otherwise()
    }
}

fn check_chars(name: &str, value: &str, intl: bool, multiline: bool) -> Validity {
    for c in value.chars() {
        let line_break = c == '\r' || c == '\n';
        if line_break {
            if !multiline {
                return Validity::Error(format!("{name} may not contain line breaks"));
            }
            continue;
        }
        if c.is_control() {
            return Validity::Error(format!("{name} contains control character {c:?}"));
        }
        if !intl && !c.is_ascii() {
            return Validity::Error(format!(
                "{name} contains non-ASCII character {c:?}; use an _INTL field"
            ));
        }
    }
    Validity::Valid
}

/// True for `-?(\d+|\d+\.\d*|\.\d+)`.
pub fn is_number(value: &str) -> bool {
    let digits = value.strip_prefix('-').unwrap_or(value);
    let (whole, frac) = match digits.split_once('.') {
        Some((w, f)) => (w, Some(f)),
        None => (digits, None),
    };
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    all_digits(whole)
        && frac.map_or(true, all_digits)
        && (!whole.is_empty() || frac.is_some_and(|f| !f.is_empty()))
}

fn check_number(name: &str, value: &str, min: Option<f64>, max: Option<f64>, integer: bool) -> Validity {
    let ok = if integer {
        let digits = value.strip_prefix('-').unwrap_or(value);
        !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
    } else {
        is_number(value)
    };
    if !ok {
        let kind = if integer { "an integer" } else { "a number" };
        return Validity::Error(format!("{name} value {value:?} is not {kind}"));
    }
    let Ok(n) = value.parse::<f64>() else {
        return Validity::Error(format!("{name} value {value:?} is not a number"));
    };
    if let Some(lo) = min.filter(|lo| n < *lo) {
        return Validity::Error(format!("{name} value {value} is below the minimum of {lo}"));
    }
    if let Some(hi) = max.filter(|hi| n > *hi) {
        return Validity::Error(format!("{name} value {value} is above the maximum of {hi}"));
    }
    Validity::Valid
}

fn check_date(name: &str, value: &str, max_year: i32) -> Validity {
    if value.len() != 8 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Validity::Error(format!("{name} value {value:?} is not a YYYYMMDD date"));
    }
    let Ok(date) = NaiveDate::parse_from_str(value, "%Y%m%d") else {
        return Validity::Error(format!("{name} value {value} is not a valid date"));
    };
    if value < MIN_DATE {
        return Validity::Error(format!("{name} value {value} is before {MIN_DATE}"));
    }
    if date.year() > max_year {
        return Validity::Error(format!("{name} value {value} is too far in the future"));
    }
    Validity::Valid
}

fn check_time(name: &str, value: &str) -> Validity {
    let bad = || Validity::Error(format!("{name} value {value:?} is not an HHMM or HHMMSS time"));
    if !matches!(value.len(), 4 | 6) || !value.bytes().all(|b| b.is_ascii_digit()) {
        return bad();
    }
    let part = |i: usize| value[i..i + 2].parse::<u32>().unwrap_or(99);
    if part(0) > 23 || part(2) > 59 || (value.len() == 6 && part(4) > 59) {
        return bad();
    }
    Validity::Valid
}

fn check_enumeration(enum_name: &str, name: &str, value: &str, ctx: &ValidationContext<'_>) -> Validity {
    let Some(e) = enumeration(enum_name) else {
        return Validity::Valid;
    };
    let scope_field = e.scope_field(name);
    let scope = scope_field.as_deref().map_or("", |f| ctx.scope_value(f)).trim();
    if !e.covers_scope(scope) {
        return Validity::Valid;
    }
    if e.get(value).is_none() {
        let message = format!("{name} value {value:?} is not in the {} enumeration", e.name);
        return if e.is_partial() && scope.is_empty() {
            Validity::Warning(message)
        } else {
            Validity::Error(message)
        };
    }
    if let Some(scope_field) = scope_field {
        if e.get_scoped(value, scope).is_none() {
            return Validity::Warning(format!(
                "{name} value {value:?} does not belong to {scope_field} {scope}"
            ));
        }
    }
    if e.lookup(value).iter().all(|v| v.import_only()) {
        return Validity::Warning(format!("{name} value {value:?} is import-only"));
    }
    Validity::Valid
}

fn check_credit_list(name: &str, value: &str) -> Validity {
    let credits = enumeration("Credit");
    for item in value.split(',') {
        let (credit, media) = match item.split_once(':') {
            Some((c, m)) => (c, Some(m)),
            None => (item, None),
        };
        if credits.is_some_and(|e| e.get(credit).is_none()) {
            return Validity::Error(format!("{name} credit {credit:?} is not recognized"));
        }
        if let Some(m) = media {
            if !m
                .split('&')
                .all(|m| ["CARD", "EQSL", "LOTW"].contains(&m.trim().to_ascii_uppercase().as_str()))
            {
                return Validity::Error(format!("{name} medium {m:?} is not CARD, EQSL or LOTW"));
            }
        }
    }
    Validity::Valid
}

const AWARD_SPONSORS: [&str; 11] = [
    "ADIF_", "ARI_", "ARRL_", "CQ_", "DARC_", "EQSL_", "IARU_", "JARL_", "RSGB_", "TAG_", "WABAG_",
];

fn check_sponsored_awards(name: &str, value: &str) -> Validity {
    match value.split(',').map(str::trim).find(|award| {
        !AWARD_SPONSORS
            .iter()
            .any(|s| award.to_ascii_uppercase().starts_with(s))
    }) {
        Some(award) => Validity::Warning(format!("{name} award {award:?} has an unknown sponsor")),
        None => Validity::Valid,
    }
}

fn is_iota_ref(value: &str) -> bool {
    let Some((cont, num)) = value.split_once('-') else {
        return false;
    };
    enumeration("Continent").is_some_and(|e| e.get(cont).is_some())
        && num.len() == 3
        && num.bytes().all(|b| b.is_ascii_digit())
}

fn is_alnum(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_alphanumeric())
}

fn is_pota_ref(value: &str) -> bool {
    let (park, location) = match value.split_once('@') {
        Some((p, l)) => (p, Some(l)),
        None => (value, None),
    };
    let Some((prefix, num)) = park.split_once('-') else {
        return false;
    };
    (1..=4).contains(&prefix.len())
        && is_alnum(prefix)
        && (4..=5).contains(&num.len())
        && num.bytes().all(|b| b.is_ascii_digit())
        && location.map_or(true, |l| {
            (4..=6).contains(&l.len()) && l.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
        })
}

fn is_sota_ref(value: &str) -> bool {
    let Some((assoc, rest)) = value.split_once('/') else {
        return false;
    };
    let Some((region, num)) = rest.split_once('-') else {
        return false;
    };
    (1..=8).contains(&assoc.len())
        && is_alnum(assoc)
        && region.len() == 2
        && is_alnum(region)
        && num.len() == 3
        && num.bytes().all(|b| b.is_ascii_digit())
}

fn is_wwff_ref(value: &str) -> bool {
    let Some((prefix, num)) = value.split_once('-') else {
        return false;
    };
    let Some(country) = prefix
        .strip_suffix("FF")
        .or_else(|| prefix.strip_suffix("ff"))
    else {
        return false;
    };
    (1..=4).contains(&country.len())
        && is_alnum(country)
        && num.len() == 4
        && num.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(name: &str, value: &str) -> Validity {
        validate_field(&Field::new(name, value), &ValidationContext::new().with_max_year(2030))
    }

    #[test]
    fn test_strings() {
        assert!(check("CALL", "W1AW").is_valid());
        assert!(check("NAME", "Zoë").is_error());
        assert!(check("NAME_INTL", "Zoë").is_valid());
        assert!(check("COMMENT_INTL", "a\nb").is_error());
        assert!(check("NOTES", "line one\r\nline two").is_valid());
        assert!(check("QTH", "tab\there").is_error());
    }

    #[test]
    fn test_numbers() {
        assert!(is_number("14.250"));
        assert!(is_number("-.5"));
        assert!(is_number("7."));
        assert!(!is_number("."));
        assert!(!is_number("1e5"));
        assert!(check("FREQ", "14.250").is_valid());
        assert!(check("FREQ", "fourteen").is_error());
        assert!(check("CQZ", "41").is_error());
        assert!(check("CQZ", "0").is_error());
        assert!(check("ANT_EL", "-90").is_valid());
        assert!(check("K_INDEX", "4.5").is_error());
        assert!(check("TX_PWR", "-1").is_error());
    }

    #[test]
    fn test_dates_and_times() {
        assert!(check("QSO_DATE", "19870605").is_valid());
        assert!(check("QSO_DATE", "20230230").is_error());
        assert!(check("QSO_DATE", "19291231").is_error());
        assert!(check("QSO_DATE", "20310101").is_error());
        assert!(check("QSO_DATE", "2023-01-01").is_error());
        assert!(check("TIME_ON", "2359").is_valid());
        assert!(check("TIME_ON", "235960").is_error());
        assert!(check("TIME_ON", "2400").is_error());
        assert!(check("TIME_ON", "123").is_error());
    }

    #[test]
    fn test_booleans_and_locations() {
        assert!(check("QSO_RANDOM", "y").is_valid());
        assert!(check("QSO_RANDOM", "yes").is_error());
        assert!(check("LAT", "N041 30.000").is_valid());
        assert!(check("LAT", "E041 30.000").is_error());
        assert!(check("MY_LON", "W179 59.999").is_valid());
    }

    #[test]
    fn test_enumerations() {
        assert!(check("BAND", "20M").is_valid());
        assert!(check("BAND", "21m").is_error());
        assert!(check("MODE", "PSK31").message().unwrap().contains("import-only"));
        assert!(matches!(check("CONTEST_ID", "MY-PARTY"), Validity::Warning(_)));
        assert!(check("CONTEST_ID", "ARRL-10").is_valid());
        assert!(check("CNTY", "MA,Middlesex").is_valid());
    }

    #[test]
    fn test_scoped_enumeration_warns() {
        let record = Record::from_fields([
            Field::new("MODE", "CW"),
            Field::new("SUBMODE", "USB"),
            Field::new("DXCC", "291"),
            Field::new("STATE", "MA"),
        ])
        .unwrap();
        let ctx = ValidationContext::new().with_record(&record);
        let sub = record.get("SUBMODE").unwrap();
        assert!(matches!(validate_field(sub, &ctx), Validity::Warning(_)));
        let state = record.get("STATE").unwrap();
        assert!(validate_field(state, &ctx).is_valid());
    }

    #[test]
    fn test_subdivisions_outside_bundled_entities() {
        let state_in = |dxcc: &str, state: &str| {
            let record =
                Record::from_fields([Field::new("DXCC", dxcc), Field::new("STATE", state)]).unwrap();
            let ctx = ValidationContext::new().with_record(&record);
            validate_field(record.get("STATE").unwrap(), &ctx)
        };
        assert!(state_in("230", "BY").is_valid());
        assert!(state_in("223", "ENG").is_valid());
        assert!(state_in("100", "B").is_valid());
        assert!(state_in("339", "13").is_valid());
        assert!(state_in("291", "ZZ").is_error());
        assert!(state_in("230", "ZZ").is_error());
        assert!(matches!(check("STATE", "ENG"), Validity::Warning(_)));
    }

    #[test]
    fn test_activity_references() {
        assert!(check("IOTA", "NA-001").is_valid());
        assert!(check("IOTA", "XX-001").is_error());
        assert!(check("POTA_REF", "K-0059,VE-1234@CA-ON").is_valid());
        assert!(check("POTA_REF", "K-59").is_error());
        assert!(check("SOTA_REF", "W4C/CM-001").is_valid());
        assert!(check("SOTA_REF", "W4C-CM-001").is_error());
        assert!(check("WWFF_REF", "KFF-4655").is_valid());
        assert!(check("WWFF_REF", "K-4655").is_error());
    }

    #[test]
    fn test_lists() {
        assert!(check("USACA_COUNTIES", "MA,Middlesex:MA,Essex").is_valid());
        assert!(check("USACA_COUNTIES", "Middlesex").is_error());
        assert!(check("VUCC_GRIDS", "FN31,FN32").is_valid());
        assert!(check("CREDIT_GRANTED", "DXCC:CARD&LOTW,WAS").is_valid());
        assert!(check("CREDIT_GRANTED", "DXCC:FAX").is_error());
        assert!(matches!(check("AWARD_GRANTED", "FOO_BAR"), Validity::Warning(_)));
        assert!(matches!(check("GUEST_OP", "K1ABC"), Validity::Warning(_)));
    }

    #[test]
    fn test_userdef_and_app_fields() {
        let defs = [UserdefField::new("EPOCH", DataType::Number).with_range(0.0, 10.0)];
        let ctx = ValidationContext::new().with_userdefs(&defs);
        assert!(validate_field(&Field::new("EPOCH", "5"), &ctx).is_valid());
        assert!(validate_field(&Field::new("EPOCH", "11"), &ctx).is_error());
        assert!(validate_field(&Field::new("EPOCH", "x"), &ctx).is_error());
        let app = Field::typed("APP_TEST_NUM", "abc", DataType::Number);
        assert!(validate_field(&app, &ctx).is_error());
        assert!(validate_field(&Field::new("APP_TEST_STR", "abc"), &ctx).is_valid());
    }
}
