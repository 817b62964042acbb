//! ADIF locations and Maidenhead grid locators.
//!
//! Locations are written `XDDD MM.mmm`, where `X` is a hemisphere letter.
//! Grid squares use the usual 18/10/24/10 subdivision for the eight
//! character locator and a further 24/10 for the four character extension.

/// Longitude in units of 1/8 arc second and latitude in units of 1/16 arc
/// second; both axes then have the same number of cells.
const LON_UNITS_PER_DEGREE: f64 = 28_800.0;
const LAT_UNITS_PER_DEGREE: f64 = 57_600.0;
const UNITS: i64 = 10_368_000;
const FIELD: i64 = 576_000;
const SQUARE: i64 = 57_600;
const SUBSQUARE: i64 = 2_400;
const EXT_SQUARE: i64 = 240;
const EXT_SUBSQUARE: i64 = 10;

/// Which axis a location value describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Latitude,
    Longitude,
}

impl Axis {
    /// Axis of a location field such as `LAT` or `MY_LON`.
    pub fn for_field(name: &str) -> Option<Axis> {
        let name = name.to_ascii_uppercase();
        match name.strip_prefix("MY_").unwrap_or(&name) {
            "LAT" => Some(Axis::Latitude),
            "LON" => Some(Axis::Longitude),
            _ => None,
        }
    }

    fn limit(self) -> f64 {
        match self {
            Axis::Latitude => 90.0,
            Axis::Longitude => 180.0,
        }
    }

    fn hemispheres(self) -> (char, char) {
        match self {
            Axis::Latitude => ('N', 'S'),
            Axis::Longitude => ('E', 'W'),
        }
    }
}

/// Parse `XDDD MM.mmm` into signed decimal degrees.
///
/// With an axis, the hemisphere letter and degree limit are checked too.
pub fn parse_location(value: &str, axis: Option<Axis>) -> Result<f64, String> {
    let bad = || format!("{value:?} is not in XDDD MM.mmm format");
    let mut chars = value.chars();
    let hemi = chars.next().ok_or_else(bad)?.to_ascii_uppercase();
    let rest = chars.as_str();
    let (deg, min) = rest.split_once(' ').ok_or_else(bad)?;
    if deg.len() != 3 || !deg.bytes().all(|b| b.is_ascii_digit()) {
        return Err(bad());
    }
    let (whole, frac) = min.split_once('.').ok_or_else(bad)?;
    if whole.len() != 2
        || frac.len() != 3
        || !whole.bytes().chain(frac.bytes()).all(|b| b.is_ascii_digit())
    {
        return Err(bad());
    }
    let degrees: f64 = deg.parse().map_err(|_| bad())?;
    let minutes: f64 = min.parse().map_err(|_| bad())?;
    if minutes >= 60.0 {
        return Err(format!("{value:?} has minutes of 60 or more"));
    }
    let sign = match hemi {
        'N' | 'E' => 1.0,
        'S' | 'W' => -1.0,
        _ => return Err(format!("{value:?} has no N, S, E or W hemisphere")),
    };
    let total = degrees + minutes / 60.0;
    if let Some(axis) = axis {
        let (pos, neg) = axis.hemispheres();
        if hemi != pos && hemi != neg {
            return Err(format!("{value:?} must start with {pos} or {neg}"));
        }
        if total > axis.limit() {
            return Err(format!("{value:?} is beyond {} degrees", axis.limit()));
        }
    }
    Ok(sign * total)
}

/// Format signed decimal degrees as `XDDD MM.mmm`.
pub fn format_location(degrees: f64, axis: Axis) -> String {
    let (pos, neg) = axis.hemispheres();
    let hemi = if degrees < 0.0 { neg } else { pos };
    let abs = degrees.abs().min(axis.limit());
    let mut whole = abs.trunc();
    let mut thousandths = ((abs - whole) * 60_000.0).round();
    if thousandths >= 60_000.0 {
        whole += 1.0;
        thousandths -= 60_000.0;
    }
    format!(
        "{hemi}{:03} {:02}.{:03}",
        whole as u32,
        (thousandths as u32) / 1000,
        (thousandths as u32) % 1000
    )
}

/// Encode a position as an eight character locator and four character extension.
pub fn to_maidenhead(lat: f64, lon: f64) -> (String, String) {
    let x = (((lon + 180.0) * LON_UNITS_PER_DEGREE).floor() as i64).clamp(0, UNITS - 1);
    let y = (((lat + 90.0) * LAT_UNITS_PER_DEGREE).floor() as i64).clamp(0, UNITS - 1);
    let digits = |n: i64| {
        [
            n / FIELD,
            n % FIELD / SQUARE,
            n % SQUARE / SUBSQUARE,
            n % SUBSQUARE / EXT_SQUARE,
            n % EXT_SQUARE / EXT_SUBSQUARE,
            n % EXT_SUBSQUARE,
        ]
    };
    let (dx, dy) = (digits(x), digits(y));
    let letter = |base: u8, n: i64| char::from(base + n as u8);
    let digit = |n: i64| char::from(b'0' + n as u8);
    let grid: String = [
        letter(b'A', dx[0]),
        letter(b'A', dy[0]),
        digit(dx[1]),
        digit(dy[1]),
        letter(b'a', dx[2]),
        letter(b'a', dy[2]),
        digit(dx[3]),
        digit(dy[3]),
    ]
    .iter()
    .collect();
    let ext: String = [
        letter(b'a', dx[4]),
        letter(b'a', dy[4]),
        digit(dx[5]),
        digit(dy[5]),
    ]
    .iter()
    .collect();
    (grid, ext)
}

/// Divisor and radix of each locator character pair, in units.
const PAIRS: [(i64, u8); 6] = [
    (FIELD, 18),
    (SQUARE, 10),
    (SUBSQUARE, 24),
    (EXT_SQUARE, 10),
    (EXT_SUBSQUARE, 24),
    (1, 10),
];

/// Decode a locator and optional extension to the center of the cell they name.
pub fn from_maidenhead(grid: &str, ext: &str) -> Option<(f64, f64)> {
    if !is_valid_gridsquare(grid) || !(ext.is_empty() || (grid.len() == 8 && is_valid_gridsquare_ext(ext))) {
        return None;
    }
    let chars: Vec<u8> = grid.bytes().chain(ext.bytes()).collect();
    let (mut x, mut y) = (0i64, 0i64);
    let mut cell = FIELD * 18;
    for (pair, (unit, radix)) in chars.chunks(2).zip(PAIRS) {
        let value = |c: u8| -> Option<i64> {
            let v = if c.is_ascii_digit() {
                c - b'0'
            } else {
                c.to_ascii_uppercase() - b'A'
            };
            (v < radix).then_some(v as i64)
        };
        x += value(pair[0])? * unit;
        y += value(pair[1])? * unit;
        cell = unit;
    }
    let lon = (x as f64 + cell as f64 / 2.0) / LON_UNITS_PER_DEGREE - 180.0;
    let lat = (y as f64 + cell as f64 / 2.0) / LAT_UNITS_PER_DEGREE - 90.0;
    Some((lat, lon))
}

/// True for a 2, 4, 6 or 8 character Maidenhead locator.
pub fn is_valid_gridsquare(grid: &str) -> bool {
    let b = grid.as_bytes();
    if !matches!(b.len(), 2 | 4 | 6 | 8) {
        return false;
    }
    b.chunks(2).zip(PAIRS).all(|(pair, (_, radix))| {
        pair.iter().all(|&c| {
            if radix == 10 {
                c.is_ascii_digit()
            } else {
                c.is_ascii_alphabetic() && c.to_ascii_uppercase() - b'A' < radix
            }
        })
    })
}

/// True for a 2 or 4 character locator extension.
pub fn is_valid_gridsquare_ext(ext: &str) -> bool {
    let b = ext.as_bytes();
    matches!(b.len(), 2 | 4)
        && b[..2]
            .iter()
            .all(|c| c.is_ascii_alphabetic() && c.to_ascii_uppercase() <= b'X')
        && b[2..].iter().all(|c| c.is_ascii_digit())
}
