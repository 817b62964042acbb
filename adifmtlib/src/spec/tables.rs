//! Bundled ADIF specification tables.
//!
//! Each table is a tab-separated file compiled into the binary. Lines
//! starting with `#` are comments, the first remaining line names the
//! columns and the first column is the primary key. Tables are parsed on
//! first use and never change afterwards.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::model::DataType;

/// A parsed tab-separated table.
#[derive(Debug)]
pub struct Table {
    pub columns: Vec<&'static str>,
    pub rows: Vec<Vec<&'static str>>,
}

impl Table {
    pub fn parse(text: &'static str) -> Self {
        let mut lines = text
            .lines()
            .filter(|l| !l.trim().is_empty() && !l.starts_with('#'));
        let columns: Vec<&'static str> = lines
            .next()
            .map(|l| l.split('\t').map(str::trim).collect())
            .unwrap_or_default();
        let rows = lines
            .map(|l| {
                let mut cells: Vec<&'static str> = l.split('\t').map(str::trim).collect();
                cells.resize(columns.len(), "");
                cells
            })
            .collect();
        Table { columns, rows }
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
    }
}

fn parse_bound(s: &str) -> Option<f64> {
    if s.is_empty() {
        None
    } else {
        s.parse().ok()
    }
}

/// A data type as named in the specification, including derived types
/// such as `PositiveInteger` or `GridSquare`.
#[derive(Debug, Clone, PartialEq)]
pub struct DataTypeSpec {
    pub name: &'static str,
    pub indicator: &'static str,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub import_only: bool,
}

impl DataTypeSpec {
    /// The primitive type this specification type is stored as.
    pub fn primitive(&self) -> DataType {
        match self.name {
            "Number" | "Integer" | "PositiveInteger" | "Digit" => DataType::Number,
            "IntlCharacter" => DataType::IntlString,
            other => DataType::lookup(other).unwrap_or(DataType::String),
        }
    }
}

/// A field defined by the ADIF specification.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub data_type: &'static DataTypeSpec,
    pub enumeration: Option<&'static str>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub header: bool,
    pub import_only: bool,
}

impl FieldSpec {
    /// Numeric lower bound from the field, falling back to its type.
    pub fn min(&self) -> Option<f64> {
        self.minimum.or(self.data_type.minimum)
    }

    pub fn max(&self) -> Option<f64> {
        self.maximum.or(self.data_type.maximum)
    }

    pub fn type_name(&self) -> &'static str {
        self.data_type.name
    }
}

/// An amateur band with its frequency limits in MHz.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub name: &'static str,
    pub lower_mhz: f64,
    pub upper_mhz: f64,
}

impl Band {
    pub fn contains(&self, mhz: f64) -> bool {
        self.lower_mhz <= mhz && mhz <= self.upper_mhz
    }
}

/// A DXCC entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DxccEntity {
    pub code: u32,
    pub name: &'static str,
    pub deleted: bool,
}

pub static DATA_TYPES: Lazy<Vec<DataTypeSpec>> = Lazy::new(|| {
    let t = Table::parse(include_str!("data/datatypes.tsv"));
    t.rows
        .iter()
        .map(|r| DataTypeSpec {
            name: r[0],
            indicator: r[1],
            minimum: parse_bound(r[2]),
            maximum: parse_bound(r[3]),
            import_only: r[4] == "Y",
        })
        .collect()
});

static STRING_TYPE: DataTypeSpec = DataTypeSpec {
    name: "String",
    indicator: "S",
    minimum: None,
    maximum: None,
    import_only: false,
};

/// Look up a specification data type by name or indicator, case-insensitively.
pub fn data_type(name: &str) -> Option<&'static DataTypeSpec> {
    DATA_TYPES.iter().find(|d| {
        d.name.eq_ignore_ascii_case(name) || (!d.indicator.is_empty() && d.indicator.eq_ignore_ascii_case(name))
    })
}

pub static FIELDS: Lazy<Vec<FieldSpec>> = Lazy::new(|| {
    let t = Table::parse(include_str!("data/fields.tsv"));
    t.rows
        .iter()
        .map(|r| FieldSpec {
            name: r[0],
            data_type: data_type(r[1]).unwrap_or(&STRING_TYPE),
            enumeration: Some(r[2]).filter(|s| !s.is_empty()),
            minimum: parse_bound(r[3]),
            maximum: parse_bound(r[4]),
            header: r[5] == "Y",
            import_only: r[6] == "Y",
        })
        .collect()
});

static FIELD_INDEX: Lazy<HashMap<&'static str, usize>> =
    Lazy::new(|| FIELDS.iter().enumerate().map(|(i, f)| (f.name, i)).collect());

/// Look up a specification field by name, case-insensitively.
pub fn field(name: &str) -> Option<&'static FieldSpec> {
    let upper = name.trim().to_ascii_uppercase();
    FIELD_INDEX.get(upper.as_str()).map(|&i| &FIELDS[i])
}

pub static BANDS: Lazy<Vec<Band>> = Lazy::new(|| {
    let t = Table::parse(include_str!("data/band.tsv"));
    t.rows
        .iter()
        .filter_map(|r| {
            Some(Band {
                name: r[0],
                lower_mhz: r[1].parse().ok()?,
                upper_mhz: r[2].parse().ok()?,
            })
        })
        .collect()
});

/// Look up a band by name, case-insensitively.
pub fn band(name: &str) -> Option<&'static Band> {
    BANDS.iter().find(|b| b.name.eq_ignore_ascii_case(name.trim()))
}

/// The band containing a frequency in MHz.
pub fn band_for_freq(mhz: f64) -> Option<&'static Band> {
    BANDS.iter().find(|b| b.contains(mhz))
}

pub static DXCC_ENTITIES: Lazy<Vec<DxccEntity>> = Lazy::new(|| {
    let t = Table::parse(include_str!("data/dxcc.tsv"));
    t.rows
        .iter()
        .filter_map(|r| {
            Some(DxccEntity {
                code: r[0].parse().ok()?,
                name: r[1],
                deleted: r[2] == "Y",
            })
        })
        .collect()
});

pub fn dxcc_by_code(code: u32) -> Option<&'static DxccEntity> {
    DXCC_ENTITIES.iter().find(|e| e.code == code)
}

/// The current entity with this name; deleted entities never match.
pub fn dxcc_by_name(name: &str) -> Option<&'static DxccEntity> {
    let name = name.trim();
    DXCC_ENTITIES
        .iter()
        .find(|e| !e.deleted && e.code != 0 && e.name.eq_ignore_ascii_case(name))
}

static ISO_3166: Lazy<Table> = Lazy::new(|| Table::parse(include_str!("data/iso3166.tsv")));

/// DXCC entity for an ISO 3166 alpha-2 or alpha-3 country code.
pub fn dxcc_for_iso(code: &str) -> Option<&'static DxccEntity> {
    let code = code.trim();
    let col = match code.len() {
        2 => 0,
        3 => 1,
        _ => return None,
    };
    ISO_3166
        .rows
        .iter()
        .find(|r| r[col].eq_ignore_ascii_case(code))
        .and_then(|r| r[2].parse().ok())
        .and_then(dxcc_by_code)
}

static MODES: Lazy<Table> = Lazy::new(|| Table::parse(include_str!("data/mode.tsv")));

/// The mode a submode belongs to.
pub fn mode_for_submode(submode: &str) -> Option<&'static str> {
    let submode = submode.trim();
    MODES
        .rows
        .iter()
        .filter(|r| r[2] != "Y")
        .find(|r| r[1].split(',').any(|s| s.eq_ignore_ascii_case(submode)))
        .map(|r| r[0])
}

pub(crate) fn mode_table() -> &'static Table {
    &MODES
}
