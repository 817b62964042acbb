//! ADIF enumerations and their scoping rules.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use super::tables::{mode_table, Table};

/// A closed set of values, looked up case-insensitively by primary key.
///
/// Some enumerations are scoped: a `Submode` is only valid for its parent
/// `MODE`, and a `Primary_Administrative_Subdivision` only within its
/// `DXCC` entity. The same key may then appear in several rows.
#[derive(Debug)]
pub struct Enumeration {
    pub name: &'static str,
    table: Table,
    index: HashMap<String, Vec<usize>>,
    scope: Option<(&'static str, usize)>,
    import_only_column: Option<usize>,
    deleted_column: Option<usize>,
    partial: bool,
}

/// One value of an enumeration.
#[derive(Debug, Clone, Copy)]
pub struct EnumValue<'a> {
    enumeration: &'a Enumeration,
    position: usize,
}

impl<'a> EnumValue<'a> {
    /// Canonical spelling of the value.
    pub fn key(&self) -> &'static str {
        self.cells()[0]
    }

    /// Cell in the named column, or `""`.
    pub fn get(&self, column: &str) -> &'static str {
        self.enumeration
            .table
            .column(column)
            .map(|c| self.cells()[c])
            .unwrap_or("")
    }

    /// Row position within the enumeration.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn import_only(&self) -> bool {
        self.flag(self.enumeration.import_only_column)
    }

    pub fn deleted(&self) -> bool {
        self.flag(self.enumeration.deleted_column)
    }

    /// Value of the scoping column, e.g. the parent mode of a submode.
    pub fn scope_value(&self) -> Option<&'static str> {
        self.enumeration.scope.map(|(_, c)| self.cells()[c])
    }

    fn flag(&self, column: Option<usize>) -> bool {
        column.is_some_and(|c| self.cells()[c] == "Y")
    }

    fn cells(&self) -> &'a [&'static str] {
        &self.enumeration.table.rows[self.position]
    }
}

impl Enumeration {
    fn new(name: &'static str, table: Table, scope: Option<(&'static str, &str)>) -> Self {
        let mut index: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, row) in table.rows.iter().enumerate() {
            index.entry(row[0].to_uppercase()).or_default().push(i);
        }
        let scope = scope.and_then(|(field, column)| table.column(column).map(|c| (field, c)));
        Enumeration {
            name,
            import_only_column: table.column("Import_Only"),
            deleted_column: table.column("Deleted"),
            table,
            index,
            scope,
            partial: false,
        }
    }

    /// Mark the bundled rows as covering only some scopes.
    fn partial(mut self) -> Self {
        self.partial = true;
        self
    }

    /// False when the table has no rows for `scope` and is known to be
    /// incomplete, so values in that scope cannot be checked.
    pub fn covers_scope(&self, scope: &str) -> bool {
        let scope = scope.trim();
        if !self.partial || scope.is_empty() {
            return true;
        }
        self.values()
            .any(|v| v.scope_value().is_some_and(|s| s.eq_ignore_ascii_case(scope)))
    }

    pub fn is_partial(&self) -> bool {
        self.partial
    }

    /// Name of the field whose value scopes this enumeration, for the given
    /// field. `MY_` fields are scoped by the `MY_` version of the field.
    pub fn scope_field(&self, for_field: &str) -> Option<String> {
        let (base, _) = self.scope?;
        if for_field.to_ascii_uppercase().starts_with("MY_") {
            Some(format!("MY_{base}"))
        } else {
            Some(base.to_string())
        }
    }

    pub fn is_scoped(&self) -> bool {
        self.scope.is_some()
    }

    /// All rows whose key matches, across every scope.
    pub fn lookup(&self, key: &str) -> Vec<EnumValue<'_>> {
        self.index
            .get(&key.trim().to_uppercase())
            .map(|rows| {
                rows.iter()
                    .map(|&position| EnumValue {
                        enumeration: self,
                        position,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// First row whose key matches.
    pub fn get(&self, key: &str) -> Option<EnumValue<'_>> {
        self.lookup(key).into_iter().next()
    }

    /// Matching row in the given scope; a blank scope matches any row.
    pub fn get_scoped(&self, key: &str, scope: &str) -> Option<EnumValue<'_>> {
        let scope = scope.trim();
        self.lookup(key).into_iter().find(|v| {
            scope.is_empty()
                || v.scope_value()
                    .map_or(true, |s| s.is_empty() || s.eq_ignore_ascii_case(scope))
        })
    }

    pub fn values(&self) -> impl Iterator<Item = EnumValue<'_>> {
        (0..self.table.rows.len()).map(move |position| EnumValue {
            enumeration: self,
            position,
        })
    }

    pub fn len(&self) -> usize {
        self.table.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.rows.is_empty()
    }
}

fn submode_table() -> Table {
    let modes = mode_table();
    let mut rows = Vec::new();
    for r in &modes.rows {
        if r[2] == "Y" || r[1].is_empty() {
            continue;
        }
        rows.extend(r[1].split(',').map(|sub| vec![sub, r[0]]));
    }
    Table {
        columns: vec!["Submode", "Mode"],
        rows,
    }
}

fn mode_enum_table() -> Table {
    let modes = mode_table();
    Table {
        columns: modes.columns.clone(),
        rows: modes.rows.clone(),
    }
}

static ENUMERATIONS: Lazy<Vec<Enumeration>> = Lazy::new(|| {
    let e = |name, text, scope| Enumeration::new(name, Table::parse(text), scope);
    vec![
        e("Ant_Path", include_str!("data/ant_path.tsv"), None),
        e("ARRL_Section", include_str!("data/arrl_section.tsv"), None),
        e("Band", include_str!("data/band.tsv"), None),
        e("Contest_ID", include_str!("data/contest_id.tsv"), None),
        e("Continent", include_str!("data/continent.tsv"), None),
        e("Credit", include_str!("data/credit.tsv"), None),
        e("DXCC_Entity_Code", include_str!("data/dxcc.tsv"), None),
        Enumeration::new("Mode", mode_enum_table(), None),
        e(
            "Primary_Administrative_Subdivision",
            include_str!("data/primary_administrative_subdivision.tsv"),
            Some(("DXCC", "DXCC_Entity_Code")),
        )
        .partial(),
        e("Propagation_Mode", include_str!("data/propagation_mode.tsv"), None),
        e("QSL_Rcvd", include_str!("data/qsl_rcvd.tsv"), None),
        e("QSL_Sent", include_str!("data/qsl_sent.tsv"), None),
        e("QSL_Via", include_str!("data/qsl_via.tsv"), None),
        e("QSO_Complete", include_str!("data/qso_complete.tsv"), None),
        e("QSO_Upload_Status", include_str!("data/qso_upload_status.tsv"), None),
        e(
            "Region",
            include_str!("data/region.tsv"),
            Some(("DXCC", "DXCC_Entity_Code")),
        ),
        Enumeration::new("Submode", submode_table(), Some(("MODE", "Mode"))),
    ]
});

/// Look up an enumeration by name, case-insensitively.
///
/// Returns `None` for enumerations the specification names but this
/// library does not bundle, such as `Secondary_Administrative_Subdivision`.
pub fn enumeration(name: &str) -> Option<&'static Enumeration> {
    ENUMERATIONS
        .iter()
        .find(|e| e.name.eq_ignore_ascii_case(name))
}
