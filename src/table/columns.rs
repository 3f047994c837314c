// src/table/columns.rs

/// One canonical field and the header substrings that identify it.
///
/// A header matches when it contains any candidate and none of the
/// excludes; `Date` with exclude `Date Time` picks a plain date column
/// over a combined one.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub field: &'static str,
    pub candidates: &'static [&'static str],
    pub excludes: &'static [&'static str],
}

impl FieldSpec {
    pub const fn new(field: &'static str, candidates: &'static [&'static str]) -> Self {
        Self {
            field,
            candidates,
            excludes: &[],
        }
    }

    pub const fn excluding(self, excludes: &'static [&'static str]) -> Self {
        Self { excludes, ..self }
    }

    pub fn matches(&self, header: &str) -> bool {
        self.candidates.iter().any(|c| header.contains(c))
            && !self.excludes.iter().any(|x| header.contains(x))
    }
}

/// Canonical field name → column position. Built once per fetched sheet.
#[derive(Debug, Clone, Default)]
pub struct ColumnIndex {
    positions: Vec<(&'static str, Option<usize>)>,
}

impl ColumnIndex {
    /// `None` when no header matched the field, or the field is unknown.
    pub fn position(&self, field: &str) -> Option<usize> {
        self.positions
            .iter()
            .find(|(f, _)| *f == field)
            .and_then(|(_, p)| *p)
    }

    pub fn has(&self, field: &str) -> bool {
        self.position(field).is_some()
    }

    /// The trimmed cell for `field`, if the column exists, the row reaches
    /// it and the cell is not blank.
    pub fn cell<'r>(&self, row: &'r [String], field: &str) -> Option<&'r str> {
        let value = row.get(self.position(field)?)?.trim();
        (!value.is_empty()).then_some(value)
    }

    /// Like [`cell`](Self::cell) but owned, empty when absent.
    pub fn text(&self, row: &[String], field: &str) -> String {
        self.cell(row, field).unwrap_or_default().to_string()
    }

    /// Highest resolved position; rows must be longer than this to be usable
    /// by normalizers that require every mapped column.
    pub fn max_position(&self) -> Option<usize> {
        self.positions.iter().filter_map(|(_, p)| *p).max()
    }

    pub fn resolved(&self) -> impl Iterator<Item = (&'static str, usize)> + '_ {
        self.positions
            .iter()
            .filter_map(|(f, p)| p.map(|p| (*f, p)))
    }
}

/// For every spec, the first header (left to right) that matches it.
pub fn build_column_index(headers: &[String], specs: &[FieldSpec]) -> ColumnIndex {
    let positions = specs
        .iter()
        .map(|spec| {
            let pos = headers.iter().position(|h| spec.matches(h.trim()));
            (spec.field, pos)
        })
        .collect();
    ColumnIndex { positions }
}
