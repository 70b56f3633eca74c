use serde::{Deserialize, Serialize};

use crate::models::{Cell, HeaderRow};

pub const UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnKey {
    Offset(usize),
    Header(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    #[default]
    Categorical,
    FreeText,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub aliases: Vec<ColumnKey>,
    #[serde(default)]
    pub kind: FieldKind,
}

pub trait RowSource {
    fn cell(&self, key: &ColumnKey) -> Option<&Cell>;
}

impl RowSource for HeaderRow {
    fn cell(&self, key: &ColumnKey) -> Option<&Cell> {
        match key {
            ColumnKey::Header(name) => self.get(name.trim()),
            ColumnKey::Offset(_) => None,
        }
    }
}

impl RowSource for [Cell] {
    fn cell(&self, key: &ColumnKey) -> Option<&Cell> {
        match key {
            ColumnKey::Offset(index) => self.get(*index),
            ColumnKey::Header(_) => None,
        }
    }
}

impl FieldSpec {
    pub fn headers(kind: FieldKind, names: &[&str]) -> Self {
        Self {
            aliases: names
                .iter()
                .map(|name| ColumnKey::Header(name.to_string()))
                .collect(),
            kind,
        }
    }

    pub fn offset(kind: FieldKind, index: usize) -> Self {
        Self {
            aliases: vec![ColumnKey::Offset(index)],
            kind,
        }
    }

    pub fn lookup<'r, R>(&self, row: &'r R) -> Option<&'r Cell>
    where
        R: RowSource + ?Sized,
    {
        self.aliases
            .iter()
            .filter_map(|key| row.cell(key))
            .find(|cell| !cell.is_blank())
    }

    pub fn resolve<R>(&self, row: &R) -> Option<String>
    where
        R: RowSource + ?Sized,
    {
        self.lookup(row).map(Cell::text)
    }

    pub fn resolve_or_default<R>(&self, row: &R) -> String
    where
        R: RowSource + ?Sized,
    {
        self.resolve(row).unwrap_or_else(|| self.default_value().to_string())
    }

    pub fn default_value(&self) -> &'static str {
        match self.kind {
            FieldKind::Categorical => UNKNOWN,
            FieldKind::FreeText => "",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_row(pairs: &[(&str, &str)]) -> HeaderRow {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), Cell::from(*value)))
            .collect()
    }

    fn fellow_name() -> FieldSpec {
        FieldSpec::headers(
            FieldKind::FreeText,
            &["Select Fellows Name", "Fellow Name", "Name"],
        )
    }

    #[test]
    fn first_present_alias_wins() {
        let row = header_row(&[("Fellow Name", "Amaka Obi"), ("Name", "Someone Else")]);
        assert_eq!(fellow_name().resolve(&row).as_deref(), Some("Amaka Obi"));
    }

    #[test]
    fn blank_alias_falls_through_to_next() {
        let row = header_row(&[("Select Fellows Name", "  "), ("Name", "Tunde Bello")]);
        assert_eq!(fellow_name().resolve(&row).as_deref(), Some("Tunde Bello"));
    }

    #[test]
    fn unresolved_fields_use_kind_default() {
        let row = header_row(&[("Subject", "Maths")]);
        assert_eq!(fellow_name().resolve_or_default(&row), "");

        let region = FieldSpec::headers(FieldKind::Categorical, &["Region"]);
        assert_eq!(region.resolve_or_default(&row), UNKNOWN);
    }

    #[test]
    fn offsets_resolve_against_positional_rows() {
        let row = vec![Cell::from("Ngozi"), Cell::Blank, Cell::Number(7.0)];
        let first = FieldSpec::offset(FieldKind::FreeText, 0);
        let missing = FieldSpec::offset(FieldKind::Categorical, 1);
        let beyond = FieldSpec::offset(FieldKind::Categorical, 9);

        assert_eq!(first.resolve(row.as_slice()).as_deref(), Some("Ngozi"));
        assert_eq!(missing.resolve_or_default(row.as_slice()), UNKNOWN);
        assert_eq!(beyond.resolve_or_default(row.as_slice()), UNKNOWN);
        assert_eq!(
            FieldSpec::offset(FieldKind::FreeText, 2).resolve(row.as_slice()).as_deref(),
            Some("7")
        );
    }

    #[test]
    fn header_keys_do_not_match_offsets() {
        let row = header_row(&[("0", "zero")]);
        let by_offset = FieldSpec::offset(FieldKind::FreeText, 0);
        assert_eq!(by_offset.resolve(&row), None);
    }
}
