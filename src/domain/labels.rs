//! Categorical label lookups.
//!
//! Each [`MappingTable`] is built once and only read afterwards. A code that
//! is not in its table is an error for the caller; lookups never fall back
//! to a default label.

use crate::utils::error::{EtlError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::io::Read;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelTable {
    Travel,
    Visa,
    Country,
    Port,
}

impl LabelTable {
    pub const ALL: [LabelTable; 4] = [
        LabelTable::Travel,
        LabelTable::Visa,
        LabelTable::Country,
        LabelTable::Port,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LabelTable::Travel => "travel",
            LabelTable::Visa => "visa",
            LabelTable::Country => "country",
            LabelTable::Port => "port",
        }
    }
}

impl fmt::Display for LabelTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key type of a mapping table.
pub trait TableKey: Eq + Hash + Clone + fmt::Display {
    /// Parse a key as written in a mapping file or inline config entry.
    fn parse_key(raw: &str) -> Option<Self>;

    /// Coerce a record value into a key. `None` means the value cannot
    /// address this kind of table at all.
    fn from_value(value: &Value) -> Option<Self>;
}

impl TableKey for i64 {
    fn parse_key(raw: &str) -> Option<Self> {
        raw.parse().ok()
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().or_else(|| integral_f64(n.as_f64()?)),
            Value::String(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| integral_f64(s.parse::<f64>().ok()?))
            }
            _ => None,
        }
    }
}

impl TableKey for String {
    fn parse_key(raw: &str) -> Option<Self> {
        if raw.is_empty() {
            None
        } else {
            Some(raw.to_string())
        }
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) if n.is_i64() || n.is_u64() => Some(n.to_string()),
            _ => None,
        }
    }
}

// SAS exports carry integer codes as doubles (`1.0`)
fn integral_f64(f: f64) -> Option<i64> {
    if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

fn strip_sas_quotes(field: &str) -> &str {
    let field = field.trim();
    field
        .strip_prefix('\'')
        .and_then(|f| f.strip_suffix('\''))
        .map(str::trim)
        .unwrap_or(field)
}

#[derive(Debug, Clone, PartialEq)]
pub struct MappingTable<K: TableKey> {
    table: LabelTable,
    entries: HashMap<K, String>,
}

impl<K: TableKey> MappingTable<K> {
    pub fn new(table: LabelTable) -> Self {
        Self {
            table,
            entries: HashMap::new(),
        }
    }

    pub fn from_pairs<I, L>(table: LabelTable, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, L)>,
        L: Into<String>,
    {
        Self {
            table,
            entries: pairs
                .into_iter()
                .map(|(key, label)| (key, label.into()))
                .collect(),
        }
    }

    /// Build a table from inline `code = label` config entries.
    pub fn from_entries(table: LabelTable, raw: &HashMap<String, String>) -> Result<Self> {
        let mut mapping = Self::new(table);
        for (code, label) in raw {
            mapping.insert_raw(code, label)?;
        }
        Ok(mapping)
    }

    /// Build a table from a `code,label` CSV with a header row.
    pub fn from_csv_reader<R: Read>(table: LabelTable, reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut mapping = Self::new(table);
        for (index, row) in csv_reader.records().enumerate() {
            let row = row?;
            let (Some(code), Some(label)) = (row.get(0), row.get(1)) else {
                return Err(EtlError::ConfigValidationError {
                    field: format!("tables.{}", table),
                    message: format!("row {} needs a code and a label column", index + 1),
                });
            };
            mapping.insert_raw(code, label)?;
        }
        Ok(mapping)
    }

    fn insert_raw(&mut self, code: &str, label: &str) -> Result<()> {
        let code = strip_sas_quotes(code);
        let key = K::parse_key(code).ok_or_else(|| EtlError::InvalidConfigValueError {
            field: format!("tables.{}", self.table),
            value: code.to_string(),
            reason: "Code cannot be used as a key for this table".to_string(),
        })?;

        if self.entries.contains_key(&key) {
            return Err(EtlError::ConfigValidationError {
                field: format!("tables.{}", self.table),
                message: format!("duplicate code {}", key),
            });
        }

        self.entries
            .insert(key, strip_sas_quotes(label).to_string());
        Ok(())
    }

    pub fn table(&self) -> LabelTable {
        self.table
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&str>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.get(key).map(String::as_str)
    }

    /// Look up a code, failing with [`EtlError::LabelNotFound`] when absent.
    pub fn lookup<Q>(&self, key: &Q) -> Result<&str>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + fmt::Display + ?Sized,
    {
        self.get(key).ok_or_else(|| EtlError::LabelNotFound {
            table: self.table.to_string(),
            key: key.to_string(),
        })
    }

    pub fn lookup_value(&self, value: &Value) -> Result<&str> {
        match K::from_value(value) {
            Some(key) => self.lookup(&key),
            None => Err(EtlError::LabelNotFound {
                table: self.table.to_string(),
                key: match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                },
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The four label tables, injected at construction.
#[derive(Debug, Clone)]
pub struct LabelTranslator {
    travel: MappingTable<i64>,
    visa: MappingTable<i64>,
    country: MappingTable<i64>,
    port: MappingTable<String>,
}

impl LabelTranslator {
    pub fn new(
        travel: MappingTable<i64>,
        visa: MappingTable<i64>,
        country: MappingTable<i64>,
        port: MappingTable<String>,
    ) -> Self {
        Self {
            travel,
            visa,
            country,
            port,
        }
    }

    pub fn travel(&self, code: i64) -> Result<&str> {
        self.travel.lookup(&code)
    }

    pub fn visa(&self, code: i64) -> Result<&str> {
        self.visa.lookup(&code)
    }

    pub fn country(&self, code: i64) -> Result<&str> {
        self.country.lookup(&code)
    }

    pub fn port(&self, code: &str) -> Result<&str> {
        self.port.lookup(code)
    }

    /// Translate a record value through the given table.
    pub fn translate(&self, table: LabelTable, value: &Value) -> Result<&str> {
        match table {
            LabelTable::Travel => self.travel.lookup_value(value),
            LabelTable::Visa => self.visa.lookup_value(value),
            LabelTable::Country => self.country.lookup_value(value),
            LabelTable::Port => self.port.lookup_value(value),
        }
    }

    pub fn table_len(&self, table: LabelTable) -> usize {
        match table {
            LabelTable::Travel => self.travel.len(),
            LabelTable::Visa => self.visa.len(),
            LabelTable::Country => self.country.len(),
            LabelTable::Port => self.port.len(),
        }
    }
}
