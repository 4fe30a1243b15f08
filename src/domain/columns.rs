use crate::domain::dates::{convert_sas_date, convert_string_date_value};
use crate::domain::labels::{LabelTable, LabelTranslator};
use crate::domain::model::Record;
use crate::utils::error::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One of the six per-value operations that can be bound to a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnTransform {
    Travel,
    Visa,
    Country,
    Port,
    SasDate,
    StringDate,
}

impl ColumnTransform {
    /// Mapping table used by a label transform; `None` for date transforms.
    pub fn label_table(&self) -> Option<LabelTable> {
        match self {
            ColumnTransform::Travel => Some(LabelTable::Travel),
            ColumnTransform::Visa => Some(LabelTable::Visa),
            ColumnTransform::Country => Some(LabelTable::Country),
            ColumnTransform::Port => Some(LabelTable::Port),
            ColumnTransform::SasDate | ColumnTransform::StringDate => None,
        }
    }

    /// Apply to a single value. Label lookups propagate failures, date
    /// conversions turn them into `Value::Null`.
    pub fn apply(&self, translator: &LabelTranslator, value: &Value) -> Result<Value> {
        match self {
            ColumnTransform::SasDate => Ok(date_value(convert_sas_date(value))),
            ColumnTransform::StringDate => Ok(date_value(convert_string_date_value(value))),
            ColumnTransform::Travel => label_value(translator, LabelTable::Travel, value),
            ColumnTransform::Visa => label_value(translator, LabelTable::Visa, value),
            ColumnTransform::Country => label_value(translator, LabelTable::Country, value),
            ColumnTransform::Port => label_value(translator, LabelTable::Port, value),
        }
    }
}

fn label_value(translator: &LabelTranslator, table: LabelTable, value: &Value) -> Result<Value> {
    translator
        .translate(table, value)
        .map(|label| Value::String(label.to_string()))
}

fn date_value(date: Option<NaiveDate>) -> Value {
    date.map(|d| Value::String(d.format("%Y-%m-%d").to_string()))
        .unwrap_or(Value::Null)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnBinding {
    pub source: String,
    /// Output column; defaults to overwriting `source`. Later bindings then
    /// see the translated value, so config validation rejects reading it again.
    pub target: Option<String>,
    pub transform: ColumnTransform,
}

impl ColumnBinding {
    pub fn new(source: impl Into<String>, transform: ColumnTransform) -> Self {
        Self {
            source: source.into(),
            target: None,
            transform,
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn target_column(&self) -> &str {
        self.target.as_deref().unwrap_or(&self.source)
    }

    /// Translate `record[source]` into `record[target]`. A missing source
    /// column is treated as null.
    pub fn apply(&self, translator: &LabelTranslator, record: &mut Record) -> Result<()> {
        let output = {
            let input = record.data.get(&self.source).unwrap_or(&Value::Null);
            self.transform.apply(translator, input)?
        };
        record.data.insert(self.target_column().to_string(), output);
        Ok(())
    }
}
