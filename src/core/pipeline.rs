use crate::core::{ConfigProvider, Pipeline, Record, Storage, TransformResult};
use crate::domain::labels::LabelTranslator;
use crate::utils::error::{EtlError, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

/// Reads a CSV, applies the configured column bindings and writes the
/// labelled result.
pub struct LabelPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    translator: LabelTranslator,
    input_columns: Mutex<Vec<String>>,
}

impl<S: Storage, C: ConfigProvider> LabelPipeline<S, C> {
    pub fn new(storage: S, config: C, translator: LabelTranslator) -> Self {
        Self {
            storage,
            config,
            translator,
            input_columns: Mutex::new(Vec::new()),
        }
    }

    fn output_columns(&self) -> Result<Vec<String>> {
        let mut columns = self
            .input_columns
            .lock()
            .map_err(|_| EtlError::ProcessingError {
                message: "input column list lock poisoned".to_string(),
            })?
            .clone();

        for binding in self.config.columns() {
            let target = binding.target_column();
            if !columns.iter().any(|c| c == target) {
                columns.push(target.to_string());
            }
        }
        Ok(columns)
    }

    fn render_csv(records: &[Record], columns: &[String]) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(columns)?;

        for record in records {
            writer.write_record(
                columns
                    .iter()
                    .map(|column| cell_text(record.data.get(column))),
            )?;
        }

        let bytes = writer.into_inner().map_err(|e| EtlError::ProcessingError {
            message: format!("failed to flush CSV output: {}", e),
        })?;
        String::from_utf8(bytes).map_err(|e| EtlError::ProcessingError {
            message: format!("CSV output is not UTF-8: {}", e),
        })
    }
}

fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for LabelPipeline<S, C> {
    async fn extract(&self) -> Result<Vec<Record>> {
        let input_file = self.config.input_file();
        tracing::debug!("📥 Reading input file: {}", input_file);
        let data = self.storage.read_file(input_file).await?;

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(data.as_slice());
        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        tracing::debug!("📥 Input columns: {:?}", headers);

        let mut records = Vec::new();
        for row in reader.records() {
            let row = row?;
            let data: HashMap<String, Value> = headers
                .iter()
                .zip(row.iter())
                .map(|(column, cell)| {
                    let value = if cell.is_empty() {
                        Value::Null
                    } else {
                        Value::String(cell.to_string())
                    };
                    (column.clone(), value)
                })
                .collect();
            records.push(Record { data });
        }

        *self
            .input_columns
            .lock()
            .map_err(|_| EtlError::ProcessingError {
                message: "input column list lock poisoned".to_string(),
            })? = headers;

        Ok(records)
    }

    async fn transform(&self, data: Vec<Record>) -> Result<TransformResult> {
        let bindings = self.config.columns();
        let mut processed_records = Vec::with_capacity(data.len());

        for (index, mut record) in data.into_iter().enumerate() {
            for binding in bindings {
                if let Err(e) = binding.apply(&self.translator, &mut record) {
                    tracing::error!(
                        "❌ Row {}: column '{}' ({:?}) failed: {}",
                        index + 1,
                        binding.source,
                        binding.transform,
                        e
                    );
                    return Err(e);
                }
            }
            processed_records.push(record);
        }

        let columns = self.output_columns()?;
        let csv_output = Self::render_csv(&processed_records, &columns)?;

        Ok(TransformResult {
            processed_records,
            columns,
            csv_output,
        })
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        let output_dir = Path::new(self.config.output_path());
        let filename = self.config.output_filename();

        let csv_path = output_dir
            .join(format!("{}.csv", filename))
            .to_string_lossy()
            .into_owned();
        tracing::debug!("💾 Writing {} bytes of CSV to {}", result.csv_output.len(), csv_path);
        self.storage
            .write_file(&csv_path, result.csv_output.as_bytes())
            .await?;

        for format in self.config.output_formats() {
            match format.as_str() {
                "csv" => {}
                "json" => {
                    let json_path = output_dir
                        .join(format!("{}.json", filename))
                        .to_string_lossy()
                        .into_owned();
                    let rows: Vec<&HashMap<String, Value>> =
                        result.processed_records.iter().map(|r| &r.data).collect();
                    let json_data = serde_json::to_string_pretty(&rows)?;
                    tracing::debug!("💾 Writing JSON to {}", json_path);
                    self.storage
                        .write_file(&json_path, json_data.as_bytes())
                        .await?;
                }
                other => tracing::warn!("🔶 Unsupported output format: {}", other),
            }
        }

        Ok(csv_path)
    }
}
