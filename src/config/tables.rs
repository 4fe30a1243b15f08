use crate::config::toml_config::{TableSource, TablesConfig};
use crate::core::Storage;
use crate::domain::labels::{LabelTable, LabelTranslator, MappingTable, TableKey};
use crate::utils::error::{EtlError, Result};

/// Load the four mapping tables. A table that is not configured is left
/// empty, so every lookup against it fails.
pub async fn load_translator<S: Storage>(
    tables: &TablesConfig,
    storage: &S,
) -> Result<LabelTranslator> {
    let travel = load_table(LabelTable::Travel, tables.travel.as_ref(), storage).await?;
    let visa = load_table(LabelTable::Visa, tables.visa.as_ref(), storage).await?;
    let country = load_table(LabelTable::Country, tables.country.as_ref(), storage).await?;
    let port = load_table(LabelTable::Port, tables.port.as_ref(), storage).await?;

    Ok(LabelTranslator::new(travel, visa, country, port))
}

async fn load_table<K: TableKey, S: Storage>(
    table: LabelTable,
    source: Option<&TableSource>,
    storage: &S,
) -> Result<MappingTable<K>> {
    let mapping = match source {
        None => {
            tracing::debug!("🗂️ {} table not configured", table);
            MappingTable::new(table)
        }
        Some(TableSource {
            file: Some(file), ..
        }) => {
            tracing::debug!("🗂️ Loading {} table from {}", table, file);
            let data = storage.read_file(file).await?;
            MappingTable::from_csv_reader(table, data.as_slice())?
        }
        Some(TableSource {
            entries: Some(entries),
            ..
        }) => MappingTable::from_entries(table, entries)?,
        Some(_) => {
            return Err(EtlError::ConfigValidationError {
                field: format!("tables.{}", table),
                message: "no 'file' or 'entries' given".to_string(),
            })
        }
    };

    tracing::info!("🗂️ {} table: {} codes", table, mapping.len());
    Ok(mapping)
}
