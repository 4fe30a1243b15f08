pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use config::{cli::LocalStorage, tables::load_translator, toml_config::TomlConfig};
pub use crate::core::{etl::EtlEngine, pipeline::LabelPipeline};
pub use domain::columns::{ColumnBinding, ColumnTransform};
pub use domain::dates::{
    convert_sas_date, convert_string_date, convert_string_date_value, sas_date_from_days,
    SAS_EPOCH,
};
pub use domain::labels::{LabelTable, LabelTranslator, MappingTable};
pub use utils::error::{EtlError, Result};
