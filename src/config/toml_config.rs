use crate::core::ConfigProvider;
use crate::domain::columns::ColumnBinding;
use crate::domain::labels::LabelTable;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

pub const DEFAULT_OUTPUT_FILENAME: &str = "labelled";
pub const SUPPORTED_OUTPUT_FORMATS: [&str; 2] = ["csv", "json"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub pipeline: PipelineConfig,
    pub source: SourceConfig,
    #[serde(default)]
    pub tables: TablesConfig,
    #[serde(default)]
    pub columns: Vec<ColumnBinding>,
    pub load: LoadConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub name: String,
    pub description: Option<String>,
    pub version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub input_file: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TablesConfig {
    pub travel: Option<TableSource>,
    pub visa: Option<TableSource>,
    pub country: Option<TableSource>,
    pub port: Option<TableSource>,
}

impl TablesConfig {
    pub fn get(&self, table: LabelTable) -> Option<&TableSource> {
        match table {
            LabelTable::Travel => self.travel.as_ref(),
            LabelTable::Visa => self.visa.as_ref(),
            LabelTable::Country => self.country.as_ref(),
            LabelTable::Port => self.port.as_ref(),
        }
    }
}

/// Where a mapping table comes from: a `code,label` CSV file or inline entries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableSource {
    pub file: Option<String>,
    pub entries: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    pub output_path: String,
    pub output_formats: Vec<String>,
    pub filename: Option<String>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${INPUT_DIR})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| EtlError::ConfigError {
            message: format!("env placeholder pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_non_empty_string("pipeline.name", &self.pipeline.name)?;
        validation::validate_path("source.input_file", &self.source.input_file)?;
        validation::validate_path("load.output_path", &self.load.output_path)?;

        if let Some(filename) = &self.load.filename {
            validation::validate_non_empty_string("load.filename", filename)?;
        }

        for format in &self.load.output_formats {
            validation::validate_one_of("load.output_formats", format, &SUPPORTED_OUTPUT_FORMATS)?;
        }
        if !self.load.output_formats.iter().any(|f| f == "csv") {
            return Err(EtlError::ConfigValidationError {
                field: "load.output_formats".to_string(),
                message: "csv output is required".to_string(),
            });
        }

        if self.columns.is_empty() {
            return Err(EtlError::MissingConfigError {
                field: "columns".to_string(),
            });
        }

        let mut written: HashSet<&str> = HashSet::new();
        for (index, binding) in self.columns.iter().enumerate() {
            let field = format!("columns[{}].source", index);
            validation::validate_non_empty_string(&field, &binding.source)?;
            // 前面的綁定已把該欄位改寫成標籤或日期
            if written.contains(binding.source.as_str()) {
                return Err(EtlError::ConfigValidationError {
                    field,
                    message: format!(
                        "column '{}' is already replaced by an earlier binding; give that binding a target",
                        binding.source
                    ),
                });
            }
            written.insert(binding.target_column());
            if let Some(table) = binding.transform.label_table() {
                let field = format!("tables.{}", table);
                validation::validate_required_field(&field, &self.tables.get(table).cloned())?;
            }
        }

        for table in LabelTable::ALL {
            if let Some(source) = self.tables.get(table) {
                Self::validate_table_source(table, source)?;
            }
        }

        Ok(())
    }

    fn validate_table_source(table: LabelTable, source: &TableSource) -> Result<()> {
        match (&source.file, &source.entries) {
            (Some(file), None) => {
                let field = format!("tables.{}.file", table);
                validation::validate_path(&field, file)?;
                validation::validate_file_extensions(&field, std::slice::from_ref(file), &["csv"])
            }
            (None, Some(_)) => Ok(()),
            _ => Err(EtlError::ConfigValidationError {
                field: format!("tables.{}", table),
                message: "exactly one of 'file' or 'entries' must be set".to_string(),
            }),
        }
    }

    pub fn output_filename(&self) -> &str {
        self.load
            .filename
            .as_deref()
            .unwrap_or(DEFAULT_OUTPUT_FILENAME)
    }
}

impl ConfigProvider for TomlConfig {
    fn input_file(&self) -> &str {
        &self.source.input_file
    }

    fn output_path(&self) -> &str {
        &self.load.output_path
    }

    fn output_formats(&self) -> &[String] {
        &self.load.output_formats
    }

    fn output_filename(&self) -> &str {
        TomlConfig::output_filename(self)
    }

    fn columns(&self) -> &[ColumnBinding] {
        &self.columns
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::columns::ColumnTransform;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const BASIC: &str = r#"
[pipeline]
name = "i94-test"

[source]
input_file = "immigration.csv"

[tables.travel]
entries = { "1" = "Air", "2" = "Sea" }

[tables.port]
file = "mappings/port.csv"

[[columns]]
source = "i94mode"
target = "travel_mode"
transform = "travel"

[[columns]]
source = "i94port"
transform = "port"

[[columns]]
source = "arrdate"
transform = "sas_date"

[load]
output_path = "./output"
output_formats = ["csv", "json"]
"#;

    #[test]
    fn test_parse_basic_toml_config() {
        let config = TomlConfig::from_toml_str(BASIC).unwrap();

        assert_eq!(config.pipeline.name, "i94-test");
        assert_eq!(config.input_file(), "immigration.csv");
        assert_eq!(config.columns.len(), 3);
        assert_eq!(config.columns[0].target_column(), "travel_mode");
        assert_eq!(config.columns[2].transform, ColumnTransform::SasDate);
        assert_eq!(config.output_filename(), DEFAULT_OUTPUT_FILENAME);
        assert!(config.tables.get(LabelTable::Travel).is_some());
        assert!(config.tables.get(LabelTable::Visa).is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("I94_TEST_OUTPUT_DIR", "/tmp/i94-out");

        let toml_content = BASIC.replace("./output", "${I94_TEST_OUTPUT_DIR}");
        let config = TomlConfig::from_toml_str(&toml_content).unwrap();
        assert_eq!(config.load.output_path, "/tmp/i94-out");

        std::env::remove_var("I94_TEST_OUTPUT_DIR");
    }

    #[test]
    fn test_unset_env_var_is_left_as_is() {
        let toml_content = BASIC.replace("./output", "${I94_TEST_UNSET_VARIABLE}");
        let config = TomlConfig::from_toml_str(&toml_content).unwrap();
        assert_eq!(config.load.output_path, "${I94_TEST_UNSET_VARIABLE}");
    }

    #[test]
    fn test_label_column_without_table_is_rejected() {
        let toml_content = BASIC.replace("transform = \"travel\"", "transform = \"visa\"");
        let config = TomlConfig::from_toml_str(&toml_content).unwrap();
        assert!(matches!(
            config.validate(),
            Err(EtlError::MissingConfigError { field }) if field == "tables.visa"
        ));
    }

    #[test]
    fn test_invalid_output_format_is_rejected() {
        let toml_content = BASIC.replace("[\"csv\", \"json\"]", "[\"csv\", \"parquet\"]");
        let config = TomlConfig::from_toml_str(&toml_content).unwrap();
        assert!(matches!(
            config.validate(),
            Err(EtlError::InvalidConfigValueError { .. })
        ));

        let json_only = BASIC.replace("[\"csv\", \"json\"]", "[\"json\"]");
        let config = TomlConfig::from_toml_str(&json_only).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_table_source_needs_exactly_one_origin() {
        let toml_content = BASIC.replace(
            "file = \"mappings/port.csv\"",
            "file = \"mappings/port.csv\"\nentries = { \"NYC\" = \"NEW YORK, NY\" }",
        );
        let config = TomlConfig::from_toml_str(&toml_content).unwrap();
        assert!(matches!(
            config.validate(),
            Err(EtlError::ConfigValidationError { .. })
        ));

        let wrong_ext = BASIC.replace("mappings/port.csv", "mappings/port.sas");
        let config = TomlConfig::from_toml_str(&wrong_ext).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_source_replaced_by_earlier_binding_is_rejected() {
        // i94port is translated in place by columns[1]
        let toml_content = BASIC.replace(
            "\n[load]",
            "\n[[columns]]\nsource = \"i94port\"\ntarget = \"port_name\"\ntransform = \"port\"\n\n[load]",
        );
        let config = TomlConfig::from_toml_str(&toml_content).unwrap();
        assert!(matches!(
            config.validate(),
            Err(EtlError::ConfigValidationError { field, .. }) if field == "columns[3].source"
        ));
    }

    #[test]
    fn test_reading_source_again_after_targeted_binding_is_allowed() {
        let toml_content = BASIC.replace(
            "\n[load]",
            "\n[[columns]]\nsource = \"i94mode\"\ntarget = \"travel_again\"\ntransform = \"travel\"\n\n[load]",
        );
        let config = TomlConfig::from_toml_str(&toml_content).unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_columns_is_rejected() {
        let config = TomlConfig::from_toml_str(
            r#"
[pipeline]
name = "empty"

[source]
input_file = "immigration.csv"

[load]
output_path = "./output"
output_formats = ["csv"]
"#,
        )
        .unwrap();
        assert!(matches!(
            config.validate(),
            Err(EtlError::MissingConfigError { .. })
        ));
    }

    #[test]
    fn test_unknown_transform_fails_to_parse() {
        let toml_content = BASIC.replace("transform = \"port\"", "transform = \"airline\"");
        assert!(matches!(
            TomlConfig::from_toml_str(&toml_content),
            Err(EtlError::ConfigValidationError { .. })
        ));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(BASIC.as_bytes()).unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.pipeline.name, "i94-test");
    }
}
