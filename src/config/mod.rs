pub mod cli;
pub mod tables;
pub mod toml_config;

#[cfg(feature = "cli")]
use crate::utils::error::Result;
#[cfg(feature = "cli")]
use clap::Parser;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "i94-labels")]
#[command(about = "Translate coded I-94 columns into labels and calendar dates")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "etl-config.toml")]
    pub config: String,

    /// Override source.input_file from the config (relative to the current directory)
    #[arg(long)]
    pub input: Option<String>,

    /// Override load.output_path from the config (relative to the current directory)
    #[arg(long)]
    pub output_path: Option<String>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub json_logs: bool,

    /// Validate config and mapping tables without processing data
    #[arg(long)]
    pub dry_run: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// Apply command line overrides to a loaded config. Override paths are
    /// made absolute so they do not resolve against the config directory.
    pub fn apply_overrides(&self, config: &mut toml_config::TomlConfig) -> Result<()> {
        let cwd = std::env::current_dir()?;
        if let Some(input) = &self.input {
            config.source.input_file = cwd.join(input).to_string_lossy().into_owned();
            tracing::info!("🔧 Input file overridden to: {}", config.source.input_file);
        }
        if let Some(output_path) = &self.output_path {
            config.load.output_path = cwd.join(output_path).to_string_lossy().into_owned();
            tracing::info!("🔧 Output path overridden to: {}", config.load.output_path);
        }
        Ok(())
    }

    /// Directory that relative paths in the config resolve against.
    pub fn base_dir(&self) -> String {
        match std::path::Path::new(&self.config).parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_string_lossy().into_owned(),
            _ => ".".to_string(),
        }
    }
}

#[cfg(all(test, feature = "cli"))]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides() {
        let cli = CliConfig::parse_from([
            "i94-labels",
            "--config",
            "jobs/april/etl-config.toml",
            "--input",
            "i94_apr16_sub.csv",
            "--dry-run",
        ]);

        assert!(cli.dry_run);
        assert!(!cli.verbose);
        assert_eq!(cli.base_dir(), "jobs/april");

        let mut config = toml_config::TomlConfig::from_toml_str(
            r#"
[pipeline]
name = "t"

[source]
input_file = "immigration.csv"

[load]
output_path = "./output"
output_formats = ["csv"]
"#,
        )
        .unwrap();
        cli.apply_overrides(&mut config).unwrap();

        let expected_input = std::env::current_dir().unwrap().join("i94_apr16_sub.csv");
        assert_eq!(std::path::Path::new(&config.source.input_file), expected_input);
        assert!(std::path::Path::new(&config.source.input_file).is_absolute());
        assert_eq!(config.load.output_path, "./output");
    }

    #[test]
    fn test_base_dir_defaults_to_cwd() {
        let cli = CliConfig::parse_from(["i94-labels"]);
        assert_eq!(cli.config, "etl-config.toml");
        assert_eq!(cli.base_dir(), ".");
    }
}
