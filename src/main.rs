use clap::Parser;
use i94_labels::domain::labels::LabelTable;
use i94_labels::utils::error::{EtlError, ErrorSeverity};
use i94_labels::utils::{logger, validation::Validate};
use i94_labels::{load_translator, CliConfig, EtlEngine, LabelPipeline, LocalStorage, TomlConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliConfig::parse();

    // 初始化日誌
    if args.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("🚀 Starting i94-labels");
    tracing::info!("📁 Loading configuration from: {}", args.config);

    // 載入 TOML 配置
    let mut config = match TomlConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    // 應用命令列覆蓋設定
    if let Err(e) = args.apply_overrides(&mut config) {
        exit_with(e);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    tracing::info!("✅ Configuration loaded and validated successfully");
    display_config_summary(&config);

    let storage = LocalStorage::new(args.base_dir());
    tracing::info!("📁 Relative config paths resolve against: {}", storage.base_path());
    let translator = match load_translator(&config.tables, &storage).await {
        Ok(translator) => translator,
        Err(e) => exit_with(e),
    };

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No data will be processed");
        for table in LabelTable::ALL {
            println!("  {:<8} {} codes", table, translator.table_len(table));
        }
        return Ok(());
    }

    let pipeline = LabelPipeline::new(storage, config, translator);
    let engine = EtlEngine::new(pipeline);

    match engine.run().await {
        Ok(output_path) => {
            tracing::info!("✅ ETL process completed successfully!");
            println!("✅ ETL process completed successfully!");
            println!("📁 Output saved to: {}", output_path);
        }
        Err(e) => exit_with(e),
    }

    Ok(())
}

fn display_config_summary(config: &TomlConfig) {
    tracing::info!("📋 Pipeline: {}", config.pipeline.name);
    if let Some(description) = &config.pipeline.description {
        tracing::info!("📋 Description: {}", description);
    }
    tracing::info!("📥 Input: {}", config.source.input_file);
    for binding in &config.columns {
        tracing::info!(
            "🔄 {} -> {} ({:?})",
            binding.source,
            binding.target_column(),
            binding.transform
        );
    }
    tracing::info!(
        "💾 Output: {} [{}]",
        config.load.output_path,
        config.load.output_formats.join(", ")
    );
}

fn exit_with(e: EtlError) -> ! {
    // 記錄詳細錯誤信息
    tracing::error!(
        "❌ ETL process failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

    // 根據錯誤嚴重程度決定退出碼
    let exit_code = match e.severity() {
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}
