use crate::core::Pipeline;
use crate::utils::error::Result;
use std::time::Instant;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub async fn run(&self) -> Result<String> {
        let started = Instant::now();
        tracing::info!("🚀 Starting ETL process");

        // Extract
        tracing::info!("📥 Extracting data...");
        let raw_data = self.pipeline.extract().await?;
        tracing::info!("📥 Extracted {} records", raw_data.len());

        // Transform
        tracing::info!("🔄 Translating columns...");
        let transformed_result = self.pipeline.transform(raw_data).await?;
        tracing::info!(
            "🔄 Transformed {} records into {} columns",
            transformed_result.processed_records.len(),
            transformed_result.columns.len()
        );

        // Load
        tracing::info!("💾 Loading data...");
        let output_path = self.pipeline.load(transformed_result).await?;
        tracing::info!(
            "💾 Output saved to: {} ({:?})",
            output_path,
            started.elapsed()
        );

        Ok(output_path)
    }
}
