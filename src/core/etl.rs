use crate::domain::ports::Pipeline;
use crate::utils::error::Result;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    /// 任何階段失敗都直接中止，不會進到 load，也就不會寫出檔案
    pub async fn run(&self) -> Result<String> {
        tracing::info!("🚀 Starting ETL process");

        let raw_data = self.pipeline.extract().await?;

        let transformed = self.pipeline.transform(raw_data).await?;
        tracing::info!(
            "Transformed {} records",
            transformed.canonical_records.len()
        );

        let output_path = self.pipeline.load(transformed).await?;
        tracing::info!("✅ ETL process completed");

        Ok(output_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::assemble::assemble;
    use crate::core::classify::Classification;
    use crate::domain::model::{Record, TransformResult};
    use crate::utils::error::EtlError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct RecordingPipeline {
        fail_extract: bool,
        loaded: AtomicBool,
    }

    #[async_trait]
    impl Pipeline for RecordingPipeline {
        async fn extract(&self) -> Result<Vec<Record>> {
            if self.fail_extract {
                return Err(EtlError::format("expected a list of records, got a string"));
            }
            Ok(vec![Record::default()])
        }

        async fn transform(&self, data: Vec<Record>) -> Result<TransformResult> {
            let tables = assemble(&data, &Classification::default());
            Ok(TransformResult {
                canonical_records: data,
                tables,
            })
        }

        async fn load(&self, _result: TransformResult) -> Result<String> {
            self.loaded.store(true, Ordering::SeqCst);
            Ok("./out/stores_output.zip".to_string())
        }
    }

    #[tokio::test]
    async fn test_run_returns_output_path() {
        let engine = EtlEngine::new(RecordingPipeline {
            fail_extract: false,
            loaded: AtomicBool::new(false),
        });

        assert_eq!(engine.run().await.unwrap(), "./out/stores_output.zip");
        assert!(engine.pipeline.loaded.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_failed_extract_skips_load() {
        let engine = EtlEngine::new(RecordingPipeline {
            fail_extract: true,
            loaded: AtomicBool::new(false),
        });

        assert!(engine.run().await.is_err());
        assert!(!engine.pipeline.loaded.load(Ordering::SeqCst));
    }
}
