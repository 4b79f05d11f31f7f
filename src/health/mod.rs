use crate::error::BenchError;

/// Liveness probe used to gate which systems take part in a run.
#[async_trait::async_trait]
pub trait HealthProvider {
    async fn health_check(&self) -> Result<(), BenchError>;
}
