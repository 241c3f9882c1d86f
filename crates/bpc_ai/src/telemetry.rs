use bpc_core::domain::{Redaction, RiskFlag, RunMetadata};
use bpc_core::error::AppError;

/// Audit/tracing sink. Recording is fire-and-forget: the chain swallows any
/// error from this seam, so a sink failure can never block or fail a
/// response.
pub trait TelemetrySink {
    fn record(
        &self,
        run: &RunMetadata,
        risk_flags: &[RiskFlag],
        redactions: &[Redaction],
    ) -> Result<(), AppError>;
}

#[derive(Debug, Clone, Default)]
pub struct NoopTelemetry;

impl TelemetrySink for NoopTelemetry {
    fn record(
        &self,
        _run: &RunMetadata,
        _risk_flags: &[RiskFlag],
        _redactions: &[Redaction],
    ) -> Result<(), AppError> {
        Ok(())
    }
}
