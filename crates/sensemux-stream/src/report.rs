use sensemux_core::{AnalysisRecord, GatewayError, SessionReport, StreamRecord};
use sensemux_gateway::{normalize, InferenceGateway, InferenceRequest, InferenceTransport};
use std::sync::Arc;

const REPORT_INSTRUCTION: &str = "ROLE: Senior behavioral analyst.\n\
TASK: Generate a high-level synthesis of the session history below. \
Reconstruct the session trajectory, identifying peak-focus periods and \
drift zones.\n\
OUTPUT STRICT JSON with keys: focusScore (0-100), performanceVerdict, \
executiveSummary, coreMetrics {focusPersistence, stressVariability, \
acousticClarity}, strategicRoadmap [{title, recommendation}].";

/// One-shot synthesis over a stream's full history, typically run when a
/// session ends. Uses the same gateway discipline as the periodic cycles.
pub async fn synthesize_session_report(
    gateway: &InferenceGateway,
    transport: &Arc<dyn InferenceTransport>,
    history: &[StreamRecord],
) -> Result<AnalysisRecord<SessionReport>, GatewayError> {
    let digest = serde_json::to_string(history).unwrap_or_else(|_| "[]".to_string());
    let request = InferenceRequest::text(format!(
        "{REPORT_INSTRUCTION}\nSESSION HISTORY: {digest}"
    ));

    let transport = Arc::clone(transport);
    let text = gateway
        .invoke(move || {
            let transport = Arc::clone(&transport);
            let request = request.clone();
            async move { transport.infer(request).await }
        })
        .await?;

    let parsed = normalize::parse(Some(&text), SessionReport::default());
    Ok(AnalysisRecord {
        timestamp_seconds: history
            .last()
            .map(|record| record.payload.timestamp_seconds())
            .unwrap_or(0.0),
        was_fallback: parsed.was_fallback,
        data: parsed.value,
    })
}
