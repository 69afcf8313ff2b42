use sensemux_core::{BehaviorReading, GatewayError};
use sensemux_gateway::{
    parse, GatewayTuning, InferenceGateway, InferenceRequest, InferenceTransport, NullTransport,
    TransportRegistry,
};
use std::sync::Arc;
use std::time::Duration;

type InferFut =
    std::pin::Pin<Box<dyn std::future::Future<Output = Result<String, GatewayError>> + Send>>;

fn infer_op(transport: &Arc<NullTransport>) -> impl FnMut() -> InferFut {
    let transport = Arc::clone(transport);
    move || -> InferFut {
        let transport = Arc::clone(&transport);
        Box::pin(async move { transport.infer(InferenceRequest::text("audit")).await })
    }
}

#[tokio::test(start_paused = true)]
async fn test_gateway_and_transport_recover_from_quota_burst() {
    let transport = Arc::new(NullTransport::new());
    transport.push_reply(Err(GatewayError::QuotaExceeded("429".to_string())));
    transport.push_reply(Err(GatewayError::QuotaExceeded("429".to_string())));
    transport.push_reply(Ok(r#"{"action":"typing","focusLevel":91}"#.to_string()));

    let gateway = InferenceGateway::new(GatewayTuning::default());
    let text = gateway.invoke(infer_op(&transport)).await.unwrap();

    assert_eq!(transport.infer_count(), 3);
    assert!(!gateway.is_throttled());

    let reading = parse(Some(&text), BehaviorReading::default());
    assert!(!reading.was_fallback);
    assert_eq!(reading.value.action, "typing");
    assert_eq!(reading.value.focus_level, 91.0);
    // Fields the reply omitted keep their fallback defaults.
    assert_eq!(reading.value.emotion_label, "Neutral");
}

#[tokio::test(start_paused = true)]
async fn test_gateway_surfaces_quota_after_retry_budget() {
    let transport = Arc::new(NullTransport::new());
    for _ in 0..4 {
        transport.push_reply(Err(GatewayError::QuotaExceeded("quota".to_string())));
    }

    let gateway = InferenceGateway::new(GatewayTuning::default());
    let out = gateway.invoke(infer_op(&transport)).await;

    assert!(matches!(out, Err(GatewayError::QuotaExceeded(_))));
    // 1 initial call + 3 retries.
    assert_eq!(transport.infer_count(), 4);
    assert!(gateway.is_throttled());
}

#[tokio::test(start_paused = true)]
async fn test_malformed_reply_is_absorbed_into_fallback_record() {
    let transport = Arc::new(NullTransport::new());
    transport.push_reply(Ok("SENSOR OFFLINE, NO DATA".to_string()));

    let gateway = InferenceGateway::new(GatewayTuning::default());
    let text = gateway.invoke(infer_op(&transport)).await.unwrap();

    let reading = parse(Some(&text), BehaviorReading::default());
    assert!(reading.was_fallback);
    assert_eq!(reading.value.action, "Uplink established");
}

#[tokio::test]
async fn test_registry_built_transport_initializes_from_toml() {
    let registry = TransportRegistry::new();
    let mut transport = registry.create("null").unwrap();
    let mut table = toml::map::Map::new();
    table.insert("latency_ms".to_string(), toml::Value::Integer(5));
    transport
        .initialize(toml::Value::Table(table))
        .await
        .unwrap();

    let started = std::time::Instant::now();
    let reply = transport
        .infer(InferenceRequest::text("ping"))
        .await
        .unwrap();
    assert_eq!(reply, "{}");
    assert!(started.elapsed() >= Duration::from_millis(5));
}
