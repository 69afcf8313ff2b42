use anyhow::{Context, Result};
use clap::Parser;
use sensemux_capture::{
    find_input_device, AudioRingBuffer, FrameSource, MicNode, Sampler, TestPatternSource,
};
use sensemux_core::PanelKind;
use sensemux_gateway::{GatewayTuning, InferenceGateway, InferenceTransport, TransportRegistry};
use sensemux_stream::{
    synthesize_session_report, Analyzer, BehaviorAnalyzer, SignAnalyzer, StreamHost,
    StreamScheduler,
};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sensemux", about = "Live multimodal inference router")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = sensemux_core::AppConfig::load_from_file(&cli.config)
        .with_context(|| format!("failed to load config from {:?}", cli.config))?;

    let env_filter = EnvFilter::try_new(&config.general.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("sensemux starting");

    // Transport + shared gateway (one throttle budget for every stream)
    let registry = TransportRegistry::new();
    let mut transport = registry
        .create(&config.gateway.transport)
        .with_context(|| format!("unknown transport '{}'", config.gateway.transport))?;

    let transport_config = match config.gateway.transport.as_str() {
        "remote" => {
            let remote = config.gateway.remote.clone().context(
                "gateway.transport = \"remote\" requires a [gateway.remote] section",
            )?;
            toml::Value::try_from(remote).context("failed to serialize remote config")?
        }
        _ => toml::Value::Table(Default::default()),
    };
    transport
        .initialize(transport_config)
        .await
        .context("failed to initialize transport")?;
    let transport: Arc<dyn InferenceTransport> = Arc::from(transport);

    let gateway = Arc::new(InferenceGateway::new(GatewayTuning::from(&config.gateway)));

    // History + alert plumbing
    let mut host = StreamHost::new();
    let mut alerts = host
        .take_alert_receiver()
        .context("alert receiver already taken")?;
    host.start();

    tokio::spawn(async move {
        while let Some(alert) = alerts.recv().await {
            tracing::warn!(
                stream_id = %alert.stream_id,
                at_seconds = alert.timestamp_seconds,
                "acoustic alert: {}",
                alert.message,
            );
        }
    });

    let frames: Arc<dyn FrameSource> = match config.video.source.as_str() {
        "pattern" => Arc::new(TestPatternSource::new(1280, 720)),
        other => anyhow::bail!("unknown video source '{}'", other),
    };

    let enabled_panels: Vec<_> = config.panel.iter().filter(|p| p.enabled).collect();
    if enabled_panels.is_empty() {
        tracing::warn!("no enabled panels configured");
    }

    // Keep mic nodes alive for the duration of the program
    let mut _mics = Vec::new();
    let mut mic_handles = Vec::new();
    let mut stream_handles = Vec::new();

    for panel in &enabled_panels {
        tracing::info!(
            "arming stream '{}' ({:?}, every {}ms, audio: {})",
            panel.id,
            panel.kind,
            panel.interval_ms,
            panel.audio,
        );

        let ring = if panel.audio && config.audio.enabled {
            let ring = Arc::new(Mutex::new(AudioRingBuffer::new(
                config.audio.ring_capacity_samples,
            )));
            let mic = find_input_device(&config.audio.device_name).and_then(|device| {
                MicNode::new(
                    &device,
                    Arc::clone(&ring),
                    config.audio.sample_rate,
                    config.audio.buffer_size,
                    &panel.id,
                )
            });
            match mic {
                Ok((mic, handle)) => {
                    _mics.push(mic);
                    mic_handles.push(handle);
                    Some(ring)
                }
                Err(e) => {
                    // A dead microphone degrades the stream to video-only.
                    tracing::warn!(
                        "mic unavailable for '{}', continuing without audio: {e}",
                        panel.id,
                    );
                    None
                }
            }
        } else {
            None
        };

        let sampler = Sampler::new(
            Arc::clone(&frames),
            ring,
            config.video.frame_width,
            config.video.frame_height,
            config.video.jpeg_quality,
        );

        let analyzer: Arc<dyn Analyzer> = match panel.kind {
            PanelKind::Behavior => Arc::new(BehaviorAnalyzer::new(
                Arc::clone(&transport),
                Arc::clone(&gateway),
                config.audio.sample_rate,
            )),
            PanelKind::Sign => Arc::new(SignAnalyzer::new(
                Arc::clone(&transport),
                Arc::clone(&gateway),
                panel.variant.clone(),
            )),
        };

        let scheduler = StreamScheduler::new(
            panel.id.as_str(),
            Duration::from_millis(panel.interval_ms),
            sampler,
            analyzer,
            host.record_sender(),
        );
        stream_handles.push(scheduler.arm());
    }

    tracing::info!(
        "{} stream(s) armed — press ctrl-c to stop",
        stream_handles.len(),
    );
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;

    tracing::info!("shutting down");
    for handle in &mic_handles {
        handle.set_enabled(false);
    }
    for handle in stream_handles {
        handle.shutdown().await;
    }
    host.shutdown().await;

    // End-of-session synthesis for behavior streams that produced history.
    for panel in enabled_panels
        .iter()
        .filter(|p| p.kind == PanelKind::Behavior)
    {
        let history = host.history_snapshot(&panel.id);
        if history.is_empty() {
            continue;
        }
        match synthesize_session_report(&gateway, &transport, &history).await {
            Ok(report) => tracing::info!(
                stream_id = %panel.id,
                focus_score = report.data.focus_score,
                records = history.len(),
                "session report: {}",
                report.data.executive_summary,
            ),
            Err(e) => tracing::warn!(stream_id = %panel.id, "session report failed: {e}"),
        }
    }

    Ok(())
}
