use sensemux_core::{AcousticAlert, AlertEvent, RecordPayload, StreamRecord};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Consumes completed records from every stream: appends them to the
/// per-stream ordered history and raises acoustic alerts on a side
/// channel. This is the boundary the UI layer reads from.
pub struct StreamHost {
    record_tx: Option<mpsc::UnboundedSender<StreamRecord>>,
    record_rx: Option<mpsc::UnboundedReceiver<StreamRecord>>,
    alert_tx: mpsc::UnboundedSender<AlertEvent>,
    alert_rx: Option<mpsc::UnboundedReceiver<AlertEvent>>,
    history: Arc<Mutex<HashMap<String, Vec<StreamRecord>>>>,
    task_handle: Option<tokio::task::JoinHandle<()>>,
}

impl StreamHost {
    pub fn new() -> Self {
        let (record_tx, record_rx) = mpsc::unbounded_channel();
        let (alert_tx, alert_rx) = mpsc::unbounded_channel();
        Self {
            record_tx: Some(record_tx),
            record_rx: Some(record_rx),
            alert_tx,
            alert_rx: Some(alert_rx),
            history: Arc::new(Mutex::new(HashMap::new())),
            task_handle: None,
        }
    }

    /// Sender handed to each scheduler.
    pub fn record_sender(&self) -> mpsc::UnboundedSender<StreamRecord> {
        self.record_tx
            .as_ref()
            .expect("record sender taken after shutdown")
            .clone()
    }

    pub fn take_alert_receiver(&mut self) -> Option<mpsc::UnboundedReceiver<AlertEvent>> {
        self.alert_rx.take()
    }

    pub fn history_snapshot(&self, stream_id: &str) -> Vec<StreamRecord> {
        self.history
            .lock()
            .unwrap()
            .get(stream_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn start(&mut self) {
        let mut rx = self
            .record_rx
            .take()
            .expect("start() called but receiver already taken");
        let alert_tx = self.alert_tx.clone();
        let history = Arc::clone(&self.history);

        let handle = tokio::spawn(async move {
            while let Some(record) = rx.recv().await {
                tracing::debug!(
                    stream_id = %record.stream_id,
                    fallback = record.payload.was_fallback(),
                    "record: {}",
                    record.payload.summary(),
                );

                if let RecordPayload::Behavior(ref reading) = record.payload {
                    if reading.data.acoustic_alert != AcousticAlert::None {
                        let transcript = if reading.data.acoustic_transcript.is_empty() {
                            "pattern matched"
                        } else {
                            reading.data.acoustic_transcript.as_str()
                        };
                        let _ = alert_tx.send(AlertEvent {
                            stream_id: record.stream_id.clone(),
                            timestamp_seconds: record.payload.timestamp_seconds(),
                            message: format!(
                                "{:?} - {}",
                                reading.data.acoustic_alert, transcript
                            ),
                        });
                    }
                }

                history
                    .lock()
                    .unwrap()
                    .entry(record.stream_id.clone())
                    .or_default()
                    .push(record);
            }
        });

        self.task_handle = Some(handle);
    }

    /// Close the record channel and wait for the routing task to drain it.
    pub async fn shutdown(&mut self) {
        self.record_tx.take();
        if let Some(handle) = self.task_handle.take() {
            let _ = handle.await;
        }
    }
}

impl Default for StreamHost {
    fn default() -> Self {
        Self::new()
    }
}
