// Background task turning snapshot changes into throttled websocket broadcasts.

use std::time::Duration;

use tokio::time;
use tracing::debug;

use crate::app::AppState;
use crate::constants::STATE_INTERVAL_MS;
use crate::ws::state_update_payload;

pub async fn state_update_task(app_state: AppState) {
    let mut snapshots = app_state.snapshots.clone();
    loop {
        if snapshots.changed().await.is_err() {
            debug!("snapshot publisher closed");
            return;
        }
        let snapshot = snapshots.borrow_and_update().clone();
        if let Some(payload) = state_update_payload(&app_state, &snapshot) {
            let _ = app_state.tx.send(payload);
        }
        // Bursts inside the window collapse into the next update.
        time::sleep(Duration::from_millis(STATE_INTERVAL_MS)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::IngestSink;
    use serde_json::Value;

    fn speed_frame(ts: u64) -> String {
        format!(r#"{{"type":"speed","data":{{"ts":{ts},"wheel":1,"speed_kph":5}}}}"#)
    }

    #[tokio::test(start_paused = true)]
    async fn bursts_are_coalesced() {
        let sink = IngestSink::new(90, 200);
        let app_state = AppState::new(sink.subscribe(), "test");
        let mut rx = app_state.tx.subscribe();
        let task = tokio::spawn(state_update_task(app_state));

        sink.accept_frame(&speed_frame(1));
        let first: Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(first["type"], "state_update");
        assert_eq!(first["schema_version"], "1.0");
        assert_eq!(first["state"]["stats"]["accepted"], 1);

        for ts in 2..=6 {
            sink.accept_frame(&speed_frame(ts));
        }
        let second: Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(second["state"]["stats"]["accepted"], 6);
        assert!(second["sequence"].as_u64().unwrap() > first["sequence"].as_u64().unwrap());
        assert!(rx.try_recv().is_err());

        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_frames_do_not_broadcast() {
        let sink = IngestSink::new(90, 200);
        let app_state = AppState::new(sink.subscribe(), "test");
        let mut rx = app_state.tx.subscribe();
        let task = tokio::spawn(state_update_task(app_state));

        sink.close();
        let _closing = rx.recv().await.unwrap();
        sink.accept_frame(&speed_frame(1));
        time::sleep(Duration::from_millis(STATE_INTERVAL_MS * 4)).await;
        assert!(rx.try_recv().is_err());

        task.abort();
    }
}
