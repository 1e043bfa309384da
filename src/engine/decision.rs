//! Background decision loop.
//!
//! Turns each scanned code into a verdict, an actuator sequence and an audit
//! record:
//! - read a code from the gateway (I/O errors back off and retry)
//! - check it against the allow-list
//! - pulse green+buzzer or red+buzzer
//! - append the record to the activity log
//!
//! Actuator and log failures are logged and never end the loop; only
//! cancellation does.

use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::device::{DENIED_SEQUENCE, GRANTED_SEQUENCE};
use crate::state::AppState;
use crate::store::{AccessStatus, ActivityEntry};
use crate::types::{Key, Result};

/// Decide on one scanned code.
///
/// Fails only if the allow-list lock is unusable, in which case no verdict
/// is signalled or recorded.
pub async fn evaluate(state: &AppState, key: Key) -> Result<ActivityEntry> {
    let status = AccessStatus::from(state.keys.contains(&key)?);
    let entry = ActivityEntry::now(key, status);

    let sequence = if status.is_granted() {
        GRANTED_SEQUENCE
    } else {
        DENIED_SEQUENCE
    };
    for command in sequence {
        if let Err(e) = state.gateway.write(command).await {
            tracing::error!(actuator = ?command.actuator, "actuator_write_failed: {}", e);
        }
    }

    match state.activity.append(entry.clone()) {
        Ok(Some(slot)) => tracing::debug!(slot = slot.get(), "activity_recorded"),
        Ok(None) => tracing::warn!(
            code = %entry.code,
            capacity = state.activity.capacity(),
            "activity_log_full, record dropped"
        ),
        Err(e) => tracing::error!("activity_append_failed: {}", e),
    }

    tracing::info!(code = %entry.code, status = ?entry.status, "access_decision");
    Ok(entry)
}

/// Owns the background task that services the keypad.
#[derive(Debug)]
pub struct DecisionLoop {
    state: AppState,
    retry_backoff: Duration,
    cancel: Option<CancellationToken>,
}

impl DecisionLoop {
    pub fn new(state: AppState, retry_backoff: Duration) -> Self {
        Self {
            state,
            retry_backoff,
            cancel: None,
        }
    }

    /// Start the loop in the background.
    /// Returns immediately; the loop runs in a spawned task until `stop`.
    pub fn start(&mut self) -> JoinHandle<()> {
        let state = self.state.clone();
        let retry_backoff = self.retry_backoff;
        let cancel = CancellationToken::new();
        // A second start supersedes the first; the old loop is told to stop.
        if let Some(previous) = self.cancel.replace(cancel.clone()) {
            previous.cancel();
        }

        tokio::spawn(
            run(state, retry_backoff, cancel).instrument(tracing::info_span!("decision_loop")),
        )
    }

    /// Signal the loop to stop. The in-flight iteration, if any, completes first.
    pub fn stop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
    }

    /// Run steps 2-5 for a code without a device read.
    pub async fn evaluate(&self, key: Key) -> Result<ActivityEntry> {
        evaluate(&self.state, key).await
    }
}

async fn run(state: AppState, retry_backoff: Duration, cancel: CancellationToken) {
    tracing::info!("decision_loop_started");

    loop {
        let scan = tokio::select! {
            _ = cancel.cancelled() => break,
            scan = state.gateway.read() => scan,
        };

        match scan {
            Ok(key) => {
                if let Err(e) = evaluate(&state, key).await {
                    tracing::error!("access_decision_failed: {}", e);
                }
            }
            Err(e) if e.is_transient() => {
                tracing::warn!("device_read_failed: {}, retrying in {:?}", e, retry_backoff);
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(retry_backoff) => {}
                }
            }
            Err(e) => tracing::warn!("scan_discarded: {}", e),
        }
    }

    tracing::info!("decision_loop_stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{DeviceGateway, ScanFeeder, SimulatedDevice};
    use crate::store::{ActivityLog, KeyStore};
    use crate::types::Error;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use tracing_test::traced_test;

    const BACKOFF: Duration = Duration::from_millis(10);

    fn setup() -> (AppState, Arc<SimulatedDevice>, ScanFeeder) {
        let (device, feeder) = SimulatedDevice::new();
        let state = AppState::new(DeviceGateway::new(device.clone()));
        (state, device, feeder)
    }

    fn key(s: &str) -> Key {
        Key::parse(s).unwrap()
    }

    async fn wait_for_records(state: &AppState, count: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while state.activity.len().unwrap() < count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("activity records should appear");
    }

    #[tokio::test]
    async fn test_known_code_is_granted() {
        let (state, device, _feeder) = setup();
        state.keys.insert(&key("1234")).unwrap();

        let entry = evaluate(&state, key("1234")).await.unwrap();

        assert_eq!(entry.status, AccessStatus::Granted);
        assert_eq!(device.commands().unwrap(), GRANTED_SEQUENCE.to_vec());
        assert_eq!(state.activity.snapshot().unwrap(), vec![entry]);
    }

    #[tokio::test]
    async fn test_unknown_code_is_denied() {
        let (state, device, _feeder) = setup();
        state.keys.insert(&key("1234")).unwrap();

        let entry = evaluate(&state, key("9999")).await.unwrap();

        assert_eq!(entry.status, AccessStatus::Denied);
        assert_eq!(entry.code.as_str(), "9999");
        assert_eq!(device.commands().unwrap(), DENIED_SEQUENCE.to_vec());
    }

    #[tokio::test]
    #[traced_test]
    async fn test_actuator_failure_still_records() {
        let (state, device, _feeder) = setup();
        device.set_fail_writes(true);

        let entry = evaluate(&state, key("5555")).await.unwrap();

        assert_eq!(state.activity.snapshot().unwrap(), vec![entry]);
        assert!(logs_contain("actuator_write_failed"));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_full_log_is_not_fatal() {
        let (device, _feeder) = SimulatedDevice::new();
        let state = AppState::with_stores(
            KeyStore::new(),
            ActivityLog::with_capacity(1),
            DeviceGateway::new(device.clone()),
        );

        evaluate(&state, key("0001")).await.unwrap();
        let second = evaluate(&state, key("0002")).await.unwrap();

        assert_eq!(second.status, AccessStatus::Denied);
        assert_eq!(state.activity.len().unwrap(), 1);
        // Actuators still fire for the dropped record.
        assert_eq!(device.frames().unwrap().len(), 4);
        assert!(logs_contain("activity_log_full"));
    }

    #[tokio::test]
    async fn test_allow_list_lock_failure_drops_scan() {
        let (state, device, _feeder) = setup();
        state.keys.poison();

        let err = evaluate(&state, key("1234")).await.unwrap_err();

        assert!(matches!(err, Error::Lock(_)), "{:?}", err);
        assert!(device.frames().unwrap().is_empty());
        assert!(state.activity.is_empty().unwrap());
    }

    #[tokio::test]
    #[traced_test]
    async fn test_loop_survives_lock_failure() {
        let (state, device, feeder) = setup();
        state.keys.poison();
        let mut decision = DecisionLoop::new(state.clone(), BACKOFF);
        let handle = decision.start();

        feeder.scan("1234").await.unwrap();
        tokio::time::timeout(Duration::from_secs(5), async {
            while !logs_contain("access_decision_failed") {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("lock failure should be logged");

        assert!(device.frames().unwrap().is_empty());
        assert!(state.activity.is_empty().unwrap());

        decision.stop();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_loop_processes_scans() {
        let (state, device, feeder) = setup();
        state.keys.insert(&key("1234")).unwrap();

        let mut decision = DecisionLoop::new(state.clone(), BACKOFF);
        let handle = decision.start();

        feeder.scan("1234").await.unwrap();
        feeder.scan("0000").await.unwrap();
        wait_for_records(&state, 2).await;

        let records = state.activity.snapshot().unwrap();
        assert_eq!(records[0].status, AccessStatus::Granted);
        assert_eq!(records[1].status, AccessStatus::Denied);

        let mut expected = GRANTED_SEQUENCE.to_vec();
        expected.extend(DENIED_SEQUENCE);
        assert_eq!(device.commands().unwrap(), expected);

        decision.stop();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("decision loop should stop")
            .unwrap();
    }

    #[tokio::test]
    #[traced_test]
    async fn test_loop_survives_read_errors_and_bad_scans() {
        let (state, _device, feeder) = setup();
        let mut decision = DecisionLoop::new(state.clone(), BACKOFF);
        let handle = decision.start();

        feeder.fail_read(std::io::ErrorKind::Interrupted).await.unwrap();
        feeder.scan_raw([0, 1, 2, 3]).await.unwrap();
        feeder.scan("7777").await.unwrap();
        wait_for_records(&state, 1).await;

        let records = state.activity.snapshot().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].code.as_str(), "7777");
        assert!(logs_contain("device_read_failed"));
        assert!(logs_contain("scan_discarded"));

        decision.stop();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_evaluate_without_scan() {
        let (state, device, _feeder) = setup();
        state.keys.insert(&key("4242")).unwrap();
        let decision = DecisionLoop::new(state.clone(), BACKOFF);

        let entry = decision.evaluate(key("4242")).await.unwrap();

        assert_eq!(entry.status, AccessStatus::Granted);
        assert_eq!(device.commands().unwrap(), GRANTED_SEQUENCE.to_vec());
        assert_eq!(state.activity.len().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_stop_while_idle() {
        let (state, _device, _feeder) = setup();
        let mut decision = DecisionLoop::new(state, BACKOFF);
        let handle = decision.start();

        tokio::time::sleep(Duration::from_millis(20)).await;
        decision.stop();

        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("idle loop should observe cancellation")
            .unwrap();
    }
}
