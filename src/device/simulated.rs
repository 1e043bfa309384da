//! In-memory peripheral.
//!
//! Scans are fed through a [`ScanFeeder`]; written frames are recorded and can
//! be inspected with [`SimulatedDevice::commands`]. Used by the test suite and
//! by `keygate --simulate`, which feeds scans from stdin.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, Notify};

use super::{DriverCommand, Peripheral, FRAME_SIZE};
use crate::types::{Error, Result, KEY_SIZE};

type Scan = std::io::Result<[u8; KEY_SIZE]>;

/// Peripheral backed by a channel of scans and a record of written frames.
#[derive(Debug)]
pub struct SimulatedDevice {
    scans: tokio::sync::Mutex<mpsc::Receiver<Scan>>,
    frames: Mutex<Vec<[u8; FRAME_SIZE]>>,
    written: Notify,
    fail_writes: AtomicBool,
}

/// Producer side of a [`SimulatedDevice`].
#[derive(Debug, Clone)]
pub struct ScanFeeder {
    tx: mpsc::Sender<Scan>,
}

impl SimulatedDevice {
    pub fn new() -> (Arc<Self>, ScanFeeder) {
        let (tx, rx) = mpsc::channel(16);
        let device = Arc::new(Self {
            scans: tokio::sync::Mutex::new(rx),
            frames: Mutex::new(Vec::new()),
            written: Notify::new(),
            fail_writes: AtomicBool::new(false),
        });
        (device, ScanFeeder { tx })
    }

    /// Raw frames in write order.
    pub fn frames(&self) -> Result<Vec<[u8; FRAME_SIZE]>> {
        Ok(self.frames.lock()?.clone())
    }

    /// Written frames decoded back into commands.
    pub fn commands(&self) -> Result<Vec<DriverCommand>> {
        self.frames()?.into_iter().map(DriverCommand::decode).collect()
    }

    /// Make subsequent writes fail with an I/O error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Wait until at least `count` frames have been written.
    pub async fn wait_for_frames(&self, count: usize) -> Result<()> {
        loop {
            let notified = self.written.notified();
            if self.frames.lock()?.len() >= count {
                return Ok(());
            }
            notified.await;
        }
    }
}

#[async_trait]
impl Peripheral for SimulatedDevice {
    async fn read_scan(&self) -> std::io::Result<[u8; KEY_SIZE]> {
        let mut scans = self.scans.lock().await;
        match scans.recv().await {
            Some(scan) => scan,
            // Nobody left to press keys: block like an idle keypad.
            None => std::future::pending().await,
        }
    }

    async fn write_frame(&self, frame: [u8; FRAME_SIZE]) -> std::io::Result<usize> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "simulated write failure",
            ));
        }
        self.frames
            .lock()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?
            .push(frame);
        self.written.notify_waiters();
        Ok(FRAME_SIZE)
    }
}

impl ScanFeeder {
    /// Queue a scanned code. Fails if the device has been dropped.
    pub async fn scan(&self, code: &str) -> Result<()> {
        let raw: [u8; KEY_SIZE] = code
            .as_bytes()
            .try_into()
            .map_err(|_| Error::validation(format!("scan must be {} bytes: {:?}", KEY_SIZE, code)))?;
        self.send(Ok(raw)).await
    }

    /// Queue raw scan bytes without validation.
    pub async fn scan_raw(&self, raw: [u8; KEY_SIZE]) -> Result<()> {
        self.send(Ok(raw)).await
    }

    /// Queue a read failure.
    pub async fn fail_read(&self, kind: std::io::ErrorKind) -> Result<()> {
        self.send(Err(std::io::Error::new(kind, "simulated read failure")))
            .await
    }

    async fn send(&self, scan: Scan) -> Result<()> {
        self.tx
            .send(scan)
            .await
            .map_err(|_| Error::cancelled("simulated device dropped"))
    }
}
