//! Gateway to the keypad/alarm peripheral.
//!
//! Reads return one scanned code (exactly `KEY_SIZE` bytes). Writes send one
//! 2-byte actuator frame. All writers share a single lock so frames from the
//! decision loop and from admin requests never interleave on the wire.

mod chardev;
mod command;
mod simulated;

pub use chardev::CharDevice;
pub use command::{
    Actuator, DriverCommand, ADMIN_ACK, DENIED_SEQUENCE, FRAME_SIZE, GRANTED_SEQUENCE,
};
pub use simulated::{ScanFeeder, SimulatedDevice};

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::types::{Error, Key, Result, KEY_SIZE};

/// Byte-level access to the peripheral. Implementations hold no mutable
/// state that callers must coordinate; serialization of writes is the
/// gateway's job.
#[async_trait]
pub trait Peripheral: Send + Sync + fmt::Debug {
    /// Block until a code is scanned.
    async fn read_scan(&self) -> std::io::Result<[u8; KEY_SIZE]>;

    /// Write one frame, returning how many bytes the device accepted.
    async fn write_frame(&self, frame: [u8; FRAME_SIZE]) -> std::io::Result<usize>;
}

/// Shared handle used by the decision loop and request handlers.
pub struct DeviceGateway {
    device: Arc<dyn Peripheral>,
    write_lock: Mutex<()>,
}

impl fmt::Debug for DeviceGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceGateway")
            .field("device", &self.device)
            .finish_non_exhaustive()
    }
}

impl DeviceGateway {
    pub fn new(device: Arc<dyn Peripheral>) -> Self {
        Self {
            device,
            write_lock: Mutex::new(()),
        }
    }

    /// Send one actuator command.
    pub async fn write(&self, command: DriverCommand) -> Result<()> {
        let frame = command.encode();
        let _guard = self.write_lock.lock().await;
        let written = self.device.write_frame(frame).await?;
        if written != FRAME_SIZE {
            return Err(Error::device(format!(
                "short write for {:?}: {} of {} bytes",
                command.actuator, written, FRAME_SIZE
            )));
        }
        tracing::trace!(actuator = ?command.actuator, duration = command.duration, "Actuator command sent");
        Ok(())
    }

    /// Wait for the next scanned code.
    ///
    /// I/O failures come back as `Error::Io` (transient); bytes that do not
    /// form a valid key come back as `Error::Validation`.
    pub async fn read(&self) -> Result<Key> {
        let raw = self.device.read_scan().await?;
        Key::from_scan(raw)
    }
}
