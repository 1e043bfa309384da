//! Character-device backend for the alarm driver.
//!
//! Scans come from a dedicated reader thread that stays parked in `read` on
//! the node and hands complete codes over a channel. Awaiting a scan is
//! therefore cancellable, and the parked thread never holds up runtime
//! teardown. Frame writes are short and run on the blocking pool.

use async_trait::async_trait;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use tokio::sync::{mpsc, Mutex};

use super::{Peripheral, FRAME_SIZE};
use crate::types::{Result, KEY_SIZE};

type Scan = std::io::Result<[u8; KEY_SIZE]>;

/// The driver node (e.g. `/dev/my_alarm`), opened once read/write for the
/// process lifetime.
#[derive(Debug)]
pub struct CharDevice {
    path: PathBuf,
    file: Arc<File>,
    scans: Mutex<mpsc::Receiver<Scan>>,
}

impl CharDevice {
    /// Open the node and start its reader thread.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = Arc::new(OpenOptions::new().read(true).write(true).open(&path)?);

        // One scan in flight: the reader does not run ahead of the consumer.
        let (tx, rx) = mpsc::channel(1);
        let reader = file.clone();
        let reader_path = path.clone();
        thread::Builder::new()
            .name("keygate-scan-reader".to_string())
            .spawn(move || read_scans(&reader, &reader_path, tx))?;

        tracing::info!("Opened alarm device {}", path.display());
        Ok(Self {
            path,
            file,
            scans: Mutex::new(rx),
        })
    }
}

/// Reader thread body. Exits once the device handle is dropped.
fn read_scans(mut file: &File, path: &Path, tx: mpsc::Sender<Scan>) {
    loop {
        let mut buf = [0u8; KEY_SIZE];
        let scan = file.read_exact(&mut buf).map(|()| buf);
        if tx.blocking_send(scan).is_err() {
            break;
        }
    }
    tracing::debug!("Scan reader for {} stopped", path.display());
}

fn join_error(e: tokio::task::JoinError) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
}

#[async_trait]
impl Peripheral for CharDevice {
    async fn read_scan(&self) -> std::io::Result<[u8; KEY_SIZE]> {
        let mut scans = self.scans.lock().await;
        match scans.recv().await {
            Some(scan) => scan,
            None => Err(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                format!("scan reader for {} exited", self.path.display()),
            )),
        }
    }

    async fn write_frame(&self, frame: [u8; FRAME_SIZE]) -> std::io::Result<usize> {
        let file = self.file.clone();
        tokio::task::spawn_blocking(move || (&*file).write(&frame))
            .await
            .map_err(join_error)?
    }
}
