//! Holder of the single open port handle.

use crate::port::{PortError, PortObserver, SerialLink};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

/// The live serial connection, shared between the registry and callers.
///
/// The link sits behind a mutex because writes, liveness checks and closes
/// need exclusive access; callers only ever see `&PortHandle`. The open flag
/// is read through the observer so status checks never wait on a write.
pub struct PortHandle {
    id: u64,
    path: String,
    baud_rate: u32,
    observer: PortObserver,
    link: Mutex<Box<dyn SerialLink>>,
}

impl PortHandle {
    pub fn new(id: u64, path: impl Into<String>, baud_rate: u32, link: Box<dyn SerialLink>) -> Self {
        Self {
            id,
            path: path.into(),
            baud_rate,
            observer: link.observer().clone(),
            link: Mutex::new(link),
        }
    }

    /// Connection id, unique for the lifetime of the process.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    pub fn is_open(&self) -> bool {
        self.observer.is_open()
    }

    pub fn write(&self, data: &[u8]) -> Result<usize, PortError> {
        self.link.lock().write_bytes(data)
    }

    pub fn drain(&self) -> Result<(), PortError> {
        self.link.lock().drain()
    }

    pub fn check_alive(&self) -> Result<(), PortError> {
        self.link.lock().check_alive()
    }

    pub fn close(&self) -> Result<(), PortError> {
        self.link.lock().close()
    }
}

impl std::fmt::Debug for PortHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortHandle")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("baud_rate", &self.baud_rate)
            .field("open", &self.is_open())
            .finish()
    }
}

/// Process-wide slot for at most one [`PortHandle`].
///
/// Cloning shares the slot. Only the lifecycle manager mutates it; everyone
/// else reads.
#[derive(Debug, Clone, Default)]
pub struct PortRegistry {
    slot: Arc<RwLock<Option<Arc<PortHandle>>>>,
}

impl PortRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The registered handle, if any.
    pub fn get(&self) -> Option<Arc<PortHandle>> {
        self.slot.read().clone()
    }

    pub(crate) fn set(&self, handle: Arc<PortHandle>) {
        *self.slot.write() = Some(handle);
    }

    /// Empty the slot, returning what was there.
    pub(crate) fn clear(&self) -> Option<Arc<PortHandle>> {
        self.slot.write().take()
    }
}
