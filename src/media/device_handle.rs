use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

/// An open capture device. Holding one keeps the device "in use" (think camera LED)
/// until [`DeviceHandle::release`] is called or the handle is dropped.
#[derive(Debug)]
pub struct DeviceHandle {
    device_id: String,
    label: String,
    live: Arc<AtomicUsize>,
    released: AtomicBool,
}

impl DeviceHandle {
    /// Opens a handle and bumps the shared live-capture counter.
    pub(crate) fn open(device_id: &str, label: &str, live: Arc<AtomicUsize>) -> Self {
        live.fetch_add(1, Ordering::SeqCst);
        Self {
            device_id: device_id.to_owned(),
            label: label.to_owned(),
            live,
            released: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    /// Frees the device. Idempotent.
    pub fn release(&self) {
        if !self.released.swap(true, Ordering::SeqCst) {
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl Drop for DeviceHandle {
    fn drop(&mut self) {
        self.release();
    }
}
