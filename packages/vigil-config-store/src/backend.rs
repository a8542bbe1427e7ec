use std::collections::HashMap;

/// Abstraction over the NVS-like key/value flash backend, so the atomic
/// write sequence can be exercised under simulated power loss without real
/// hardware. Keys are the record-slot names (`zones`, `zones_prev`,
/// `zones_new`, `device`, `network`, `security`, `calibration`).
pub trait NvsBackend {
    fn get_blob(&self, key: &str) -> Option<Vec<u8>>;
    fn set_blob(&mut self, key: &str, data: &[u8]) -> Result<(), ()>;
    fn erase(&mut self, key: &str);
    fn commit(&mut self) -> Result<(), ()>;
}

/// In-memory backend used by tests and by hosts without real NVS. Supports
/// injected failures at a chosen future write/commit to simulate power loss
/// mid-sequence.
#[derive(Default)]
pub struct MemoryBackend {
    blobs: HashMap<String, Vec<u8>>,
    /// When `Some(0)`, the next `set_blob`/`commit` call fails instead of
    /// succeeding; decremented on every call otherwise.
    fail_in: Option<u32>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            blobs: HashMap::new(),
            fail_in: None,
        }
    }

    /// Arranges for the `n`th subsequent write-affecting call to fail.
    /// `fail_in(0)` fails the very next call.
    pub fn fail_in(&mut self, n: u32) {
        self.fail_in = Some(n);
    }

    fn should_fail(&mut self) -> bool {
        match self.fail_in {
            Some(0) => {
                self.fail_in = None;
                true
            }
            Some(n) => {
                self.fail_in = Some(n - 1);
                false
            }
            None => false,
        }
    }
}

impl NvsBackend for MemoryBackend {
    fn get_blob(&self, key: &str) -> Option<Vec<u8>> {
        self.blobs.get(key).cloned()
    }

    fn set_blob(&mut self, key: &str, data: &[u8]) -> Result<(), ()> {
        if self.should_fail() {
            return Err(());
        }
        self.blobs.insert(key.to_string(), data.to_vec());
        Ok(())
    }

    fn erase(&mut self, key: &str) {
        self.blobs.remove(key);
    }

    fn commit(&mut self) -> Result<(), ()> {
        if self.should_fail() {
            return Err(());
        }
        Ok(())
    }
}
