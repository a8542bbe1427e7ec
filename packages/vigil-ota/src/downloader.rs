use vigil_types::OtaError;

/// Abstracts the image transport so the state machine is testable without a
/// real HTTPS stack. `fetch_chunk` is polled repeatedly; `abort` mid-flight
/// must cause a clean tear-down rather than a further chunk.
pub trait Downloader: Send {
    fn total_bytes(&self) -> u64;
    /// Returns the next chunk, or `Ok(None)` once the transfer is complete.
    fn fetch_chunk(&mut self) -> Result<Option<Vec<u8>>, OtaError>;
}

/// In-memory downloader for tests: serves a fixed image in fixed-size
/// chunks, optionally failing partway through.
pub struct MockDownloader {
    image: Vec<u8>,
    chunk_size: usize,
    offset: usize,
    fail_after_bytes: Option<u64>,
}

impl MockDownloader {
    pub fn new(image: Vec<u8>, chunk_size: usize) -> Self {
        Self {
            image,
            chunk_size,
            offset: 0,
            fail_after_bytes: None,
        }
    }

    pub fn failing_after(image: Vec<u8>, chunk_size: usize, fail_after_bytes: u64) -> Self {
        Self {
            image,
            chunk_size,
            offset: 0,
            fail_after_bytes: Some(fail_after_bytes),
        }
    }
}

impl Downloader for MockDownloader {
    fn total_bytes(&self) -> u64 {
        self.image.len() as u64
    }

    fn fetch_chunk(&mut self) -> Result<Option<Vec<u8>>, OtaError> {
        if let Some(limit) = self.fail_after_bytes {
            if self.offset as u64 >= limit {
                return Err(OtaError::DownloadFailed);
            }
        }
        if self.offset >= self.image.len() {
            return Ok(None);
        }
        let end = (self.offset + self.chunk_size).min(self.image.len());
        let chunk = self.image[self.offset..end].to_vec();
        self.offset = end;
        Ok(Some(chunk))
    }
}
