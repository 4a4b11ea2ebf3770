//! Bounded capture of a child process stream.
//!
//! The job child can be chatty (ffmpeg, whisper, `RUST_LOG=debug`).  Only
//! the last `limit` bytes of each stream are kept; the count of discarded
//! bytes is reported in front of the retained tail.

use std::collections::VecDeque;

use tokio::io::{AsyncRead, AsyncReadExt};

const READ_CHUNK: usize = 8 * 1024;

/// Keeps the tail of a byte stream, at most `limit` bytes.
#[derive(Debug, Clone)]
pub struct BoundedCapture {
    limit: usize,
    buf: VecDeque<u8>,
    dropped: usize,
}

impl BoundedCapture {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            buf: VecDeque::with_capacity(limit.min(READ_CHUNK)),
            dropped: 0,
        }
    }

    pub fn push(&mut self, chunk: &[u8]) {
        // Only the tail of an oversized chunk can survive.
        let chunk = if chunk.len() > self.limit {
            let skip = chunk.len() - self.limit;
            self.dropped += skip;
            &chunk[skip..]
        } else {
            chunk
        };

        let overflow = (self.buf.len() + chunk.len()).saturating_sub(self.limit);
        if overflow > 0 {
            self.buf.drain(..overflow);
            self.dropped += overflow;
        }
        self.buf.extend(chunk);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Bytes discarded to respect the limit.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Lossy UTF-8 rendering of the retained tail.
    ///
    /// ```
    /// use video_transcriber::job::BoundedCapture;
    ///
    /// let mut cap = BoundedCapture::new(4);
    /// cap.push(b"abcdef");
    /// assert_eq!(cap.to_text(), "[2 bytes truncated]\ncdef");
    /// ```
    pub fn to_text(&self) -> String {
        let (a, b) = self.buf.as_slices();
        let mut bytes = Vec::with_capacity(a.len() + b.len());
        bytes.extend_from_slice(a);
        bytes.extend_from_slice(b);
        let text = String::from_utf8_lossy(&bytes);
        if self.dropped > 0 {
            format!("[{} bytes truncated]\n{text}", self.dropped)
        } else {
            text.into_owned()
        }
    }
}

/// Read `reader` to EOF, keeping at most `limit` bytes.
///
/// Read errors end the capture early; what was read so far is kept.
pub async fn drain<R>(mut reader: R, limit: usize) -> BoundedCapture
where
    R: AsyncRead + Unpin,
{
    let mut capture = BoundedCapture::new(limit);
    let mut chunk = vec![0u8; READ_CHUNK];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => capture.push(&chunk[..n]),
            Err(e) => {
                log::debug!("job: capture read error: {e}");
                break;
            }
        }
    }
    capture
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn under_limit_keeps_everything() {
        let mut cap = BoundedCapture::new(16);
        cap.push(b"hello ");
        cap.push(b"world");
        assert_eq!(cap.to_text(), "hello world");
        assert_eq!(cap.dropped(), 0);
    }

    #[test]
    fn over_limit_keeps_tail_across_pushes() {
        let mut cap = BoundedCapture::new(5);
        cap.push(b"abc");
        cap.push(b"defg");
        assert_eq!(cap.len(), 5);
        assert_eq!(cap.dropped(), 2);
        assert!(cap.to_text().ends_with("cdefg"));
    }

    #[test]
    fn zero_limit_keeps_nothing() {
        let mut cap = BoundedCapture::new(0);
        cap.push(b"abc");
        assert!(cap.is_empty());
        assert_eq!(cap.dropped(), 3);
    }

    #[tokio::test]
    async fn drain_bounds_large_streams() {
        let data = vec![b'x'; 100_000];
        let cap = drain(&data[..], 1_024).await;
        assert_eq!(cap.len(), 1_024);
        assert_eq!(cap.dropped(), 100_000 - 1_024);
    }
}
