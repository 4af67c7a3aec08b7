//! Byte-range resolution for partial-content responses
//!
//! The core always materializes the complete payload; this module turns a
//! client `Range` header into a slice of that payload. Only single ranges
//! are sliced; multi-range requests fall back to the full body.

use crate::error::{Result, ServeError};
use bytes::Bytes;

/// An inclusive byte range within a resource of known total length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    /// Starting byte position (inclusive)
    pub start: u64,
    /// Ending byte position (inclusive)
    pub end: u64,
}

impl ByteRange {
    /// Create a new ByteRange
    ///
    /// # Returns
    /// * `Ok(ByteRange)` if the range is valid
    /// * `Err(ServeError::InvalidRange)` if start > end
    pub fn new(start: u64, end: u64) -> Result<Self> {
        if start > end {
            return Err(ServeError::InvalidRange(format!(
                "start ({}) must be <= end ({})",
                start, end
            )));
        }
        Ok(ByteRange { start, end })
    }

    /// Size of this byte range in bytes
    pub fn size(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Resolve a client `Range` header against a resource of `total_len` bytes
    ///
    /// Accepted forms (single range only): `bytes=a-b`, `bytes=a-` and the
    /// suffix form `bytes=-n`.
    ///
    /// # Returns
    /// * `Ok(Some(range))` for a satisfiable single range, clamped to the
    ///   resource length
    /// * `Ok(None)` for a multi-range request (the caller serves the full
    ///   body instead)
    /// * `Err(ServeError::InvalidRange)` for a malformed header or a range
    ///   with no overlap with the resource (maps to 416)
    pub fn resolve(header: &str, total_len: u64) -> Result<Option<Self>> {
        let header = header.trim();
        let spec = header
            .strip_prefix("bytes=")
            .ok_or_else(|| ServeError::InvalidRange(format!("unsupported range unit: {}", header)))?;

        if spec.contains(',') {
            // Multiple ranges are not sliced; the full body is served.
            return Ok(None);
        }

        let (start_str, end_str) = spec
            .split_once('-')
            .ok_or_else(|| ServeError::InvalidRange(format!("missing '-' in range: {}", spec)))?;
        let start_str = start_str.trim();
        let end_str = end_str.trim();

        if start_str.is_empty() {
            // Suffix form: the last n bytes.
            let n = parse_pos(end_str)?;
            if n == 0 || total_len == 0 {
                return Err(ServeError::InvalidRange(format!(
                    "empty suffix range over {} bytes",
                    total_len
                )));
            }
            let n = n.min(total_len);
            return Ok(Some(ByteRange {
                start: total_len - n,
                end: total_len - 1,
            }));
        }

        let start = parse_pos(start_str)?;
        if start >= total_len {
            return Err(ServeError::InvalidRange(format!(
                "start {} beyond resource of {} bytes",
                start, total_len
            )));
        }

        let end = if end_str.is_empty() {
            total_len - 1
        } else {
            parse_pos(end_str)?.min(total_len - 1)
        };

        ByteRange::new(start, end).map(Some)
    }

    /// Render a `Content-Range` header value for a 206 response
    pub fn to_content_range(&self, total_len: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, total_len)
    }

    /// Render the `Content-Range` value for a 416 response
    pub fn unsatisfiable_content_range(total_len: u64) -> String {
        format!("bytes */{}", total_len)
    }

    /// Slice the range out of a complete payload
    ///
    /// The range must already be resolved against `data.len()`.
    pub fn slice(&self, data: &Bytes) -> Bytes {
        data.slice(self.start as usize..=self.end as usize)
    }
}

fn parse_pos(s: &str) -> Result<u64> {
    s.parse::<u64>()
        .map_err(|e| ServeError::InvalidRange(format!("invalid byte position '{}': {}", s, e)))
}
