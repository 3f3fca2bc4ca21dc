//! Line framing for the chunked response body
//!
//! Network reads split the body at arbitrary byte offsets, including in the
//! middle of a line or a multi-byte character. The decoder keeps exactly one
//! pending partial line between calls and only yields fully delimited lines.
//! One decoder is created per request.

/// Incremental newline-delimited decoder
#[derive(Debug, Default)]
pub struct FrameDecoder {
    /// Decoded text after the last line terminator
    pending: String,
    /// Trailing bytes of an incomplete UTF-8 sequence
    carry: Vec<u8>,
    bytes_seen: usize,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk and return every line it completes, in order.
    ///
    /// Lines are returned without their terminator; a trailing `\r` is
    /// stripped so CRLF-framed streams decode the same as LF-framed ones.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.bytes_seen += chunk.len();
        self.decode_into_pending(chunk);
        self.drain_complete_lines()
    }

    /// End of stream: flush whatever is left as a final line.
    ///
    /// Returns `None` when nothing was pending.
    pub fn finish(mut self) -> Option<String> {
        if !self.carry.is_empty() {
            let tail = std::mem::take(&mut self.carry);
            self.pending.push_str(&String::from_utf8_lossy(&tail));
        }
        if self.pending.is_empty() {
            return None;
        }
        Some(strip_cr(&self.pending).to_string())
    }

    /// Bytes fed so far
    pub fn bytes_seen(&self) -> usize {
        self.bytes_seen
    }

    fn decode_into_pending(&mut self, chunk: &[u8]) {
        self.carry.extend_from_slice(chunk);

        let mut consumed = 0;
        while consumed < self.carry.len() {
            let rest = &self.carry[consumed..];
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    self.pending.push_str(text);
                    consumed = self.carry.len();
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    self.pending
                        .push_str(std::str::from_utf8(&rest[..valid]).unwrap_or_default());
                    match e.error_len() {
                        Some(invalid) => {
                            self.pending.push(char::REPLACEMENT_CHARACTER);
                            consumed += valid + invalid;
                        }
                        // Incomplete sequence at the end; wait for the next chunk
                        None => {
                            consumed += valid;
                            break;
                        }
                    }
                }
            }
        }

        self.carry.drain(..consumed);
    }

    fn drain_complete_lines(&mut self) -> Vec<String> {
        let Some(last_newline) = self.pending.rfind('\n') else {
            return Vec::new();
        };

        let remainder = self.pending.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.pending, remainder);

        complete
            .split_terminator('\n')
            .map(|line| strip_cr(line).to_string())
            .collect()
    }
}

fn strip_cr(line: &str) -> &str {
    line.strip_suffix('\r').unwrap_or(line)
}
