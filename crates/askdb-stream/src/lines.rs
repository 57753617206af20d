//! Reassembles complete lines from arbitrarily sized byte chunks.

/// Holds the not-yet-terminated tail of the stream for one request.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `chunk` and returns every line it completed, in order.
    ///
    /// The segment after the last `\n` stays buffered. A trailing `\r` is
    /// stripped from each emitted line, so a `\r\n` pair split across two
    /// chunks never leaks into the line content.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);
        let Some(last_newline) = self.buf.iter().rposition(|b| *b == b'\n') else {
            return Vec::new();
        };

        let tail = self.buf.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.buf, tail);
        complete[..last_newline]
            .split(|b| *b == b'\n')
            .map(|raw| {
                let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
                String::from_utf8_lossy(raw).into_owned()
            })
            .collect()
    }

    /// Number of buffered bytes not yet terminated by a newline.
    pub fn pending_len(&self) -> usize {
        self.buf.len()
    }

    /// Ends the stream, discarding any unterminated tail.
    ///
    /// Returns how many bytes were discarded.
    pub fn finish(self) -> usize {
        self.buf.len()
    }
}
