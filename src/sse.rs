//! Streaming frame decoder.
//!
//! Incoming bytes are buffered and cut into line-delimited SSE frames.
//! Decoding is an explicit state machine so that partial frames split
//! across network reads are unambiguous: the decoder stays in `InBody`
//! holding the incomplete tail until the next chunk completes it.

use serde_json::Value;

use crate::error::BenchError;

/// The literal sentinel that terminates an OpenAI-style stream
const DONE_SENTINEL: &str = "[DONE]";

/// Decoder state, driven by frame boundaries and the sentinel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No bytes seen yet
    AwaitingHeader,
    /// Stream is open, frames are being decoded
    InBody,
    /// Sentinel received; trailing bytes are ignored
    Terminated,
    /// A malformed frame was seen; the decoder will not recover
    Errored,
}

/// One decoded frame
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// A `data:` frame carrying a JSON payload
    Data(Value),
    /// The terminal sentinel
    Done,
}

/// Buffering line decoder for one streaming response
#[derive(Debug)]
pub struct FrameDecoder {
    buffer: String,
    phase: Phase,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
            phase: Phase::AwaitingHeader,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Whether the terminal sentinel was received
    pub fn terminated(&self) -> bool {
        self.phase == Phase::Terminated
    }

    /// Feed raw bytes and extract every complete frame.
    ///
    /// Frames decoded before a malformed line are returned alongside
    /// the error that stopped decoding, so observations made earlier
    /// in the same chunk are never lost. An error poisons the decoder.
    /// Invalid UTF-8 is replaced rather than rejected, matching how
    /// lossy decoding of chunk boundaries behaves.
    pub fn feed(&mut self, chunk: &[u8]) -> (Vec<Frame>, Option<BenchError>) {
        if matches!(self.phase, Phase::Terminated | Phase::Errored) {
            return (Vec::new(), None);
        }

        if !chunk.is_empty() {
            self.phase = Phase::InBody;
            self.buffer.push_str(&String::from_utf8_lossy(chunk));
        }

        let mut frames = Vec::new();

        while let Some(pos) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=pos).collect();
            if let Some(err) = self.decode_line(&line, &mut frames) {
                return (frames, Some(err));
            }
            if self.phase == Phase::Terminated {
                self.buffer.clear();
                break;
            }
        }

        (frames, None)
    }

    /// Decode whatever the buffer still holds once the stream has
    /// closed. A final frame may arrive without its trailing newline.
    pub fn finish(&mut self) -> (Vec<Frame>, Option<BenchError>) {
        if matches!(self.phase, Phase::Terminated | Phase::Errored) {
            return (Vec::new(), None);
        }

        let tail = std::mem::take(&mut self.buffer);
        let mut frames = Vec::new();
        let err = self.decode_line(&tail, &mut frames);
        (frames, err)
    }

    /// Decode one line. A line that is neither an SSE field nor a
    /// comment is a protocol error.
    fn decode_line(&mut self, raw: &str, frames: &mut Vec<Frame>) -> Option<BenchError> {
        let line = raw.trim_end_matches(['\n', '\r']);

        if line.is_empty() {
            // Event boundary
            return None;
        }

        if let Some(payload) = line.strip_prefix("data:") {
            let payload = payload.trim();
            if payload == DONE_SENTINEL {
                self.phase = Phase::Terminated;
                frames.push(Frame::Done);
                return None;
            }

            match serde_json::from_str::<Value>(payload) {
                Ok(json) => {
                    frames.push(Frame::Data(json));
                    None
                }
                Err(e) => {
                    self.phase = Phase::Errored;
                    Some(BenchError::Protocol(format!("malformed data frame: {}", e)))
                }
            }
        } else if line.starts_with(':')
            || line.starts_with("event:")
            || line.starts_with("id:")
            || line.starts_with("retry:")
        {
            // SSE metadata fields carry no content
            None
        } else {
            self.phase = Phase::Errored;
            let preview: String = line.chars().take(80).collect();
            Some(BenchError::Protocol(format!(
                "unexpected stream line: {}",
                preview
            )))
        }
    }
}
