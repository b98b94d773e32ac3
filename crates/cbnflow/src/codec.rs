//! Framed codec for the server-push event stream.
//!
//! Frames on raw `\n`-terminated bytes and uses serde_json for the `data:`
//! payload. Works over any AsyncRead; in production that is the response body
//! wrapped in a `StreamReader`.
//!
//! Only well-formed result events are yielded. Comment lines, keep-alives,
//! blank lines, non-UTF-8 or non-JSON payloads, over-long lines and progress
//! events are consumed without ending the stream. Read errors from the
//! underlying transport still surface through `FramedRead`.

use std::io;

use tokio_util::bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;

use crate::protocol::{RawEvent, StreamEvent};

/// Prefix of lines carrying an event payload.
pub const DATA_PREFIX: &str = "data: ";

/// Longest line buffered before it is discarded.
pub const MAX_LINE_LENGTH: usize = 16 * 1024 * 1024;

/// Decoder yielding [`StreamEvent`]s from an event-stream body.
pub struct EventCodec {
    max_length: usize,
    /// Bytes of `src` already searched for a newline.
    next_index: usize,
    /// Dropping the rest of an over-long line.
    discarding: bool,
    skipped: u64,
}

impl Default for EventCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl EventCodec {
    pub fn new() -> Self {
        Self::with_max_length(MAX_LINE_LENGTH)
    }

    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            max_length,
            next_index: 0,
            discarding: false,
            skipped: 0,
        }
    }

    /// Lines seen that did not produce an event.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    fn skip(&mut self, reason: &str) {
        self.skipped += 1;
        tracing::debug!(reason, "Skipping event line");
    }

    fn parse_line(&mut self, line: &[u8]) -> Option<StreamEvent> {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if line.len() > self.max_length {
            self.skip("line too long");
            return None;
        }
        let payload = line.strip_prefix(DATA_PREFIX.as_bytes())?;
        let Ok(payload) = std::str::from_utf8(payload) else {
            self.skip("payload is not utf-8");
            return None;
        };
        let payload = payload.trim();
        if payload.is_empty() {
            return None;
        }
        match serde_json::from_str::<RawEvent>(payload) {
            Ok(raw) => {
                let event = raw.into_event();
                if event.is_none() {
                    self.skipped += 1;
                    tracing::trace!("Event without a usable result");
                }
                event
            }
            Err(e) => {
                self.skipped += 1;
                tracing::debug!(error = %e, "Skipping malformed event payload");
                None
            }
        }
    }
}

impl Decoder for EventCodec {
    type Item = StreamEvent;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            let newline = src[self.next_index..].iter().position(|b| *b == b'\n');
            match (self.discarding, newline) {
                (true, Some(offset)) => {
                    src.advance(self.next_index + offset + 1);
                    self.next_index = 0;
                    self.discarding = false;
                    self.skip("line too long");
                }
                (true, None) => {
                    src.advance(src.len());
                    self.next_index = 0;
                    return Ok(None);
                }
                (false, Some(offset)) => {
                    let end = self.next_index + offset;
                    self.next_index = 0;
                    let line = src.split_to(end + 1);
                    if let Some(event) = self.parse_line(&line[..end]) {
                        return Ok(Some(event));
                    }
                }
                (false, None) if src.len() > self.max_length => {
                    self.discarding = true;
                }
                (false, None) => {
                    self.next_index = src.len();
                    return Ok(None);
                }
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(event) = self.decode(src)? {
            return Ok(Some(event));
        }
        self.next_index = 0;
        if self.discarding || src.is_empty() {
            self.discarding = false;
            src.clear();
            return Ok(None);
        }
        let line = src.split();
        Ok(self.parse_line(&line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use tokio_util::codec::FramedRead;

    async fn decode_all(body: &str) -> (Vec<StreamEvent>, u64) {
        decode_bytes(body.as_bytes(), EventCodec::new()).await
    }

    async fn decode_bytes(body: &[u8], codec: EventCodec) -> (Vec<StreamEvent>, u64) {
        let mut framed = FramedRead::new(body, codec);
        let mut events = Vec::new();
        while let Some(item) = framed.next().await {
            events.push(item.unwrap());
        }
        (events, framed.decoder().skipped())
    }

    #[tokio::test]
    async fn yields_only_result_events() {
        let body = concat!(
            ": keep-alive\n",
            "\n",
            "event: update\n",
            "data: \n",
            "data: {\"id\":\"j1\",\"data\":{\"Final_Result\":\"result-A\"}}\n",
            "data: {not json\n",
            "data: {\"id\":\"j9\",\"data\":{\"status\":\"running\"}}\n",
            "data: {\"id\":\"j2\",\"data\":{\"type\":\"Blob\",\"id\":\"blob9\",\"container\":\"c1\"}}\n",
        );

        let (events, skipped) = decode_all(body).await;
        assert_eq!(
            events,
            vec![
                StreamEvent::inline("j1", "result-A"),
                StreamEvent::blob("j2", "c1", "blob9"),
            ]
        );
        assert_eq!(skipped, 2);
    }

    #[tokio::test]
    async fn handles_crlf_and_missing_trailing_newline() {
        let body = "data: {\"id\":\"j1\",\"data\":{\"Final_Result\":\"a\"}}\r\n\r\ndata: {\"id\":\"j2\",\"data\":{\"Final_Result\":\"b\"}}";
        let (events, _) = decode_all(body).await;
        assert_eq!(
            events,
            vec![StreamEvent::inline("j1", "a"), StreamEvent::inline("j2", "b")]
        );
    }

    #[test]
    fn decode_waits_for_complete_line() {
        let mut codec = EventCodec::new();
        let mut buf = BytesMut::from("data: {\"id\":\"j1\",\"data\":{\"Final");
        assert_eq!(codec.decode(&mut buf).unwrap(), None);

        buf.extend_from_slice(b"_Result\":\"x\"}}\n");
        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some(StreamEvent::inline("j1", "x"))
        );
    }

    #[test]
    fn preserves_multibyte_payloads() {
        let mut codec = EventCodec::new();
        let mut buf = BytesMut::from("data: {\"id\":\"j1\",\"data\":{\"Final_Result\":\"héllo → wörld\"}}\n");
        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some(StreamEvent::inline("j1", "héllo → wörld"))
        );
    }

    #[tokio::test]
    async fn invalid_utf8_line_is_skipped() {
        let mut body = b"data: {\"id\":\"j0\",\"data\":{\"Final_Result\":\"".to_vec();
        body.extend_from_slice(b"\xff\xfe\"}}\n");
        body.extend_from_slice(b"data: {\"id\":\"j1\",\"data\":{\"Final_Result\":\"after\"}}\n");

        let (events, skipped) = decode_bytes(&body, EventCodec::new()).await;
        assert_eq!(events, vec![StreamEvent::inline("j1", "after")]);
        assert_eq!(skipped, 1);
    }

    #[test]
    fn over_long_line_is_discarded_across_reads() {
        let mut codec = EventCodec::with_max_length(32);
        let mut buf = BytesMut::from("data: {\"id\":\"j0\",\"data\":{\"Final_Result\":");
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        assert!(buf.is_empty());

        buf.extend_from_slice(b"\"still going\"}}\ndata: {\"id\":\"j1\",\"data\":{}}\n");
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        assert_eq!(codec.skipped(), 2);

        buf.extend_from_slice(b"data: {\"id\":\"j2\"}\n");
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        assert_eq!(codec.skipped(), 3);
    }

    #[tokio::test]
    async fn over_long_complete_line_does_not_stop_later_events() {
        let body = concat!(
            "data: {\"id\":\"j0\",\"data\":{\"Final_Result\":\"far too long for the limit\"}}\n",
            "data: {\"id\":\"j1\",\"data\":{\"Final_Result\":\"ok\"}}\n",
        );
        let (events, skipped) = decode_bytes(body.as_bytes(), EventCodec::with_max_length(48)).await;
        assert_eq!(events, vec![StreamEvent::inline("j1", "ok")]);
        assert_eq!(skipped, 1);
    }
}
