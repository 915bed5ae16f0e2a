//! The seam between session logic and the byte transport.

use clanview_model::Packet;
use serde_json::json;

use crate::error::{Error, Result};

/// Outcome of transport activity, delivered back to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Opened,
    OpenFailed(String),
    Closed(String),
    /// One inbound text frame
    Frame(String),
}

/// A duplex text-frame transport.
///
/// `open` only starts the attempt; success or failure comes back later as a
/// [`TransportEvent`].
pub trait Link {
    fn open(&mut self);

    fn close(&mut self);

    fn send(&mut self, frame: String) -> Result<()>;
}

/// Link that records every call instead of talking to a server.
///
/// Backs headless runs and the scenario tests.
#[derive(Debug, Default)]
pub struct RecordingLink {
    pub opens: usize,
    pub closes: usize,
    pub sent: Vec<String>,
    /// Make every send fail
    pub refuse_sends: bool,
}

impl RecordingLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Event names of the frames sent so far, in order.
    pub fn sent_events(&self) -> Vec<String> {
        self.sent_frames()
            .iter()
            .filter_map(|frame| frame["event"].as_str().map(str::to_string))
            .collect()
    }

    /// Sent event packets as `{"event": name, "data": payload}` values.
    ///
    /// `data` is absent for payload-less events.
    pub fn sent_frames(&self) -> Vec<serde_json::Value> {
        self.sent
            .iter()
            .filter_map(|frame| match Packet::decode(frame) {
                Ok(Packet::Event {
                    name,
                    payload: Some(payload),
                }) => Some(json!({ "event": name, "data": payload })),
                Ok(Packet::Event {
                    name,
                    payload: None,
                }) => Some(json!({ "event": name })),
                _ => None,
            })
            .collect()
    }

    pub fn clear_sent(&mut self) {
        self.sent.clear();
    }
}

impl Link for RecordingLink {
    fn open(&mut self) {
        self.opens += 1;
    }

    fn close(&mut self) {
        self.closes += 1;
    }

    fn send(&mut self, frame: String) -> Result<()> {
        if self.refuse_sends {
            return Err(Error::Transport("link refused frame".into()));
        }
        self.sent.push(frame);
        Ok(())
    }
}
