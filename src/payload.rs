//! Hand-off of client writes to the command parser.
//!
//! The write handler runs inside the SoftDevice event dispatch and must
//! not block, so payloads are queued and consumed by [`payload_task`].
//! Interpreting the text is the parser's business; this module only
//! delivers it.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use heapless::Vec;

use crate::ble::session::PayloadSink;
use crate::config::{MAX_WRITE_LEN, PAYLOAD_QUEUE_DEPTH};

pub type Payload = Vec<u8, MAX_WRITE_LEN>;

static PAYLOADS: Channel<CriticalSectionRawMutex, Payload, PAYLOAD_QUEUE_DEPTH> = Channel::new();

/// Sink that queues each write for the payload task.
pub struct PayloadQueue;

impl PayloadSink for PayloadQueue {
    fn parse(&mut self, text: &[u8]) {
        let mut payload = Payload::new();
        if payload.extend_from_slice(text).is_err() {
            warn!("payload of {} bytes exceeds {} - dropping", text.len(), MAX_WRITE_LEN);
            return;
        }
        // try_send avoids blocking the event dispatch; if the parser is behind, we drop.
        if PAYLOADS.try_send(payload).is_err() {
            warn!("payload queue full - dropping write");
        }
    }
}

/// Drain the queue into the command parser.
pub async fn payload_task() -> ! {
    loop {
        let payload = PAYLOADS.receive().await;
        parse_data_communication(&payload);
    }
}

/// Command parser entry point.
fn parse_data_communication(text: &[u8]) {
    match core::str::from_utf8(text) {
        Ok(s) => info!("parser: {}", s),
        Err(_) => info!("parser: {} non-UTF-8 bytes", text.len()),
    }
}
