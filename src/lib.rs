//! Test-only library interface for ble-connect.
//!
//! This module exposes the hardware-independent logic - the peripheral
//! session controller, CCCD decoding and advertising payloads -
//! so it can be tested on the host (no embedded hardware required).
//!
//! Usage: `cargo test --lib` (unit) or `cargo test` (unit + integration)
//!
//! Note: The embedded binary uses main.rs with #![no_std] and #![no_main].
//! This lib.rs provides a separate entry point for host-based testing.

#![cfg_attr(not(test), no_std)]

mod fmt;

pub mod config;
pub mod error;

// ═══════════════════════════════════════════════════════════════════════════
// BLE Module Re-exports
// ═══════════════════════════════════════════════════════════════════════════

// Only the hardware-independent half of `src/ble/`; `server` and
// `peripheral` need the SoftDevice and live in the binary alone.
pub mod ble {
    pub mod adv;
    pub mod cccd;
    pub mod session;

    pub use cccd::Subscription;
    pub use session::{
        push_pattern, Advertiser, Characteristic, DescriptorOutcome, GattLayout, GattStack, PayloadSink,
        PeripheralSession, Properties,
    };
}

pub use error::Error;

// ═══════════════════════════════════════════════════════════════════════════
// Unit Tests
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::ble::cccd::CccdError;
    use super::ble::*;
    use super::config;
    use super::Error;

    // ════════════════════════════════════════════════════════════════════════
    // Recording fakes
    // ════════════════════════════════════════════════════════════════════════

    #[derive(Default)]
    struct FakeCharacteristic {
        value: Vec<u8>,
        sets: usize,
        notifies: usize,
        indicates: usize,
        fail_push: bool,
    }

    impl Characteristic for FakeCharacteristic {
        fn set_value(&mut self, value: &[u8]) -> Result<(), Error> {
            if value.len() > config::MAX_VALUE_LEN {
                return Err(Error::ValueTooLong);
            }
            self.value = value.to_vec();
            self.sets += 1;
            Ok(())
        }

        fn notify(&mut self) -> Result<(), Error> {
            if self.fail_push {
                return Err(Error::NotConnected);
            }
            self.notifies += 1;
            Ok(())
        }

        fn indicate(&mut self) -> Result<(), Error> {
            if self.fail_push {
                return Err(Error::NotConnected);
            }
            self.indicates += 1;
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeAdvertiser {
        starts: usize,
        refuse_restarts: bool,
    }

    impl Advertiser for FakeAdvertiser {
        fn start(&mut self) -> Result<(), Error> {
            self.starts += 1;
            if self.refuse_restarts && self.starts > 1 {
                return Err(Error::Advertise);
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeSink {
        calls: Vec<Vec<u8>>,
    }

    impl PayloadSink for FakeSink {
        fn parse(&mut self, text: &[u8]) {
            self.calls.push(text.to_vec());
        }
    }

    #[derive(Default)]
    struct FakeStack {
        layouts: Vec<GattLayout>,
        refuse_register: bool,
        omit_cccd: bool,
        refuse_restarts: bool,
    }

    impl GattStack for FakeStack {
        type Characteristic = FakeCharacteristic;
        type Advertiser = FakeAdvertiser;

        fn register(&mut self, layout: &GattLayout) -> Result<FakeCharacteristic, Error> {
            if self.refuse_register {
                return Err(Error::Register);
            }
            self.layouts.push(*layout);
            layout.check_cccd(if self.omit_cccd { 0 } else { 0x000d })?;
            Ok(FakeCharacteristic {
                value: layout.initial_value.to_vec(),
                ..Default::default()
            })
        }

        fn advertiser(&mut self) -> Result<FakeAdvertiser, Error> {
            Ok(FakeAdvertiser {
                refuse_restarts: self.refuse_restarts,
                ..Default::default()
            })
        }
    }

    type Session = PeripheralSession<FakeCharacteristic, FakeAdvertiser, FakeSink>;

    fn session() -> Session {
        let mut stack = FakeStack::default();
        Session::initialize(&mut stack, FakeSink::default()).unwrap()
    }

    // ════════════════════════════════════════════════════════════════════════
    // Initialization Tests
    // ════════════════════════════════════════════════════════════════════════

    #[test]
    fn initialize_registers_device_layout() {
        let mut stack = FakeStack::default();
        let _session = Session::initialize(&mut stack, FakeSink::default()).unwrap();

        assert_eq!(stack.layouts.len(), 1);
        let layout = stack.layouts[0];
        assert_eq!(layout.service, config::SERVICE_UUID);
        assert_eq!(layout.characteristic, config::CHARACTERISTIC_UUID);
        assert!(layout.properties.contains(Properties::READ));
        assert!(layout.properties.contains(Properties::WRITE));
        assert!(layout.properties.contains(Properties::NOTIFY));
        assert!(layout.properties.contains(Properties::INDICATE));
        assert!(layout.has_cccd());
    }

    #[test]
    fn initialize_sets_initial_value_and_advertises() {
        let session = session();
        assert_eq!(GattLayout::device().initial_value, &[0x11, 0x22, 0x33]);
        assert_eq!(session.characteristic().value, [0x11, 0x22, 0x33]);
        // The value comes with the attribute; no update is issued during bring-up.
        assert_eq!(session.characteristic().sets, 0);
        assert_eq!(session.advertiser().starts, 1);
        assert_eq!(session.characteristic().notifies, 0);
        assert_eq!(session.characteristic().indicates, 0);
    }

    #[test]
    fn initialize_propagates_registration_failure() {
        let mut stack = FakeStack {
            refuse_register: true,
            ..Default::default()
        };
        let result = Session::initialize(&mut stack, FakeSink::default());
        assert_eq!(result.err(), Some(Error::Register));
    }

    #[test]
    fn initialize_fails_when_cccd_missing() {
        let mut stack = FakeStack {
            omit_cccd: true,
            ..Default::default()
        };
        let result = Session::initialize(&mut stack, FakeSink::default());
        assert_eq!(result.err(), Some(Error::Register));
    }

    #[test]
    fn cccd_required_only_for_pushes() {
        let layout = GattLayout::device();
        assert!(layout.has_cccd());
        assert_eq!(layout.check_cccd(0), Err(Error::Register));
        assert_eq!(layout.check_cccd(0x000d), Ok(()));

        let read_write = GattLayout {
            properties: Properties::READ.union(Properties::WRITE),
            ..layout
        };
        assert!(!read_write.has_cccd());
        assert_eq!(read_write.check_cccd(0), Ok(()));
    }

    // ════════════════════════════════════════════════════════════════════════
    // Connection Tests
    // ════════════════════════════════════════════════════════════════════════

    #[test]
    fn connect_changes_nothing() {
        let mut session = session();
        session.on_connect();
        assert_eq!(session.characteristic().value, config::INITIAL_VALUE);
        assert_eq!(session.advertiser().starts, 1);
    }

    #[test]
    fn each_disconnect_restarts_advertising_once() {
        let mut session = session();
        for n in 1..=5 {
            session.on_connect();
            session.on_disconnect();
            assert_eq!(session.advertiser().starts, 1 + n);
        }
    }

    #[test]
    fn failed_restart_is_logged_not_fatal() {
        let mut stack = FakeStack {
            refuse_restarts: true,
            ..Default::default()
        };
        let mut session = Session::initialize(&mut stack, FakeSink::default()).unwrap();

        session.on_disconnect();
        session.on_disconnect();
        assert_eq!(session.advertiser().starts, 3);

        // Still answering events.
        assert_eq!(session.on_read(), &config::READ_RESPONSE);
        assert!(session.on_write(b"after"));
    }

    // ════════════════════════════════════════════════════════════════════════
    // Read / Write Tests
    // ════════════════════════════════════════════════════════════════════════

    #[test]
    fn read_always_serves_deadbeef() {
        let mut session = session();
        assert_eq!(session.on_read(), &[0xde, 0xed, 0xbe, 0xef]);
        assert_eq!(session.characteristic().value, [0xde, 0xed, 0xbe, 0xef]);

        session.on_descriptor_write(&[0x01, 0x00]);
        assert_eq!(session.on_read(), &config::READ_RESPONSE);
        assert_eq!(session.characteristic().value, config::READ_RESPONSE);
    }

    #[test]
    fn write_forwards_payload_once() {
        let mut session = session();
        assert!(session.on_write(b"hello"));
        assert_eq!(session.sink().calls, vec![b"hello".to_vec()]);
    }

    #[test]
    fn empty_write_is_ignored() {
        let mut session = session();
        assert!(!session.on_write(&[]));
        assert!(session.sink().calls.is_empty());
    }

    #[test]
    fn binary_write_is_forwarded_raw() {
        let mut session = session();
        assert!(session.on_write(&[0xff, 0x00, 0x80]));
        assert_eq!(session.sink().calls, vec![vec![0xff, 0x00, 0x80]]);
    }

    #[test]
    fn write_does_not_touch_value() {
        let mut session = session();
        session.on_write(b"cmd");
        assert_eq!(session.characteristic().value, config::INITIAL_VALUE);
    }

    // ════════════════════════════════════════════════════════════════════════
    // Descriptor Write Tests
    // ════════════════════════════════════════════════════════════════════════

    #[test]
    fn push_pattern_counts_up() {
        let pattern = push_pattern();
        assert_eq!(pattern.len(), 15);
        for (i, b) in pattern.iter().enumerate() {
            assert_eq!(*b as usize, i);
        }
    }

    #[test]
    fn notify_enable_pushes_pattern() {
        let mut session = session();
        let outcome = session.on_descriptor_write(&[0x01, 0x00]);
        assert_eq!(outcome, DescriptorOutcome::Pushed(Subscription::Notify));
        assert_eq!(session.characteristic().value, push_pattern());
        assert_eq!(session.characteristic().notifies, 1);
        assert_eq!(session.characteristic().indicates, 0);
    }

    #[test]
    fn indicate_enable_pushes_pattern() {
        let mut session = session();
        let outcome = session.on_descriptor_write(&[0x02, 0x00]);
        assert_eq!(outcome, DescriptorOutcome::Pushed(Subscription::Indicate));
        assert_eq!(session.characteristic().value, push_pattern());
        assert_eq!(session.characteristic().notifies, 0);
        assert_eq!(session.characteristic().indicates, 1);
    }

    #[test]
    fn disable_leaves_value_alone() {
        let mut session = session();
        session.on_read();
        let outcome = session.on_descriptor_write(&[0x00, 0x00]);
        assert_eq!(outcome, DescriptorOutcome::Disabled);
        assert_eq!(session.characteristic().value, config::READ_RESPONSE);
        assert_eq!(session.characteristic().notifies, 0);
        assert_eq!(session.characteristic().indicates, 0);
    }

    #[test]
    fn malformed_descriptor_writes_are_ignored() {
        let mut session = session();
        let cases: [(&[u8], CccdError); 5] = [
            (&[], CccdError::Length(0)),
            (&[0x01], CccdError::Length(1)),
            (&[0x01, 0x00, 0x00], CccdError::Length(3)),
            (&[0x03, 0x00], CccdError::Unknown(0x0003)),
            (&[0x00, 0x01], CccdError::Unknown(0x0100)),
        ];

        for (data, err) in cases {
            assert_eq!(session.on_descriptor_write(data), DescriptorOutcome::Rejected(err));
            assert_eq!(session.characteristic().value, config::INITIAL_VALUE);
            assert_eq!(session.characteristic().notifies, 0);
            assert_eq!(session.characteristic().indicates, 0);
        }
    }

    #[test]
    fn push_failure_is_reported_not_fatal() {
        let mut session = session();
        session.characteristic_mut().fail_push = true;

        let outcome = session.on_descriptor_write(&[0x01, 0x00]);
        assert_eq!(outcome, DescriptorOutcome::Failed(Error::NotConnected));

        // The session keeps answering events afterwards.
        assert_eq!(session.on_read(), &config::READ_RESPONSE);
    }
}
