//! Peripheral session controller.
//!
//! Wires the GATT topology once, then answers each event the stack
//! delivers. The stack serializes event delivery, so every handler takes
//! `&mut self` and runs to completion without blocking.
//!
//! The BLE stack is reached only through the traits in this module:
//! the firmware implements them on top of the SoftDevice, tests implement
//! them with recording fakes.

use crate::ble::cccd::{self, CccdError, Subscription};
use uuid::Uuid;

use crate::config;
use crate::error::Error;

/// Characteristic properties advertised in the GATT declaration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Properties(u8);

impl Properties {
    pub const READ: Self = Self(0x02);
    pub const WRITE: Self = Self(0x08);
    pub const NOTIFY: Self = Self(0x10);
    pub const INDICATE: Self = Self(0x20);

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

/// What gets registered with the stack.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GattLayout {
    pub service: Uuid,
    pub characteristic: Uuid,
    pub properties: Properties,
    /// Value the attribute is created with.
    pub initial_value: &'static [u8],
    /// Maximum value length; the value itself is variable length.
    pub max_len: usize,
}

impl GattLayout {
    /// The one service / one characteristic layout this device exposes.
    pub const fn device() -> Self {
        Self {
            service: config::SERVICE_UUID,
            characteristic: config::CHARACTERISTIC_UUID,
            properties: Properties::READ
                .union(Properties::WRITE)
                .union(Properties::NOTIFY)
                .union(Properties::INDICATE),
            initial_value: &config::INITIAL_VALUE,
            max_len: config::MAX_VALUE_LEN,
        }
    }

    /// Notify or indicate requires a CCCD on the characteristic.
    pub const fn has_cccd(&self) -> bool {
        self.properties.contains(Properties::NOTIFY) || self.properties.contains(Properties::INDICATE)
    }

    /// Check the handle the stack assigned to the CCCD. Zero means none
    /// was created, which is a registration failure when one is needed.
    pub fn check_cccd(&self, cccd_handle: u16) -> Result<(), Error> {
        if self.has_cccd() && cccd_handle == 0 {
            return Err(Error::Register);
        }
        Ok(())
    }
}

/// Handle to a registered characteristic.
pub trait Characteristic {
    /// Replace the value the stack serves on read/notify/indicate.
    fn set_value(&mut self, value: &[u8]) -> Result<(), Error>;

    /// Unacknowledged push of the current value.
    fn notify(&mut self) -> Result<(), Error>;

    /// Acknowledged push of the current value; the stack owns the handshake.
    fn indicate(&mut self) -> Result<(), Error>;
}

/// Handle to the GAP advertiser.
pub trait Advertiser {
    /// Begin (or resume) connectable advertising. Does not wait.
    fn start(&mut self) -> Result<(), Error>;
}

/// Consumer of client writes.
pub trait PayloadSink {
    /// Hand off one non-empty write. The sink must not retain `text`.
    fn parse(&mut self, text: &[u8]);
}

/// The vendor stack, as seen at initialization.
pub trait GattStack {
    type Characteristic: Characteristic;
    type Advertiser: Advertiser;

    /// Create the service, the characteristic (holding `layout.initial_value`)
    /// and its CCCD, and start the service.
    fn register(&mut self, layout: &GattLayout) -> Result<Self::Characteristic, Error>;

    fn advertiser(&mut self) -> Result<Self::Advertiser, Error>;
}

/// What a descriptor write led to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DescriptorOutcome {
    /// Value replaced with the push pattern and a notification/indication sent.
    Pushed(Subscription),
    /// Client turned pushes off; value untouched.
    Disabled,
    /// Malformed or unknown write; ignored.
    Rejected(CccdError),
    /// Recognised write, but the stack failed to update or push.
    Failed(Error),
}

/// Counting pattern pushed when a client subscribes: byte i = i mod 255.
pub const fn push_pattern() -> [u8; config::PUSH_PATTERN_LEN] {
    let mut out = [0u8; config::PUSH_PATTERN_LEN];
    let mut i = 0;
    while i < out.len() {
        out[i] = (i % 0xff) as u8;
        i += 1;
    }
    out
}

/// Owns the characteristic and advertiser handles and reacts to events.
pub struct PeripheralSession<C, A, P> {
    characteristic: C,
    advertiser: A,
    sink: P,
}

impl<C, A, P> PeripheralSession<C, A, P>
where
    C: Characteristic,
    A: Advertiser,
    P: PayloadSink,
{
    /// Register the GATT table with the initial value and start advertising.
    ///
    /// Must be called once. Any error means the radio is unusable.
    pub fn initialize<S>(stack: &mut S, sink: P) -> Result<Self, Error>
    where
        S: GattStack<Characteristic = C, Advertiser = A>,
    {
        info!("Starting BLE work...");

        let layout = GattLayout::device();
        let characteristic = stack.register(&layout)?;

        let mut advertiser = stack.advertiser()?;
        advertiser.start()?;

        info!("BLE advertising started");
        let mut buf = Uuid::encode_buffer();
        info!("Service UUID: {}", &*layout.service.hyphenated().encode_lower(&mut buf));
        info!("Characteristic UUID: {}", &*layout.characteristic.hyphenated().encode_lower(&mut buf));

        Ok(Self {
            characteristic,
            advertiser,
            sink,
        })
    }

    /// A client completed a link.
    pub fn on_connect(&mut self) {
        info!("Client connected");
    }

    /// The link was lost; advertising is re-armed exactly once.
    pub fn on_disconnect(&mut self) {
        info!("Client disconnected, restarting advertising");
        if let Err(e) = self.advertiser.start() {
            error!("Failed to restart advertising: {}", e);
        }
    }

    /// A client is reading the value. Returns what will be served.
    pub fn on_read(&mut self) -> &'static [u8] {
        if let Err(e) = self.characteristic.set_value(&config::READ_RESPONSE) {
            warn!("Failed to set read response: {}", e);
        }
        info!("Characteristic read");
        &config::READ_RESPONSE
    }

    /// A client wrote the value. Returns whether the payload was forwarded.
    pub fn on_write(&mut self, data: &[u8]) -> bool {
        if data.is_empty() {
            return false;
        }

        match core::str::from_utf8(data) {
            Ok(text) => info!("Received Value: {}", text),
            Err(_) => info!("Received Value: {:02x}", data),
        }

        self.sink.parse(data);
        true
    }

    /// A client wrote the CCCD.
    pub fn on_descriptor_write(&mut self, data: &[u8]) -> DescriptorOutcome {
        let subscription = match cccd::decode(data) {
            Ok(sub) => sub,
            Err(e) => {
                warn!("Unknown descriptor value: {:02x}", data);
                return DescriptorOutcome::Rejected(e);
            }
        };

        let pushed = match subscription {
            Subscription::Disabled => {
                info!("Notify/Indicate disabled");
                return DescriptorOutcome::Disabled;
            }
            Subscription::Notify => {
                info!("Notify enabled");
                self.characteristic
                    .set_value(&push_pattern())
                    .and_then(|()| self.characteristic.notify())
            }
            Subscription::Indicate => {
                info!("Indicate enabled");
                self.characteristic
                    .set_value(&push_pattern())
                    .and_then(|()| self.characteristic.indicate())
            }
        };

        match pushed {
            Ok(()) => DescriptorOutcome::Pushed(subscription),
            Err(e) => {
                warn!("Push after {} failed: {}", subscription, e);
                DescriptorOutcome::Failed(e)
            }
        }
    }

    pub fn characteristic(&self) -> &C {
        &self.characteristic
    }

    pub fn characteristic_mut(&mut self) -> &mut C {
        &mut self.characteristic
    }

    pub fn advertiser(&self) -> &A {
        &self.advertiser
    }

    pub fn sink(&self) -> &P {
        &self.sink
    }
}
