//! Application-wide constants and compile-time configuration.
//!
//! Identifiers, fixed payloads and advertising parameters live here so
//! they can be tuned in one place.

use uuid::Uuid;

// Identity

/// GAP device name (shown in scan results).
pub const DEVICE_NAME: &str = "BLE-Connect";

/// Primary service exposed by the peripheral.
pub const SERVICE_UUID: Uuid = Uuid::from_u128(0x4fafc201_1fb5_459e_8fcc_c5c9c331914b);

/// The single read/write/notify/indicate characteristic.
pub const CHARACTERISTIC_UUID: Uuid = Uuid::from_u128(0xbeb5483e_36e1_4688_b7f5_ea07361b26a8);

// Characteristic payloads

/// Value the characteristic holds right after initialization.
pub const INITIAL_VALUE: [u8; 3] = [0x11, 0x22, 0x33];

/// Value written into the characteristic before every read is served.
pub const READ_RESPONSE: [u8; 4] = [0xde, 0xed, 0xbe, 0xef];

/// Length of the counting pattern pushed on notify/indicate enable.
pub const PUSH_PATTERN_LEN: usize = 15;

/// Maximum characteristic value length (default ATT MTU 23 - 3).
pub const MAX_VALUE_LEN: usize = 20;

/// Largest client write forwarded to the payload parser.
pub const MAX_WRITE_LEN: usize = MAX_VALUE_LEN;

// Advertising

/// Peripheral preferred connection interval range (in 1.25 ms units).
/// 6 = 7.5 ms, 18 = 22.5 ms.
pub const ADV_CONN_INTERVAL_MIN: u16 = 0x06;
pub const ADV_CONN_INTERVAL_MAX: u16 = 0x12;

/// Advertising interval (in 0.625 ms units). 160 = 100 ms.
pub const ADV_INTERVAL: u32 = 160;

// SoftDevice sizing

/// ATT MTU requested from the SoftDevice.
pub const ATT_MTU: u16 = 23;

/// Number of concurrent peripheral links.
pub const PERIPHERAL_LINKS: u8 = 1;

/// Depth of the queue between the write handler and the payload task.
pub const PAYLOAD_QUEUE_DEPTH: usize = 4;
