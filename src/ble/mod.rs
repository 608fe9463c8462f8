//! Bluetooth Low Energy subsystem.
//!
//! This module drives the Nordic SoftDevice S140 in **Peripheral** role:
//!
//! 1. **Session** - the event-driven controller for our one service and
//!    one characteristic (connect, disconnect, read, write, CCCD write).
//! 2. **Server** - registers the GATT table and dispatches SoftDevice
//!    GATT events to the session.
//! 3. **Peripheral** - the advertising loop; each disconnect re-arms it.
//!
//! `adv`, `cccd` and `session` are hardware-independent and are
//! also compiled into the host-testable library.

pub mod adv;
pub mod cccd;
pub mod peripheral;
pub mod server;
pub mod session;
