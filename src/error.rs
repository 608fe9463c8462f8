//! Unified error type for ble-connect.
//!
//! We avoid `alloc` - all error variants carry only fixed-size data.
//! Implements `defmt::Format` for efficient on-target logging.

/// Top-level error type used across the application.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    // GATT table
    /// The stack refused the service, characteristic or CCCD registration.
    Register,

    // Characteristic value
    /// Writing the local characteristic value failed.
    SetValue,

    /// Value does not fit the characteristic's maximum length.
    ValueTooLong,

    // Server-initiated pushes
    /// Sending a notification failed.
    Notify,

    /// Sending an indication failed.
    Indicate,

    /// A push was requested while no client is connected.
    NotConnected,

    // GAP
    /// Advertising could not be (re)started.
    Advertise,

    /// AD structures do not fit a legacy advertising PDU.
    AdvDataTooLong,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let msg = match self {
            Error::Register => "GATT registration failed",
            Error::SetValue => "failed to set characteristic value",
            Error::ValueTooLong => "characteristic value too long",
            Error::Notify => "notification failed",
            Error::Indicate => "indication failed",
            Error::NotConnected => "no connected client",
            Error::Advertise => "failed to start advertising",
            Error::AdvDataTooLong => "advertising data exceeds 31 bytes",
        };
        f.write_str(msg)
    }
}
