//! Client Characteristic Configuration Descriptor (CCCD) decoding.
//!
//! A client enables pushes by writing a 2-byte little-endian bitfield to
//! the CCCD (0x2902). Only the three single values below are recognised;
//! anything else (including "notify | indicate" = 0x0003) is rejected.

/// CCCD value: pushes disabled.
pub const CCCD_DISABLED: u16 = 0x0000;
/// CCCD value: notifications enabled.
pub const CCCD_NOTIFY: u16 = 0x0001;
/// CCCD value: indications enabled.
pub const CCCD_INDICATE: u16 = 0x0002;

/// Length of a CCCD write, in bytes.
pub const CCCD_LEN: usize = 2;

/// Push subscription requested by the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Subscription {
    Disabled,
    Notify,
    Indicate,
}

/// Why a descriptor write was not understood.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CccdError {
    /// Write was not exactly [`CCCD_LEN`] bytes.
    Length(usize),
    /// Well-formed write carrying an unrecognised code.
    Unknown(u16),
}

/// Decode a raw descriptor write.
///
/// The length is checked before any byte is read.
pub fn decode(data: &[u8]) -> Result<Subscription, CccdError> {
    let raw: [u8; CCCD_LEN] = data
        .try_into()
        .map_err(|_| CccdError::Length(data.len()))?;

    match u16::from_le_bytes(raw) {
        CCCD_DISABLED => Ok(Subscription::Disabled),
        CCCD_NOTIFY => Ok(Subscription::Notify),
        CCCD_INDICATE => Ok(Subscription::Indicate),
        other => Err(CccdError::Unknown(other)),
    }
}
