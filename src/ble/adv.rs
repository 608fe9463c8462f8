//! Legacy advertising and scan response payloads.
//!
//! Advertising data carries the flags and the 128-bit service UUID so
//! scanners can filter on the service. The device name and the preferred
//! connection interval go into the scan response.
//!
//! Both are `[len][type][data]...` AD structures limited to 31 bytes.

use heapless::Vec;
use uuid::Uuid;

use crate::error::Error;

/// Legacy advertising PDU payload limit.
pub const MAX_ADV_LEN: usize = 31;

pub type AdvPayload = Vec<u8, MAX_ADV_LEN>;

/// AD type: Flags.
pub const AD_FLAGS: u8 = 0x01;
/// AD type: Complete List of 128-bit Service UUIDs.
pub const AD_UUID128_COMPLETE: u8 = 0x07;
/// AD type: Shortened Local Name.
pub const AD_NAME_SHORT: u8 = 0x08;
/// AD type: Complete Local Name.
pub const AD_NAME_COMPLETE: u8 = 0x09;
/// AD type: Peripheral (Slave) Connection Interval Range.
pub const AD_CONN_INTERVAL: u8 = 0x12;

/// LE General Discoverable Mode.
pub const FLAG_LE_GENERAL_DISC: u8 = 0x02;
/// BR/EDR Not Supported.
pub const FLAG_BR_EDR_NOT_SUPPORTED: u8 = 0x04;

/// The 16 UUID bytes in over-the-air (little-endian) order, last text byte first.
pub const fn uuid_le_bytes(uuid: &Uuid) -> [u8; 16] {
    uuid.as_u128().to_le_bytes()
}

/// Advertising data: flags + complete 128-bit service UUID list.
pub fn advertising_data(service: &Uuid) -> Result<AdvPayload, Error> {
    let mut buf = AdvPayload::new();
    push_ad(&mut buf, AD_FLAGS, &[FLAG_LE_GENERAL_DISC | FLAG_BR_EDR_NOT_SUPPORTED])?;
    push_ad(&mut buf, AD_UUID128_COMPLETE, &uuid_le_bytes(service))?;
    Ok(buf)
}

/// Scan response: preferred connection interval + local name.
///
/// The name is truncated to a Shortened Local Name if it does not fit.
pub fn scan_response_data(name: &str, interval_min: u16, interval_max: u16) -> Result<AdvPayload, Error> {
    let mut buf = AdvPayload::new();

    let mut range = [0u8; 4];
    range[..2].copy_from_slice(&interval_min.to_le_bytes());
    range[2..].copy_from_slice(&interval_max.to_le_bytes());
    push_ad(&mut buf, AD_CONN_INTERVAL, &range)?;

    let room = MAX_ADV_LEN - buf.len() - 2;
    let name = name.as_bytes();
    if name.len() <= room {
        push_ad(&mut buf, AD_NAME_COMPLETE, name)?;
    } else {
        push_ad(&mut buf, AD_NAME_SHORT, &name[..room])?;
    }
    Ok(buf)
}

/// Append one AD structure. Leaves `buf` untouched if it does not fit.
fn push_ad(buf: &mut AdvPayload, ad_type: u8, data: &[u8]) -> Result<(), Error> {
    if buf.len() + 2 + data.len() > MAX_ADV_LEN {
        return Err(Error::AdvDataTooLong);
    }
    buf.push(data.len() as u8 + 1).map_err(|_| Error::AdvDataTooLong)?;
    buf.push(ad_type).map_err(|_| Error::AdvDataTooLong)?;
    buf.extend_from_slice(data).map_err(|_| Error::AdvDataTooLong)
}
