//! SoftDevice binding for the peripheral session.
//!
//! Registers the GATT table through `ServiceBuilder` and implements
//! `gatt_server::Server` as the single dispatch object: value writes,
//! CCCD writes and deferred reads on our characteristic are routed to the
//! [`PeripheralSession`]. Connection lifecycle is reported by the
//! advertising task through [`Server::connected`] / [`Server::disconnected`].

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::signal::Signal;
use heapless::Vec;
use nrf_softdevice::ble::gatt_server::builder::ServiceBuilder;
use nrf_softdevice::ble::gatt_server::characteristic::{self, Attribute, Metadata};
use nrf_softdevice::ble::gatt_server::{self, CharacteristicHandles, DeferredReadReply, WriteOp};
use nrf_softdevice::ble::{Connection, Uuid};
use nrf_softdevice::Softdevice;

use crate::ble::adv::uuid_le_bytes;
use crate::ble::session::{
    Advertiser, Characteristic, DescriptorOutcome, GattLayout, GattStack, PeripheralSession, Properties,
};
use crate::config::MAX_VALUE_LEN;
use crate::error::Error;
use crate::payload::PayloadQueue;

/// Raised whenever the session wants advertising (re)started.
static ADVERTISE: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Wait until the session asks for advertising.
pub async fn advertise_requested() {
    ADVERTISE.wait().await
}

/// Advertiser handle: requests a new advertising round from the
/// advertising task.
pub struct AdvertiseSignal;

impl Advertiser for AdvertiseSignal {
    fn start(&mut self) -> Result<(), Error> {
        ADVERTISE.signal(());
        Ok(())
    }
}

/// Our characteristic inside the SoftDevice attribute table.
pub struct SoftdeviceCharacteristic {
    handles: CharacteristicHandles,
    /// Last value written locally; pushed on notify/indicate.
    value: Vec<u8, MAX_VALUE_LEN>,
    conn: Option<Connection>,
}

impl SoftdeviceCharacteristic {
    fn attach(&mut self, conn: &Connection) {
        self.conn = Some(conn.clone());
    }

    fn detach(&mut self) {
        self.conn = None;
    }

    fn connection(&self) -> Result<&Connection, Error> {
        self.conn.as_ref().ok_or(Error::NotConnected)
    }
}

impl Characteristic for SoftdeviceCharacteristic {
    fn set_value(&mut self, value: &[u8]) -> Result<(), Error> {
        let mut next = Vec::new();
        next.extend_from_slice(value).map_err(|_| Error::ValueTooLong)?;

        gatt_server::set_value(Softdevice::steal(), self.handles.value_handle, value).map_err(|e| {
            warn!("set_value failed: {:?}", e);
            Error::SetValue
        })?;

        self.value = next;
        Ok(())
    }

    fn notify(&mut self) -> Result<(), Error> {
        let conn = self.connection()?;
        gatt_server::notify_value(conn, self.handles.value_handle, &self.value).map_err(|e| {
            warn!("notify failed: {:?}", e);
            Error::Notify
        })
    }

    fn indicate(&mut self) -> Result<(), Error> {
        let conn = self.connection()?;
        gatt_server::indicate_value(conn, self.handles.value_handle, &self.value).map_err(|e| {
            warn!("indicate failed: {:?}", e);
            Error::Indicate
        })
    }
}

/// Registration context, alive only while the table is built.
struct SoftdeviceStack<'a> {
    sd: &'a mut Softdevice,
}

impl GattStack for SoftdeviceStack<'_> {
    type Characteristic = SoftdeviceCharacteristic;
    type Advertiser = AdvertiseSignal;

    fn register(&mut self, layout: &GattLayout) -> Result<SoftdeviceCharacteristic, Error> {
        let service_uuid = Uuid::new_128(&uuid_le_bytes(&layout.service));
        let char_uuid = Uuid::new_128(&uuid_le_bytes(&layout.characteristic));

        let mut sb = ServiceBuilder::new(self.sd, service_uuid).map_err(|e| {
            error!("service registration failed: {:?}", e);
            Error::Register
        })?;

        // Reads are deferred so the session sees each one before it is served.
        let attr = Attribute::new(layout.initial_value)
            .variable_len(layout.max_len as u16)
            .deferred_read();
        let metadata = Metadata::new(properties(layout.properties));

        let handles = sb
            .add_characteristic(char_uuid, attr, metadata)
            .map_err(|e| {
                error!("characteristic registration failed: {:?}", e);
                Error::Register
            })?
            .build();
        let _service = sb.build();
        layout.check_cccd(handles.cccd_handle)?;

        let mut value = Vec::new();
        value
            .extend_from_slice(layout.initial_value)
            .map_err(|_| Error::ValueTooLong)?;

        debug!(
            "GATT table: value_handle={} cccd_handle={}",
            handles.value_handle, handles.cccd_handle
        );

        Ok(SoftdeviceCharacteristic {
            handles,
            value,
            conn: None,
        })
    }

    fn advertiser(&mut self) -> Result<AdvertiseSignal, Error> {
        Ok(AdvertiseSignal)
    }
}

fn properties(props: Properties) -> characteristic::Properties {
    let mut out = characteristic::Properties::new();
    if props.contains(Properties::READ) {
        out = out.read();
    }
    if props.contains(Properties::WRITE) {
        out = out.write();
    }
    if props.contains(Properties::NOTIFY) {
        out = out.notify();
    }
    if props.contains(Properties::INDICATE) {
        out = out.indicate();
    }
    out
}

pub type Session = PeripheralSession<SoftdeviceCharacteristic, AdvertiseSignal, PayloadQueue>;

/// GATT server wrapping the session.
pub struct Server {
    session: Mutex<CriticalSectionRawMutex, RefCell<Session>>,
    value_handle: u16,
    cccd_handle: u16,
}

impl Server {
    /// Build the attribute table, set the initial value and request
    /// advertising. Must be called once, before the SoftDevice task runs.
    pub fn new(sd: &mut Softdevice) -> Result<Self, Error> {
        let mut stack = SoftdeviceStack { sd };
        let session = Session::initialize(&mut stack, PayloadQueue)?;
        let handles = &session.characteristic().handles;
        let (value_handle, cccd_handle) = (handles.value_handle, handles.cccd_handle);

        Ok(Self {
            session: Mutex::new(RefCell::new(session)),
            value_handle,
            cccd_handle,
        })
    }

    fn with_session<R>(&self, f: impl FnOnce(&mut Session) -> R) -> R {
        self.session.lock(|cell| f(&mut cell.borrow_mut()))
    }

    /// A client link came up.
    pub fn connected(&self, conn: &Connection) {
        self.with_session(|session| {
            session.characteristic_mut().attach(conn);
            session.on_connect();
        });
    }

    /// The client link went down.
    pub fn disconnected(&self) {
        self.with_session(|session| {
            session.characteristic_mut().detach();
            session.on_disconnect();
        });
    }
}

/// Events surfaced to the `gatt_server::run` callback.
#[derive(Clone, Copy, defmt::Format)]
pub enum ServerEvent {
    /// Client write handed to the payload parser.
    Written,
    /// CCCD write and what it did.
    Descriptor(DescriptorOutcome),
}

impl gatt_server::Server for Server {
    type Event = ServerEvent;

    fn on_write(&self, _conn: &Connection, handle: u16, op: WriteOp, offset: usize, data: &[u8]) -> Option<Self::Event> {
        if handle == self.cccd_handle {
            let outcome = self.with_session(|session| session.on_descriptor_write(data));
            return Some(ServerEvent::Descriptor(outcome));
        }

        if handle == self.value_handle {
            let forwarded = self.with_session(|session| session.on_write(data));
            return forwarded.then_some(ServerEvent::Written);
        }

        debug!(
            "Write to unknown handle {} (op: {:?}, offset: {}, len: {})",
            handle,
            op,
            offset,
            data.len()
        );
        None
    }

    fn on_deferred_read(&self, handle: u16, offset: usize, reply: DeferredReadReply) -> Option<Self::Event> {
        if handle != self.value_handle {
            debug!("Deferred read on unknown handle {}", handle);
            return None;
        }

        let value = self.with_session(|session| session.on_read());
        let value = value.get(offset..).unwrap_or(&[]);
        if let Err(e) = reply.reply(Ok(Some(value))) {
            warn!("read reply failed: {:?}", e);
        }
        None
    }
}
