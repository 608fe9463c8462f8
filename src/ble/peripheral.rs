//! Advertising loop.
//!
//! Each round waits for the session to request advertising, advertises
//! connectably until a client connects, then runs the GATT server until
//! the link drops. The session re-arms advertising from its disconnect
//! handler, which starts the next round. A SoftDevice that refuses to
//! advertise is fatal.

use defmt::unwrap;
use nrf_softdevice::ble::{gatt_server, peripheral};
use nrf_softdevice::Softdevice;
use static_cell::StaticCell;

use crate::ble::adv::{self, AdvPayload};
use crate::ble::server::{self, Server, ServerEvent};
use crate::ble::session::DescriptorOutcome;
use crate::config;

static ADV_DATA: StaticCell<AdvPayload> = StaticCell::new();
static SCAN_DATA: StaticCell<AdvPayload> = StaticCell::new();

pub async fn run(sd: &'static Softdevice, server: &'static Server) -> ! {
    let adv_data: &'static AdvPayload =
        ADV_DATA.init(unwrap!(adv::advertising_data(&config::SERVICE_UUID)));
    let scan_data: &'static AdvPayload = SCAN_DATA.init(unwrap!(adv::scan_response_data(
        config::DEVICE_NAME,
        config::ADV_CONN_INTERVAL_MIN,
        config::ADV_CONN_INTERVAL_MAX,
    )));

    loop {
        server::advertise_requested().await;

        let adv_config = peripheral::Config {
            interval: config::ADV_INTERVAL,
            ..Default::default()
        };
        let adv = peripheral::ConnectableAdvertisement::ScannableUndirected {
            adv_data: adv_data.as_slice(),
            scan_data: scan_data.as_slice(),
        };

        let conn = match peripheral::advertise_connectable(sd, adv, &adv_config).await {
            Ok(conn) => conn,
            // Without advertising the device can never be reached again.
            Err(e) => defmt::panic!("BLE advertising failed: {:?}", e),
        };

        server.connected(&conn);

        // Returns when the connection gets disconnected.
        let e = gatt_server::run(&conn, server, |event| match event {
            ServerEvent::Written => debug!("write forwarded to parser"),
            ServerEvent::Descriptor(DescriptorOutcome::Failed(e)) => {
                warn!("subscription push failed: {}", e)
            }
            ServerEvent::Descriptor(outcome) => debug!("descriptor write: {}", outcome),
        })
        .await;

        debug!("gatt_server run exited: {:?}", e);
        server.disconnected();
    }
}
