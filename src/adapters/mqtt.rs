//! MQTT message-bus adapter over the ESP-IDF client.
//!
//! Outbound: [`EspMqttBus`] implements [`MessageBus`]; every call is a
//! non-blocking enqueue into the ESP-IDF client, QoS 0 like the rest of
//! the locker fleet.
//!
//! Inbound: [`pump_connection`] runs on its own thread, blocking on the
//! client's event connection, and forwards connects and messages into the
//! [`Inbox`] the executor drains.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use esp_idf_svc::mqtt::client::{EspMqttClient, EspMqttConnection, EventPayload, QoS};
use log::{debug, info, warn};

use super::inbox::Inbox;
use crate::app::ports::MessageBus;

/// Publish/subscribe half of the broker session.
pub struct EspMqttBus {
    client: RefCell<EspMqttClient<'static>>,
}

impl EspMqttBus {
    pub fn new(client: EspMqttClient<'static>) -> Self {
        Self {
            client: RefCell::new(client),
        }
    }
}

impl MessageBus for EspMqttBus {
    fn publish(&self, topic: &str, payload: &[u8]) {
        if let Err(e) = self
            .client
            .borrow_mut()
            .enqueue(topic, QoS::AtMostOnce, false, payload)
        {
            warn!("MQTT: publish to '{}' failed: {}", topic, e);
        }
    }

    fn subscribe(&self, topic: &str) {
        if let Err(e) = self.client.borrow_mut().subscribe(topic, QoS::AtMostOnce) {
            warn!("MQTT: subscribe '{}' failed: {}", topic, e);
        }
    }

    fn unsubscribe(&self, topic: &str) {
        if let Err(e) = self.client.borrow_mut().unsubscribe(topic) {
            warn!("MQTT: unsubscribe '{}' failed: {}", topic, e);
        }
    }
}

/// Forward broker events into `inbox` until the connection closes.
pub fn pump_connection(mut connection: EspMqttConnection, inbox: &Inbox<CriticalSectionRawMutex>) {
    info!("MQTT: event pump running");
    while let Ok(event) = connection.next() {
        match event.payload() {
            EventPayload::Connected(_) => {
                info!("MQTT: connected");
                inbox.post_connected();
            }
            EventPayload::Disconnected => warn!("MQTT: disconnected, client will retry"),
            EventPayload::Received {
                topic: Some(topic),
                data,
                ..
            } => {
                inbox.post_message(topic, data);
            }
            EventPayload::Error(e) => warn!("MQTT: {:?}", e),
            other => debug!("MQTT: {:?}", other),
        }
    }
    warn!("MQTT: event connection closed");
}
