//! MQTT adapter on the `rumqttc` synchronous client.
//!
//! Each [`BrokerConnector::connect`] builds a fresh client/connection
//! pair, so a lost session is fully torn down and the publisher's
//! throttle alone decides when the next attempt happens.  A retained
//! last-will of `OFFLINE` on the status topic lets the broker announce
//! an unclean drop.

use std::time::Duration;

use rumqttc::{
    Client, ConnectReturnCode, Connection, ConnectionError, Event, LastWill, MqttOptions, Packet,
    QoS, RecvTimeoutError,
};

use crate::app::events::SystemStatus;
use crate::config::BrokerConfig;
use crate::error::BrokerError;
use crate::telemetry::topics;
use crate::telemetry::{BrokerConnector, BrokerSession, SessionEvent};

/// Requests buffered inside rumqttc between `try_publish` and the socket.
const CLIENT_CAPACITY: usize = 64;

pub struct MqttConnector {
    options: MqttOptions,
}

impl MqttConnector {
    pub fn new(config: &BrokerConfig) -> Self {
        let mut options = MqttOptions::new(&config.client_id, &config.host, config.port);
        options
            .set_keep_alive(Duration::from_secs(config.keep_alive_secs.max(5)))
            .set_clean_session(true)
            .set_last_will(LastWill::new(
                topics::STATUS,
                SystemStatus::Offline.as_str(),
                QoS::AtMostOnce,
                true,
            ));
        Self { options }
    }
}

impl BrokerConnector for MqttConnector {
    type Session = MqttSession;

    fn connect(&mut self) -> Result<MqttSession, BrokerError> {
        let (client, connection) = Client::new(self.options.clone(), CLIENT_CAPACITY);
        Ok(MqttSession { client, connection })
    }
}

pub struct MqttSession {
    client: Client,
    connection: Connection,
}

impl BrokerSession for MqttSession {
    fn poll(&mut self, timeout: Duration) -> Result<SessionEvent, BrokerError> {
        match self.connection.recv_timeout(timeout) {
            Ok(Ok(Event::Incoming(Packet::ConnAck(ack)))) => {
                if ack.code == ConnectReturnCode::Success {
                    Ok(SessionEvent::Connected)
                } else {
                    Err(BrokerError::Refused(format!("{:?}", ack.code)))
                }
            }
            Ok(Ok(_)) | Err(RecvTimeoutError::Timeout) => Ok(SessionEvent::Idle),
            Ok(Err(ConnectionError::ConnectionRefused(code))) => {
                Err(BrokerError::Refused(format!("{code:?}")))
            }
            Ok(Err(e)) => Err(BrokerError::ConnectionLost(e.to_string())),
            Err(RecvTimeoutError::Disconnected) => {
                Err(BrokerError::ConnectionLost("event loop closed".into()))
            }
        }
    }

    fn publish(&mut self, topic: &str, payload: &str, retain: bool) -> Result<(), BrokerError> {
        self.client
            .try_publish(topic, QoS::AtMostOnce, retain, payload.as_bytes().to_vec())
            .map_err(|e| BrokerError::PublishFailed(e.to_string()))
    }

    fn disconnect(&mut self) {
        let _ = self.client.try_disconnect();
    }
}
