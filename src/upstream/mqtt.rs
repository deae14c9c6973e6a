//! MQTT 3.1.1 connector backed by `rumqttc`.
//!
//! Each [`MqttConnector::connect`] builds a fresh client and event loop, so
//! a lost connection is simply dropped and replaced by the reconnect loop
//! in [`Subscriber`](crate::upstream::Subscriber). Sessions are clean and
//! every subscription uses QoS 0, matching the fire-and-forget status feed.
//!
//! `upstream.connect_timeout_secs` bounds both the CONNACK and the SUBACK
//! wait; a broker that accepts the TCP stream and then goes silent cannot
//! stall the reconnect loop.

use std::collections::VecDeque;
use std::time::Duration;

use rumqttc::{
    AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Packet, QoS, SubscribeFilter,
    SubscribeReasonCode,
};
use tokio::time::timeout;

use crate::config::UpstreamSettings;
use crate::hub::message::Message;
use crate::hub::topic::SubscriptionSet;
use crate::upstream::connector::{Connection, Connector};
use crate::utils::error::{BridgeError, Result};

/// Capacity of the request channel between `AsyncClient` and its event loop.
const REQUEST_CAPACITY: usize = 16;

/// rumqttc rejects keep-alive intervals shorter than this.
const MIN_KEEP_ALIVE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct MqttConnector {
    host: String,
    port: u16,
    client_id: String,
    keep_alive: Duration,
    connect_timeout: Duration,
    max_packet_size: usize,
}

impl MqttConnector {
    pub fn new(settings: &UpstreamSettings) -> Self {
        Self {
            host: settings.host.clone(),
            port: settings.port,
            client_id: settings.client_id.clone(),
            keep_alive: Duration::from_secs(settings.keep_alive_secs).max(MIN_KEEP_ALIVE),
            connect_timeout: Duration::from_secs(settings.connect_timeout_secs),
            max_packet_size: settings.max_packet_size,
        }
    }

    /// Overrides the CONNACK/SUBACK deadline taken from the settings.
    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    fn options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(&self.client_id, &self.host, self.port);
        options.set_keep_alive(self.keep_alive);
        options.set_clean_session(true);
        options.set_max_packet_size(self.max_packet_size, self.max_packet_size);
        options
    }

    fn connect_error(&self, reason: impl Into<String>) -> BridgeError {
        BridgeError::Connect {
            addr: self.address(),
            reason: reason.into(),
        }
    }
}

impl Connector for MqttConnector {
    type Conn = MqttConnection;

    async fn connect(&self) -> Result<MqttConnection> {
        let (client, mut eventloop) = AsyncClient::new(self.options(), REQUEST_CAPACITY);

        let handshake = async {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                        return match ack.code {
                            ConnectReturnCode::Success => Ok(()),
                            code => Err(format!("handshake refused: {code:?}")),
                        };
                    }
                    Ok(_) => {}
                    Err(e) => return Err(e.to_string()),
                }
            }
        };

        let outcome = timeout(self.connect_timeout, handshake).await;
        match outcome {
            Ok(Ok(())) => Ok(MqttConnection {
                client,
                eventloop,
                backlog: VecDeque::new(),
                ack_timeout: self.connect_timeout,
            }),
            Ok(Err(reason)) => Err(self.connect_error(reason)),
            Err(_) => Err(self.connect_error(format!(
                "no CONNACK within {:?}",
                self.connect_timeout
            ))),
        }
    }

    fn address(&self) -> String {
        format!("mqtt://{}:{}", self.host, self.port)
    }
}

pub struct MqttConnection {
    client: AsyncClient,
    eventloop: EventLoop,
    /// Publishes that arrived while waiting for a SUBACK.
    backlog: VecDeque<Message>,
    ack_timeout: Duration,
}

impl MqttConnection {
    async fn poll(&mut self) -> Result<Option<Message>> {
        match self.eventloop.poll().await {
            Ok(Event::Incoming(Packet::Publish(publish))) => Ok(Some(Message::new(
                publish.topic,
                publish.payload.to_vec(),
            ))),
            Ok(Event::Incoming(Packet::Disconnect)) => Err(BridgeError::ConnectionLost(
                "broker sent DISCONNECT".to_string(),
            )),
            Ok(_) => Ok(None),
            Err(e) => Err(BridgeError::ConnectionLost(e.to_string())),
        }
    }
}

impl Connection for MqttConnection {
    async fn subscribe(&mut self, topics: &SubscriptionSet) -> Result<()> {
        if topics.is_empty() {
            return Ok(());
        }

        let requested: Vec<String> = topics.iter().map(str::to_string).collect();
        let filters = requested
            .iter()
            .map(|topic| SubscribeFilter::new(topic.clone(), QoS::AtMostOnce));
        self.client
            .subscribe_many(filters)
            .await
            .map_err(|e| BridgeError::ConnectionLost(e.to_string()))?;

        let eventloop = &mut self.eventloop;
        let backlog = &mut self.backlog;
        let acknowledged = async {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::SubAck(ack))) => {
                        let rejected = ack
                            .return_codes
                            .iter()
                            .position(|code| matches!(code, SubscribeReasonCode::Failure));
                        return match rejected {
                            Some(index) => Err(BridgeError::Subscribe {
                                topic: requested.get(index).cloned().unwrap_or_default(),
                                reason: "rejected by broker".to_string(),
                            }),
                            None => Ok(()),
                        };
                    }
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        backlog.push_back(Message::new(publish.topic, publish.payload.to_vec()));
                    }
                    Ok(_) => {}
                    Err(e) => return Err(BridgeError::ConnectionLost(e.to_string())),
                }
            }
        };

        match timeout(self.ack_timeout, acknowledged).await {
            Ok(result) => result,
            Err(_) => Err(BridgeError::Subscribe {
                topic: requested.join(", "),
                reason: format!("no SUBACK within {:?}", self.ack_timeout),
            }),
        }
    }

    async fn next_message(&mut self) -> Result<Message> {
        if let Some(message) = self.backlog.pop_front() {
            return Ok(message);
        }
        loop {
            if let Some(message) = self.poll().await? {
                return Ok(message);
            }
        }
    }
}
