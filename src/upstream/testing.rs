//! In-memory connector whose connections follow a script.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::hub::message::Message;
use crate::hub::topic::SubscriptionSet;
use crate::upstream::connector::{Connection, Connector};
use crate::utils::error::{BridgeError, Result};

enum Script {
    Refuse,
    RejectSubscribe(String),
    Accept(mpsc::UnboundedReceiver<Message>),
}

#[derive(Default)]
struct Recorded {
    scripts: VecDeque<Script>,
    connects: usize,
    subscriptions: Vec<Vec<String>>,
}

/// Each `connect` consumes the next scripted outcome; once the script runs
/// out every attempt is refused.
#[derive(Clone, Default)]
pub(crate) struct ScriptedConnector {
    inner: Arc<Mutex<Recorded>>,
}

impl ScriptedConnector {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Scripts a connection that delivers whatever is sent on the returned
    /// sender and drops once the sender is dropped.
    pub(crate) fn accept(&self) -> mpsc::UnboundedSender<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.lock().unwrap().scripts.push_back(Script::Accept(rx));
        tx
    }

    pub(crate) fn refuse(&self) {
        self.inner.lock().unwrap().scripts.push_back(Script::Refuse);
    }

    pub(crate) fn reject_subscribe(&self, topic: &str) {
        self.inner
            .lock()
            .unwrap()
            .scripts
            .push_back(Script::RejectSubscribe(topic.to_string()));
    }

    pub(crate) fn connects(&self) -> usize {
        self.inner.lock().unwrap().connects
    }

    pub(crate) fn subscriptions(&self) -> Vec<Vec<String>> {
        self.inner.lock().unwrap().subscriptions.clone()
    }
}

impl Connector for ScriptedConnector {
    type Conn = ScriptedConnection;

    async fn connect(&self) -> Result<ScriptedConnection> {
        let mut inner = self.inner.lock().unwrap();
        inner.connects += 1;
        match inner.scripts.pop_front() {
            Some(Script::Accept(rx)) => Ok(ScriptedConnection {
                rx,
                reject: None,
                recorded: self.inner.clone(),
            }),
            Some(Script::RejectSubscribe(topic)) => {
                let (_, rx) = mpsc::unbounded_channel();
                Ok(ScriptedConnection {
                    rx,
                    reject: Some(topic),
                    recorded: self.inner.clone(),
                })
            }
            Some(Script::Refuse) | None => Err(BridgeError::Connect {
                addr: self.address(),
                reason: "connection refused".to_string(),
            }),
        }
    }

    fn address(&self) -> String {
        "scripted://broker".to_string()
    }
}

pub(crate) struct ScriptedConnection {
    rx: mpsc::UnboundedReceiver<Message>,
    reject: Option<String>,
    recorded: Arc<Mutex<Recorded>>,
}

impl Connection for ScriptedConnection {
    async fn subscribe(&mut self, topics: &SubscriptionSet) -> Result<()> {
        self.recorded
            .lock()
            .unwrap()
            .subscriptions
            .push(topics.iter().map(str::to_string).collect());
        match self.reject.take() {
            Some(topic) => Err(BridgeError::Subscribe {
                topic,
                reason: "rejected by broker".to_string(),
            }),
            None => Ok(()),
        }
    }

    async fn next_message(&mut self) -> Result<Message> {
        self.rx
            .recv()
            .await
            .ok_or_else(|| BridgeError::ConnectionLost("script ended".to_string()))
    }
}
