//! The task-queue contract and a Redis-backed reference implementation.
//!
//! [`Broker`] is what the client needs: enqueue a payload under a queue
//! name and poll a task id for its result. [`WorkerBroker`] is what the
//! worker needs on the other end: block for the next payload across a set
//! of queues in priority order, and write a result back. `RedisBroker`
//! implements both against a single connection, matching the `task-database`
//! address in both binaries' configuration.

use std::time::Duration;

use redis::Commands;
use serde_derive::{Deserialize, Serialize};
use uuid::Uuid;

use errors::*;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskId(pub String);

pub enum TaskState {
    Pending,
    Completed(Vec<u8>),
}

pub trait Broker {
    fn enqueue(&self, queue: &str, payload: Vec<u8>, retention: Duration) -> Result<TaskId>;
    fn poll(&self, id: &TaskId) -> Result<TaskState>;
}

pub trait WorkerBroker {
    /// Block up to `timeout` for the next payload on any of `queues`, tried
    /// in the given order (highest priority first). Returns `None` on a
    /// timeout with nothing available.
    fn dequeue(&self, queues: &[String], timeout: Duration) -> Result<Option<(TaskId, Vec<u8>)>>;
    fn write_result(&self, id: &TaskId, retention: Duration, payload: Vec<u8>) -> Result<()>;
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    id: String,
    payload: Vec<u8>,
}

pub struct RedisBroker {
    client: redis::Client,
}

impl RedisBroker {
    pub fn connect(address: &str) -> Result<Self> {
        let url = if address.contains("://") {
            address.to_owned()
        } else {
            format!("redis://{}", address)
        };
        let client = redis::Client::open(url).chain_err(|| ErrorKind::BrokerUnavailable(format!("invalid broker address '{}'", address)))?;
        Ok(RedisBroker { client })
    }

    fn connection(&self) -> Result<redis::Connection> {
        self.client
            .get_connection()
            .chain_err(|| ErrorKind::BrokerUnavailable("could not connect to broker".to_owned()))
    }

    fn queue_key(queue: &str) -> String {
        format!("allbuild:queue:{}", queue)
    }

    fn result_key(id: &TaskId) -> String {
        format!("allbuild:result:{}", id.0)
    }
}

impl Broker for RedisBroker {
    fn enqueue(&self, queue: &str, payload: Vec<u8>, _retention: Duration) -> Result<TaskId> {
        let id = TaskId(Uuid::new_v4().to_string());
        let envelope = Envelope { id: id.0.clone(), payload };
        let bytes = ::serde_json::to_vec(&envelope).chain_err(|| "failed to encode task envelope")?;
        let mut conn = self.connection()?;
        conn.rpush::<_, _, ()>(Self::queue_key(queue), bytes)
            .chain_err(|| ErrorKind::BrokerUnavailable("enqueue failed".to_owned()))?;
        Ok(id)
    }

    fn poll(&self, id: &TaskId) -> Result<TaskState> {
        let mut conn = self.connection()?;
        let result: Option<Vec<u8>> = conn
            .get(Self::result_key(id))
            .chain_err(|| ErrorKind::BrokerUnavailable("poll failed".to_owned()))?;
        match result {
            Some(bytes) => Ok(TaskState::Completed(bytes)),
            None => Ok(TaskState::Pending),
        }
    }
}

impl WorkerBroker for RedisBroker {
    fn dequeue(&self, queues: &[String], timeout: Duration) -> Result<Option<(TaskId, Vec<u8>)>> {
        let mut conn = self.connection()?;
        let keys: Vec<String> = queues.iter().map(|q| Self::queue_key(q)).collect();
        let seconds = timeout.as_secs().max(1) as usize;
        let popped: Option<(String, Vec<u8>)> = conn
            .blpop(keys, seconds)
            .chain_err(|| ErrorKind::BrokerUnavailable("dequeue failed".to_owned()))?;
        match popped {
            Some((_key, bytes)) => {
                let envelope: Envelope = ::serde_json::from_slice(&bytes).chain_err(|| "failed to decode task envelope")?;
                Ok(Some((TaskId(envelope.id), envelope.payload)))
            }
            None => Ok(None),
        }
    }

    fn write_result(&self, id: &TaskId, retention: Duration, payload: Vec<u8>) -> Result<()> {
        let mut conn = self.connection()?;
        conn.set_ex::<_, _, ()>(Self::result_key(id), payload, retention.as_secs().max(1) as usize)
            .chain_err(|| ErrorKind::BrokerUnavailable("writing result failed".to_owned()))?;
        Ok(())
    }
}
