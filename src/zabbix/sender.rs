use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::zabbix::Item;
use crate::{RelayError, RelayResult};

/// Magic prefix of every Zabbix protocol frame.
const ZBX_MAGIC: &[u8; 5] = b"ZBXD\x01";

/// Sink for expanded items.
///
/// The orchestrator buffers items through this seam and triggers one
/// transmission per flush. Implement it to capture items in tests or to
/// target a different transport.
pub trait ItemSender {
    /// Buffers one item for the next transmission.
    fn add_item(&mut self, item: Item);

    /// Returns the number of currently buffered items.
    fn item_count(&self) -> usize;

    /// Transmits the buffered batch and drains the buffer on success.
    ///
    /// # Errors
    /// Returns an error if the transmission fails; the buffer is left
    /// untouched so the caller decides whether to discard it.
    fn send(&mut self) -> RelayResult<SendResponse>;

    /// Discards any buffered items.
    fn clear(&mut self);
}

/// The trapper server's reply to a sender batch.
#[derive(Debug, Clone, Deserialize)]
pub struct SendResponse {
    /// `"success"` when the server accepted the batch.
    pub response: String,
    /// Processing summary, e.g. `processed: 2; failed: 0; ...`.
    #[serde(default)]
    pub info: String,
}

#[derive(Debug, Serialize)]
struct TrapItem {
    host: String,
    key: String,
    #[serde(serialize_with = "serialize_value")]
    value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    clock: Option<u64>,
}

#[derive(Debug, Serialize)]
struct TrapRequest<'a> {
    request: &'static str,
    data: &'a [TrapItem],
    #[serde(skip_serializing_if = "Option::is_none")]
    clock: Option<u64>,
}

/// Integral values go on the wire without a fractional part, the way the
/// server reports them back.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
fn serialize_value<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.fract() == 0.0 && value.is_finite() && value.abs() < i64::MAX as f64 {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}

/// TCP client for the Zabbix trapper ("sender data") protocol.
///
/// Buffers items between flushes and transmits them in a single framed
/// JSON request. Connection handling is one connect per send; the trapper
/// protocol is strictly request/response.
pub struct ZabbixSender {
    server: String,
    timeout: Duration,
    with_timestamps: bool,
    items: Vec<TrapItem>,
}

impl ZabbixSender {
    /// Creates a sender targeting `host:port`.
    ///
    /// When `with_timestamps` is set, each item carries the wall-clock
    /// second it was buffered and the request carries a top-level clock,
    /// so the server records the relay's time instead of its own receive
    /// time.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16, with_timestamps: bool) -> Self {
        Self {
            server: format!("{}:{}", host.into(), port),
            timeout: Duration::from_secs(10),
            with_timestamps,
            items: Vec::new(),
        }
    }

    /// Overrides the connect/read/write timeout (default 10s).
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn encode_request(&self) -> RelayResult<Vec<u8>> {
        let request = TrapRequest {
            request: "sender data",
            data: &self.items,
            clock: self.with_timestamps.then(unix_now),
        };
        let body = serde_json::to_vec(&request)?;

        let mut frame = Vec::with_capacity(ZBX_MAGIC.len() + 8 + body.len());
        frame.extend_from_slice(ZBX_MAGIC);
        frame.extend_from_slice(&(body.len() as u64).to_le_bytes());
        frame.extend_from_slice(&body);
        Ok(frame)
    }

    fn exchange(&self, frame: &[u8]) -> RelayResult<SendResponse> {
        let addr = resolve_addr(&self.server)?;
        let mut stream = TcpStream::connect_timeout(&addr, self.timeout)?;
        stream.set_read_timeout(Some(self.timeout))?;
        stream.set_write_timeout(Some(self.timeout))?;

        stream.write_all(frame)?;

        let mut header = [0u8; 13];
        stream.read_exact(&mut header)?;
        if &header[..5] != ZBX_MAGIC {
            return Err(RelayError::Server(
                "malformed response header".to_string(),
            ));
        }

        let body_len = u64::from_le_bytes([
            header[5], header[6], header[7], header[8], header[9], header[10], header[11],
            header[12],
        ]);
        #[allow(clippy::cast_possible_truncation)]
        let mut body = vec![0u8; body_len as usize];
        stream.read_exact(&mut body)?;

        let response: SendResponse = serde_json::from_slice(&body)?;
        if response.response != "success" {
            return Err(RelayError::Server(if response.info.is_empty() {
                response.response
            } else {
                response.info
            }));
        }
        Ok(response)
    }
}

impl ItemSender for ZabbixSender {
    fn add_item(&mut self, item: Item) {
        self.items.push(TrapItem {
            host: item.host,
            key: item.key,
            value: item.value,
            clock: self.with_timestamps.then(unix_now),
        });
    }

    fn item_count(&self) -> usize {
        self.items.len()
    }

    fn send(&mut self) -> RelayResult<SendResponse> {
        let frame = self.encode_request()?;
        let response = self.exchange(&frame);
        if response.is_ok() {
            self.items.clear();
        }
        response
    }

    fn clear(&mut self) {
        self.items.clear();
    }
}

fn resolve_addr(server: &str) -> RelayResult<SocketAddr> {
    server.to_socket_addrs()?.next().ok_or_else(|| {
        RelayError::StdIo(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("no address for {server}"),
        ))
    })
}

/// Current unix timestamp in seconds.
pub(crate) fn unix_now() -> u64 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(elapsed) => elapsed.as_secs(),
        Err(err) => {
            warn!("System clock before unix epoch: {err}");
            0
        }
    }
}
