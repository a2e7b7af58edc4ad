//! Open Pixel Control client.
//!
//! Message layout: `[channel, command, len_hi, len_lo, data...]` where command
//! 0 is "set pixel colours" and data is packed RGB triplets.

use crate::canvas::Rgb;
use std::io::Write;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

pub const DEFAULT_PORT: u16 = 7890;
pub const CMD_SET_PIXELS: u8 = 0;

/// Pixel transport capability used by the streamer.
pub trait PixelTransport {
    fn is_connected(&self) -> bool;
    /// Non-blocking, idempotent reconnect attempt.
    fn try_connect(&mut self);
    /// Fire-and-forget write of one addressed channel.
    fn write_channel(&mut self, channel: u8, pixels: &[Rgb]);
}

pub fn encode_message(channel: u8, pixels: &[Rgb]) -> Vec<u8> {
    let max_pixels = u16::MAX as usize / 3;
    let pixels = &pixels[..pixels.len().min(max_pixels)];
    let len = pixels.len() * 3;
    let mut msg = Vec::with_capacity(4 + len);
    msg.push(channel);
    msg.push(CMD_SET_PIXELS);
    msg.extend_from_slice(&(len as u16).to_be_bytes());
    for px in pixels {
        msg.extend_from_slice(&[px.r, px.g, px.b]);
    }
    msg
}

pub struct OpcClient {
    host: String,
    port: u16,
    stream: Option<TcpStream>,
    retry_every: Duration,
    connect_timeout: Duration,
    last_attempt: Option<Instant>,
    messages_sent: u64,
}

impl OpcClient {
    /// Set up the client and make a first connection attempt.
    pub fn connect(host: impl Into<String>, port: u16, retry_every: Duration) -> Self {
        let mut client = Self {
            host: host.into(),
            port,
            stream: None,
            retry_every,
            connect_timeout: Duration::from_millis(50),
            last_attempt: None,
            messages_sent: 0,
        };
        client.try_connect();
        client
    }

    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn messages_sent(&self) -> u64 {
        self.messages_sent
    }

    fn resolve(&self) -> Option<SocketAddr> {
        match (self.host.as_str(), self.port).to_socket_addrs() {
            Ok(mut addrs) => addrs.next(),
            Err(err) => {
                tracing::warn!(endpoint = %self.endpoint(), error = %err, "cannot resolve pixel server");
                None
            }
        }
    }

    fn open(&self, addr: SocketAddr) -> std::io::Result<TcpStream> {
        let stream = TcpStream::connect_timeout(&addr, self.connect_timeout)?;
        stream.set_nodelay(true)?;
        stream.set_write_timeout(Some(Duration::from_millis(50)))?;
        Ok(stream)
    }

    fn disconnect(&mut self, err: &std::io::Error) {
        tracing::warn!(endpoint = %self.endpoint(), error = %err, "pixel server connection lost");
        self.stream = None;
    }
}

impl PixelTransport for OpcClient {
    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn try_connect(&mut self) {
        if self.stream.is_some() {
            return;
        }
        let now = Instant::now();
        if let Some(last) = self.last_attempt {
            if now.duration_since(last) < self.retry_every {
                return;
            }
        }
        self.last_attempt = Some(now);

        let Some(addr) = self.resolve() else {
            return;
        };
        match self.open(addr) {
            Ok(stream) => {
                tracing::info!(endpoint = %self.endpoint(), "connected to pixel server");
                self.stream = Some(stream);
            }
            Err(err) => {
                tracing::debug!(endpoint = %self.endpoint(), error = %err, "pixel server not reachable");
            }
        }
    }

    fn write_channel(&mut self, channel: u8, pixels: &[Rgb]) {
        let Some(stream) = self.stream.as_mut() else {
            return;
        };
        let msg = encode_message(channel, pixels);
        match stream.write_all(&msg) {
            Ok(()) => self.messages_sent += 1,
            Err(err) => self.disconnect(&err),
        }
    }
}
