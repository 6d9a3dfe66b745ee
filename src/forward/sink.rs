//! Network sink for raw sample records.

use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

/// Address of the dataset collection server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkConfig {
    pub host: String,
    pub port: u16,
}

impl SinkConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Parse `host:port`.
    pub fn parse(s: &str) -> Option<Self> {
        let (host, port) = s.trim().rsplit_once(':')?;
        let port = port.parse().ok()?;
        if host.is_empty() {
            return None;
        }
        Some(Self::new(host, port))
    }
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self::new("192.168.136.250", 7123)
    }
}

impl std::fmt::Display for SinkConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// A byte-stream destination the forwarder writes records to.
pub trait NetworkSink {
    /// Open a connection. The forwarder does not retry on failure.
    fn connect(&mut self, host: &str, port: u16) -> io::Result<()>;

    /// Write `bytes`, returning how many were written.
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize>;

    /// Close the connection, if any.
    fn stop(&mut self);
}

impl<S: NetworkSink + ?Sized> NetworkSink for Box<S> {
    fn connect(&mut self, host: &str, port: u16) -> io::Result<()> {
        (**self).connect(host, port)
    }

    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        (**self).write(bytes)
    }

    fn stop(&mut self) {
        (**self).stop()
    }
}

/// TCP client sink.
#[derive(Debug)]
pub struct TcpSink {
    stream: Option<TcpStream>,
    connect_timeout: Duration,
}

impl TcpSink {
    pub fn new(connect_timeout: Duration) -> Self {
        Self {
            stream: None,
            connect_timeout,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }
}

impl Default for TcpSink {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

impl NetworkSink for TcpSink {
    fn connect(&mut self, host: &str, port: u16) -> io::Result<()> {
        self.stop();

        let mut last_err = io::Error::new(io::ErrorKind::NotFound, "address resolved to nothing");
        for addr in (host, port).to_socket_addrs()? {
            match TcpStream::connect_timeout(&addr, self.connect_timeout) {
                Ok(stream) => {
                    stream.set_nodelay(true)?;
                    self.stream = Some(stream);
                    return Ok(());
                }
                Err(e) => last_err = e,
            }
        }
        Err(last_err)
    }

    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        match self.stream.as_mut() {
            Some(stream) => {
                stream.write_all(bytes)?;
                Ok(bytes.len())
            }
            None => Err(io::Error::new(io::ErrorKind::NotConnected, "not connected")),
        }
    }

    fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }
}
