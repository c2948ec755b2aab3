//! # ntp-query
//!
//! A single-shot Network Time Protocol client for Rust. It sends one NTPv3 client-mode request,
//! reads the reply and turns the server's transmit timestamp into a calendar time.
//!
//! * A blocking API over UDP and an (optional) asynchronous API based on `tokio`
//! * A transport-agnostic core: [`query`] runs the exchange over anything implementing
//!   [`Transport`]
//! * Date and time handling based on the `chrono` crate, optional `time` crate conversion
//!
//! There is no clock filtering, no round trip or offset computation and no retry: one query is
//! one 48 byte request and one 48 byte reply.
//!
//! ## Usage
//!
//! Add this to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! ntp-query = "1.0.0"
//! ```
//!
//! Obtain the current local time with the blocking API:
//!
//! ```no_run
//! use ntp_query::NtpClient;
//!
//! let client = NtpClient::new();
//! let result = client.query("pool.ntp.org").unwrap();
//!
//! println!("Time: {}", result.local_time());
//! ```
//!
#![cfg_attr(
    feature = "async",
    doc = r##"
A function which uses the asynchronous API to obtain the UTC time:

```no_run
use ntp_query::{AsyncNtpClient, CalendarTime};

async fn utc_time() -> CalendarTime {
  let client = AsyncNtpClient::new();
  let result = client.query("pool.ntp.org").await.unwrap();

  result.utc_time()
}
```

## Disabling asynchronous API

The asynchronous API is enabled by default but you can optionally disable it. This removes
dependency to `tokio`.

```toml
[dependencies]
ntp-query = { version = "1.0.0", default-features = false }
```
"##
)]
//! ## Custom transports
//!
//! Name resolution and socket setup are not tied to the exchange. Any connected channel can be
//! used:
//!
//! ```no_run
//! use ntp_query::{query, StreamTransport, Validation};
//! use std::net::TcpStream;
//!
//! let stream = TcpStream::connect("127.0.0.1:12300").unwrap();
//! let mut transport = StreamTransport::new(stream);
//!
//! let result = query(&mut transport, Validation::None).unwrap();
//! println!("Unix time: {}", result.unix_timestamp());
//! ```
//!
//! ## Reply validation
//!
//! By default any well formed reply is accepted, including Kiss-o'-Death replies. With
//! [`Config::strict`] the client rejects stratum 0 replies, replies with a mode other than
//! server or broadcast and replies without a transmit timestamp.
//!

mod core_logic;
mod error;
mod packet;
mod result;
mod to_server_addrs;
mod transport;

pub use core_logic::{ntp_to_unix_seconds, query, Validation, NTP_UNIX_EPOCH_OFFSET};
pub use error::{ConversionError, KissCode, ProtocolError, QueryError};
pub use packet::{
    decode_response, encode_request, extract_flags, from_network_order, to_network_order, Flags,
    LeapIndicator, Mode, NtpPacket, NtpTimestamp, ReferenceIdentifier,
};
pub use result::{CalendarTime, QueryResult};
pub use to_server_addrs::{ServerAddrs, ToServerAddrs};
pub use transport::{StreamTransport, Transport, UdpTransport};

#[cfg(feature = "async")]
use core_logic::{Reply, Request};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

#[cfg(feature = "async")]
use tokio::time::timeout;

/// Well known NTP server port
pub const NTP_PORT: u16 = 123;

/// Client configuration
///
/// This is a struct which contains the configuration of a client. It uses a builder-like pattern
/// to set parameters. Its main aim is to be able to create client instances with non-default
/// configuration without making them mutable.
///
/// # Example
///
/// ```no_run
/// use ntp_query::{Config, NtpClient};
/// use std::time::Duration;
///
/// let config = Config::default().bind_address("192.168.0.1:0".parse().unwrap()).timeout(Duration::from_secs(10));
/// let client = NtpClient::with_config(config);
/// ```
#[derive(Clone, Debug, Hash)]
pub struct Config {
    bind_address: SocketAddr,
    timeout: Duration,
    validation: Validation,
}

impl Config {
    /// Creates an instance with default configuration
    ///
    /// # Example
    ///
    /// ```no_run
    /// use ntp_query::Config;
    ///
    /// let config = Config::default();
    /// ```
    pub fn default() -> Config {
        Config {
            bind_address: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
            timeout: Duration::from_secs(3),
            validation: Validation::None,
        }
    }

    /// Set UDP bind address
    ///
    /// Sets the local address which is used to send/receive UDP packets. By default it is
    /// "0.0.0.0:0" which means that an IPv4 address and a port is chosen automatically.
    ///
    /// To query IPv6 servers, you might need to set it to an IPv6 address.
    pub fn bind_address(self, address: SocketAddr) -> Config {
        Config {
            bind_address: address,
            ..self
        }
    }

    /// Sets the query timeout
    ///
    /// Sets the amount of time which the client waits for reply after the request has been sent.
    /// Default is 3 seconds.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use ntp_query::{Config, NtpClient};
    /// use std::time::Duration;
    ///
    /// let config = Config::default().timeout(Duration::from_secs(10));
    /// let client = NtpClient::with_config(config);
    /// ```
    pub fn timeout(self, timeout: Duration) -> Config {
        Config { timeout, ..self }
    }

    /// Enables or disables strict reply validation
    ///
    /// Off by default. When on, Kiss-o'-Death replies, replies with a mode other than server or
    /// broadcast and replies with a zero transmit timestamp are rejected with a
    /// [`ProtocolError`].
    ///
    /// # Example
    ///
    /// ```no_run
    /// use ntp_query::{Config, NtpClient};
    ///
    /// let client = NtpClient::with_config(Config::default().strict(true));
    ///
    /// match client.query("pool.ntp.org") {
    ///     Err(err) if err.is_kiss_of_death() => println!("Server asked us to go away"),
    ///     Err(err) => println!("Query failed: {}", err),
    ///     Ok(result) => println!("{}", result.local_time()),
    /// }
    /// ```
    pub fn strict(self, strict: bool) -> Config {
        let validation = if strict {
            Validation::Strict
        } else {
            Validation::None
        };

        Config { validation, ..self }
    }
}

/// Blocking client instance
///
/// This is the main entry point of the blocking API.
#[derive(Clone, Debug, Hash)]
pub struct NtpClient {
    config: Config,
}

impl NtpClient {
    /// Creates a new instance with default configuration
    ///
    /// # Example
    ///
    /// ```no_run
    /// use ntp_query::NtpClient;
    ///
    /// let client = NtpClient::new();
    /// ```
    pub fn new() -> NtpClient {
        NtpClient {
            config: Config::default(),
        }
    }

    /// Creates a new instance with a specific configuration
    pub fn with_config(config: Config) -> NtpClient {
        NtpClient { config }
    }

    /// Query the server
    ///
    /// Opens a UDP socket, sends a request to the server, waits for the reply and processes it.
    /// This is a blocking call: it waits up to the configured timeout for the reply.
    ///
    /// If the server address has no port, the NTP port (123) is used. If it resolves to
    /// multiple addresses, they are tried in order until the socket connects.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use ntp_query::NtpClient;
    ///
    /// let client = NtpClient::new();
    /// let result = client.query("pool.ntp.org");
    /// ```
    pub fn query<A: ToServerAddrs>(&self, server_address: A) -> Result<QueryResult, QueryError> {
        let server_address = server_address.to_server_addrs(NTP_PORT);
        log::debug!("Querying {:?}", server_address);

        let mut transport = UdpTransport::connect(server_address, &self.config)?;

        query(&mut transport, self.config.validation)
    }

    /// Sets the query timeout
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.config.timeout = timeout;
    }

    /// Set UDP bind address
    pub fn set_bind_address(&mut self, address: SocketAddr) {
        self.config.bind_address = address;
    }

    /// Set the configuration
    pub fn set_config(&mut self, config: Config) {
        self.config = config
    }
}

impl Default for NtpClient {
    fn default() -> Self {
        NtpClient::new()
    }
}

/// Asynchronous client instance
///
/// Only available when async feature is enabled (which is the default)
///
/// This is the main entry point of the asynchronous API.
#[cfg(feature = "async")]
#[derive(Clone, Debug, Hash)]
pub struct AsyncNtpClient {
    config: Config,
}

#[cfg(feature = "async")]
impl AsyncNtpClient {
    /// Creates a new instance with default configuration
    ///
    /// # Example
    ///
    /// ```no_run
    /// use ntp_query::AsyncNtpClient;
    ///
    /// let client = AsyncNtpClient::new();
    /// ```
    pub fn new() -> AsyncNtpClient {
        AsyncNtpClient {
            config: Config::default(),
        }
    }

    /// Creates a new instance with a specific configuration
    pub fn with_config(config: Config) -> AsyncNtpClient {
        AsyncNtpClient { config }
    }

    /// Query the server
    ///
    /// Sends a request to the server and processes the reply. If no reply is received within
    /// timeout then an error is returned. If the server address resolves to multiple addresses,
    /// they are tried in order until the socket connects.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use ntp_query::{AsyncNtpClient, QueryResult, QueryError};
    ///
    /// async fn server_time() -> Result<QueryResult, QueryError> {
    ///   let client = AsyncNtpClient::new();
    ///
    ///   client.query("pool.ntp.org").await
    /// }
    /// ```
    pub async fn query<A: ToServerAddrs>(
        &self,
        server_address: A,
    ) -> Result<QueryResult, QueryError> {
        let server_address = server_address.to_server_addrs(NTP_PORT);
        let peers = server_address.lookup().await?;

        let socket = tokio::net::UdpSocket::bind(self.config.bind_address).await?;
        let peer = connect_any(&socket, &peers).await?;
        log::debug!("Querying {}", peer);

        let request = Request::new();
        Request::check_sent(socket.send(request.as_bytes()).await?)?;

        let mut receive_buffer = [0; NtpPacket::ENCODED_LEN];
        let result_future = timeout(self.config.timeout, socket.recv(&mut receive_buffer));

        let bytes_received = result_future.await.map_err(|_| {
            std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "Timeout while waiting for server reply",
            )
        })??;

        Reply::from_received(&receive_buffer[..bytes_received])?.process(self.config.validation)
    }

    /// Sets the query timeout
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.config.timeout = timeout;
    }

    /// Set UDP bind address
    pub fn set_bind_address(&mut self, address: SocketAddr) {
        self.config.bind_address = address;
    }

    /// Set the configuration
    pub fn set_config(&mut self, config: Config) {
        self.config = config
    }
}

#[cfg(feature = "async")]
impl Default for AsyncNtpClient {
    fn default() -> Self {
        AsyncNtpClient::new()
    }
}

/// Connects to the first address which accepts the connection, returns the last error if none
/// does.
#[cfg(feature = "async")]
async fn connect_any(
    socket: &tokio::net::UdpSocket,
    peers: &[SocketAddr],
) -> std::io::Result<SocketAddr> {
    let mut last_error = None;

    for peer in peers {
        match socket.connect(*peer).await {
            Ok(()) => return Ok(*peer),
            Err(e) => {
                log::debug!("Unable to connect to {}: {}", peer, e);
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Server address did not resolve to any address",
        )
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builder_keeps_other_fields() {
        let bind: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let config = Config::default()
            .timeout(Duration::from_millis(250))
            .strict(true)
            .bind_address(bind);

        assert_eq!(config.bind_address, bind);
        assert_eq!(config.timeout, Duration::from_millis(250));
        assert_eq!(config.validation, Validation::Strict);
        assert_eq!(config.strict(false).validation, Validation::None);
    }

    #[cfg(feature = "async")]
    #[tokio::test]
    async fn connect_skips_addresses_of_other_family() {
        let socket = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let v6: SocketAddr = "[::1]:12300".parse().unwrap();
        let v4: SocketAddr = "127.0.0.1:12300".parse().unwrap();

        assert_eq!(connect_any(&socket, &[v6, v4]).await.unwrap(), v4);
        assert_eq!(socket.peer_addr().unwrap(), v4);
    }

    #[cfg(feature = "async")]
    #[tokio::test]
    async fn connect_without_addresses_fails() {
        let socket = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let err = connect_any(&socket, &[]).await.unwrap_err();

        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }

    #[test]
    fn default_config_binds_any_ipv4() {
        let config = Config::default();

        assert_eq!(config.bind_address, "0.0.0.0:0".parse().unwrap());
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.validation, Validation::None);
    }
}
