use crate::error::{KissCode, ProtocolError, QueryError};
use crate::packet::{self, Mode, NtpPacket};
use crate::result::QueryResult;
use crate::transport::Transport;

/// Seconds between 1900-01-01T00:00:00Z and 1970-01-01T00:00:00Z
pub const NTP_UNIX_EPOCH_OFFSET: i64 = 2_208_988_800;

/// How much of the reply is checked before it is accepted
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum Validation {
    /// Any well formed reply is accepted
    #[default]
    None,
    /// Kiss-o'-Death, wrong mode and zero transmit timestamp are rejected
    Strict,
}

/// Converts NTP era 0 seconds to Unix seconds.
pub fn ntp_to_unix_seconds(ntp_seconds: u32) -> i64 {
    i64::from(ntp_seconds) - NTP_UNIX_EPOCH_OFFSET
}

pub(crate) struct Request {
    bytes: [u8; NtpPacket::ENCODED_LEN],
}

impl Request {
    pub fn new() -> Request {
        Request {
            bytes: packet::encode_request(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn send<T: Transport + ?Sized>(&self, transport: &mut T) -> Result<(), QueryError> {
        let written = transport.send(self.as_bytes())?;

        Request::check_sent(written)
    }

    /// Accepts only a complete write of the request.
    pub fn check_sent(written: usize) -> Result<(), QueryError> {
        if written != NtpPacket::ENCODED_LEN {
            return Err(QueryError::ShortWrite(written));
        }

        log::debug!("Request sent ({} bytes)", written);

        Ok(())
    }
}

pub(crate) struct Reply {
    reply: NtpPacket,
}

impl Reply {
    pub fn new(reply: NtpPacket) -> Reply {
        Reply { reply }
    }

    pub fn receive<T: Transport + ?Sized>(transport: &mut T) -> Result<Reply, QueryError> {
        let mut buffer = [0; NtpPacket::ENCODED_LEN];
        let received = transport.receive(&mut buffer)?;

        Reply::from_received(&buffer[..received])
    }

    pub fn from_received(received: &[u8]) -> Result<Reply, QueryError> {
        match received.len() {
            0 => Err(QueryError::ConnectionClosed),
            n if n < NtpPacket::ENCODED_LEN => Err(QueryError::ShortRead(n)),
            _ => Ok(Reply::new(packet::decode_response(received)?)),
        }
    }

    fn check(&self) -> Result<(), ProtocolError> {
        let mode = self.reply.flags().mode;

        if self.reply.stratum == 0 {
            let code = KissCode::from_packet(&self.reply);
            log::warn!("Kiss-o'-Death received: {}", code);

            return Err(ProtocolError::KissODeath(code));
        }

        if mode != Mode::Server && mode != Mode::Broadcast {
            return Err(ProtocolError::InvalidMode);
        }

        if self.reply.transmit_timestamp.is_zero() {
            return Err(ProtocolError::InvalidTransmitTimestamp);
        }

        Ok(())
    }

    pub fn process(self, validation: Validation) -> Result<QueryResult, QueryError> {
        debug_ntp_packet(&self.reply);

        if validation == Validation::Strict {
            self.check()?;
        }

        let transmit = self.reply.transmit_timestamp;
        let unix_seconds = ntp_to_unix_seconds(transmit.seconds);

        log::debug!(
            "Transmit timestamp {}.{:09} -> unix {}",
            transmit.seconds,
            transmit.subsec_nanos(),
            unix_seconds
        );

        Ok(QueryResult::new(unix_seconds, &self.reply))
    }
}

/// Performs one request/reply exchange over an already connected transport.
///
/// Writes a 48 byte client request, reads a 48 byte reply and converts its transmit timestamp.
/// Nothing is retried: a failed or partial write or read ends the query with an error. A read
/// blocks until the transport returns, so any timeout has to be set on the transport.
///
/// # Example
///
/// ```no_run
/// use ntp_query::{query, Validation};
/// use std::net::UdpSocket;
///
/// let mut socket = UdpSocket::bind("0.0.0.0:0").unwrap();
/// socket.connect("pool.ntp.org:123").unwrap();
///
/// let result = query(&mut socket, Validation::None).unwrap();
/// println!("{}", result.local_time());
/// ```
pub fn query<T: Transport + ?Sized>(
    transport: &mut T,
    validation: Validation,
) -> Result<QueryResult, QueryError> {
    Request::new().send(transport)?;

    Reply::receive(transport)?.process(validation)
}

fn debug_ntp_packet(packet: &NtpPacket) {
    if !log::log_enabled!(log::Level::Debug) {
        return;
    }

    let flags = packet.flags();

    log::debug!("{}", "=".repeat(48));
    log::debug!("| Mode:\t\t\t{:?}", flags.mode);
    log::debug!("| Version:\t\t{}", flags.version);
    log::debug!("| Leap:\t\t\t{:?}", flags.leap_indicator);
    log::debug!("| Stratum:\t\t{}", packet.stratum);
    log::debug!("| Poll:\t\t\t{}", packet.poll);
    log::debug!("| Precision:\t\t{}", packet.precision);
    log::debug!("| Root delay:\t\t{}", packet.root_delay);
    log::debug!("| Root dispersion:\t{}", packet.root_dispersion);
    log::debug!("| Reference ID:\t\t{}", packet.reference_identifier());
    log::debug!("| Transmit timestamp:\t{:?}", packet.transmit_timestamp);
    log::debug!("{}", "=".repeat(48));
}
