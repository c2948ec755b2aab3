use crate::packet::{NtpPacket, ReferenceIdentifier};
use std::convert::From;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Kiss code, reason of a Kiss-o'-Death reply.
///
/// Kiss code provides information about why the server sent a Kiss-o'-Death packet, i.e.
/// why the request has been rejected. Codes follow RFC 5905 section 7.4.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum KissCode {
    /// Unknown code
    Unknown,
    /// The association belongs to a unicast server
    AssociationBelongsToUnicastServer,
    /// The association belongs to a broadcast server
    AssociationBelongsToBroadcastServer,
    /// The association belongs to a manycast server
    AssociationBelongsToManycastServer,
    /// Server authentication failed
    ServerAuthenticationFailed,
    /// Autokey sequence failed
    AutokeySequenceFailed,
    /// Cryptographic authentication or identification failed
    CryptographicAuthenticationFailed,
    /// Access denied by remote server
    AccessDenied,
    /// Lost peer in symmetric mode
    LostPeer,
    /// The association has not yet synchronized for the first time
    AssociationNotYetSynchronized,
    /// No key found
    NoKeyFound,
    /// Rate exceeded, the server has temporarily denied access
    RateExceeded,
    /// Somebody is tinkering with the association from a remote host
    TinkeringWithAssociation,
    /// A step change in system time has occurred, but the association has not yet resynchronized
    StepChange,
}

impl KissCode {
    pub(crate) fn new(reference_identifier: &ReferenceIdentifier) -> KissCode {
        if let ReferenceIdentifier::ASCII(s) = reference_identifier {
            match s.as_str() {
                "ACST" => KissCode::AssociationBelongsToUnicastServer,
                "AUTH" => KissCode::ServerAuthenticationFailed,
                "AUTO" => KissCode::AutokeySequenceFailed,
                "BCST" => KissCode::AssociationBelongsToBroadcastServer,
                "CRYP" => KissCode::CryptographicAuthenticationFailed,
                "DENY" | "RSTR" => KissCode::AccessDenied,
                "DROP" => KissCode::LostPeer,
                "INIT" => KissCode::AssociationNotYetSynchronized,
                "MCST" => KissCode::AssociationBelongsToManycastServer,
                "NKEY" => KissCode::NoKeyFound,
                "RATE" => KissCode::RateExceeded,
                "RMOT" => KissCode::TinkeringWithAssociation,
                "STEP" => KissCode::StepChange,
                _ => KissCode::Unknown,
            }
        } else {
            KissCode::Unknown
        }
    }

    pub(crate) fn from_packet(packet: &NtpPacket) -> KissCode {
        KissCode::new(&packet.reference_identifier())
    }
}

impl Display for KissCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            KissCode::Unknown => "Unknown",
            KissCode::AssociationBelongsToUnicastServer => {
                "The association belongs to a unicast server"
            }
            KissCode::AssociationBelongsToBroadcastServer => {
                "The association belongs to a broadcast server"
            }
            KissCode::AssociationBelongsToManycastServer => {
                "The association belongs to a manycast server"
            }
            KissCode::ServerAuthenticationFailed => "Server authentication failed",
            KissCode::AutokeySequenceFailed => "Autokey sequence failed",
            KissCode::CryptographicAuthenticationFailed => {
                "Cryptographic authentication or identification failed"
            }
            KissCode::AccessDenied => "Access denied by remote server",
            KissCode::LostPeer => "Lost peer in symmetric mode",
            KissCode::AssociationNotYetSynchronized => {
                "The association has not yet synchronized for the first time"
            }
            KissCode::NoKeyFound => "No key found",
            KissCode::RateExceeded => "Rate exceeded",
            KissCode::TinkeringWithAssociation => {
                "Somebody is tinkering with the association from a remote host"
            }
            KissCode::StepChange => {
                "A step change in system time has occurred, but the association has not yet resynchronized"
            }
        };

        write!(f, "{}", text)
    }
}

/// Errors in the content of a server reply.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ProtocolError {
    /// Server reply packet is shorter than 48 bytes
    PacketIsTooShort,
    /// Server reply packet contains a mode other than server or broadcast
    InvalidMode,
    /// Server reply contains a zero transmit timestamp
    InvalidTransmitTimestamp,
    /// Reference identifier is not a printable ASCII code
    InvalidReferenceIdentifier,
    /// Kiss-o'-Death packet received. The server rejected the request and the client should
    /// stop sending requests to it.
    KissODeath(KissCode),
}

impl Error for ProtocolError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        None
    }
}

impl Display for ProtocolError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ProtocolError::PacketIsTooShort => write!(f, "Server reply packet is too short"),
            ProtocolError::InvalidMode => write!(f, "Server reply packet contains invalid mode"),
            ProtocolError::InvalidTransmitTimestamp => {
                write!(f, "Server reply contains invalid transmit timestamp")
            }
            ProtocolError::InvalidReferenceIdentifier => {
                write!(f, "Server reply contains invalid reference identifier")
            }
            ProtocolError::KissODeath(code) => {
                write!(f, "Kiss-o'-Death packet received: {}", code)
            }
        }
    }
}

/// Query error
///
/// Returned when a query fails. Transport failures and protocol failures are kept apart so
/// callers can decide whether trying another server makes sense.
#[derive(Debug)]
pub enum QueryError {
    /// An I/O error occured, like socket error, timeout, etc...
    IOError(std::io::Error),
    /// The transport accepted fewer bytes than the request size
    ShortWrite(usize),
    /// The transport delivered fewer bytes than the reply size
    ShortRead(usize),
    /// The transport was closed before any reply byte arrived
    ConnectionClosed,
    /// NTP protocol specific error
    ProtocolError(ProtocolError),
}

impl QueryError {
    /// Check if the error was raised by the transport rather than by the reply content.
    ///
    /// ```no_run
    /// use ntp_query::NtpClient;
    ///
    /// let client = NtpClient::new();
    ///
    /// if let Err(err) = client.query("pool.ntp.org") {
    ///     if err.is_transport_error() {
    ///         println!("Server unreachable: {}", err);
    ///     }
    /// }
    /// ```
    pub fn is_transport_error(&self) -> bool {
        matches!(
            self,
            QueryError::IOError(_)
                | QueryError::ShortWrite(_)
                | QueryError::ShortRead(_)
                | QueryError::ConnectionClosed
        )
    }

    /// Check if the error is a Kiss-o'-Death.
    ///
    /// Only reported when strict reply validation is enabled, see [`crate::Config::strict`].
    pub fn is_kiss_of_death(&self) -> bool {
        matches!(
            self,
            QueryError::ProtocolError(ProtocolError::KissODeath(_))
        )
    }
}

impl Error for QueryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            QueryError::IOError(io_error) => Some(io_error),
            QueryError::ProtocolError(protocol_error) => Some(protocol_error),
            _ => None,
        }
    }
}

impl Display for QueryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryError::IOError(io_error) => write!(f, "Input/output error: {}", io_error),
            QueryError::ShortWrite(written) => write!(
                f,
                "Short write: {} of {} bytes sent",
                written,
                NtpPacket::ENCODED_LEN
            ),
            QueryError::ShortRead(read) => write!(
                f,
                "Short read: {} of {} bytes received",
                read,
                NtpPacket::ENCODED_LEN
            ),
            QueryError::ConnectionClosed => write!(f, "Connection closed by peer"),
            QueryError::ProtocolError(protocol_error) => {
                write!(f, "Protocol error: {}", protocol_error)
            }
        }
    }
}

impl From<std::io::Error> for QueryError {
    fn from(io_error: std::io::Error) -> QueryError {
        QueryError::IOError(io_error)
    }
}

impl From<ProtocolError> for QueryError {
    fn from(protocol_error: ProtocolError) -> QueryError {
        QueryError::ProtocolError(protocol_error)
    }
}

/// Represents an error which occured during timestamp conversion
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ConversionError {
    /// The timestamp is out of the range of the target type
    Overflow,
}

impl Error for ConversionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        None
    }
}

impl Display for ConversionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Overflow during timestamp conversion")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kiss_code_is_parsed_from_ascii_identifier() {
        let rate = ReferenceIdentifier::ASCII("RATE".to_string());
        let rstr = ReferenceIdentifier::ASCII("RSTR".to_string());
        let other = ReferenceIdentifier::ASCII("XYZW".to_string());

        assert_eq!(KissCode::new(&rate), KissCode::RateExceeded);
        assert_eq!(KissCode::new(&rstr), KissCode::AccessDenied);
        assert_eq!(KissCode::new(&other), KissCode::Unknown);
        assert_eq!(KissCode::new(&ReferenceIdentifier::Empty), KissCode::Unknown);
    }

    #[test]
    fn transport_errors_are_distinguished() {
        let io = QueryError::from(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            "timeout",
        ));

        assert!(io.is_transport_error());
        assert!(QueryError::ShortWrite(10).is_transport_error());
        assert!(QueryError::ShortRead(47).is_transport_error());
        assert!(QueryError::ConnectionClosed.is_transport_error());
        assert!(!QueryError::from(ProtocolError::PacketIsTooShort).is_transport_error());
    }

    #[test]
    fn kiss_of_death_is_detected() {
        let err = QueryError::from(ProtocolError::KissODeath(KissCode::RateExceeded));

        assert!(err.is_kiss_of_death());
        assert!(!QueryError::ConnectionClosed.is_kiss_of_death());
        assert_eq!(
            err.to_string(),
            "Protocol error: Kiss-o'-Death packet received: Rate exceeded"
        );
    }

    #[test]
    fn short_read_message_names_sizes() {
        assert_eq!(
            QueryError::ShortRead(12).to_string(),
            "Short read: 12 of 48 bytes received"
        );
    }
}
