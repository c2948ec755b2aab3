use crate::error::ProtocolError;
use std::fmt::{Display, Formatter};
use std::net::Ipv4Addr;

const LI_MASK: u8 = 0xC0;
const LI_SHIFT: u8 = 6;
const VERSION_MASK: u8 = 0x38;
const VERSION_SHIFT: u8 = 3;
const MODE_MASK: u8 = 0x07;
const MODE_SHIFT: u8 = 0;

/// Protocol version carried by every request
pub(crate) const NTP_VERSION: u8 = 3;

/// Leap indicator
///
/// Warning of an impending leap second to be inserted or deleted in the last minute of the
/// current day.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum LeapIndicator {
    /// No warning
    NoWarning,
    /// Last minute of the day has 61 seconds
    LastMinuteHas61Seconds,
    /// Last minute of the day has 59 seconds
    LastMinuteHas59Seconds,
    /// Unknown (clock unsynchronized)
    AlarmCondition,
}

impl LeapIndicator {
    fn from_bits(bits: u8) -> LeapIndicator {
        match bits & 0x03 {
            0 => LeapIndicator::NoWarning,
            1 => LeapIndicator::LastMinuteHas61Seconds,
            2 => LeapIndicator::LastMinuteHas59Seconds,
            _ => LeapIndicator::AlarmCondition,
        }
    }

    /// Numeric value, `0..=3`
    pub fn bits(self) -> u8 {
        match self {
            LeapIndicator::NoWarning => 0,
            LeapIndicator::LastMinuteHas61Seconds => 1,
            LeapIndicator::LastMinuteHas59Seconds => 2,
            LeapIndicator::AlarmCondition => 3,
        }
    }
}

impl From<LeapIndicator> for u8 {
    fn from(leap_indicator: LeapIndicator) -> u8 {
        leap_indicator.bits()
    }
}

/// Association mode
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Mode {
    Reserved,
    SymmetricActive,
    SymmetricPassive,
    Client,
    Server,
    Broadcast,
    ControlMessage,
    ReservedForPrivateUse,
}

impl Mode {
    fn from_bits(bits: u8) -> Mode {
        match bits & 0x07 {
            0 => Mode::Reserved,
            1 => Mode::SymmetricActive,
            2 => Mode::SymmetricPassive,
            3 => Mode::Client,
            4 => Mode::Server,
            5 => Mode::Broadcast,
            6 => Mode::ControlMessage,
            _ => Mode::ReservedForPrivateUse,
        }
    }

    /// Numeric value, `0..=7`
    pub fn bits(self) -> u8 {
        match self {
            Mode::Reserved => 0,
            Mode::SymmetricActive => 1,
            Mode::SymmetricPassive => 2,
            Mode::Client => 3,
            Mode::Server => 4,
            Mode::Broadcast => 5,
            Mode::ControlMessage => 6,
            Mode::ReservedForPrivateUse => 7,
        }
    }
}

impl From<Mode> for u8 {
    fn from(mode: Mode) -> u8 {
        mode.bits()
    }
}

/// Unpacked content of the first header byte.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Flags {
    pub leap_indicator: LeapIndicator,
    pub version: u8,
    pub mode: Mode,
}

impl Flags {
    pub(crate) fn client_request() -> Flags {
        Flags {
            leap_indicator: LeapIndicator::NoWarning,
            version: NTP_VERSION,
            mode: Mode::Client,
        }
    }

    pub(crate) fn to_byte(self) -> u8 {
        (self.leap_indicator.bits() << LI_SHIFT)
            | ((self.version << VERSION_SHIFT) & VERSION_MASK)
            | (self.mode.bits() << MODE_SHIFT)
    }
}

/// Reference identifier of the server
///
/// For stratum 0 and 1 servers this is a four character ASCII code, for secondary IPv4 servers
/// the address of the upstream server. Anything else is kept as raw bytes.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ReferenceIdentifier {
    /// No identifier
    Empty,
    /// ASCII code, used by primary servers and in kiss-o'-death replies
    ASCII(String),
    /// IPv4 address of the upstream server
    IpAddress(Ipv4Addr),
    /// Uninterpreted bytes
    Unknown([u8; 4]),
}

impl ReferenceIdentifier {
    pub(crate) fn new(stratum: u8, reference_id: u32) -> ReferenceIdentifier {
        let bytes = reference_id.to_be_bytes();

        if reference_id == 0 {
            ReferenceIdentifier::Empty
        } else if stratum <= 1 {
            ReferenceIdentifier::new_ascii(bytes).unwrap_or(ReferenceIdentifier::Unknown(bytes))
        } else if stratum < 16 {
            ReferenceIdentifier::IpAddress(Ipv4Addr::from(bytes))
        } else {
            ReferenceIdentifier::Unknown(bytes)
        }
    }

    pub(crate) fn new_ascii(bytes: [u8; 4]) -> Result<ReferenceIdentifier, ProtocolError> {
        let len = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
        let code = &bytes[..len];

        if code.is_empty() || !code.iter().all(|b| b.is_ascii_graphic()) {
            return Err(ProtocolError::InvalidReferenceIdentifier);
        }

        Ok(ReferenceIdentifier::ASCII(
            String::from_utf8_lossy(code).into_owned(),
        ))
    }
}

impl Display for ReferenceIdentifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ReferenceIdentifier::Empty => write!(f, ""),
            ReferenceIdentifier::ASCII(code) => write!(f, "{}", code),
            ReferenceIdentifier::IpAddress(addr) => write!(f, "{}", addr),
            ReferenceIdentifier::Unknown(bytes) => write!(
                f,
                "{:02x}{:02x}{:02x}{:02x}",
                bytes[0], bytes[1], bytes[2], bytes[3]
            ),
        }
    }
}

/// 64-bit NTP timestamp: seconds since 1900-01-01 and a 2^-32 second fraction.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct NtpTimestamp {
    pub seconds: u32,
    pub fraction: u32,
}

impl NtpTimestamp {
    pub fn zero() -> NtpTimestamp {
        NtpTimestamp::default()
    }

    pub fn is_zero(&self) -> bool {
        self.seconds == 0 && self.fraction == 0
    }

    /// Fraction converted to nanoseconds, always below one second.
    pub fn subsec_nanos(&self) -> u32 {
        ((u64::from(self.fraction) * 1_000_000_000) >> 32) as u32
    }

    fn read(bytes: &[u8], offset: usize) -> NtpTimestamp {
        NtpTimestamp {
            seconds: read_u32(bytes, offset),
            fraction: read_u32(bytes, offset + 4),
        }
    }

    fn write(&self, bytes: &mut [u8], offset: usize) {
        write_u32(bytes, offset, self.seconds);
        write_u32(bytes, offset + 4, self.fraction);
    }
}

/// NTP packet header, all multi-byte fields in host byte order.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct NtpPacket {
    pub flags: u8,
    pub stratum: u8,
    pub poll: i8,
    pub precision: i8,
    pub root_delay: u32,
    pub root_dispersion: u32,
    pub reference_id: u32,
    pub reference_timestamp: NtpTimestamp,
    pub originate_timestamp: NtpTimestamp,
    pub receive_timestamp: NtpTimestamp,
    pub transmit_timestamp: NtpTimestamp,
}

impl NtpPacket {
    /// Size of the header on the wire
    pub const ENCODED_LEN: usize = 48;

    pub(crate) fn client_request() -> NtpPacket {
        NtpPacket {
            flags: Flags::client_request().to_byte(),
            stratum: 0,
            poll: 0,
            precision: 0,
            root_delay: 0,
            root_dispersion: 0,
            reference_id: 0,
            reference_timestamp: NtpTimestamp::zero(),
            originate_timestamp: NtpTimestamp::zero(),
            receive_timestamp: NtpTimestamp::zero(),
            transmit_timestamp: NtpTimestamp::zero(),
        }
    }

    /// Parses a packet from its wire form.
    ///
    /// Fails with [`ProtocolError::PacketIsTooShort`] if `bytes` holds less than
    /// [`Self::ENCODED_LEN`] bytes, in which case no field is read. Trailing bytes (extension
    /// fields, MAC) are ignored.
    pub fn from_bytes(bytes: &[u8]) -> Result<NtpPacket, ProtocolError> {
        if bytes.len() < Self::ENCODED_LEN {
            return Err(ProtocolError::PacketIsTooShort);
        }

        Ok(NtpPacket {
            flags: bytes[0],
            stratum: bytes[1],
            poll: bytes[2] as i8,
            precision: bytes[3] as i8,
            root_delay: read_u32(bytes, 4),
            root_dispersion: read_u32(bytes, 8),
            reference_id: read_u32(bytes, 12),
            reference_timestamp: NtpTimestamp::read(bytes, 16),
            originate_timestamp: NtpTimestamp::read(bytes, 24),
            receive_timestamp: NtpTimestamp::read(bytes, 32),
            transmit_timestamp: NtpTimestamp::read(bytes, 40),
        })
    }

    /// Serializes the packet into its wire form.
    pub fn to_bytes(&self) -> [u8; Self::ENCODED_LEN] {
        let mut bytes = [0; Self::ENCODED_LEN];

        bytes[0] = self.flags;
        bytes[1] = self.stratum;
        bytes[2] = self.poll as u8;
        bytes[3] = self.precision as u8;
        write_u32(&mut bytes, 4, self.root_delay);
        write_u32(&mut bytes, 8, self.root_dispersion);
        write_u32(&mut bytes, 12, self.reference_id);
        self.reference_timestamp.write(&mut bytes, 16);
        self.originate_timestamp.write(&mut bytes, 24);
        self.receive_timestamp.write(&mut bytes, 32);
        self.transmit_timestamp.write(&mut bytes, 40);

        bytes
    }

    pub fn flags(&self) -> Flags {
        extract_flags(self)
    }

    pub fn reference_identifier(&self) -> ReferenceIdentifier {
        ReferenceIdentifier::new(self.stratum, self.reference_id)
    }
}

/// Encodes a client request: all zero except the flags byte (LI 0, VN 3, mode client).
pub fn encode_request() -> [u8; NtpPacket::ENCODED_LEN] {
    NtpPacket::client_request().to_bytes()
}

/// Decodes a server reply, see [`NtpPacket::from_bytes`].
pub fn decode_response(bytes: &[u8]) -> Result<NtpPacket, ProtocolError> {
    NtpPacket::from_bytes(bytes)
}

/// Unpacks leap indicator, version and mode from the flags byte.
pub fn extract_flags(packet: &NtpPacket) -> Flags {
    Flags {
        leap_indicator: LeapIndicator::from_bits(shifter(packet.flags, LI_MASK, LI_SHIFT)),
        version: shifter(packet.flags, VERSION_MASK, VERSION_SHIFT),
        mode: Mode::from_bits(shifter(packet.flags, MODE_MASK, MODE_SHIFT)),
    }
}

/// Converts a host order value to network (big-endian) order.
pub fn to_network_order(value: u32) -> u32 {
    value.to_be()
}

/// Converts a network (big-endian) order value to host order.
pub fn from_network_order(value: u32) -> u32 {
    u32::from_be(value)
}

fn shifter(val: u8, mask: u8, shift: u8) -> u8 {
    (val & mask) >> shift
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

fn write_u32(bytes: &mut [u8], offset: usize, value: u32) {
    bytes[offset..offset + 4].copy_from_slice(&value.to_be_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_reply() -> NtpPacket {
        NtpPacket {
            flags: 0x24,
            stratum: 2,
            poll: 3,
            precision: -23,
            root_delay: 0x0000_0b71,
            root_dispersion: 0x0000_0399,
            reference_id: 0xc0a8_0001,
            reference_timestamp: NtpTimestamp {
                seconds: 3_486_372_500,
                fraction: 0x1234_5678,
            },
            originate_timestamp: NtpTimestamp::zero(),
            receive_timestamp: NtpTimestamp {
                seconds: 3_486_372_588,
                fraction: 0x8000_0000,
            },
            transmit_timestamp: NtpTimestamp {
                seconds: 3_486_372_588,
                fraction: 0x8000_1000,
            },
        }
    }

    #[test]
    fn request_is_zero_except_flags() {
        let bytes = encode_request();

        assert_eq!(bytes.len(), 48);
        assert_eq!(bytes[0], 0x1b);
        assert!(bytes[1..].iter().all(|b| *b == 0));
    }

    #[test]
    fn request_round_trips_through_decoder() {
        let packet = decode_response(&encode_request()).unwrap();

        assert_eq!(packet, NtpPacket::client_request());
        assert_eq!(packet.stratum, 0);
        assert!(packet.transmit_timestamp.is_zero());
    }

    #[test]
    fn flags_0x1b_decode_to_client_v3() {
        let packet = decode_response(&encode_request()).unwrap();
        let flags = extract_flags(&packet);

        assert_eq!(flags.leap_indicator, LeapIndicator::NoWarning);
        assert_eq!(flags.version, 3);
        assert_eq!(flags.mode, Mode::Client);
    }

    #[test]
    fn flags_are_unpacked_from_their_bit_ranges() {
        let mut packet = NtpPacket::client_request();

        packet.flags = 0b11_100_101;
        let flags = packet.flags();
        assert_eq!(flags.leap_indicator, LeapIndicator::AlarmCondition);
        assert_eq!(flags.version, 4);
        assert_eq!(flags.mode, Mode::Broadcast);

        packet.flags = 0b01_011_100;
        let flags = packet.flags();
        assert_eq!(flags.leap_indicator, LeapIndicator::LastMinuteHas61Seconds);
        assert_eq!(flags.version, 3);
        assert_eq!(flags.mode, Mode::Server);
    }

    #[test]
    fn flags_convert_to_their_numeric_ranges() {
        let mut packet = NtpPacket::client_request();

        for byte in 0..=u8::MAX {
            packet.flags = byte;
            let flags = extract_flags(&packet);

            assert_eq!(u8::from(flags.leap_indicator), byte >> 6);
            assert_eq!(flags.version, (byte >> 3) & 0x07);
            assert_eq!(u8::from(flags.mode), byte & 0x07);
        }

        let flags = extract_flags(&decode_response(&encode_request()).unwrap());
        assert_eq!(
            (flags.leap_indicator.bits(), flags.version, flags.mode.bits()),
            (0, 3, 3)
        );
    }

    #[test]
    fn fields_are_read_big_endian_from_their_offsets() {
        let mut bytes = [0u8; 48];
        bytes[0] = 0x1c;
        bytes[1] = 1;
        bytes[2] = 0x06;
        bytes[3] = 0xe9;
        bytes[4..8].copy_from_slice(&[0x00, 0x00, 0x00, 0x10]);
        bytes[12..16].copy_from_slice(b"GPS\0");
        bytes[40..44].copy_from_slice(&[0xcf, 0xcd, 0x0c, 0xec]);
        bytes[44..48].copy_from_slice(&[0x80, 0x00, 0x00, 0x00]);

        let packet = decode_response(&bytes).unwrap();

        assert_eq!(packet.stratum, 1);
        assert_eq!(packet.poll, 6);
        assert_eq!(packet.precision, -23);
        assert_eq!(packet.root_delay, 16);
        assert_eq!(packet.transmit_timestamp.seconds, 3_486_321_900);
        assert_eq!(packet.transmit_timestamp.fraction, 0x8000_0000);
        assert_eq!(packet.transmit_timestamp.subsec_nanos(), 500_000_000);
        assert_eq!(packet.reference_identifier().to_string(), "GPS");
    }

    #[test]
    fn encoding_is_lossless() {
        let packet = sample_reply();

        assert_eq!(decode_response(&packet.to_bytes()).unwrap(), packet);
    }

    #[test]
    fn short_buffer_is_rejected() {
        let bytes = sample_reply().to_bytes();

        for len in [0, 1, 40, 47] {
            assert_eq!(
                decode_response(&bytes[..len]),
                Err(ProtocolError::PacketIsTooShort)
            );
        }
    }

    #[test]
    fn trailing_bytes_are_ignored() {
        let mut bytes = sample_reply().to_bytes().to_vec();
        bytes.extend_from_slice(&[0xff; 20]);

        assert_eq!(decode_response(&bytes).unwrap(), sample_reply());
    }

    #[test]
    fn byte_order_conversion_is_its_own_inverse() {
        for value in [0, 1, 0x1234_5678, 0x8000_0000, 2_208_988_800, u32::MAX] {
            assert_eq!(from_network_order(to_network_order(value)), value);
            assert_eq!(to_network_order(from_network_order(value)), value);
        }

        assert_eq!(to_network_order(0x0102_0304).to_ne_bytes(), [1, 2, 3, 4]);
    }

    #[test]
    fn reference_identifier_depends_on_stratum() {
        assert_eq!(
            ReferenceIdentifier::new(1, u32::from_be_bytes(*b"PPS\0")),
            ReferenceIdentifier::ASCII("PPS".to_string())
        );
        assert_eq!(
            ReferenceIdentifier::new(0, u32::from_be_bytes(*b"RATE")).to_string(),
            "RATE"
        );
        assert_eq!(
            ReferenceIdentifier::new(2, 0xc0a8_0001),
            ReferenceIdentifier::IpAddress(Ipv4Addr::new(192, 168, 0, 1))
        );
        assert_eq!(ReferenceIdentifier::new(3, 0), ReferenceIdentifier::Empty);
        assert_eq!(
            ReferenceIdentifier::new(1, 0x0102_0304),
            ReferenceIdentifier::Unknown([1, 2, 3, 4])
        );
    }
}
