use crate::error::ConversionError;
use crate::packet::{LeapIndicator, Mode, NtpPacket, NtpTimestamp, ReferenceIdentifier};
use chrono::{DateTime, Datelike, Local, Offset, TimeZone, Timelike, Utc};
use std::fmt::{Display, Formatter};

/// Broken-down date and time
///
/// Computed for a specific time zone, see [`QueryResult::local_time`] and
/// [`QueryResult::utc_time`]. `second` is in `0..=60` to leave room for a leap second.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct CalendarTime {
    pub year: i32,
    /// 1-12
    pub month: u32,
    /// 1-31
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    /// Sub-second part derived from the transmit timestamp fraction
    pub nanosecond: u32,
    /// Offset of the zone from UTC, in seconds
    pub utc_offset: i32,
}

impl CalendarTime {
    /// Breaks down a chrono date and time in its own time zone.
    pub fn from_datetime<Tz: TimeZone>(datetime: &DateTime<Tz>) -> CalendarTime {
        let (second, nanosecond) = if datetime.nanosecond() >= 1_000_000_000 {
            (60, datetime.nanosecond() - 1_000_000_000)
        } else {
            (datetime.second(), datetime.nanosecond())
        };

        CalendarTime {
            year: datetime.year(),
            month: datetime.month(),
            day: datetime.day(),
            hour: datetime.hour(),
            minute: datetime.minute(),
            second,
            nanosecond,
            utc_offset: datetime.offset().fix().local_minus_utc(),
        }
    }
}

/// Formats as `YYYY-M-D H:MM:SS`.
impl Display for CalendarTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}-{}-{} {}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

/// Result of a query.
///
/// Holds the server's transmit time and the informational header fields of the reply. The time
/// can be obtained as Unix seconds, as a broken-down [`CalendarTime`] or as a `chrono` (or,
/// with the `time` feature, a `time`) value.
#[derive(Debug, Clone)]
pub struct QueryResult {
    unix_seconds: i64,
    transmit_timestamp: NtpTimestamp,
    reference_identifier: ReferenceIdentifier,
    leap_indicator: LeapIndicator,
    version: u8,
    mode: Mode,
    stratum: u8,
}

impl QueryResult {
    pub(crate) fn new(unix_seconds: i64, reply: &NtpPacket) -> QueryResult {
        let flags = reply.flags();

        QueryResult {
            unix_seconds,
            transmit_timestamp: reply.transmit_timestamp,
            reference_identifier: reply.reference_identifier(),
            leap_indicator: flags.leap_indicator,
            version: flags.version,
            mode: flags.mode,
            stratum: reply.stratum,
        }
    }

    /// Returns with the server transmit time as seconds since the Unix epoch.
    ///
    /// The value is computed in 64 bits so it never overflows, but the NTP seconds field itself
    /// is 32 bits wide and rolls over on 2036-02-07. No era extension is applied: timestamps
    /// sent after the rollover map to dates before 1970.
    ///
    /// ```no_run
    /// use ntp_query::NtpClient;
    ///
    /// let client = NtpClient::new();
    /// let result = client.query("pool.ntp.org").unwrap();
    ///
    /// println!("Unix time: {}", result.unix_timestamp());
    /// ```
    pub fn unix_timestamp(&self) -> i64 {
        self.unix_seconds
    }

    /// Sub-second part of the transmit time, in nanoseconds
    pub fn subsec_nanos(&self) -> u32 {
        self.transmit_timestamp.subsec_nanos()
    }

    /// Raw transmit timestamp as sent by the server
    pub fn transmit_timestamp(&self) -> NtpTimestamp {
        self.transmit_timestamp
    }

    /// Converts the transmit time to [`chrono::DateTime<Utc>`]
    ///
    /// ```no_run
    /// use ntp_query::NtpClient;
    /// use chrono::{DateTime, Local};
    ///
    /// let client = NtpClient::new();
    /// let result = client.query("pool.ntp.org").unwrap();
    ///
    /// let local_time: DateTime<Local> = DateTime::from(result.as_chrono_datetime_utc().unwrap());
    /// ```
    pub fn as_chrono_datetime_utc(&self) -> Result<DateTime<Utc>, ConversionError> {
        DateTime::from_timestamp(self.unix_seconds, self.subsec_nanos())
            .ok_or(ConversionError::Overflow)
    }

    /// Converts the transmit time to [`time::OffsetDateTime`]
    ///
    /// Only available when the `time` feature is enabled
    #[cfg(feature = "time")]
    pub fn as_time_offset_datetime(&self) -> Result<time::OffsetDateTime, ConversionError> {
        let nanos =
            i128::from(self.unix_seconds) * 1_000_000_000 + i128::from(self.subsec_nanos());

        time::OffsetDateTime::from_unix_timestamp_nanos(nanos)
            .map_err(|_| ConversionError::Overflow)
    }

    /// Breaks down the transmit time in the local system time zone.
    ///
    /// ```no_run
    /// use ntp_query::NtpClient;
    ///
    /// let client = NtpClient::new();
    /// let time = client.query("pool.ntp.org").unwrap().local_time();
    ///
    /// println!("{}-{}-{} {}:{}:{}", time.year, time.month, time.day, time.hour, time.minute, time.second);
    /// ```
    pub fn local_time(&self) -> CalendarTime {
        self.calendar_time(&Local)
    }

    /// Breaks down the transmit time in UTC.
    pub fn utc_time(&self) -> CalendarTime {
        self.calendar_time(&Utc)
    }

    /// Breaks down the transmit time in an arbitrary `chrono` time zone.
    pub fn calendar_time<Tz: TimeZone>(&self, tz: &Tz) -> CalendarTime {
        // u32 seconds minus the epoch offset is always inside chrono's range
        let utc = self.as_chrono_datetime_utc().unwrap_or_default();

        CalendarTime::from_datetime(&utc.with_timezone(tz))
    }

    /// Returns with the server reference identifier.
    pub fn reference_identifier(&self) -> &ReferenceIdentifier {
        &self.reference_identifier
    }

    /// Returns with the leap indicator sent by the server
    pub fn leap_indicator(&self) -> LeapIndicator {
        self.leap_indicator
    }

    /// Protocol version of the reply
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Association mode of the reply
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Returns with the server stratum
    ///
    /// Values defined as:
    /// *  0 - Kiss-o'-Death or unspecified
    /// *  1 - Primary reference (e.g., calibrated atomic clock, radio clock, etc...)
    /// *  2..15 - Secondary reference
    /// *  16 - Unsynchronized
    pub fn stratum(&self) -> u8 {
        self.stratum
    }
}
