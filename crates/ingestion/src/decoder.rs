//! BaseStation (SBS-1) line decoder
//!
//! Stateless. A line is comma separated and positional:
//!
//! | idx | field                     |
//! |-----|---------------------------|
//! | 0   | record kind (`MSG`, ...)  |
//! | 1   | transmission type 1..8    |
//! | 2-3 | session id, aircraft id   |
//! | 4   | ICAO 24-bit address (hex) |
//! | 5   | flight id                 |
//! | 6-7 | date/time generated       |
//! | 8-9 | date/time logged          |
//! | 10  | callsign                  |
//! | 11-16 | altitude, ground speed, track, lat, lon, vertical rate |
//! | 17  | squawk                    |
//! | 18-21 | alert, emergency, spi, on ground |
//!
//! Only the identity key and the generated timestamp are mandatory; every
//! other field degrades to `None` when empty or unparseable.

use std::str::FromStr;

use chrono::NaiveDateTime;
use contracts::{IcaoAddress, RecordKind, TelemetryMessage, TransmissionType};

use crate::error::DecodeError;

/// Field count of a complete `MSG` record
pub const MSG_FIELD_COUNT: usize = 22;

const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S%.f";

/// Outcome of decoding one accepted line
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// A transmission record carrying telemetry
    Transmission(TelemetryMessage),
    /// A recognised record kind that carries nothing to persist
    Informational(RecordKind),
}

impl Decoded {
    pub fn into_message(self) -> Option<TelemetryMessage> {
        match self {
            Self::Transmission(msg) => Some(msg),
            Self::Informational(_) => None,
        }
    }
}

/// Decode one raw line
///
/// Never panics on malformed input; every rejection is a [`DecodeError`].
pub fn decode_line(line: &str) -> Result<Decoded, DecodeError> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return Err(DecodeError::Empty);
    }

    let fields: Vec<&str> = line.split(',').collect();
    let discriminator = fields[0].trim();
    let kind = RecordKind::from_field(discriminator)
        .ok_or_else(|| DecodeError::UnknownKind(truncate(discriminator, 16)))?;

    if !kind.is_transmission() {
        return Ok(Decoded::Informational(kind));
    }

    if fields.len() < MSG_FIELD_COUNT {
        return Err(DecodeError::TooShort {
            kind,
            fields: fields.len(),
        });
    }

    let icao_field = fields[4].trim();
    let icao24 = IcaoAddress::parse(icao_field)
        .map_err(|_| DecodeError::InvalidIcao(truncate(icao_field, 16)))?;

    let timestamp = parse_timestamp(fields[6], fields[7]).ok_or_else(|| {
        DecodeError::InvalidTimestamp(truncate(&format!("{} {}", fields[6], fields[7]), 32))
    })?;

    let mut msg = TelemetryMessage::new(icao24, timestamp);
    msg.transmission_type = parse_num::<i64>(fields[1]).and_then(TransmissionType::from_code);
    msg.session_id = parse_num(fields[2]);
    msg.aircraft_id = parse_num(fields[3]);
    msg.flight_id = parse_num(fields[5]);
    msg.logged_at = parse_timestamp(fields[8], fields[9]);
    msg.callsign = parse_text(fields[10]);
    msg.altitude = parse_num(fields[11]);
    msg.ground_speed = parse_float(fields[12]);
    msg.track = parse_float(fields[13]);
    msg.lat = parse_float(fields[14]);
    msg.lon = parse_float(fields[15]);
    msg.vertical_rate = parse_num(fields[16]);
    msg.squawk = parse_text(fields[17]);
    msg.alert = parse_flag(fields[18]);
    msg.emergency = parse_flag(fields[19]);
    msg.spi = parse_flag(fields[20]);
    msg.is_on_ground = parse_flag(fields[21]);

    Ok(Decoded::Transmission(msg))
}

fn parse_timestamp(date: &str, time: &str) -> Option<NaiveDateTime> {
    let (date, time) = (date.trim(), time.trim());
    if date.is_empty() || time.is_empty() {
        return None;
    }
    NaiveDateTime::parse_from_str(&format!("{date} {time}"), TIMESTAMP_FORMAT).ok()
}

fn parse_num<T: FromStr>(field: &str) -> Option<T> {
    let field = field.trim();
    if field.is_empty() {
        return None;
    }
    field.parse().ok()
}

fn parse_float(field: &str) -> Option<f64> {
    parse_num::<f64>(field).filter(|v| v.is_finite())
}

fn parse_text(field: &str) -> Option<String> {
    let field = field.trim();
    (!field.is_empty()).then(|| field.to_string())
}

/// dump1090 writes `0`/`-1`; other producers use `0`/`1`
fn parse_flag(field: &str) -> Option<bool> {
    match field.trim() {
        "0" => Some(false),
        "1" | "-1" => Some(true),
        other if other.eq_ignore_ascii_case("false") => Some(false),
        other if other.eq_ignore_ascii_case("true") => Some(true),
        _ => None,
    }
}

/// Char-boundary-safe prefix for diagnostics
pub fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
