//! TelemetryMessage - decoder output
//!
//! One decoded BaseStation transmission line.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::{DedupKey, IcaoAddress};

/// First-field discriminator of a BaseStation line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordKind {
    /// Selection change
    Sel,
    /// New id
    Id,
    /// New aircraft
    Air,
    /// Status change
    Sta,
    /// Click
    Clk,
    /// Transmission message, the only kind carrying telemetry
    Msg,
}

impl RecordKind {
    /// Parse the discriminator field
    pub fn from_field(field: &str) -> Option<Self> {
        match field {
            "SEL" => Some(Self::Sel),
            "ID" => Some(Self::Id),
            "AIR" => Some(Self::Air),
            "STA" => Some(Self::Sta),
            "CLK" => Some(Self::Clk),
            "MSG" => Some(Self::Msg),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sel => "SEL",
            Self::Id => "ID",
            Self::Air => "AIR",
            Self::Sta => "STA",
            Self::Clk => "CLK",
            Self::Msg => "MSG",
        }
    }

    /// Whether lines of this kind carry telemetry
    pub fn is_transmission(&self) -> bool {
        matches!(self, Self::Msg)
    }
}

/// Transmission sub-type (second field of a `MSG` line)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransmissionType {
    /// ES identification and category
    Identification = 1,
    /// ES surface position
    SurfacePosition = 2,
    /// ES airborne position
    AirbornePosition = 3,
    /// ES airborne velocity
    AirborneVelocity = 4,
    /// Surveillance altitude
    SurveillanceAltitude = 5,
    /// Surveillance id (squawk)
    SurveillanceId = 6,
    /// Air-to-air
    AirToAir = 7,
    /// All-call reply
    AllCallReply = 8,
}

impl TransmissionType {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::Identification),
            2 => Some(Self::SurfacePosition),
            3 => Some(Self::AirbornePosition),
            4 => Some(Self::AirborneVelocity),
            5 => Some(Self::SurveillanceAltitude),
            6 => Some(Self::SurveillanceId),
            7 => Some(Self::AirToAir),
            8 => Some(Self::AllCallReply),
            _ => None,
        }
    }

    pub fn code(&self) -> u8 {
        *self as u8
    }
}

/// Decoded transmission record
///
/// Every telemetry field is optional: an empty or unparseable field is unknown,
/// not a failure of the whole record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryMessage {
    /// Aircraft identity key
    pub icao24: IcaoAddress,

    /// Transmission sub-type (None when absent or out of range)
    pub transmission_type: Option<TransmissionType>,

    /// Receiver session id
    pub session_id: Option<i64>,

    /// Receiver aircraft id
    pub aircraft_id: Option<i64>,

    /// Receiver flight id
    pub flight_id: Option<i64>,

    /// Event time (date/time generated)
    pub timestamp: NaiveDateTime,

    /// Receiver log time (date/time logged)
    pub logged_at: Option<NaiveDateTime>,

    /// Display label
    pub callsign: Option<String>,

    /// Altitude (ft)
    pub altitude: Option<i32>,

    /// Ground speed (kt)
    pub ground_speed: Option<f64>,

    /// Track / heading (degrees)
    pub track: Option<f64>,

    /// Latitude (degrees)
    pub lat: Option<f64>,

    /// Longitude (degrees)
    pub lon: Option<f64>,

    /// Vertical rate (ft/min)
    pub vertical_rate: Option<i32>,

    /// Transponder squawk code
    pub squawk: Option<String>,

    /// Squawk change alert flag
    pub alert: Option<bool>,

    /// Emergency flag
    pub emergency: Option<bool>,

    /// Special position indicator flag
    pub spi: Option<bool>,

    /// On-ground flag
    pub is_on_ground: Option<bool>,
}

impl TelemetryMessage {
    /// Minimal record: identity and event time, everything else unknown
    pub fn new(icao24: IcaoAddress, timestamp: NaiveDateTime) -> Self {
        Self {
            icao24,
            transmission_type: None,
            session_id: None,
            aircraft_id: None,
            flight_id: None,
            timestamp,
            logged_at: None,
            callsign: None,
            altitude: None,
            ground_speed: None,
            track: None,
            lat: None,
            lon: None,
            vertical_rate: None,
            squawk: None,
            alert: None,
            emergency: None,
            spi: None,
            is_on_ground: None,
        }
    }

    /// Key used for duplicate suppression
    pub fn dedup_key(&self) -> DedupKey {
        DedupKey {
            icao24: self.icao24,
            timestamp: self.timestamp,
            transmission_type: self.transmission_type,
        }
    }

    /// `(lat, lon)` when both coordinates are known
    pub fn position(&self) -> Option<(f64, f64)> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }

    pub fn has_position(&self) -> bool {
        self.position().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_milli_opt(12, 0, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_record_kind_round_trip() {
        for field in ["SEL", "ID", "AIR", "STA", "CLK", "MSG"] {
            let kind = RecordKind::from_field(field).unwrap();
            assert_eq!(kind.as_str(), field);
        }
        assert!(RecordKind::from_field("msg").is_none());
        assert!(RecordKind::Msg.is_transmission());
        assert!(!RecordKind::Air.is_transmission());
    }

    #[test]
    fn test_transmission_codes() {
        assert_eq!(
            TransmissionType::from_code(3),
            Some(TransmissionType::AirbornePosition)
        );
        assert_eq!(TransmissionType::AllCallReply.code(), 8);
        assert!(TransmissionType::from_code(0).is_none());
        assert!(TransmissionType::from_code(9).is_none());
    }

    #[test]
    fn test_position_requires_both_coordinates() {
        let mut msg = TelemetryMessage::new("4CA123".parse().unwrap(), ts());
        assert!(!msg.has_position());

        msg.lat = Some(51.5);
        assert!(!msg.has_position());

        msg.lon = Some(-0.1);
        assert_eq!(msg.position(), Some((51.5, -0.1)));
    }
}
