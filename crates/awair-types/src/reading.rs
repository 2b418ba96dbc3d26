//! Core sensor reading types.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use time::PrimitiveDateTime;

/// One of the canonical sensor value fields.
///
/// The field set is closed and ordered; the ordering here also defines the
/// on-disk column order (after the leading timestamp column).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum SensorField {
    /// Temperature in degrees Fahrenheit.
    Temp,
    /// CO2 concentration in ppm.
    Co2,
    /// PM10 in µg/m³.
    Pm10,
    /// PM2.5 in µg/m³.
    Pm25,
    /// Relative humidity percentage.
    Humid,
    /// VOC in ppb.
    Voc,
}

impl SensorField {
    /// All value fields in canonical (on-disk) order.
    pub const ALL: [SensorField; 6] = [
        SensorField::Temp,
        SensorField::Co2,
        SensorField::Pm10,
        SensorField::Pm25,
        SensorField::Humid,
        SensorField::Voc,
    ];

    /// The field's column / component name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            SensorField::Temp => "temp",
            SensorField::Co2 => "co2",
            SensorField::Pm10 => "pm10",
            SensorField::Pm25 => "pm25",
            SensorField::Humid => "humid",
            SensorField::Voc => "voc",
        }
    }

    /// Look up a field by its API sensor-component name.
    ///
    /// Components outside the canonical set return `None` and are dropped
    /// during normalization.
    #[must_use]
    pub fn from_comp(comp: &str) -> Option<Self> {
        match comp {
            "temp" => Some(SensorField::Temp),
            "co2" => Some(SensorField::Co2),
            "pm10" => Some(SensorField::Pm10),
            "pm25" => Some(SensorField::Pm25),
            "humid" => Some(SensorField::Humid),
            "voc" => Some(SensorField::Voc),
            _ => None,
        }
    }
}

impl fmt::Display for SensorField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One sensor sample: a naive timestamp plus the six canonical value fields.
///
/// Every field is required. Rows missing a field never reach this type;
/// normalization rejects them at the boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Reading {
    /// Sample timestamp (timezone-naive, normalized to UTC at ingestion).
    #[cfg_attr(feature = "serde", serde(with = "crate::timestamp::serde"))]
    pub timestamp: PrimitiveDateTime,
    /// Temperature in degrees Fahrenheit.
    pub temp: f64,
    /// CO2 concentration in ppm.
    pub co2: f64,
    /// PM10 in µg/m³.
    pub pm10: f64,
    /// PM2.5 in µg/m³.
    pub pm25: f64,
    /// Relative humidity percentage.
    pub humid: f64,
    /// VOC in ppb.
    pub voc: f64,
}

impl Reading {
    /// The value of a single field.
    #[must_use]
    pub fn field(&self, field: SensorField) -> f64 {
        match field {
            SensorField::Temp => self.temp,
            SensorField::Co2 => self.co2,
            SensorField::Pm10 => self.pm10,
            SensorField::Pm25 => self.pm25,
            SensorField::Humid => self.humid,
            SensorField::Voc => self.voc,
        }
    }

    /// All value fields in canonical order.
    #[must_use]
    pub fn values(&self) -> [f64; 6] {
        SensorField::ALL.map(|f| self.field(f))
    }

    /// Fields on which two readings disagree, in canonical order.
    ///
    /// Timestamps are not compared; callers only diff readings that already
    /// share a timestamp.
    #[must_use]
    pub fn differing_fields(&self, other: &Reading) -> Vec<SensorField> {
        SensorField::ALL
            .into_iter()
            .filter(|&f| self.field(f) != other.field(f))
            .collect()
    }
}
