//! Payload normalization: raw sensor arrays into flat readings.

use awair_types::{ParseError, ParseResult, Reading, SensorField, parse_timestamp};

use crate::source::RawSample;

/// Pivot a raw `{timestamp, sensors: [{comp, value}]}` record into a
/// [`Reading`].
///
/// Sensor components outside the canonical field set are dropped. A missing
/// canonical field is a contract violation and fails the whole sample.
///
/// # Errors
///
/// [`ParseError::InvalidTimestamp`] or [`ParseError::MissingField`].
pub fn normalize_sample(sample: &RawSample) -> ParseResult<Reading> {
    let timestamp = parse_timestamp(&sample.timestamp)?;

    let mut values: [Option<f64>; 6] = [None; 6];
    for sensor in &sample.sensors {
        if let Some(field) = SensorField::from_comp(&sensor.comp) {
            values[field as usize] = Some(sensor.value);
        }
    }

    let require = |field: SensorField| {
        values[field as usize].ok_or_else(|| ParseError::MissingField {
            timestamp: sample.timestamp.clone(),
            field: field.as_str(),
        })
    };

    Ok(Reading {
        timestamp,
        temp: require(SensorField::Temp)?,
        co2: require(SensorField::Co2)?,
        pm10: require(SensorField::Pm10)?,
        pm25: require(SensorField::Pm25)?,
        humid: require(SensorField::Humid)?,
        voc: require(SensorField::Voc)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::RawSensor;
    use time::macros::datetime;

    fn sensor(comp: &str, value: f64) -> RawSensor {
        RawSensor {
            comp: comp.to_string(),
            value,
        }
    }

    fn full_sample() -> RawSample {
        RawSample {
            timestamp: "2025-01-01T00:00:00Z".to_string(),
            sensors: vec![
                sensor("temp", 70.0),
                sensor("co2", 400.0),
                sensor("pm10", 5.0),
                sensor("pm25", 3.0),
                sensor("humid", 40.0),
                sensor("voc", 100.0),
            ],
        }
    }

    #[test]
    fn test_normalize_full_sample() {
        let reading = normalize_sample(&full_sample()).unwrap();
        assert_eq!(reading.timestamp, datetime!(2025-01-01 00:00:00));
        assert_eq!(reading.temp, 70.0);
        assert_eq!(reading.voc, 100.0);
    }

    #[test]
    fn test_normalize_drops_unknown_components() {
        let mut sample = full_sample();
        sample.sensors.push(sensor("lux", 123.0));
        sample.sensors.push(sensor("spl_a", 45.0));

        let reading = normalize_sample(&sample).unwrap();
        assert_eq!(reading.values(), [70.0, 400.0, 5.0, 3.0, 40.0, 100.0]);
    }

    #[test]
    fn test_normalize_missing_field_fails() {
        let mut sample = full_sample();
        sample.sensors.retain(|s| s.comp != "co2");

        let err = normalize_sample(&sample).unwrap_err();
        assert!(matches!(
            err,
            ParseError::MissingField { field: "co2", .. }
        ));
    }

    #[test]
    fn test_normalize_bad_timestamp_fails() {
        let mut sample = full_sample();
        sample.timestamp = "yesterday".to_string();
        assert!(matches!(
            normalize_sample(&sample),
            Err(ParseError::InvalidTimestamp { .. })
        ));
    }
}
