//! Snapshot wire types and validation.
//!
//! A snapshot arrives either as a bare JSON array of position records or
//! wrapped in the feed envelope (`{ timestamp, positions, data_source, .. }`).
//! Records are validated one at a time so a single bad record never rejects
//! the rest of the batch.

use std::fmt;

use foundation::ids::ObjectId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A validated object position, as observed in one snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedObject {
    pub id: ObjectId,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    pub altitude_km: f64,
    /// Display only; never used for motion.
    pub velocity_kmh: Option<f64>,
}

impl TrackedObject {
    pub fn new(id: u64, name: impl Into<String>, lat: f64, lng: f64, altitude_km: f64) -> Self {
        Self {
            id: ObjectId(id),
            name: name.into(),
            lat,
            lng,
            altitude_km,
            velocity_kmh: None,
        }
    }

    pub fn with_velocity(mut self, velocity_kmh: f64) -> Self {
        self.velocity_kmh = Some(velocity_kmh);
        self
    }

    /// Checks the invariants every cached object relies on.
    ///
    /// Longitude outside `[-180, 180]` is accepted and wrapped by projection.
    pub fn validate(&self) -> Result<(), RecordError> {
        if !self.lat.is_finite() {
            return Err(RecordError::NonFinite("lat"));
        }
        if !self.lng.is_finite() {
            return Err(RecordError::NonFinite("lng"));
        }
        if !self.altitude_km.is_finite() {
            return Err(RecordError::NonFinite("altitude_km"));
        }
        if !(-90.0..=90.0).contains(&self.lat) {
            return Err(RecordError::LatitudeOutOfRange(self.lat));
        }
        if self.altitude_km < 0.0 {
            return Err(RecordError::NegativeAltitude(self.altitude_km));
        }
        Ok(())
    }
}

/// Why a single record was rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordError {
    NotAnObject,
    Malformed(String),
    MissingId,
    InvalidId(String),
    MissingField(&'static str),
    NonFinite(&'static str),
    LatitudeOutOfRange(f64),
    NegativeAltitude(f64),
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordError::NotAnObject => write!(f, "record is not a JSON object"),
            RecordError::Malformed(err) => write!(f, "malformed record: {err}"),
            RecordError::MissingId => write!(f, "record has no id"),
            RecordError::InvalidId(raw) => write!(f, "invalid id: {raw}"),
            RecordError::MissingField(name) => write!(f, "missing field: {name}"),
            RecordError::NonFinite(name) => write!(f, "non-finite {name}"),
            RecordError::LatitudeOutOfRange(lat) => write!(f, "latitude out of range: {lat}"),
            RecordError::NegativeAltitude(alt) => write!(f, "negative altitude: {alt} km"),
        }
    }
}

impl std::error::Error for RecordError {}

/// A record that failed validation, with its position in the batch.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRecord {
    pub index: usize,
    /// Present when the id itself was readable.
    pub id: Option<ObjectId>,
    pub error: RecordError,
}

/// Whole-document failures: nothing in the payload could be used.
#[derive(Debug)]
pub enum SnapshotError {
    Json(serde_json::Error),
    Envelope(serde_json::Error),
    UnexpectedShape(&'static str),
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotError::Json(err) => write!(f, "snapshot is not valid JSON: {err}"),
            SnapshotError::Envelope(err) => write!(f, "invalid snapshot envelope: {err}"),
            SnapshotError::UnexpectedShape(found) => {
                write!(f, "expected an array or an envelope object, found {found}")
            }
        }
    }
}

impl std::error::Error for SnapshotError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SnapshotError::Json(err) | SnapshotError::Envelope(err) => Some(err),
            SnapshotError::UnexpectedShape(_) => None,
        }
    }
}

/// Envelope fields other than the positions themselves.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotMeta {
    pub timestamp: Option<String>,
    pub satellite_count: Option<u64>,
    pub data_source: Option<String>,
    pub tle_age_hours: Option<f64>,
    pub note: Option<String>,
}

/// One parsed batch of positions. Applied to the cache as a whole.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub objects: Vec<TrackedObject>,
    pub skipped: Vec<SkippedRecord>,
    pub meta: Option<SnapshotMeta>,
}

impl Snapshot {
    /// Builds a snapshot from already-typed objects, validating each one.
    pub fn from_objects(objects: impl IntoIterator<Item = TrackedObject>) -> Self {
        let mut snapshot = Snapshot::default();
        for (index, object) in objects.into_iter().enumerate() {
            match object.validate() {
                Ok(()) => snapshot.objects.push(object),
                Err(error) => snapshot.skipped.push(SkippedRecord {
                    index,
                    id: Some(object.id),
                    error,
                }),
            }
        }
        snapshot
    }

    pub fn parse_json(payload: &str) -> Result<Self, SnapshotError> {
        let value: Value = serde_json::from_str(payload).map_err(SnapshotError::Json)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, SnapshotError> {
        let (records, meta) = match value {
            Value::Array(records) => (records, None),
            Value::Object(map) if map.contains_key("positions") => {
                let envelope: WireEnvelope = serde_json::from_value(Value::Object(map))
                    .map_err(SnapshotError::Envelope)?;
                let meta = SnapshotMeta {
                    timestamp: envelope.timestamp,
                    satellite_count: envelope.satellite_count,
                    data_source: envelope.data_source,
                    tle_age_hours: envelope.tle_age_hours,
                    note: envelope.note,
                };
                (envelope.positions, Some(meta))
            }
            Value::Object(_) => return Err(SnapshotError::UnexpectedShape("object without positions")),
            Value::Null => return Err(SnapshotError::UnexpectedShape("null")),
            Value::Bool(_) => return Err(SnapshotError::UnexpectedShape("boolean")),
            Value::Number(_) => return Err(SnapshotError::UnexpectedShape("number")),
            Value::String(_) => return Err(SnapshotError::UnexpectedShape("string")),
        };

        let mut snapshot = Snapshot {
            meta,
            ..Snapshot::default()
        };
        for (index, record) in records.into_iter().enumerate() {
            match parse_record(record) {
                Ok(object) => snapshot.objects.push(object),
                Err((id, error)) => snapshot.skipped.push(SkippedRecord { index, id, error }),
            }
        }
        Ok(snapshot)
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Total records seen, valid or not.
    pub fn record_count(&self) -> usize {
        self.objects.len() + self.skipped.len()
    }
}

/// Position record as the feed serves it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionRecord {
    pub name: String,
    pub norad_id: u64,
    pub lat: f64,
    pub lng: f64,
    pub altitude_km: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub velocity_kmh: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl PositionRecord {
    pub fn from_object(object: &TrackedObject, timestamp: Option<String>) -> Self {
        Self {
            name: object.name.clone(),
            norad_id: object.id.get(),
            lat: object.lat,
            lng: object.lng,
            altitude_km: object.altitude_km,
            velocity_kmh: object.velocity_kmh,
            timestamp,
        }
    }
}

/// The feed envelope around a list of positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEnvelope {
    pub timestamp: String,
    pub satellite_count: usize,
    pub positions_calculated: usize,
    pub positions: Vec<PositionRecord>,
    pub data_source: String,
    pub tle_age_hours: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Deserialize)]
struct WireEnvelope {
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default)]
    satellite_count: Option<u64>,
    #[serde(default)]
    data_source: Option<String>,
    #[serde(default)]
    tle_age_hours: Option<f64>,
    #[serde(default)]
    note: Option<String>,
    positions: Vec<Value>,
}

/// Every accepted spelling is its own field, so a record may carry several
/// spellings of the same key. The first present one in declaration order wins.
#[derive(Deserialize)]
struct WireRecord {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    norad_id: Option<Value>,
    #[serde(default, rename = "noradId")]
    norad_id_camel: Option<Value>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    latitude: Option<f64>,
    #[serde(default)]
    lng: Option<f64>,
    #[serde(default)]
    lon: Option<f64>,
    #[serde(default)]
    longitude: Option<f64>,
    #[serde(default, rename = "altitudeKm")]
    altitude_km_camel: Option<f64>,
    #[serde(default)]
    altitude_km: Option<f64>,
    #[serde(default, rename = "velocityKmh")]
    velocity_kmh_camel: Option<f64>,
    #[serde(default)]
    velocity_kmh: Option<f64>,
}

fn present(value: Option<Value>) -> Option<Value> {
    value.filter(|v| !v.is_null())
}

fn parse_record(record: Value) -> Result<TrackedObject, (Option<ObjectId>, RecordError)> {
    if !record.is_object() {
        return Err((None, RecordError::NotAnObject));
    }
    let wire: WireRecord = serde_json::from_value(record)
        .map_err(|err| (None, RecordError::Malformed(err.to_string())))?;

    let raw_id = present(wire.id)
        .or(present(wire.norad_id))
        .or(present(wire.norad_id_camel));
    let id = parse_id(raw_id).map_err(|err| (None, err))?;
    let lat = wire
        .lat
        .or(wire.latitude)
        .ok_or((Some(id), RecordError::MissingField("lat")))?;
    let lng = wire
        .lng
        .or(wire.lon)
        .or(wire.longitude)
        .ok_or((Some(id), RecordError::MissingField("lng")))?;
    let altitude_km = wire
        .altitude_km_camel
        .or(wire.altitude_km)
        .ok_or((Some(id), RecordError::MissingField("altitude_km")))?;
    let velocity_kmh = wire.velocity_kmh_camel.or(wire.velocity_kmh);

    let object = TrackedObject {
        id,
        name: wire.name.unwrap_or_else(|| format!("OBJECT-{id}")),
        lat,
        lng,
        altitude_km,
        velocity_kmh: velocity_kmh.filter(|v| v.is_finite()),
    };
    object.validate().map_err(|err| (Some(id), err))?;
    Ok(object)
}

fn parse_id(raw: Option<Value>) -> Result<ObjectId, RecordError> {
    match raw {
        None | Some(Value::Null) => Err(RecordError::MissingId),
        Some(Value::Number(n)) => n
            .as_u64()
            .map(ObjectId)
            .ok_or_else(|| RecordError::InvalidId(n.to_string())),
        Some(Value::String(s)) => s
            .trim()
            .parse::<u64>()
            .map(ObjectId)
            .map_err(|_| RecordError::InvalidId(s)),
        Some(other) => Err(RecordError::InvalidId(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::{RecordError, Snapshot, SnapshotEnvelope, SnapshotError, TrackedObject};
    use foundation::ids::ObjectId;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_bare_array_with_camel_case_fields() {
        let payload = r#"[
            {"id": 25544, "name": "ISS", "lat": 10.0, "lng": 20.0, "altitudeKm": 550.0, "velocityKmh": 27600.0}
        ]"#;
        let snapshot = Snapshot::parse_json(payload).unwrap();
        assert_eq!(
            snapshot.objects,
            vec![TrackedObject::new(25544, "ISS", 10.0, 20.0, 550.0).with_velocity(27600.0)]
        );
        assert!(snapshot.skipped.is_empty());
        assert!(snapshot.meta.is_none());
    }

    #[test]
    fn parses_feed_envelope() {
        let payload = r#"{
            "timestamp": "2025-01-01T00:00:00+00:00",
            "satellite_count": 2,
            "positions_calculated": 2,
            "positions": [
                {"name": "STARLINK-1000", "norad_id": 50000, "lat": -60, "lng": -180, "altitude_km": 550, "velocity_kmh": 27000, "timestamp": "x"},
                {"name": "STARLINK-1001", "norad_id": "50001", "lat": -45, "lng": -144, "altitude_km": 550}
            ],
            "data_source": "sample_data",
            "tle_age_hours": 0,
            "note": "demo"
        }"#;
        let snapshot = Snapshot::parse_json(payload).unwrap();
        let ids: Vec<ObjectId> = snapshot.objects.iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![ObjectId(50000), ObjectId(50001)]);
        let meta = snapshot.meta.unwrap();
        assert_eq!(meta.data_source.as_deref(), Some("sample_data"));
        assert_eq!(meta.satellite_count, Some(2));
    }

    #[test]
    fn malformed_records_are_skipped_individually() {
        let payload = r#"[
            {"id": 1, "lat": 0, "lng": 0, "altitudeKm": 400},
            {"lat": 0, "lng": 0, "altitudeKm": 400},
            {"id": 3, "lat": 95, "lng": 0, "altitudeKm": 400},
            {"id": 4, "lat": 0, "lng": 0, "altitudeKm": -1},
            {"id": 5, "lng": 0, "altitudeKm": 400},
            {"id": "abc", "lat": 0, "lng": 0, "altitudeKm": 400},
            {"id": 7, "lat": "north", "lng": 0, "altitudeKm": 400},
            42
        ]"#;
        let snapshot = Snapshot::parse_json(payload).unwrap();
        assert_eq!(snapshot.objects.len(), 1);
        assert_eq!(snapshot.objects[0].id, ObjectId(1));
        assert_eq!(snapshot.record_count(), 8);

        let errors: Vec<(usize, RecordError)> = snapshot
            .skipped
            .iter()
            .map(|s| (s.index, s.error.clone()))
            .collect();
        assert_eq!(errors[0], (1, RecordError::MissingId));
        assert_eq!(errors[1], (2, RecordError::LatitudeOutOfRange(95.0)));
        assert_eq!(errors[2], (3, RecordError::NegativeAltitude(-1.0)));
        assert_eq!(errors[3], (4, RecordError::MissingField("lat")));
        assert_eq!(errors[4], (5, RecordError::InvalidId("abc".to_string())));
        assert!(matches!(errors[5], (6, RecordError::Malformed(_))));
        assert_eq!(errors[6], (7, RecordError::NotAnObject));
        assert_eq!(snapshot.skipped[1].id, Some(ObjectId(3)));
    }

    #[test]
    fn accepts_records_carrying_several_spellings_of_a_key() {
        let payload = r#"[
            {"id": 25544, "norad_id": 25544, "lat": 10, "lng": 20, "altitudeKm": 550},
            {"id": 1, "lat": 10, "lng": 20, "lon": 20, "altitudeKm": 550, "altitude_km": 550},
            {"norad_id": null, "noradId": "7", "latitude": -5, "longitude": 30, "altitude_km": 400}
        ]"#;
        let snapshot = Snapshot::parse_json(payload).unwrap();
        assert!(snapshot.skipped.is_empty());
        let ids: Vec<ObjectId> = snapshot.objects.iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![ObjectId(25544), ObjectId(1), ObjectId(7)]);
        assert_eq!((snapshot.objects[2].lat, snapshot.objects[2].lng), (-5.0, 30.0));
    }

    #[test]
    fn rejects_documents_that_are_not_snapshots() {
        assert!(matches!(
            Snapshot::parse_json("{\"status\": \"ok\"}"),
            Err(SnapshotError::UnexpectedShape(_))
        ));
        assert!(matches!(
            Snapshot::parse_json("not json"),
            Err(SnapshotError::Json(_))
        ));
        assert!(matches!(
            Snapshot::parse_json("{\"positions\": 3}"),
            Err(SnapshotError::Envelope(_))
        ));
    }

    #[test]
    fn from_objects_validates() {
        let snapshot = Snapshot::from_objects([
            TrackedObject::new(1, "a", 0.0, 0.0, 500.0),
            TrackedObject::new(2, "b", f64::NAN, 0.0, 500.0),
        ]);
        assert_eq!(snapshot.objects.len(), 1);
        assert_eq!(snapshot.skipped[0].error, RecordError::NonFinite("lat"));
    }

    #[test]
    fn envelope_serializes_with_backend_field_names() {
        let object = TrackedObject::new(50000, "STARLINK-1000", 1.0, 2.0, 550.0);
        let envelope = SnapshotEnvelope {
            timestamp: "t".to_string(),
            satellite_count: 1,
            positions_calculated: 1,
            positions: vec![super::PositionRecord::from_object(&object, None)],
            data_source: "sample_data".to_string(),
            tle_age_hours: 0.0,
            note: None,
        };
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["positions"][0]["norad_id"], 50000);
        assert!(json.get("note").is_none());

        let parsed = Snapshot::from_value(json).unwrap();
        assert_eq!(parsed.objects, vec![object]);
    }
}
