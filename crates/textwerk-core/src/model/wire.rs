// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// serde adapters for the JSON-1.1 wire encoding of blobs and timestamps.

/// Blobs travel as standard base64 strings.
pub mod blob {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }

    pub mod option {
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            bytes: &Option<Vec<u8>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match bytes {
                Some(bytes) => super::serialize(bytes, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Vec<u8>>, D::Error> {
            #[derive(Deserialize)]
            struct Wrapped(#[serde(deserialize_with = "super::deserialize")] Vec<u8>);

            Option::<Wrapped>::deserialize(deserializer).map(|w| w.map(|Wrapped(bytes)| bytes))
        }
    }
}

/// Timestamps travel as (possibly fractional) seconds since the Unix epoch,
/// carried to the millisecond.  Finer precision is dropped on encode, so
/// values built with [`truncate`] or [`now`] survive a round trip unchanged.
pub mod epoch_seconds {
    use chrono::{DateTime, TimeZone, Timelike, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    /// `time` with everything below the millisecond cleared.
    pub fn truncate(time: DateTime<Utc>) -> DateTime<Utc> {
        time.with_nanosecond(time.nanosecond() / 1_000_000 * 1_000_000)
            .unwrap_or(time)
    }

    /// The current time at wire precision.
    pub fn now() -> DateTime<Utc> {
        truncate(Utc::now())
    }

    pub fn serialize<S: Serializer>(
        time: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let millis = time.timestamp_millis();
        if millis % 1000 == 0 {
            serializer.serialize_i64(millis / 1000)
        } else {
            serializer.serialize_f64(millis as f64 / 1000.0)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let seconds = f64::deserialize(deserializer)?;
        from_seconds(seconds).ok_or_else(|| {
            serde::de::Error::custom(format!("timestamp {seconds} is out of range"))
        })
    }

    fn from_seconds(seconds: f64) -> Option<DateTime<Utc>> {
        if !seconds.is_finite() {
            return None;
        }
        let millis = (seconds * 1000.0).round() as i64;
        Utc.timestamp_millis_opt(millis).single()
    }

    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            time: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match time {
                Some(time) => super::serialize(time, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            #[derive(Deserialize)]
            struct Wrapped(#[serde(deserialize_with = "super::deserialize")] DateTime<Utc>);

            Option::<Wrapped>::deserialize(deserializer).map(|w| w.map(|Wrapped(t)| t))
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        #[serde(with = "super::blob")]
        data: Vec<u8>,
        #[serde(
            default,
            with = "super::epoch_seconds::option",
            skip_serializing_if = "Option::is_none"
        )]
        at: Option<DateTime<Utc>>,
    }

    #[test]
    fn blob_is_base64() {
        let sample = Sample {
            data: b"hello".to_vec(),
            at: None,
        };
        let json = serde_json::to_string(&sample).expect("encode");
        assert_eq!(json, r#"{"data":"aGVsbG8="}"#);
    }

    #[test]
    fn fractional_epoch_seconds_decode() {
        let sample: Sample =
            serde_json::from_str(r#"{"data":"","at":1700000000.5}"#).expect("decode");
        let expected = Utc
            .timestamp_millis_opt(1_700_000_000_500)
            .single()
            .expect("valid");
        assert_eq!(sample.at, Some(expected));
    }

    #[test]
    fn whole_seconds_encode_as_integer() {
        let sample = Sample {
            data: Vec::new(),
            at: Utc.timestamp_opt(1_700_000_000, 0).single(),
        };
        let json = serde_json::to_string(&sample).expect("encode");
        assert!(json.contains(r#""at":1700000000"#));
    }

    #[test]
    fn sub_millisecond_precision_is_truncated_consistently() {
        let precise = Utc
            .timestamp_opt(1_700_000_000, 123_456_789)
            .single()
            .expect("valid");
        let sample = Sample {
            data: Vec::new(),
            at: Some(precise),
        };
        let json = serde_json::to_string(&sample).expect("encode");
        assert!(json.contains(r#""at":1700000000.123"#));

        let decoded: Sample = serde_json::from_str(&json).expect("decode");
        let truncated = super::epoch_seconds::truncate(precise);
        assert_eq!(truncated.timestamp_subsec_nanos(), 123_000_000);
        assert_eq!(decoded.at, Some(truncated));

        let again = serde_json::to_string(&decoded).expect("re-encode");
        assert_eq!(again, json);
    }

    #[test]
    fn wire_clock_round_trips_exactly() {
        let sample = Sample {
            data: Vec::new(),
            at: Some(super::epoch_seconds::now()),
        };
        let json = serde_json::to_string(&sample).expect("encode");
        let decoded: Sample = serde_json::from_str(&json).expect("decode");
        assert_eq!(decoded, sample);
    }

    #[test]
    fn invalid_base64_is_rejected() {
        let result: Result<Sample, _> = serde_json::from_str(r#"{"data":"***"}"#);
        assert!(result.is_err());
    }
}
