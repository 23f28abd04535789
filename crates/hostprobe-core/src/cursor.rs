//! Opaque cursor codec.
//!
//! A cursor is the URL-safe base64 encoding (no padding) of a JSON value
//! carrying the counters and wall-clock timestamp of a prior sample. It is
//! the sole state carried between calls: the engine hands a fresh cursor to
//! the client with every rate-bearing response, and the client replays it
//! on the next call to get deltas over its own sampling window.
//!
//! Decoding never fails loudly. A missing, truncated, or corrupt cursor
//! yields `None` (logged at debug), which callers treat as "no prior
//! sample": the response carries zero rates and a new valid cursor.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

/// Encodes a cursor payload as URL-safe base64 JSON.
pub fn encode<T: Serialize>(value: &T) -> String {
    match serde_json::to_vec(value) {
        Ok(json) => URL_SAFE_NO_PAD.encode(json),
        Err(e) => {
            debug!(error = %e, "failed to serialize cursor");
            String::new()
        }
    }
}

/// Decodes a cursor string. Returns `None` for empty or malformed input.
pub fn decode<T: DeserializeOwned>(cursor: &str) -> Option<T> {
    if cursor.is_empty() {
        return None;
    }
    let bytes = match URL_SAFE_NO_PAD.decode(cursor.as_bytes()) {
        Ok(b) => b,
        Err(e) => {
            debug!(error = %e, "cursor is not valid base64");
            return None;
        }
    };
    match serde_json::from_slice(&bytes) {
        Ok(v) => Some(v),
        Err(e) => {
            debug!(error = %e, "cursor payload is not valid JSON");
            None
        }
    }
}

/// Decodes a cursor string, falling back to the neutral value (zero
/// counters, zero timestamp) when absent or malformed.
pub fn decode_or_default<T: DeserializeOwned + Default>(cursor: &str) -> T {
    decode(cursor).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CpuCursor, NetCounters, NetRateCursor, ProcessCursorEntry};
    use std::collections::HashMap;

    #[test]
    fn round_trip_cpu_cursor() {
        let cursor = CpuCursor {
            total: vec![1000.0, 0.0, 500.0, 8500.0, 0.0, 0.0, 0.0, 0.0],
            cores: vec![
                vec![500.0, 0.0, 250.0, 4250.0, 0.0, 0.0, 0.0, 0.0],
                vec![500.0, 0.0, 250.0, 4250.0, 0.0, 0.0, 0.0, 0.0],
            ],
            timestamp: 1_700_000_000_000,
        };

        let encoded = encode(&cursor);
        assert!(!encoded.is_empty());
        // URL-safe alphabet, no padding
        assert!(!encoded.contains('='));
        assert!(!encoded.contains('+'));
        assert!(!encoded.contains('/'));

        let decoded: CpuCursor = decode(&encoded).unwrap();
        assert_eq!(decoded.total, cursor.total);
        assert_eq!(decoded.cores, cursor.cores);
        assert_eq!(decoded.timestamp, cursor.timestamp);
    }

    #[test]
    fn round_trip_net_rate_cursor() {
        let mut interfaces = HashMap::new();
        interfaces.insert(
            "eth0".to_string(),
            NetCounters {
                bytes_recv: 1_000_000,
                bytes_sent: 500_000,
                packets_recv: 1200,
                packets_sent: 800,
            },
        );
        let cursor = NetRateCursor {
            timestamp: 1_700_000_000_000,
            interfaces,
        };

        let decoded: NetRateCursor = decode(&encode(&cursor)).unwrap();
        assert_eq!(decoded.timestamp, cursor.timestamp);
        let eth0 = &decoded.interfaces["eth0"];
        assert_eq!(eth0.bytes_recv, 1_000_000);
        assert_eq!(eth0.bytes_sent, 500_000);
        assert_eq!(eth0.packets_recv, 1200);
        assert_eq!(eth0.packets_sent, 800);
    }

    #[test]
    fn round_trip_process_cursor() {
        let entries = vec![
            ProcessCursorEntry {
                pid: 1,
                ticks: 12.5,
                timestamp: 1000,
            },
            ProcessCursorEntry {
                pid: 4242,
                ticks: 0.0,
                timestamp: 1000,
            },
        ];
        let decoded: Vec<ProcessCursorEntry> = decode(&encode(&entries)).unwrap();
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0].pid, 1);
        assert_eq!(decoded[1].pid, 4242);
        assert!((decoded[0].ticks - 12.5).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_cursor_is_neutral() {
        let decoded: CpuCursor = decode_or_default("");
        assert!(decoded.total.is_empty());
        assert!(decoded.cores.is_empty());
        assert_eq!(decoded.timestamp, 0);
    }

    #[test]
    fn corrupt_base64_is_neutral() {
        assert!(decode::<CpuCursor>("!!!not-base64!!!").is_none());
        let decoded: CpuCursor = decode_or_default("!!!not-base64!!!");
        assert_eq!(decoded.timestamp, 0);
    }

    #[test]
    fn valid_base64_invalid_json_is_neutral() {
        // "hello world" in url-safe base64
        let encoded = URL_SAFE_NO_PAD.encode(b"hello world");
        assert!(decode::<CpuCursor>(&encoded).is_none());
    }

    #[test]
    fn decoder_ignores_unknown_fields() {
        let json = r#"{"total":[1.0],"cores":[],"timestamp":5,"extra_field":"future"}"#;
        let encoded = URL_SAFE_NO_PAD.encode(json.as_bytes());
        let decoded: CpuCursor = decode(&encoded).unwrap();
        assert_eq!(decoded.timestamp, 5);
        assert_eq!(decoded.total, vec![1.0]);
    }
}
