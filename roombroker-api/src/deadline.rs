//! Caller deadlines carried in the `grpc-timeout` header

use std::time::Duration;
use tonic::metadata::MetadataMap;

/// Deadline the caller attached to the request, if any
///
/// A malformed header is treated as absent. tonic enforces the same header
/// on its own and cancels the call when it elapses, so a structured
/// `store write timed out` answer only reaches the caller when the
/// configured store timeout is the shorter of the two.
pub fn from_metadata(metadata: &MetadataMap) -> Option<Duration> {
    let raw = metadata.get("grpc-timeout")?.to_str().ok()?;
    parse_grpc_timeout(raw)
}

/// Parse `<1-8 digits><unit>` where unit is one of `H M S m u n`
pub fn parse_grpc_timeout(raw: &str) -> Option<Duration> {
    if raw.len() < 2 || !raw.is_ascii() {
        return None;
    }
    let (digits, unit) = raw.split_at(raw.len() - 1);
    if digits.len() > 8 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let value: u64 = digits.parse().ok()?;

    match unit {
        "H" => Some(Duration::from_secs(value * 3600)),
        "M" => Some(Duration::from_secs(value * 60)),
        "S" => Some(Duration::from_secs(value)),
        "m" => Some(Duration::from_millis(value)),
        "u" => Some(Duration::from_micros(value)),
        "n" => Some(Duration::from_nanos(value)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_units() {
        assert_eq!(parse_grpc_timeout("2H"), Some(Duration::from_secs(7200)));
        assert_eq!(parse_grpc_timeout("3M"), Some(Duration::from_secs(180)));
        assert_eq!(parse_grpc_timeout("5S"), Some(Duration::from_secs(5)));
        assert_eq!(parse_grpc_timeout("250m"), Some(Duration::from_millis(250)));
        assert_eq!(parse_grpc_timeout("100u"), Some(Duration::from_micros(100)));
        assert_eq!(parse_grpc_timeout("99999999n"), Some(Duration::from_nanos(99_999_999)));
    }

    #[test]
    fn test_malformed() {
        for raw in ["", "m", "10", "10x", "123456789S", "-5S", "1.5S", "5é"] {
            assert_eq!(parse_grpc_timeout(raw), None, "{raw}");
        }
    }

    #[test]
    fn test_from_metadata() {
        let mut metadata = MetadataMap::new();
        assert_eq!(from_metadata(&metadata), None);

        metadata.insert("grpc-timeout", "1500m".parse().unwrap());
        assert_eq!(from_metadata(&metadata), Some(Duration::from_millis(1500)));
    }
}
