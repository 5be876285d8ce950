/// Utility functions
use crate::errors::ApiResult;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Extract number from JSON value
pub fn num(v: &Value) -> Option<f64> {
    if let Some(x) = v.as_f64() {
        return Some(x);
    }
    if let Some(s) = v.as_str() {
        return s.parse::<f64>().ok();
    }
    None
}

/// Pick string value from JSON by trying multiple keys
pub fn s_pick(v: &Value, keys: &[&str]) -> Option<String> {
    for k in keys {
        if let Some(x) = v.get(*k) {
            if let Some(s) = x.as_str() {
                if !s.is_empty() {
                    return Some(s.to_string());
                }
            } else if x.is_number() {
                return Some(x.to_string());
            }
        }
    }
    None
}

/// Parse a query value as a finite float
pub fn parse_coord(raw: Option<&str>) -> Option<f64> {
    raw.and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|x| x.is_finite())
}

/// Race an upstream call against `limit`, resolving to `fallback` on timeout or error.
///
/// The losing future is dropped, which abandons the in-flight request.
pub async fn with_fallback<T, F>(label: &str, limit: Duration, fallback: T, fut: F) -> T
where
    F: Future<Output = ApiResult<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(Ok(value)) => value,
        Ok(Err(e)) => {
            warn!("{} failed, using fallback: {}", label, e);
            fallback
        }
        Err(_) => {
            warn!(
                "{} timed out after {}ms, using fallback",
                label,
                limit.as_millis()
            );
            fallback
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ApiError;

    #[test]
    fn test_num_from_float() {
        let json = serde_json::json!(42.5);
        assert_eq!(num(&json), Some(42.5));
    }

    #[test]
    fn test_num_from_string() {
        let json = serde_json::json!("42.5");
        assert_eq!(num(&json), Some(42.5));
    }

    #[test]
    fn test_num_from_invalid() {
        let json = serde_json::json!("invalid");
        assert_eq!(num(&json), None);
    }

    #[test]
    fn test_s_pick_finds_first() {
        let json = serde_json::json!({"name": "test", "title": "backup"});
        assert_eq!(s_pick(&json, &["name", "title"]), Some("test".to_string()));
    }

    #[test]
    fn test_s_pick_skips_empty_string() {
        let json = serde_json::json!({"name": "", "title": "backup"});
        assert_eq!(
            s_pick(&json, &["name", "title"]),
            Some("backup".to_string())
        );
    }

    #[test]
    fn test_s_pick_not_found() {
        let json = serde_json::json!({"other": "value"});
        assert_eq!(s_pick(&json, &["name", "title"]), None);
    }

    #[test]
    fn test_parse_coord() {
        assert_eq!(parse_coord(Some("40.5")), Some(40.5));
        assert_eq!(parse_coord(Some(" -74 ")), Some(-74.0));
        assert_eq!(parse_coord(Some("north")), None);
        assert_eq!(parse_coord(Some("NaN")), None);
        assert_eq!(parse_coord(None), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_fallback_prefers_fallback_when_slow() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok::<_, ApiError>(vec![1, 2, 3])
        };
        let got = with_fallback("slow", Duration::from_millis(5000), Vec::new(), slow).await;
        assert!(got.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_fallback_returns_value_within_limit() {
        let quick = async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok::<_, ApiError>(7)
        };
        assert_eq!(with_fallback("quick", Duration::from_secs(5), 0, quick).await, 7);
    }

    #[tokio::test]
    async fn test_with_fallback_on_error() {
        let failing = async { Err::<u8, _>(ApiError::Internal("boom".into())) };
        assert_eq!(
            with_fallback("failing", Duration::from_secs(1), 9, failing).await,
            9
        );
    }
}
