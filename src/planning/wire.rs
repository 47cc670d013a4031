//! JSON shapes exchanged with the planning service and their validating decode.
//!
//! The service sends loosely typed, field-optional records. Decoding applies
//! the documented defaults here so nothing downstream deals with absent fields.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::{
    OffsetDateTime, PrimitiveDateTime, format_description::FormatItem,
    format_description::well_known::Rfc3339, macros::format_description,
};

use super::RemoteError;
use crate::fleet::{
    Decision, OverrideRequest, PredictionOptions, ServiceState, SystemStatus, Train,
    UNKNOWN_DEPOT,
};

const SUCCESS: &str = "success";
const MAX_ERROR_TEXT: usize = 200;

#[derive(Debug, Serialize)]
pub(crate) struct PredictRequestWire {
    pub use_mock_data: bool,
    pub retrain_model: bool,
    pub target_inductions: u32,
}

impl From<&PredictionOptions> for PredictRequestWire {
    fn from(options: &PredictionOptions) -> Self {
        Self {
            use_mock_data: options.use_mock_data,
            retrain_model: options.retrain_model,
            target_inductions: options.target_inductions,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct OverrideRequestWire<'a> {
    pub train_id: &'a str,
    pub decision: &'static str,
    pub reason: &'a str,
}

impl<'a> From<&'a OverrideRequest> for OverrideRequestWire<'a> {
    fn from(request: &'a OverrideRequest) -> Self {
        Self {
            train_id: &request.train_id,
            decision: request.decision.as_str(),
            reason: &request.reason,
        }
    }
}

#[derive(Debug, Deserialize)]
struct InductionListWire {
    #[serde(default)]
    induction_list: Option<Vec<TrainWire>>,
}

#[derive(Debug, Deserialize)]
struct TrainWire {
    train_id: Option<String>,
    fitness_score: Option<f64>,
    depot: Option<String>,
    final_decision: Option<String>,
    open_work_orders: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct SystemStatusWire {
    status: Option<String>,
    trains_count: Option<u32>,
    ml_model_trained: Option<bool>,
    optimization_completed: Option<bool>,
    manual_overrides_count: Option<u32>,
    last_update: Option<String>,
}

/// Decode a `/get_induction_list` body, preserving service order.
pub(crate) fn decode_induction_list(body: &[u8]) -> Result<Vec<Train>, RemoteError> {
    let value = parse_json(body)?;
    ensure_success(&value)?;
    let wire: InductionListWire = serde_json::from_value(value)
        .map_err(|err| RemoteError::Malformed(format!("induction list: {err}")))?;
    let mut seen = HashSet::new();
    let mut trains = Vec::new();
    for (index, record) in wire.induction_list.unwrap_or_default().into_iter().enumerate() {
        let train = decode_train(index, record)?;
        if !seen.insert(train.train_id.clone()) {
            return Err(RemoteError::Malformed(format!(
                "duplicate train_id '{}'",
                train.train_id
            )));
        }
        trains.push(train);
    }
    Ok(trains)
}

fn decode_train(index: usize, record: TrainWire) -> Result<Train, RemoteError> {
    let train_id = record
        .train_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| RemoteError::Malformed(format!("train #{index} has no train_id")))?;
    let open_work_orders = match record.open_work_orders {
        None => 0,
        Some(raw) => work_order_count(raw).ok_or_else(|| {
            RemoteError::Malformed(format!(
                "train '{train_id}' has invalid open_work_orders {raw}"
            ))
        })?,
    };
    Ok(Train {
        train_id,
        fitness_score: record.fitness_score.unwrap_or(0.0),
        depot: record
            .depot
            .filter(|depot| !depot.is_empty())
            .unwrap_or_else(|| UNKNOWN_DEPOT.to_string()),
        final_decision: Decision::from_service_value(record.final_decision.as_deref()),
        open_work_orders,
    })
}

/// Whole, non-negative counts that fit a `u32`; anything else is malformed.
fn work_order_count(raw: f64) -> Option<u32> {
    let in_range = raw.is_finite() && raw >= 0.0 && raw <= f64::from(u32::MAX);
    (in_range && raw.fract() == 0.0).then_some(raw as u32)
}

/// Decode a `/status` body. Its `status` field is the service state, not an ack.
pub(crate) fn decode_status(body: &[u8]) -> Result<SystemStatus, RemoteError> {
    let wire: SystemStatusWire = serde_json::from_slice(body)
        .map_err(|err| RemoteError::Malformed(format!("system status: {err}")))?;
    let raw_state = wire
        .status
        .ok_or_else(|| RemoteError::Malformed("system status has no status field".into()))?;
    let status = ServiceState::from_service_value(&raw_state).ok_or_else(|| {
        RemoteError::Malformed(format!("unknown service status '{raw_state}'"))
    })?;
    let last_update = wire.last_update.as_deref().and_then(|raw| {
        let parsed = parse_timestamp(raw);
        if parsed.is_none() {
            tracing::warn!(value = raw, "Ignoring unparseable last_update timestamp");
        }
        parsed
    });
    Ok(SystemStatus {
        status,
        trains_count: wire.trains_count.unwrap_or(0),
        ml_model_trained: wire.ml_model_trained.unwrap_or(false),
        optimization_completed: wire.optimization_completed.unwrap_or(false),
        manual_overrides_count: wire.manual_overrides_count.unwrap_or(0),
        last_update,
    })
}

/// Validate an acknowledgment body. Empty or non-JSON bodies are accepted.
pub(crate) fn check_ack(body: &[u8]) -> Result<(), RemoteError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(());
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(value) => ensure_success(&value),
        Err(_) => Ok(()),
    }
}

/// Best-effort human-readable message from an error response body.
pub(crate) fn error_message(body: &[u8]) -> Option<String> {
    if let Ok(value) = serde_json::from_slice::<Value>(body)
        && let Some(message) = detail_text(&value)
    {
        return Some(message);
    }
    let text = String::from_utf8_lossy(body);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(MAX_ERROR_TEXT).collect())
}

fn parse_json(body: &[u8]) -> Result<Value, RemoteError> {
    serde_json::from_slice(body).map_err(|err| RemoteError::Malformed(err.to_string()))
}

fn ensure_success(value: &Value) -> Result<(), RemoteError> {
    match value.get("status") {
        None | Some(Value::Null) => Ok(()),
        Some(Value::String(status)) if status == SUCCESS => Ok(()),
        Some(other) => Err(RemoteError::Service {
            status: None,
            message: detail_text(value).unwrap_or_else(|| format!("status {other}")),
        }),
    }
}

fn detail_text(value: &Value) -> Option<String> {
    ["message", "detail", "error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}

fn parse_timestamp(raw: &str) -> Option<OffsetDateTime> {
    const NAIVE_FRACTIONAL: &[FormatItem<'_>] =
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]");
    const NAIVE: &[FormatItem<'_>] =
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
    let raw = raw.trim();
    if let Ok(parsed) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(parsed);
    }
    // Naive service timestamps are taken as UTC.
    [NAIVE_FRACTIONAL, NAIVE]
        .iter()
        .find_map(|format| PrimitiveDateTime::parse(raw, *format).ok())
        .map(PrimitiveDateTime::assume_utc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn induction_list_applies_defaults_and_keeps_order() {
        let body = br#"{
            "status": "success",
            "induction_list": [
                {"train_id": "Train-103", "fitness_score": 76.5, "depot": "Muttom",
                 "final_decision": "Reject", "open_work_orders": 2},
                {"train_id": "Train-101"}
            ]
        }"#;
        let trains = decode_induction_list(body).unwrap();
        assert_eq!(trains.len(), 2);
        assert_eq!(trains[0].train_id, "Train-103");
        assert_eq!(trains[0].final_decision, Decision::Reject);
        assert_eq!(trains[0].open_work_orders, 2);
        assert_eq!(trains[1], Train::new("Train-101"));
    }

    #[test]
    fn induction_list_without_list_is_empty() {
        assert!(decode_induction_list(br#"{"status":"success"}"#)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn induction_list_with_error_status_is_service_error() {
        let err = decode_induction_list(
            br#"{"status":"error","message":"model not trained","induction_list":[]}"#,
        )
        .unwrap_err();
        assert_eq!(
            err,
            RemoteError::Service {
                status: None,
                message: "model not trained".into()
            }
        );
    }

    #[test]
    fn induction_list_rejects_missing_and_duplicate_ids() {
        let missing = decode_induction_list(br#"{"induction_list":[{"fitness_score":80}]}"#);
        assert!(matches!(missing, Err(RemoteError::Malformed(_))));
        let duplicate = decode_induction_list(
            br#"{"induction_list":[{"train_id":"T-1"},{"train_id":"T-1"}]}"#,
        );
        assert!(matches!(duplicate, Err(RemoteError::Malformed(_))));
    }

    #[test]
    fn induction_list_rejects_non_json() {
        assert!(matches!(
            decode_induction_list(b"<html>oops</html>"),
            Err(RemoteError::Malformed(_))
        ));
    }

    #[test]
    fn work_orders_must_be_whole_non_negative_counts() {
        let whole = decode_induction_list(
            br#"{"induction_list":[{"train_id":"T-1","open_work_orders":3.0}]}"#,
        )
        .unwrap();
        assert_eq!(whole[0].open_work_orders, 3);

        for raw in ["2.7", "-4", "1e12"] {
            let body = format!(
                r#"{{"induction_list":[{{"train_id":"T-1","open_work_orders":{raw}}}]}}"#
            );
            match decode_induction_list(body.as_bytes()) {
                Err(RemoteError::Malformed(message)) => assert!(message.contains("T-1")),
                other => panic!("expected malformed for {raw}, got {other:?}"),
            }
        }
    }

    #[test]
    fn status_decodes_with_defaults_and_naive_timestamp() {
        let status = decode_status(
            br#"{"status":"running","trains_count":25,"ml_model_trained":true,
                "last_update":"2025-09-20T10:15:30.123456"}"#,
        )
        .unwrap();
        assert_eq!(status.status, ServiceState::Running);
        assert_eq!(status.trains_count, 25);
        assert!(status.ml_model_trained);
        assert!(!status.optimization_completed);
        assert_eq!(status.manual_overrides_count, 0);
        let ts = status.last_update.unwrap();
        assert_eq!(ts.year(), 2025);
        assert_eq!(ts.hour(), 10);
    }

    #[test]
    fn status_accepts_rfc3339_and_ignores_garbage_timestamps() {
        let with_offset =
            decode_status(br#"{"status":"error","last_update":"2025-09-20T10:15:30+05:30"}"#)
                .unwrap();
        assert_eq!(
            with_offset.last_update.unwrap().offset().whole_hours(),
            5
        );
        let garbage =
            decode_status(br#"{"status":"initializing","last_update":"yesterday"}"#).unwrap();
        assert!(garbage.last_update.is_none());
    }

    #[test]
    fn status_requires_known_state() {
        assert!(matches!(
            decode_status(br#"{"trains_count":3}"#),
            Err(RemoteError::Malformed(_))
        ));
        assert!(matches!(
            decode_status(br#"{"status":"sleeping"}"#),
            Err(RemoteError::Malformed(_))
        ));
    }

    #[test]
    fn ack_accepts_success_empty_and_plain_text() {
        assert!(check_ack(br#"{"status":"success","message":"done"}"#).is_ok());
        assert!(check_ack(b"  ").is_ok());
        assert!(check_ack(b"ok").is_ok());
        assert!(check_ack(br#"{"message":"Hello"}"#).is_ok());
    }

    #[test]
    fn ack_with_failed_status_is_service_error() {
        let err = check_ack(br#"{"status":"failed","detail":"train locked"}"#).unwrap_err();
        assert_eq!(err.to_string(), "Planning service error: train locked");
    }

    #[test]
    fn error_message_prefers_structured_detail() {
        assert_eq!(
            error_message(br#"{"detail":"Not Found"}"#).as_deref(),
            Some("Not Found")
        );
        assert_eq!(error_message(b" boom ").as_deref(), Some("boom"));
        assert_eq!(error_message(b""), None);
    }

    #[test]
    fn override_wire_uses_service_decision_names() {
        let request = OverrideRequest {
            train_id: "Train-7".into(),
            decision: Decision::Hold,
            reason: "brake inspection".into(),
        };
        let json = serde_json::to_value(OverrideRequestWire::from(&request)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "train_id": "Train-7",
                "decision": "Hold",
                "reason": "brake inspection"
            })
        );
    }
}
