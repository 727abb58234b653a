//! The governed event envelope: one JSON object per emitted business event.

use std::collections::BTreeMap;

use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct Actor {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Validation {
    pub status: &'static str,
    pub version: &'static str,
}

impl Default for Validation {
    fn default() -> Self {
        Self {
            status: "ACCEPTED",
            version: "v1",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum BottleResult {
    Good,
    Reject,
}

/// Per-event-type fields, tagged by `eventType` matching the variant name.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "eventType", rename_all = "camelCase")]
pub enum EventBody {
    StateChanged {
        from_state: String,
        to_state: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        stop_code: Option<u16>,
        #[serde(skip_serializing_if = "Option::is_none")]
        fault_code: Option<u16>,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason_id: Option<u16>,
        #[serde(skip_serializing_if = "Option::is_none")]
        duration_ms: Option<u64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        fingerprint: Option<BTreeMap<String, String>>,
    },
    OrderStarted {
        planned_qty: u32,
        planned_start_ts: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        planned_end_ts: Option<String>,
    },
    OrderCompleted {
        good_count_delta: u32,
        reject_count_delta: u32,
        duration_ms: u64,
        #[serde(rename = "yield")]
        yield_: f64,
    },
    BottleCompleted {
        result: BottleResult,
        station: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        reject_reason: Option<String>,
        weight: f64,
        torque: f64,
    },
    MicrostopStarted {
        stop_code: u16,
        fingerprint: BTreeMap<String, String>,
    },
    MicrostopEnded {
        stop_code: u16,
        duration_ms: u64,
        fingerprint: BTreeMap<String, String>,
    },
    StopStarted {
        stop_code: u16,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason_id: Option<u16>,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason_text: Option<String>,
    },
    StopEnded {
        stop_code: u16,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason_id: Option<u16>,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason_text: Option<String>,
        duration_ms: u64,
    },
    FaultRaised {
        fault_code: u16,
        severity: String,
        station: String,
    },
    FaultCleared {
        fault_code: u16,
        severity: String,
        station: String,
        duration_ms: u64,
    },
    CipStarted {},
    CipEnded {
        duration_ms: u64,
    },
    ChangeoverStarted {
        changeover_type: String,
        stop_code: String,
    },
    ChangeoverCompleted {
        changeover_type: String,
        stop_code: String,
        duration_ms: u64,
    },
}

/// The full governed event: common envelope fields plus the type-specific
/// body, flattened into one JSON object.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub event_id: Uuid,
    pub ts: String,
    pub enterprise: String,
    pub site: String,
    pub area: String,
    pub line: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    pub actor: Actor,
    pub validation: Validation,
    #[serde(flatten)]
    pub body: EventBody,
}

/// `round(dur_sim_s * 1000)` as specified.
pub fn duration_ms(dur_sim_s: f64) -> u64 {
    (dur_sim_s.max(0.0) * 1000.0).round() as u64
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn event_serializes_with_flat_event_type_tag() {
        let event = Event {
            event_id: Uuid::nil(),
            ts: "2026-07-30T00:00:00+00:00".to_string(),
            enterprise: "ACME".into(),
            site: "Cork".into(),
            area: "Bottling".into(),
            line: "L1".into(),
            order_id: Some("ORD-001".into()),
            sku: Some("LEM-500-IE".into()),
            actor: Actor {
                kind: "sim",
                id: "sim-1".into(),
            },
            validation: Validation::default(),
            body: EventBody::OrderStarted {
                planned_qty: 4000,
                planned_start_ts: "2026-07-30T00:00:00+00:00".to_string(),
                planned_end_ts: None,
            },
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["eventType"], "OrderStarted");
        assert_eq!(json["plannedQty"], 4000);
        assert_eq!(json["orderId"], "ORD-001");
        assert!(json.get("plannedEndTs").is_none());
    }

    #[test]
    fn duration_ms_rounds_sim_seconds() {
        assert_eq!(duration_ms(1.2345), 1235);
        assert_eq!(duration_ms(1.5), 1500);
        assert_eq!(duration_ms(0.0), 0);
    }
}
