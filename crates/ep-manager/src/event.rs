//! Scan events.
//!
//! # JSON shape
//!
//! ```json
//! { "waybill": "WB1", "location": "CTR1 (North Hub)", "destination": "CTR9",
//!   "action": "inbound", "connection": "1042",
//!   "scan_datetime": "2024-03-01T08:00:00", "pickup_date": "2024-02-29" }
//! ```
//!
//! `waybill`, `location`, `destination` and `scan_datetime` are required.
//! `action` is `"inbound"` / `"outbound"`, or the transport codes `"<L"` /
//! `"+L"`; anything else is a plain location scan.  `connection` may be an
//! integer or a numeric string; any other value means no connection.

use serde::Deserialize;

use ep_core::Timestamp;
use ep_network::normalize_code;

use crate::{ManagerError, ManagerResult};

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum ScanAction {
    Inbound,
    Outbound,
}

impl ScanAction {
    pub fn as_str(self) -> &'static str {
        match self {
            ScanAction::Inbound => "inbound",
            ScanAction::Outbound => "outbound",
        }
    }

    fn parse(raw: &str) -> Option<ScanAction> {
        match raw.trim() {
            "inbound" | "<L" => Some(ScanAction::Inbound),
            "outbound" | "+L" => Some(ScanAction::Outbound),
            _ => None,
        }
    }
}

/// A decoded scan: a shipment seen at a center.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScanEvent {
    pub waybill:     String,
    /// Center code, normalised.
    pub location:    String,
    /// Center code, normalised.
    pub destination: String,
    pub action:      Option<ScanAction>,
    pub connection:  Option<u32>,
    pub scan_time:   Timestamp,
    pub pickup_date: Option<Timestamp>,
}

impl ScanEvent {
    /// A plain location scan.
    pub fn new(waybill: &str, location: &str, destination: &str, scan_time: Timestamp) -> ScanEvent {
        ScanEvent {
            waybill: waybill.trim().to_owned(),
            location: normalize_code(location).to_owned(),
            destination: normalize_code(destination).to_owned(),
            action: None,
            connection: None,
            scan_time,
            pickup_date: None,
        }
    }

    pub fn inbound(mut self) -> Self {
        self.action = Some(ScanAction::Inbound);
        self
    }

    pub fn outbound(mut self, connection: u32) -> Self {
        self.action = Some(ScanAction::Outbound);
        self.connection = Some(connection);
        self
    }

    pub fn with_pickup_date(mut self, pickup_date: Timestamp) -> Self {
        self.pickup_date = Some(pickup_date);
        self
    }

    /// Identity of the physical scan, for de-duplication.
    pub fn scan_key(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}",
            self.waybill,
            self.location,
            self.scan_time.0,
            self.action.map_or("-", ScanAction::as_str),
            self.connection.map_or_else(|| "-".to_owned(), |c| c.to_string()),
        )
    }

    pub fn from_json(line: &str) -> ManagerResult<ScanEvent> {
        let raw: RawScan = serde_json::from_str(line)
            .map_err(|e| ManagerError::Validation(format!("undecodable scan: {e}")))?;
        raw.into_event()
    }

    pub fn from_value(value: serde_json::Value) -> ManagerResult<ScanEvent> {
        let raw: RawScan = serde_json::from_value(value)
            .map_err(|e| ManagerError::Validation(format!("undecodable scan: {e}")))?;
        raw.into_event()
    }
}

// ── Wire record ───────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct RawScan {
    #[serde(default)]
    waybill:       Option<String>,
    #[serde(default)]
    location:      Option<String>,
    #[serde(default)]
    destination:   Option<String>,
    #[serde(default)]
    action:        Option<String>,
    #[serde(default)]
    connection:    Option<serde_json::Value>,
    #[serde(default)]
    scan_datetime: Option<String>,
    #[serde(default)]
    pickup_date:   Option<String>,
}

fn required(field: &'static str, value: Option<String>) -> ManagerResult<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ManagerError::Validation(format!("missing field {field}")))
}

fn parse_time(field: &'static str, raw: &str) -> ManagerResult<Timestamp> {
    Timestamp::parse_iso(raw).map_err(|e| ManagerError::Validation(format!("{field}: {e}")))
}

fn connection_index(value: Option<serde_json::Value>) -> Option<u32> {
    match value? {
        serde_json::Value::Number(n) => n.as_u64().and_then(|i| u32::try_from(i).ok()),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

impl RawScan {
    fn into_event(self) -> ManagerResult<ScanEvent> {
        let waybill = required("waybill", self.waybill)?;
        let location = required("location", self.location)?;
        let destination = required("destination", self.destination)?;
        let scan_time = parse_time("scan_datetime", &required("scan_datetime", self.scan_datetime)?)?;
        let pickup_date = match self.pickup_date.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(parse_time("pickup_date", raw)?),
        };
        Ok(ScanEvent {
            waybill,
            location: normalize_code(&location).to_owned(),
            destination: normalize_code(&destination).to_owned(),
            action: self.action.as_deref().and_then(ScanAction::parse),
            connection: connection_index(self.connection),
            scan_time,
            pickup_date,
        })
    }
}
