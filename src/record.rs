//! Report records as handed over by the ticket service.
//!
//! Everything here is read-only input: the renderer never mutates a record.
//! Text fields default to `""` so a partially filled JSON request still
//! deserializes, and every relation on the aircraft is optional.

use crate::error::Result;
use crate::types::Color;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// The literal stored by the analyst form when a status select was never
/// touched.
pub const UNSET: &str = "0";

/// True when a stored text value carries no content: blank or the unset
/// sentinel.
pub fn is_blank(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty() || trimmed == UNSET
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum EnginePosition {
    #[default]
    Single,
    Left,
    Right,
}

impl EnginePosition {
    pub fn label(self) -> &'static str {
        match self {
            EnginePosition::Single => "",
            EnginePosition::Left => "Left",
            EnginePosition::Right => "Right",
        }
    }

    pub fn is_twin(self) -> bool {
        self != EnginePosition::Single
    }
}

impl TryFrom<u8> for EnginePosition {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(EnginePosition::Single),
            1 => Ok(EnginePosition::Left),
            2 => Ok(EnginePosition::Right),
            other => Err(format!("unknown engine position {other}")),
        }
    }
}

impl From<EnginePosition> for u8 {
    fn from(value: EnginePosition) -> Self {
        match value {
            EnginePosition::Single => 0,
            EnginePosition::Left => 1,
            EnginePosition::Right => 2,
        }
    }
}

/// The traffic-light value of one functional area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Satisfactory,
    Caution,
    Alert,
    NotApplicable,
    /// Anything else the form stored; drawn gray with its own text.
    Other(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChipVariant {
    Standard,
    Gami,
}

impl Status {
    pub fn parse(raw: &str) -> Self {
        let value = raw.trim();
        match value {
            "Satisfactory" => Status::Satisfactory,
            "Caution" => Status::Caution,
            "Alert" => Status::Alert,
            "" | UNSET | "N/A" => Status::NotApplicable,
            other => Status::Other(other.to_string()),
        }
    }

    pub fn fill(&self) -> Color {
        match self {
            Status::Satisfactory => Color::rgb8(0, 255, 0),
            Status::Caution => Color::rgb8(255, 230, 48),
            Status::Alert => Color::rgb8(255, 115, 115),
            Status::NotApplicable | Status::Other(_) => Color::rgb8(230, 230, 230),
        }
    }

    pub fn label(&self, variant: ChipVariant) -> Cow<'_, str> {
        match (self, variant) {
            (Status::Satisfactory, _) => Cow::Borrowed("Satisfactory"),
            (Status::Caution, _) => Cow::Borrowed("Caution"),
            (Status::Alert, _) => Cow::Borrowed("Alert"),
            (Status::NotApplicable, ChipVariant::Standard) => Cow::Borrowed("Not Applicable"),
            (Status::NotApplicable, ChipVariant::Gami) => {
                Cow::Borrowed("N/A (no usable mixture sweeps observed)")
            }
            (Status::Other(text), _) => Cow::Borrowed(text.as_str()),
        }
    }
}

/// The seven analysed areas, in page order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionalArea {
    Gami,
    Ignition,
    Power,
    Temperatures,
    Monitor,
    Powerplant,
    Electrical,
}

impl FunctionalArea {
    pub const ALL: [FunctionalArea; 7] = [
        FunctionalArea::Gami,
        FunctionalArea::Ignition,
        FunctionalArea::Power,
        FunctionalArea::Temperatures,
        FunctionalArea::Monitor,
        FunctionalArea::Powerplant,
        FunctionalArea::Electrical,
    ];

    /// The six areas shown as paired data boxes, row by row.
    pub const DATA_BOXES: [FunctionalArea; 6] = [
        FunctionalArea::Ignition,
        FunctionalArea::Power,
        FunctionalArea::Temperatures,
        FunctionalArea::Monitor,
        FunctionalArea::Powerplant,
        FunctionalArea::Electrical,
    ];

    pub fn title(self) -> &'static str {
        match self {
            FunctionalArea::Gami => "GAMI Lean Test",
            FunctionalArea::Ignition => "Ignition",
            FunctionalArea::Power => "Max Power",
            FunctionalArea::Temperatures => "Temperatures",
            FunctionalArea::Monitor => "Engine Monitor",
            FunctionalArea::Powerplant => "Powerplant Mgt",
            FunctionalArea::Electrical => "Electrical",
        }
    }

    pub fn labels(self) -> [&'static str; 4] {
        match self {
            FunctionalArea::Gami => ["Sweep #1", "Sweep #2", "Sweep #3", "Observations"],
            FunctionalArea::Ignition => [
                "Non-firing plug(s)",
                "Marginal plug(s)",
                "Split mag timing",
                "Add'l observations",
            ],
            FunctionalArea::Power => [
                "Max power FF",
                "Max power RPM",
                "Maximum MAP",
                "Add'l observations",
            ],
            FunctionalArea::Temperatures => ["CHTs", "EGTs", "TIT(s)", "Add'l observations"],
            FunctionalArea::Monitor => [
                "Inoperative sensors",
                "Anomalous channels",
                "Noisy channels",
                "Add'l observations",
            ],
            FunctionalArea::Powerplant => {
                ["Power", "Mixture", "Test Profile(s)", "Add'l observations"]
            }
            FunctionalArea::Electrical => [
                "Primary sys",
                "Secondary sys",
                "Other sensors",
                "Add'l observations",
            ],
        }
    }

    pub fn chip_variant(self) -> ChipVariant {
        match self {
            FunctionalArea::Gami => ChipVariant::Gami,
            _ => ChipVariant::Standard,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Assessment {
    pub status: String,
    pub observations: [String; 4],
}

impl Assessment {
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            observations: Default::default(),
        }
    }

    pub fn with_observation(mut self, index: usize, text: impl Into<String>) -> Self {
        if let Some(slot) = self.observations.get_mut(index) {
            *slot = text.into();
        }
        self
    }

    pub fn status(&self) -> Status {
        Status::parse(&self.status)
    }

    pub fn is_empty(&self) -> bool {
        is_blank(&self.status) && self.observations.iter().all(|text| is_blank(text))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AircraftSummary {
    pub owner_first_name: String,
    pub owner_last_name: String,
    pub registration: String,
    pub aircraft_manufacturer: Option<String>,
    pub aircraft_model: Option<String>,
    pub engine_manufacturer: Option<String>,
    pub engine_model: Option<String>,
    pub monitor_manufacturer: Option<String>,
    pub monitor_model: Option<String>,
    /// End of the current subscription; `None` for pay-per-use clients.
    pub subscription_end: Option<NaiveDate>,
}

fn pair(first: &Option<String>, second: &Option<String>) -> String {
    format!(
        "{} {}",
        first.as_deref().unwrap_or(""),
        second.as_deref().unwrap_or("")
    )
}

impl AircraftSummary {
    pub fn owner_name(&self) -> String {
        format!("{} {}", self.owner_first_name, self.owner_last_name)
    }

    pub fn aircraft_type(&self) -> String {
        pair(&self.aircraft_manufacturer, &self.aircraft_model)
    }

    pub fn engine(&self) -> String {
        pair(&self.engine_manufacturer, &self.engine_model)
    }

    pub fn monitor(&self) -> String {
        pair(&self.monitor_manufacturer, &self.monitor_model)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightSummary {
    #[serde(default)]
    pub id: u64,
    pub date: NaiveDate,
    #[serde(default)]
    pub aircraft: AircraftSummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightReportRecord {
    pub id: u64,
    #[serde(default)]
    pub engine: EnginePosition,
    #[serde(default)]
    pub sister_report: Option<u64>,
    #[serde(default)]
    pub created_on: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ticket_id: Option<u64>,
    pub flight: FlightSummary,
    #[serde(default)]
    pub client_comments: Option<String>,
    #[serde(default)]
    pub gami: Assessment,
    #[serde(default)]
    pub ignition: Assessment,
    #[serde(default)]
    pub power: Assessment,
    #[serde(default)]
    pub temperatures: Assessment,
    #[serde(default)]
    pub monitor: Assessment,
    #[serde(default)]
    pub powerplant: Assessment,
    #[serde(default)]
    pub electrical: Assessment,
    #[serde(default)]
    pub findings: String,
    #[serde(default)]
    pub recommendations: String,
    #[serde(default)]
    pub additional: String,
}

impl FlightReportRecord {
    /// A record with every text field blank.
    pub fn new(id: u64, engine: EnginePosition, flight: FlightSummary) -> Self {
        Self {
            id,
            engine,
            sister_report: None,
            created_on: None,
            ticket_id: None,
            flight,
            client_comments: None,
            gami: Assessment::default(),
            ignition: Assessment::default(),
            power: Assessment::default(),
            temperatures: Assessment::default(),
            monitor: Assessment::default(),
            powerplant: Assessment::default(),
            electrical: Assessment::default(),
            findings: String::new(),
            recommendations: String::new(),
            additional: String::new(),
        }
    }

    pub fn assessment(&self, area: FunctionalArea) -> &Assessment {
        match area {
            FunctionalArea::Gami => &self.gami,
            FunctionalArea::Ignition => &self.ignition,
            FunctionalArea::Power => &self.power,
            FunctionalArea::Temperatures => &self.temperatures,
            FunctionalArea::Monitor => &self.monitor,
            FunctionalArea::Powerplant => &self.powerplant,
            FunctionalArea::Electrical => &self.electrical,
        }
    }

    pub fn aircraft(&self) -> &AircraftSummary {
        &self.flight.aircraft
    }

    /// Nothing worth a page: findings, recommendations, remarks and every
    /// assessment are blank. Client comments are not considered since they
    /// usually come from the ticket rather than the analyst.
    pub fn is_empty(&self) -> bool {
        is_blank(&self.findings)
            && is_blank(&self.recommendations)
            && is_blank(&self.additional)
            && FunctionalArea::ALL
                .iter()
                .all(|area| self.assessment(*area).is_empty())
    }

    pub fn has_additional(&self) -> bool {
        !is_blank(&self.additional)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportRenderRequest {
    pub records: Vec<FlightReportRecord>,
    /// Replaces every record's client comments when present.
    pub ticket_body: Option<String>,
    /// Serve as a download with a synthesized filename.
    pub attachment: bool,
}

impl ReportRenderRequest {
    pub fn new(records: Vec<FlightReportRecord>) -> Self {
        Self {
            records,
            ticket_body: None,
            attachment: false,
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_ticket_body(mut self, body: impl Into<String>) -> Self {
        self.ticket_body = Some(body.into());
        self
    }

    pub fn as_attachment(mut self) -> Self {
        self.attachment = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn flight() -> FlightSummary {
        FlightSummary {
            id: 7,
            date: NaiveDate::from_ymd_opt(2024, 3, 9).unwrap(),
            aircraft: AircraftSummary {
                owner_first_name: "Ada".into(),
                owner_last_name: "Lovelace".into(),
                registration: "N123AB".into(),
                ..AircraftSummary::default()
            },
        }
    }

    #[test]
    fn blank_and_sentinel_records_are_empty() {
        let mut record = FlightReportRecord::new(1, EnginePosition::Single, flight());
        record.findings = "0".into();
        record.ignition.status = "0".into();
        record.gami.observations[3] = "   ".into();
        record.client_comments = Some("customer says it runs rough".into());
        assert!(record.is_empty());

        record.power.observations[1] = "2700".into();
        assert!(!record.is_empty());
    }

    #[test]
    fn not_applicable_forms_share_one_status() {
        for raw in ["0", "N/A", "", "  "] {
            assert_eq!(Status::parse(raw), Status::NotApplicable);
        }
        assert_eq!(Status::parse("Alert"), Status::Alert);
        assert_eq!(
            Status::parse("Pending").label(ChipVariant::Standard),
            "Pending"
        );
        assert_eq!(
            Status::NotApplicable.label(ChipVariant::Gami),
            "N/A (no usable mixture sweeps observed)"
        );
        assert_eq!(Status::NotApplicable.fill(), Status::parse("Other").fill());
    }

    #[test]
    fn missing_relations_render_as_blank_pairs() {
        let aircraft = AircraftSummary {
            aircraft_manufacturer: Some("Beechcraft".into()),
            engine_model: Some("IO-550".into()),
            ..AircraftSummary::default()
        };
        assert_eq!(aircraft.aircraft_type(), "Beechcraft ");
        assert_eq!(aircraft.engine(), " IO-550");
        assert_eq!(aircraft.monitor(), " ");
    }

    #[test]
    fn request_parses_from_sparse_json() {
        let json = r#"{
            "records": [{
                "id": 4,
                "engine": 1,
                "sister_report": 5,
                "flight": {"date": "2024-03-09", "aircraft": {"registration": "N55"}},
                "gami": {"status": "Alert", "observations": ["", "", "", "spread 0.9 GPH"]},
                "findings": "CHT 3 runs hot"
            }],
            "attachment": true
        }"#;
        let request = ReportRenderRequest::from_json(json).unwrap();
        assert!(request.attachment);
        let record = &request.records[0];
        assert_eq!(record.engine, EnginePosition::Left);
        assert_eq!(record.sister_report, Some(5));
        assert_eq!(record.gami.status(), Status::Alert);
        assert_eq!(record.ignition, Assessment::default());
        assert_eq!(record.aircraft().registration, "N55");
    }

    #[test]
    fn unknown_engine_position_is_rejected() {
        let json = r#"{"records": [{"id": 1, "engine": 3, "flight": {"date": "2024-01-01"}}]}"#;
        assert!(ReportRenderRequest::from_json(json).is_err());
    }

    #[test]
    fn every_area_has_four_labels_and_a_title() {
        for area in FunctionalArea::ALL {
            assert!(!area.title().is_empty());
            assert!(area.labels().iter().all(|label| !label.is_empty()));
        }
        assert_eq!(FunctionalArea::Gami.chip_variant(), ChipVariant::Gami);
    }
}
