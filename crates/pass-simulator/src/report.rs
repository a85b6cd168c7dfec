//! Sectioned link budget report
//!
//! Shapes a result sequence into the layout a downlink budget sheet uses:
//! one column per sample key, grouped rows per stage of the chain. Export
//! is left to the caller (`Report` serializes with serde, `to_rows` gives
//! a flat table for CSV-style sinks).

use chrono::SecondsFormat;
use link_budget::{LinkBudgetResult, RfParameters, BOLTZMANN_DBW_PER_K_HZ};
use orbital_mechanics::{PassWindow, SampleKey};
use serde::Serialize;
use tracing::debug;

pub const NEXT_PASS: &str = "Next Pass";
pub const DOWNLINK: &str = "Downlink";
pub const TRANSMIT: &str = "Spacecraft Transmit Parameters";
pub const CHANNEL: &str = "Channel Parameters";
pub const RECEIVER: &str = "Receiver";
pub const POWER_SUMMARY: &str = "Power Summary";
pub const UNCODED_OFFSET: &str = "Uncoded Offset";

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Text(String),
    Empty,
}

impl Cell {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(v) => Some(*v),
            _ => None,
        }
    }

    fn render(&self) -> String {
        match self {
            Cell::Number(v) => format!("{v:.4}"),
            Cell::Text(s) => s.clone(),
            Cell::Empty => String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Row {
    pub parameter: String,
    pub unit: String,
    pub values: Vec<Cell>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Section {
    pub title: String,
    pub rows: Vec<Row>,
}

impl Section {
    pub fn row(&self, parameter: &str) -> Option<&Row> {
        self.rows.iter().find(|r| r.parameter == parameter)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Report {
    /// One label per result, in result order
    pub columns: Vec<String>,
    pub sections: Vec<Section>,
}

impl Report {
    pub fn section(&self, title: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.title == title)
    }

    /// Flat table: a title row, a header row and the parameter rows for
    /// each section, sections separated by an empty row
    pub fn to_rows(&self) -> Vec<Vec<String>> {
        let mut out = Vec::new();
        for (i, section) in self.sections.iter().enumerate() {
            if i > 0 {
                out.push(Vec::new());
            }
            out.push(vec![section.title.clone()]);

            let mut header = vec!["Parameter".to_string(), "Units".to_string()];
            header.extend(self.columns.iter().cloned());
            out.push(header);

            for row in &section.rows {
                let mut line = vec![row.parameter.clone(), row.unit.clone()];
                line.extend(row.values.iter().map(Cell::render));
                out.push(line);
            }
        }
        out
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReportAssembler {
    altitude_km: Option<f64>,
    pass: Option<PassWindow>,
    predicted: Option<LinkBudgetResult>,
}

impl ReportAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_altitude_km(mut self, altitude_km: f64) -> Self {
        self.altitude_km = Some(altitude_km);
        self
    }

    pub fn with_pass(mut self, window: PassWindow, predicted: LinkBudgetResult) -> Self {
        self.pass = Some(window);
        self.predicted = Some(predicted);
        self
    }

    pub fn assemble(&self, results: &[LinkBudgetResult], params: &RfParameters) -> Report {
        debug!("Assembling report over {} results", results.len());

        let columns = results.iter().map(|r| column_label(&r.key)).collect();
        let n = results.len();
        let constant = |v: f64| vec![Cell::Number(v); n];
        let computed = |f: fn(&LinkBudgetResult) -> f64| per_result(results, f);

        let mut sections = Vec::with_capacity(7);

        if let Some(window) = &self.pass {
            let mut rows = vec![
                text_row("AOS", "UTC", time_label(window.aos_time), n),
                text_row("Peak", "UTC", time_label(window.peak_time), n),
                text_row("LOS", "UTC", time_label(window.los_time), n),
                row("Duration", "s", constant(window.duration().num_milliseconds() as f64 / 1000.0)),
                row("Peak Elevation", "deg", constant(window.peak_elevation_deg)),
            ];
            if let Some(predicted) = &self.predicted {
                rows.push(row("Predicted Slant Range", "km", constant(predicted.slant_range_km)));
                rows.push(row("Predicted Link Margin", "dB", constant(predicted.link_margin_db)));
            }
            sections.push(section(NEXT_PASS, rows));
        }

        let mut downlink = vec![
            row("Frequency", "Hz", constant(params.frequency_hz)),
            row("Data Rate", "bps", constant(params.data_rate_bps)),
        ];
        if let Some(altitude) = self.altitude_km {
            downlink.push(row("Orbital Altitude", "km", constant(altitude)));
        }
        sections.push(section(DOWNLINK, downlink));

        sections.push(section(
            TRANSMIT,
            vec![
                row("RF Input Power", "W", constant(params.tx_power_w)),
                row("Tx Cable Loss", "dB", constant(params.tx_cable_loss_db)),
                row("Tx Antenna Gain", "dBi", constant(params.tx_antenna_gain_dbi)),
                row("EIRP", "dBW", computed(|r| r.eirp_dbw)),
            ],
        ));

        let mut channel = vec![
            row("Elevation", "deg", computed(|r| r.elevation_deg)),
            row("Slant Range", "km", computed(|r| r.slant_range_km)),
        ];
        if results.iter().any(|r| r.azimuth_deg.is_some()) {
            let azimuth = results
                .iter()
                .map(|r| r.azimuth_deg.map_or(Cell::Empty, Cell::Number))
                .collect();
            channel.push(row("Azimuth", "deg", azimuth));
        }
        channel.push(row("Free Space Path Loss", "dB", computed(|r| r.fspl_db)));
        sections.push(section(CHANNEL, channel));

        sections.push(section(
            RECEIVER,
            vec![
                row("Rx Antenna Gain", "dBi", constant(params.rx_antenna_gain_dbi)),
                row("Antenna Noise Temperature", "K", constant(params.antenna_noise_temp_k)),
                row("Receiver Noise Temperature", "K", constant(params.receiver_noise_temp_k)),
                row("System Noise Temperature", "dBK", computed(|r| r.system_noise_temp_dbk)),
                row("G/T", "dB/K", computed(|r| r.g_over_t_db)),
            ],
        ));

        sections.push(section(
            POWER_SUMMARY,
            vec![
                row("Boltzmann's Constant", "dBW/K/Hz", constant(BOLTZMANN_DBW_PER_K_HZ)),
                row("C/N0 at Ground Station", "dB-Hz", computed(|r| r.cn0_dbhz)),
            ],
        ));

        sections.push(section(
            UNCODED_OFFSET,
            vec![
                row("Available Eb/N0", "dB", computed(|r| r.eb_n0_db)),
                row("Required Eb/N0", "dB", constant(params.required_eb_n0_db)),
                row("Link Margin", "dB", computed(|r| r.link_margin_db)),
            ],
        ));

        Report { columns, sections }
    }
}

fn per_result(results: &[LinkBudgetResult], f: fn(&LinkBudgetResult) -> f64) -> Vec<Cell> {
    results.iter().map(|r| Cell::Number(f(r))).collect()
}

fn column_label(key: &SampleKey) -> String {
    match key {
        SampleKey::Time(t) => time_label(*t),
        SampleKey::Elevation(deg) => format!("{deg}°"),
    }
}

fn time_label(time: chrono::DateTime<chrono::Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn row(parameter: &str, unit: &str, values: Vec<Cell>) -> Row {
    Row {
        parameter: parameter.to_string(),
        unit: unit.to_string(),
        values,
    }
}

fn text_row(parameter: &str, unit: &str, text: String, n: usize) -> Row {
    row(parameter, unit, vec![Cell::Text(text); n])
}

fn section(title: &str, rows: Vec<Row>) -> Section {
    Section {
        title: title.to_string(),
        rows,
    }
}
