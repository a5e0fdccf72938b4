//! Postprocessors run after every committed step.

use crate::error::{SolverError, SolverResult, parse_settings};
use fsi_coupling::{CouplingResult, Postprocessor, SolverContext};
use fsi_state::{SimulationState, StructuralTimestepState};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Vertical position of the last structural node.
fn tip_z(step: &StructuralTimestepState) -> f64 {
    step.pos.last().map_or(0.0, |p| p.z)
}

/// Logs a one-line summary of the committed structural state.
#[derive(Debug, Clone, Default)]
pub struct StateSummary {
    steps_seen: usize,
}

impl StateSummary {
    pub const ID: &'static str = "StateSummary";

    pub fn steps_seen(&self) -> usize {
        self.steps_seen
    }
}

impl Postprocessor for StateSummary {
    fn name(&self) -> &str {
        Self::ID
    }

    fn initialise(&mut self, _state: &mut SimulationState, _ctx: &SolverContext) -> CouplingResult<()> {
        self.steps_seen = 0;
        Ok(())
    }

    fn run(&mut self, state: &mut SimulationState, online: bool) -> CouplingResult<()> {
        let last = state.last_structural()?;
        self.steps_seen += 1;
        info!(
            ts = state.ts,
            online,
            q_norm = last.q.norm(),
            tip_z = tip_z(last),
            for_pos = ?last.for_pos,
            "state summary"
        );
        Ok(())
    }
}

/// Settings block for [`TimeSeriesCsv`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimeSeriesCsvSettings {
    /// Output file, truncated at initialise and appended after every step
    pub path: PathBuf,
}

impl Default for TimeSeriesCsvSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("fsi_timeseries.csv"),
        }
    }
}

/// Writes one CSV row per committed step.
#[derive(Debug, Clone)]
pub struct TimeSeriesCsv {
    settings: TimeSeriesCsvSettings,
    dt: f64,
}

impl TimeSeriesCsv {
    pub const ID: &'static str = "TimeSeriesCsv";

    const HEADER: &'static str = "ts,time_s,q_norm,tip_z,force_z\n";

    pub fn new(settings: TimeSeriesCsvSettings) -> Self {
        Self {
            settings,
            dt: 0.0,
        }
    }

    pub fn from_value(value: &serde_json::Value) -> SolverResult<Self> {
        Ok(Self::new(parse_settings(Self::ID, value)?))
    }

    pub fn path(&self) -> &Path {
        &self.settings.path
    }

    fn append_row(&self, row: &str) -> SolverResult<()> {
        let mut file = OpenOptions::new().append(true).open(&self.settings.path)?;
        file.write_all(row.as_bytes())?;
        Ok(())
    }
}

impl Postprocessor for TimeSeriesCsv {
    fn name(&self) -> &str {
        Self::ID
    }

    fn initialise(&mut self, _state: &mut SimulationState, ctx: &SolverContext) -> CouplingResult<()> {
        let parent = self.settings.path.parent().filter(|p| !p.as_os_str().is_empty());
        if let Some(parent) = parent {
            fs::create_dir_all(parent).map_err(SolverError::from)?;
        }
        self.dt = ctx.dt;
        fs::write(&self.settings.path, Self::HEADER).map_err(SolverError::from)?;
        Ok(())
    }

    fn run(&mut self, state: &mut SimulationState, _online: bool) -> CouplingResult<()> {
        let last = state.last_structural()?;
        let row = format!(
            "{},{},{},{},{}\n",
            state.ts,
            state.ts as f64 * self.dt,
            last.q.norm(),
            tip_z(last),
            last.total_steady_force(2)
        );
        self.append_row(&row)?;
        Ok(())
    }
}
