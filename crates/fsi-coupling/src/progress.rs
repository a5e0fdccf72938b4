//! Per-step progress records and the residual table layout.

use fsi_core::units::Time;
use uom::si::time::second;

/// Summary of one committed outer step.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressRecord {
    /// Outer step index
    pub ts: usize,
    /// Simulated time `ts * dt`
    pub time: Time,
    /// Substep index reached when the inner loop stopped
    pub substeps: usize,
    /// `log10` of the last computed velocity residual, carried over from an
    /// earlier step when none was computed in this one
    pub log10_res_dqdt: f64,
    pub for_vel_x: f64,
    pub for_vel_z: f64,
    /// Sum of the steady applied forces along body x
    pub force_x: f64,
    /// Sum of the steady applied forces along body z
    pub force_z: f64,
}

const HEADERS: [&str; 8] = [
    "ts",
    "t",
    "iter",
    "residual vel",
    "FoR_vel(x)",
    "FoR_vel(z)",
    "x_b forces",
    "z_b forces",
];

/// Fixed-width text layout of progress records.
#[derive(Debug, Clone)]
pub struct ResidualTable {
    widths: [usize; 8],
}

impl Default for ResidualTable {
    fn default() -> Self {
        Self {
            widths: [6, 6, 14, 14, 14, 14, 14, 14],
        }
    }
}

impl ResidualTable {
    pub fn header(&self) -> String {
        let cells: Vec<String> = HEADERS
            .iter()
            .zip(self.widths)
            .map(|(h, w)| format!("{h:>w$}"))
            .collect();
        let line = cells.join("|");
        format!("{line}\n{}", "=".repeat(line.len()))
    }

    pub fn line(&self, r: &ProgressRecord) -> String {
        let w = self.widths;
        [
            format!("{:>w$}", r.ts, w = w[0]),
            format!("{:>w$.4}", r.time.get::<second>(), w = w[1]),
            format!("{:>w$}", r.substeps, w = w[2]),
            format!("{:>w$.6}", r.log10_res_dqdt, w = w[3]),
            format!("{:>w$.6e}", r.for_vel_x, w = w[4]),
            format!("{:>w$.6e}", r.for_vel_z, w = w[5]),
            format!("{:>w$.6}", r.force_x, w = w[6]),
            format!("{:>w$.6}", r.force_z, w = w[7]),
        ]
        .join("|")
    }
}
