//! Trimming, alignment and commit of the timestep history buffers.

use crate::error::{CouplingError, CouplingResult};
use fsi_state::{AeroTimestepState, SimulationState, StructuralTimestepState};

/// Keeps the aero and structural histories index-aligned.
#[derive(Clone, Copy, Debug, Default)]
pub struct TimestepHistoryManager;

impl TimestepHistoryManager {
    /// Keep only the last entry of each history as the new seed.
    ///
    /// When either history holds more than one entry, its last entry is moved
    /// to slot 0, everything after slot 0 is dropped and the time cursor is
    /// reset. Histories of length 0 or 1 are left untouched.
    pub fn cleanup(&self, state: &mut SimulationState) {
        let longest = state
            .structural_history_len()
            .max(state.aero_history_len());
        if longest <= 1 {
            return;
        }
        keep_last(&mut state.aero.timestep_info);
        keep_last(&mut state.structure.timestep_info);
        state.ts = 0;
    }

    /// Both histories must be non-empty and of equal length.
    pub fn check_aligned(&self, state: &SimulationState) -> CouplingResult<()> {
        let (n_struct, n_aero) = (state.structural_history_len(), state.aero_history_len());
        if n_struct == 0 || n_aero == 0 {
            return Err(CouplingError::History {
                what: "histories must hold at least the seed state".to_string(),
            });
        }
        if n_struct != n_aero {
            return Err(CouplingError::History {
                what: format!("structural history has {n_struct} entries, aero has {n_aero}"),
            });
        }
        Ok(())
    }

    /// Overwrite the last entry of each history with the final iterate.
    pub fn commit(
        &self,
        state: &mut SimulationState,
        aero: &AeroTimestepState,
        structural: &StructuralTimestepState,
    ) -> CouplingResult<()> {
        *state.aero.last_mut()? = aero.clone();
        *state.structure.last_mut()? = structural.clone();
        Ok(())
    }
}

fn keep_last<T>(history: &mut Vec<T>) {
    if let Some(last) = history.pop() {
        history.clear();
        history.push(last);
    }
}
