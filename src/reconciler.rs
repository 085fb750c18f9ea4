//! Progress Reconciler
//!
//! Per-node sub-task flags, the derived node-complete bit, and the mission
//! cursor. Every operation is one read-modify-write of a whole worksheet; an
//! error before the write leaves the worksheet untouched. Other pilots' rows,
//! unknown columns and unreadable rows are written back as they were read.

use crate::error::{LaunchpadError, Result};
use crate::records::{
    ManifestNode, MissionState, MissionStatus, NodeId, NodeProgress, ProgressFlag, Row,
    normalize_email, nodes_of, timestamp_now,
};
use crate::store::{RecordStore, Sheet};
use log::{info, warn};

/// What `advance_mission_node` did to the cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// Cursor moved to this node
    Advanced { current_node: u32 },
    /// The last node was finished just now. The only outcome on which a
    /// celebration should fire.
    Completed { current_node: u32 },
    /// Mission was already completed; nothing was written
    AlreadyCompleted { current_node: u32 },
}

pub struct ProgressReconciler<'a> {
    store: &'a RecordStore,
}

fn checked_email(pilot_email: &str) -> Result<String> {
    let email = normalize_email(pilot_email);
    if email.is_empty() {
        return Err(LaunchpadError::validation("email", "pilot email is empty"));
    }
    Ok(email)
}

fn checked_mission(mission_id: &str) -> Result<&str> {
    let mission_id = mission_id.trim();
    if mission_id.is_empty() {
        return Err(LaunchpadError::validation("mission id", "mission id is empty"));
    }
    Ok(mission_id)
}

fn raw_email(raw: &Row) -> String {
    raw.get("Email").map(|e| normalize_email(e)).unwrap_or_default()
}

fn raw_progress_matches(raw: &Row, email: &str, node_id: &NodeId) -> bool {
    raw_email(raw) == email
        && raw
            .get("Node_ID")
            .and_then(|id| NodeId::parse(id).ok())
            .is_some_and(|id| &id == node_id)
}

/// Drop every progress row for (pilot, node) after the first
///
/// Duplicates only arise from writes outside this crate; the first row wins
/// so exactly one survives the next write.
fn collapse_duplicates(sheet: &mut Sheet<NodeProgress>, email: &str, node_id: &NodeId) {
    let before = sheet.len();
    let mut seen = false;
    sheet.retain(|r| {
        if !r.matches(email, node_id) {
            return true;
        }
        let keep = !seen;
        seen = true;
        keep
    });
    if sheet.len() != before {
        warn!(
            "collapsed {} duplicate progress rows for {} node {}",
            before - sheet.len(),
            email,
            node_id
        );
    }
}

impl<'a> ProgressReconciler<'a> {
    pub fn new(store: &'a RecordStore) -> Self {
        ProgressReconciler { store }
    }

    fn catalog_has(&self, mission_id: &str) -> Result<bool> {
        let manifest: Vec<ManifestNode> = self.store.read_records()?;
        Ok(!nodes_of(&manifest, mission_id).is_empty())
    }

    fn catalog_has_node(&self, mission_id: &str, node_id: &NodeId) -> Result<bool> {
        let manifest: Vec<ManifestNode> = self.store.read_records()?;
        Ok(manifest
            .iter()
            .any(|n| n.mission_id == mission_id && &n.node_id == node_id))
    }

    /// Set one sub-task flag for a pilot's node and re-derive `complete`
    ///
    /// Creates the progress row on first touch. Setting a flag to the value
    /// it already has still rewrites the worksheet; the resulting row is the
    /// same either way.
    ///
    /// # Errors
    /// * NotFound if the catalog has no such node in the mission
    /// * Validation if the pilot's stored row for the node is unreadable
    pub fn set_node_flag(
        &self,
        pilot_email: &str,
        mission_id: &str,
        node_id: &NodeId,
        flag: ProgressFlag,
        value: bool,
    ) -> Result<NodeProgress> {
        let email = checked_email(pilot_email)?;
        let mission_id = checked_mission(mission_id)?;
        if !self.catalog_has_node(mission_id, node_id)? {
            return Err(LaunchpadError::not_found(
                "node",
                format!("{} in {}", node_id, mission_id),
            ));
        }

        let mut sheet: Sheet<NodeProgress> = self.store.load_sheet()?;
        sheet.ensure_readable(|raw| raw_progress_matches(raw, &email, node_id))?;
        collapse_duplicates(&mut sheet, &email, node_id);

        let updated = match sheet.find_mut(|r| r.matches(&email, node_id)) {
            Some(row) => {
                row.set_flag(flag, value);
                row.clone()
            }
            None => {
                let mut fresh = NodeProgress::new(&email, mission_id, node_id.clone());
                fresh.set_flag(flag, value);
                sheet.push(fresh.clone());
                fresh
            }
        };

        self.store.save_sheet(sheet)?;
        info!(
            "{} node {}: {} = {} (complete: {})",
            email, node_id, flag, value, updated.complete
        );
        Ok(updated)
    }

    /// Clear one sub-task flag ("undo")
    ///
    /// Returns `None` without writing when the pilot never touched the node.
    pub fn reset_node_flag(
        &self,
        pilot_email: &str,
        node_id: &NodeId,
        flag: ProgressFlag,
    ) -> Result<Option<NodeProgress>> {
        let email = checked_email(pilot_email)?;

        let mut sheet: Sheet<NodeProgress> = self.store.load_sheet()?;
        sheet.ensure_readable(|raw| raw_progress_matches(raw, &email, node_id))?;
        collapse_duplicates(&mut sheet, &email, node_id);

        let Some(row) = sheet.find_mut(|r| r.matches(&email, node_id)) else {
            return Ok(None);
        };
        row.set_flag(flag, false);
        let updated = row.clone();

        self.store.save_sheet(sheet)?;
        info!("{} node {}: reset {}", email, node_id, flag);
        Ok(Some(updated))
    }

    /// Move the pilot's cursor one node forward, or finish the mission
    ///
    /// The cursor saturates at `total_nodes`: advancing from the last node
    /// marks the mission Completed and leaves the cursor where it is. The
    /// pilot's mission row is the reference here, so a mission that has
    /// since left the catalog can still be finished.
    ///
    /// # Errors
    /// * Validation if `total_nodes` is 0 or the pilot's mission row is
    ///   unreadable
    /// * NotFound if the pilot is not flying the mission
    pub fn advance_mission_node(
        &self,
        pilot_email: &str,
        mission_id: &str,
        total_nodes: u32,
    ) -> Result<AdvanceOutcome> {
        let email = checked_email(pilot_email)?;
        let mission_id = checked_mission(mission_id)?;
        if total_nodes == 0 {
            return Err(LaunchpadError::validation(
                "total nodes",
                "a mission needs at least one node",
            ));
        }

        let mut sheet: Sheet<MissionState> = self.store.load_sheet()?;
        sheet.ensure_readable(|raw| raw_email(raw) == email)?;
        let state = sheet
            .find_mut(|s| s.email == email && s.mission_id == mission_id)
            .ok_or_else(|| {
                LaunchpadError::not_found("mission state", format!("{} on {}", email, mission_id))
            })?;

        let outcome = if state.status == MissionStatus::Completed {
            AdvanceOutcome::AlreadyCompleted {
                current_node: state.current_node,
            }
        } else if state.current_node < total_nodes {
            state.current_node += 1;
            state.last_update = timestamp_now();
            AdvanceOutcome::Advanced {
                current_node: state.current_node,
            }
        } else {
            state.status = MissionStatus::Completed;
            AdvanceOutcome::Completed {
                current_node: state.current_node,
            }
        };

        if let AdvanceOutcome::AlreadyCompleted { .. } = outcome {
            return Ok(outcome);
        }

        self.store.save_sheet(sheet)?;
        info!("{} on {}: {:?}", email, mission_id, outcome);
        Ok(outcome)
    }

    /// Start a mission, or switch to another one from node 1
    ///
    /// The pilot ends up with exactly one MissionState row, which replaces
    /// any unreadable rows of theirs. Progress rows from the previous
    /// mission stay in Node_Analytics.
    pub fn start_or_switch_mission(&self, pilot_email: &str, mission_id: &str) -> Result<MissionState> {
        let email = checked_email(pilot_email)?;
        let mission_id = checked_mission(mission_id)?;
        if !self.catalog_has(mission_id)? {
            return Err(LaunchpadError::not_found("mission", mission_id));
        }

        let mut sheet: Sheet<MissionState> = self.store.load_sheet()?;
        let repaired = sheet.drop_unreadable(|raw| raw_email(raw) == email);
        if repaired > 0 {
            warn!("replacing {} unreadable mission rows of {}", repaired, email);
        }

        let fresh = MissionState::start(&email, mission_id);
        match sheet.find_mut(|s| s.email == email) {
            Some(state) => *state = fresh.clone(),
            None => sheet.push(fresh.clone()),
        }
        let mut seen = false;
        sheet.retain(|s| {
            if s.email != email {
                return true;
            }
            let keep = !seen;
            seen = true;
            keep
        });

        self.store.save_sheet(sheet)?;
        info!("{} started mission {}", email, mission_id);
        Ok(fresh)
    }
}
