//! View Composer
//!
//! Read-only derivations for the dashboard: the per-node sub-task buttons,
//! the active-mission banner and the mission navigator. Nothing here writes.

use crate::error::Result;
use crate::records::{
    ManifestNode, MissionState, MissionStatus, NodeId, NodeProgress, normalize_email, nodes_of,
};
use crate::store::RecordStore;
use serde::Serialize;
use std::collections::HashMap;

/// One sub-task button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SubtaskState {
    pub done: bool,
    /// A done sub-task can be reset
    pub undoable: bool,
    /// False when the node has no such sub-task (Has_Code / Has_Quiz)
    pub applicable: bool,
}

impl SubtaskState {
    fn new(done: bool, applicable: bool) -> Self {
        SubtaskState {
            done,
            undoable: done,
            applicable,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeDisplay {
    pub node_id: NodeId,
    pub read: SubtaskState,
    pub code: SubtaskState,
    pub quiz: SubtaskState,
    pub complete: bool,
}

/// Progress rows keyed by (pilot, node), built once per worksheet read
pub struct ProgressIndex {
    rows: HashMap<(String, NodeId), NodeProgress>,
}

impl ProgressIndex {
    pub fn build(rows: Vec<NodeProgress>) -> Self {
        let mut index = HashMap::with_capacity(rows.len());
        for row in rows {
            // First row wins, matching the reconciler.
            index
                .entry((row.email.clone(), row.node_id.clone()))
                .or_insert(row);
        }
        ProgressIndex { rows: index }
    }

    pub fn get(&self, email: &str, node_id: &NodeId) -> Option<&NodeProgress> {
        self.rows.get(&(email.to_string(), node_id.clone()))
    }

    /// Button states for one node; an untouched node has everything false
    pub fn display(&self, email: &str, node: &ManifestNode) -> NodeDisplay {
        let progress = self.get(email, &node.node_id);
        let (read, code, quiz, complete) = match progress {
            Some(p) => (p.blog_read, p.code_done, p.quiz_done, p.complete),
            None => (false, false, false, false),
        };

        NodeDisplay {
            node_id: node.node_id.clone(),
            read: SubtaskState::new(read, true),
            code: SubtaskState::new(code, node.has_code),
            quiz: SubtaskState::new(quiz, node.has_quiz),
            complete,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Briefing {
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActiveMission {
    pub mission_id: String,
    pub current_node: u32,
    pub total_nodes: u32,
    pub fraction: f64,
    /// The catalog entry at the cursor, if the catalog has one
    pub briefing: Option<Briefing>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum MissionBanner {
    Active(ActiveMission),
    NoActiveMission,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeListing {
    pub node_id: NodeId,
    pub title: String,
    pub url: String,
    pub display: NodeDisplay,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavigatorEntry {
    pub mission_id: String,
    pub nodes: Vec<NodeListing>,
}

pub struct ViewComposer<'a> {
    store: &'a RecordStore,
    default_total_nodes: u32,
}

impl<'a> ViewComposer<'a> {
    pub fn new(store: &'a RecordStore, default_total_nodes: u32) -> Self {
        ViewComposer {
            store,
            default_total_nodes: default_total_nodes.max(1),
        }
    }

    fn progress_index(&self) -> Result<ProgressIndex> {
        Ok(ProgressIndex::build(self.store.read_records()?))
    }

    /// Node count of a mission in the catalog, or the configured default
    pub fn total_nodes(&self, mission_id: &str) -> Result<u32> {
        let manifest: Vec<ManifestNode> = self.store.read_records()?;
        Ok(total_from(&manifest, mission_id, self.default_total_nodes))
    }

    pub fn node_display_state(&self, pilot_email: &str, node: &ManifestNode) -> Result<NodeDisplay> {
        let email = normalize_email(pilot_email);
        Ok(self.progress_index()?.display(&email, node))
    }

    /// The pilot's mission state row, whatever its status
    pub fn mission_state(&self, pilot_email: &str) -> Result<Option<MissionState>> {
        let email = normalize_email(pilot_email);
        let states: Vec<MissionState> = self.store.read_records()?;
        Ok(states.into_iter().find(|s| s.email == email))
    }

    pub fn mission_banner(&self, pilot_email: &str) -> Result<MissionBanner> {
        let state = match self.mission_state(pilot_email)? {
            Some(s) if s.status == MissionStatus::Active => s,
            _ => return Ok(MissionBanner::NoActiveMission),
        };

        let manifest: Vec<ManifestNode> = self.store.read_records()?;
        let total_nodes = total_from(&manifest, &state.mission_id, self.default_total_nodes);
        let briefing = nodes_of(&manifest, &state.mission_id)
            .get(state.current_node as usize - 1)
            .map(|n| Briefing {
                title: n.title.clone(),
                url: n.url.clone(),
            });

        Ok(MissionBanner::Active(ActiveMission {
            fraction: (state.current_node as f64 / total_nodes as f64).min(1.0),
            mission_id: state.mission_id,
            current_node: state.current_node,
            total_nodes,
            briefing,
        }))
    }

    /// Every mission in catalog order, each with its nodes and the pilot's
    /// button states
    pub fn navigator(&self, pilot_email: &str) -> Result<Vec<NavigatorEntry>> {
        let email = normalize_email(pilot_email);
        let manifest: Vec<ManifestNode> = self.store.read_records()?;
        let index = self.progress_index()?;

        let mut mission_ids: Vec<&str> = Vec::new();
        for node in &manifest {
            if !mission_ids.contains(&node.mission_id.as_str()) {
                mission_ids.push(&node.mission_id);
            }
        }

        Ok(mission_ids
            .into_iter()
            .map(|mission_id| NavigatorEntry {
                mission_id: mission_id.to_string(),
                nodes: nodes_of(&manifest, mission_id)
                    .into_iter()
                    .map(|node| NodeListing {
                        node_id: node.node_id.clone(),
                        title: node.title.clone(),
                        url: node.url.clone(),
                        display: index.display(&email, node),
                    })
                    .collect(),
            })
            .collect())
    }
}

fn total_from(manifest: &[ManifestNode], mission_id: &str, default_total: u32) -> u32 {
    match nodes_of(manifest, mission_id).len() {
        0 => default_total,
        n => n as u32,
    }
}
