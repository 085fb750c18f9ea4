#![allow(dead_code)]

use launchpad::records::{ManifestNode, NodeId};
use launchpad::store::{MemoryBackend, RecordStore};
use std::sync::Arc;

pub const PILOT: &str = "a@x.com";

fn node(mission: &str, id: u32, title: &str, has_code: bool, has_quiz: bool) -> ManifestNode {
    ManifestNode {
        mission_id: mission.to_string(),
        node_id: NodeId::from(id),
        title: title.to_string(),
        url: format!("https://projectaiml.com/{}-{:02}", mission.to_lowercase(), id),
        order: id as i64,
        has_code,
        has_quiz,
    }
}

/// FOUNDATION has five nodes, ARCHITECT two (the second without a quiz)
pub fn manifest() -> Vec<ManifestNode> {
    vec![
        node("FOUNDATION", 1, "Python Basics", true, true),
        node("FOUNDATION", 2, "Pandas Intro", true, true),
        node("FOUNDATION", 3, "Data Viz", true, true),
        node("FOUNDATION", 4, "EDA", true, true),
        node("FOUNDATION", 5, "Foundation Exam", false, true),
        node("ARCHITECT", 2, "Optimisation", true, false),
        node("ARCHITECT", 1, "Linear Regression", true, true),
    ]
}

/// A store over a fresh in-memory workbook with the manifest loaded
pub fn seeded_store() -> (MemoryBackend, RecordStore) {
    let backend = MemoryBackend::new();
    let store = RecordStore::new(Arc::new(backend.clone()));
    store
        .write_records(&manifest())
        .expect("seeding the manifest should succeed");
    (backend, store)
}
