/*!
# Launchpad

A learning-progress tracker over a spreadsheet-backed workbook.

## Overview

A pilot logs in, picks a mission (an ordered list of nodes), ticks off the
sub-tasks of each node (reading, coding exercise, quiz) and advances a
mission-level cursor. All state lives in four worksheets of one workbook,
read and written whole.

## Architecture

### Record Store Adapter
- `read_table` / `write_table` against `User_Registry`, `Mission_Manifest`,
  `User_Missions` and `Node_Analytics`
- Optional TTL cache in front of reads, cleared on every successful write
- Backends: in-memory, or a gzip-compressed bincode workbook file

### Progress Reconciler
- Sets and resets per-node flags, keeping `Complete` equal to the AND of the
  three sub-tasks
- Advances the mission cursor, saturating at the last node
- Starts or switches missions, one mission row per pilot

### View Composer
- Sub-task button states, active mission banner, mission navigator

## Known limitation

Writes replace whole worksheets with no version check. Two sessions that
read, modify and write the same worksheet concurrently lose the earlier
write. See the `concurrency` integration tests.

## Modules

- **records**: typed rows, node id normalisation, boolean coercion
- **store**: record store adapter and backends
- **cache**: TTL worksheet cache
- **saving**: workbook file persistence
- **loader**: CSV import (mission manifest)
- **downloader**: CSV and XLSX export
- **login**: pilot registration and credential checks
- **reconciler**: progress state transitions
- **view**: read-side derivations for the dashboard
- **config**: TOML configuration
- **app**: command parsing and the dashboard session
*/

pub mod app;
pub mod cache;
pub mod config;
pub mod downloader;
pub mod error;
pub mod loader;
pub mod login;
pub mod reconciler;
pub mod records;
pub mod saving;
pub mod store;
pub mod view;

pub use error::{LaunchpadError, Result, StoreError};
pub use reconciler::{AdvanceOutcome, ProgressReconciler};
pub use records::{
    ManifestNode, MissionState, MissionStatus, NodeId, NodeProgress, Pilot, ProgressFlag, Row,
    TableName,
};
pub use store::{MemoryBackend, RecordStore, Sheet, TableBackend};
pub use view::{MissionBanner, ViewComposer};
