mod common;

use common::seeded_store;
use launchpad::app::{Command, Launchpad};
use launchpad::config::LaunchpadConfig;
use launchpad::records::{ManifestNode, MissionState, MissionStatus, NodeId, ProgressFlag};
use launchpad::{LaunchpadError, RecordStore};
use std::fs;
use tempfile::tempdir;

fn session() -> Launchpad {
    let (_, store) = seeded_store();
    Launchpad::with_store(store, LaunchpadConfig::default())
}

fn logged_in() -> Launchpad {
    let mut launchpad = session();
    launchpad.execute_line("register ada@x.com hunter2 Ada Lovelace");
    let reply = launchpad.execute_line("login ada@x.com hunter2");
    assert_eq!(reply.message, "Welcome back, Ada Lovelace (Level 1 Cadet)");
    launchpad
}

fn mission_state(store: &RecordStore) -> MissionState {
    let mut states: Vec<MissionState> = store.read_records().unwrap();
    assert_eq!(states.len(), 1);
    states.remove(0)
}

#[test]
fn test_command_parsing() {
    assert_eq!(
        Command::parse("read FOUNDATION 3.0").unwrap(),
        Command::Mark {
            flag: ProgressFlag::BlogRead,
            mission_id: "FOUNDATION".to_string(),
            node_id: NodeId::from(3u32),
        }
    );
    assert_eq!(
        Command::parse("undo code 2").unwrap(),
        Command::Undo {
            flag: ProgressFlag::CodeDone,
            node_id: NodeId::from(2u32),
        }
    );
    assert_eq!(
        Command::parse("register a@x.com pw Grace Brewster Hopper").unwrap(),
        Command::Register {
            email: "a@x.com".to_string(),
            password: "pw".to_string(),
            full_name: "Grace Brewster Hopper".to_string(),
        }
    );
    assert_eq!(
        Command::parse("STATUS --json").unwrap(),
        Command::Status { json: true }
    );
    assert_eq!(Command::parse("exit").unwrap(), Command::Quit);
    println!("✓ Commands parse with their arguments");
}

#[test]
fn test_command_parse_errors() {
    for line in ["", "   ", "fly", "login a@x.com", "start", "undo read", "quiz 1"] {
        assert!(
            matches!(Command::parse(line), Err(LaunchpadError::Validation { .. })),
            "expected a usage error for {:?}",
            line
        );
    }
    println!("✓ Malformed commands are validation errors");
}

#[test]
fn test_commands_need_a_pilot() {
    let mut launchpad = session();
    for line in ["start FOUNDATION", "read FOUNDATION 1", "advance", "status", "nav"] {
        let reply = launchpad.execute_line(line);
        assert_eq!(reply.message, "error: invalid session: log in first", "{}", line);
    }
    println!("✓ Progress commands refuse to run without a login");
}

#[test]
fn test_bad_login_keeps_guest_session() {
    let mut launchpad = session();
    launchpad.execute_line("register ada@x.com hunter2 Ada");

    let reply = launchpad.execute_line("login ada@x.com wrong");
    assert_eq!(reply.message, "Invalid credentials");
    assert!(launchpad.pilot().is_none());
    println!("✓ Wrong password leaves the session logged out");
}

#[test]
fn test_full_flight() {
    let mut launchpad = logged_in();

    let reply = launchpad.execute_line("start ARCHITECT");
    assert_eq!(reply.message, "Mission ARCHITECT initialised at node 1");

    launchpad.execute_line("read ARCHITECT 1");
    launchpad.execute_line("code ARCHITECT 1");
    let reply = launchpad.execute_line("quiz ARCHITECT 1");
    assert_eq!(reply.message, "Synced Quiz_Done for node 1 (node complete)");

    let status = launchpad.execute_line("status").message;
    assert!(status.contains("Active Mission: ARCHITECT"));
    assert!(status.contains("Node 1 of 2"));
    assert!(status.contains("Linear Regression"));

    let reply = launchpad.execute_line("advance");
    assert_eq!(reply.message, "Advancing to node 2 of 2");
    assert!(!reply.celebrate);

    let reply = launchpad.execute_line("advance");
    assert!(reply.celebrate);
    assert_eq!(mission_state(launchpad.store()).status, MissionStatus::Completed);

    let reply = launchpad.execute_line("advance");
    assert!(!reply.celebrate);
    assert_eq!(reply.message, "Mission ARCHITECT is already complete");

    let state = mission_state(launchpad.store());
    assert_eq!(state.current_node, 2);
    println!("✓ Register, fly and complete a mission; celebration fires once");
}

#[test]
fn test_undo_and_navigator() {
    let mut launchpad = logged_in();
    launchpad.execute_line("read FOUNDATION 5");

    let nav = launchpad.execute_line("nav").message;
    assert!(nav.contains("Protocol: FOUNDATION"));
    assert!(nav.contains("[5] Foundation Exam | read: done | code: n/a | quiz: open"));

    let reply = launchpad.execute_line("undo read 5");
    assert_eq!(reply.message, "Reset Blog_Read for node 5");
    let reply = launchpad.execute_line("undo quiz 4");
    assert_eq!(reply.message, "Node 4 has no progress to reset");

    let json = launchpad.execute_line("nav --json").message;
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed[0]["mission_id"], "FOUNDATION");
    assert_eq!(parsed[0]["nodes"][4]["display"]["read"]["done"], false);
    println!("✓ Undo clears a sub-task; navigator renders as text and JSON");
}

#[test]
fn test_status_without_mission() {
    let mut launchpad = logged_in();
    let status = launchpad.execute_line("status").message;
    assert!(status.starts_with("Select a mission"));

    let reply = launchpad.execute_line("advance");
    assert!(reply.message.starts_with("error: active mission not found"));
    println!("✓ No mission row: banner invites a pick, advance errors");
}

#[test]
fn test_legacy_mission_advances_on_default_total() {
    let mut launchpad = logged_in();
    launchpad
        .store()
        .write_records(&[MissionState {
            email: "ada@x.com".to_string(),
            mission_id: "LEGACY".to_string(),
            current_node: 4,
            status: MissionStatus::Active,
            last_update: String::new(),
        }])
        .unwrap();

    assert!(launchpad.execute_line("status").message.contains("Node 4 of 5"));
    let reply = launchpad.execute_line("advance");
    assert_eq!(reply.message, "Advancing to node 5 of 5");
    let reply = launchpad.execute_line("advance");
    assert!(reply.celebrate);
    assert_eq!(mission_state(launchpad.store()).status, MissionStatus::Completed);
    println!("✓ A mission missing from the manifest finishes on the default total");
}

#[test]
fn test_unknown_mission_is_rejected() {
    let mut launchpad = logged_in();
    let reply = launchpad.execute_line("start ASTRONAUT");
    assert_eq!(reply.message, "error: mission not found: ASTRONAUT");
    assert!(launchpad.store().read_records::<MissionState>().unwrap().is_empty());
    println!("✓ Starting a mission outside the catalog writes nothing");
}

#[test]
fn test_manifest_import() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("manifest.csv");
    fs::write(
        &path,
        "Mission_ID,Node_ID,Node_Title,URL,Order,Has_Code,Has_Quiz\n\
         DEPLOY,2,\"Docker, part 2\",https://projectaiml.com/docker-2,2,TRUE,\n\
         DEPLOY,1,Docker,https://projectaiml.com/docker-1,1,FALSE,TRUE\n",
    )
    .unwrap();

    let mut launchpad = logged_in();
    let reply = launchpad.execute_line(&format!("import {}", path.display()));
    assert_eq!(reply.message, "Imported 2 manifest nodes");

    let catalog: Vec<ManifestNode> = launchpad.store().read_records().unwrap();
    assert_eq!(catalog.len(), 2);
    assert_eq!(catalog[0].title, "Docker, part 2");
    assert!(catalog[0].has_quiz);
    assert!(!catalog[1].has_code);

    let reply = launchpad.execute_line("start DEPLOY");
    assert_eq!(reply.message, "Mission DEPLOY initialised at node 1");
    assert!(launchpad.execute_line("status").message.contains("Node 1 of 2"));
    println!("✓ CSV manifest import replaces the catalog");
}

#[test]
fn test_invalid_manifest_import_writes_nothing() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("manifest.csv");
    fs::write(&path, "Mission_ID,Node_ID\nDEPLOY,1\n,2\n").unwrap();

    let mut launchpad = logged_in();
    let reply = launchpad.execute_line(&format!("import {}", path.display()));
    assert!(reply.message.starts_with("error: invalid Mission_ID"));

    let catalog: Vec<ManifestNode> = launchpad.store().read_records().unwrap();
    assert_eq!(catalog.len(), common::manifest().len());
    println!("✓ A bad manifest row aborts the import");
}

#[test]
fn test_csv_export() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("missions.csv");

    let mut launchpad = logged_in();
    launchpad.execute_line("start FOUNDATION");
    let reply = launchpad.execute_line(&format!("export user_missions {}", path.display()));
    assert!(reply.message.starts_with("User_Missions exported to"));

    let csv = fs::read_to_string(&path).unwrap();
    let mut lines = csv.lines();
    assert_eq!(
        lines.next(),
        Some("Email,Mission_ID,Current_Node,Status,Last_Update")
    );
    assert!(lines.next().unwrap().starts_with("ada@x.com,FOUNDATION,1,Active,"));

    let reply = launchpad.execute_line(&format!("export Nowhere {}", path.display()));
    assert_eq!(reply.message, "error: worksheet not found: Nowhere");
    println!("✓ Worksheets export as CSV");
}

#[cfg(feature = "xlsx")]
#[test]
fn test_xlsx_export() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("launchpad.xlsx");

    let mut launchpad = logged_in();
    let reply = launchpad.execute_line(&format!("export xlsx {}", path.display()));
    assert!(reply.message.starts_with("Workbook exported to"));

    let bytes = fs::read(&path).unwrap();
    // XLSX files are zip archives.
    assert_eq!(&bytes[..2], b"PK");
    println!("✓ Whole workbook exports as XLSX");
}

#[test]
fn test_quit_and_logout() {
    let mut launchpad = logged_in();
    assert!(launchpad.execute_line("logout").message == "Logged out");
    assert!(launchpad.pilot().is_none());
    assert!(launchpad.execute_line("quit").quit);
    println!("✓ Logout clears the pilot; quit ends the loop");
}
