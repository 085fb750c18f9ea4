use crate::error::{LaunchpadError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One worksheet row, column header to cell text
///
/// The backing spreadsheet has no native types, so every cell travels as
/// text and the typed records below do the parsing.
pub type Row = BTreeMap<String, String>;

/// Timestamp layout used in Join_Date and Last_Update cells
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn timestamp_now() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// The four worksheets of the launchpad workbook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TableName {
    UserRegistry,
    MissionManifest,
    UserMissions,
    NodeAnalytics,
}

impl TableName {
    pub const ALL: [TableName; 4] = [
        TableName::UserRegistry,
        TableName::MissionManifest,
        TableName::UserMissions,
        TableName::NodeAnalytics,
    ];

    /// Worksheet title as it appears in the workbook
    pub fn as_str(&self) -> &'static str {
        match self {
            TableName::UserRegistry => "User_Registry",
            TableName::MissionManifest => "Mission_Manifest",
            TableName::UserMissions => "User_Missions",
            TableName::NodeAnalytics => "Node_Analytics",
        }
    }

    /// Canonical column order, used when a worksheet is written out or exported
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            TableName::UserRegistry => &[
                "Full_Name",
                "Email",
                "Password_Hash",
                "Clearance",
                "Join_Date",
            ],
            TableName::MissionManifest => &[
                "Mission_ID",
                "Node_ID",
                "Node_Title",
                "URL",
                "Order",
                "Has_Code",
                "Has_Quiz",
            ],
            TableName::UserMissions => &[
                "Email",
                "Mission_ID",
                "Current_Node",
                "Status",
                "Last_Update",
            ],
            TableName::NodeAnalytics => &[
                "Email",
                "Mission_ID",
                "Node_ID",
                "Blog_Read",
                "Code_Done",
                "Quiz_Done",
                "Complete",
            ],
        }
    }

    pub fn from_sheet_name(name: &str) -> Option<Self> {
        TableName::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Node identifier in canonical string form
///
/// Spreadsheet cells hand node ids back as `3`, `"3"` or `3.0` depending on
/// who typed them; all three compare equal once normalised.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(String);

impl NodeId {
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(LaunchpadError::validation("node id", "node id is empty"));
        }

        match parse_whole_number(trimmed) {
            Some(n) => Ok(NodeId(n.to_string())),
            None => Ok(NodeId(trimmed.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<u32> for NodeId {
    fn from(n: u32) -> Self {
        NodeId(n.to_string())
    }
}

impl From<i64> for NodeId {
    fn from(n: i64) -> Self {
        NodeId(n.to_string())
    }
}

impl TryFrom<&str> for NodeId {
    type Error = LaunchpadError;

    fn try_from(raw: &str) -> Result<Self> {
        NodeId::parse(raw)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parse `"4"`, `"4.0"` or `" 4 "` as a whole number
pub fn parse_whole_number(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    if let Ok(n) = trimmed.parse::<i64>() {
        return Some(n);
    }
    let f = trimmed.parse::<f64>().ok()?;
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
        Some(f as i64)
    } else {
        None
    }
}

const TRUE_TOKENS: [&str; 4] = ["true", "1", "1.0", "yes"];
const FALSE_TOKENS: [&str; 6] = ["", "false", "0", "0.0", "no", "nan"];

/// Read a checkbox cell. Anything not recognisably true is false.
pub fn coerce_bool(raw: &str) -> bool {
    let lowered = raw.trim().to_ascii_lowercase();
    TRUE_TOKENS.contains(&lowered.as_str())
}

/// Whether a cell holds one of the recognised boolean spellings
pub fn is_bool_token(raw: &str) -> bool {
    let lowered = raw.trim().to_ascii_lowercase();
    TRUE_TOKENS.contains(&lowered.as_str()) || FALSE_TOKENS.contains(&lowered.as_str())
}

pub fn bool_cell(value: bool) -> String {
    let text = if value { "TRUE" } else { "FALSE" };
    text.to_string()
}

pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Clearance cell; anything unparseable or below 1 counts as level 1
pub fn parse_clearance(raw: &str) -> u32 {
    match parse_whole_number(raw) {
        Some(n) if n >= 1 && n <= u32::MAX as i64 => n as u32,
        _ => 1,
    }
}

fn cell<'a>(row: &'a Row, column: &str) -> &'a str {
    row.get(column).map(|s| s.as_str()).unwrap_or("")
}

fn required<'a>(row: &'a Row, column: &str, table: TableName, index: usize) -> Result<&'a str> {
    let value = cell(row, column).trim();
    if value.is_empty() {
        return Err(LaunchpadError::validation(
            column,
            format!("row {} of {} has no {}", index + 1, table, column),
        ));
    }
    Ok(value)
}

/// A typed view over one worksheet's rows
pub trait Record: Sized {
    const TABLE: TableName;

    fn from_row(row: &Row, index: usize) -> Result<Self>;

    fn to_row(&self) -> Row;
}

fn row_from(pairs: Vec<(&str, String)>) -> Row {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

/// A registered user of the tracker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pilot {
    pub full_name: String,
    pub email: String,
    pub password_hash: String,
    pub clearance: u32,
    pub join_date: String,
}

impl Record for Pilot {
    const TABLE: TableName = TableName::UserRegistry;

    fn from_row(row: &Row, index: usize) -> Result<Self> {
        Ok(Pilot {
            full_name: cell(row, "Full_Name").trim().to_string(),
            email: normalize_email(required(row, "Email", Self::TABLE, index)?),
            password_hash: cell(row, "Password_Hash").trim().to_string(),
            clearance: parse_clearance(cell(row, "Clearance")),
            join_date: cell(row, "Join_Date").to_string(),
        })
    }

    fn to_row(&self) -> Row {
        row_from(vec![
            ("Full_Name", self.full_name.clone()),
            ("Email", self.email.clone()),
            ("Password_Hash", self.password_hash.clone()),
            ("Clearance", self.clearance.to_string()),
            ("Join_Date", self.join_date.clone()),
        ])
    }
}

/// One step of a mission, as curated in the manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestNode {
    pub mission_id: String,
    pub node_id: NodeId,
    pub title: String,
    pub url: String,
    pub order: i64,
    pub has_code: bool,
    pub has_quiz: bool,
}

// Absent or blank capability cells mean the sub-task applies.
fn capability(row: &Row, column: &str) -> bool {
    let raw = cell(row, column);
    raw.trim().is_empty() || coerce_bool(raw)
}

impl Record for ManifestNode {
    const TABLE: TableName = TableName::MissionManifest;

    fn from_row(row: &Row, index: usize) -> Result<Self> {
        let title = match cell(row, "Node_Title").trim() {
            "" => cell(row, "Title").trim(),
            t => t,
        };
        let order = parse_whole_number(cell(row, "Order")).unwrap_or(index as i64 + 1);

        Ok(ManifestNode {
            mission_id: required(row, "Mission_ID", Self::TABLE, index)?.to_string(),
            node_id: NodeId::parse(required(row, "Node_ID", Self::TABLE, index)?)?,
            title: title.to_string(),
            url: cell(row, "URL").trim().to_string(),
            order,
            has_code: capability(row, "Has_Code"),
            has_quiz: capability(row, "Has_Quiz"),
        })
    }

    fn to_row(&self) -> Row {
        row_from(vec![
            ("Mission_ID", self.mission_id.clone()),
            ("Node_ID", self.node_id.to_string()),
            ("Node_Title", self.title.clone()),
            ("URL", self.url.clone()),
            ("Order", self.order.to_string()),
            ("Has_Code", bool_cell(self.has_code)),
            ("Has_Quiz", bool_cell(self.has_quiz)),
        ])
    }
}

/// A mission's nodes from the catalog, in `Order`
pub fn nodes_of<'m>(manifest: &'m [ManifestNode], mission_id: &str) -> Vec<&'m ManifestNode> {
    let mut nodes: Vec<&ManifestNode> = manifest
        .iter()
        .filter(|n| n.mission_id == mission_id)
        .collect();
    nodes.sort_by_key(|n| n.order);
    nodes
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MissionStatus {
    Active,
    Completed,
}

impl MissionStatus {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(MissionStatus::Active),
            "completed" => Ok(MissionStatus::Completed),
            other => Err(LaunchpadError::validation(
                "Status",
                format!("unknown mission status '{}'", other),
            )),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MissionStatus::Active => "Active",
            MissionStatus::Completed => "Completed",
        }
    }
}

impl fmt::Display for MissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single mission cursor a pilot holds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionState {
    pub email: String,
    pub mission_id: String,
    pub current_node: u32,
    pub status: MissionStatus,
    pub last_update: String,
}

impl MissionState {
    pub fn start(email: &str, mission_id: &str) -> Self {
        MissionState {
            email: email.to_string(),
            mission_id: mission_id.to_string(),
            current_node: 1,
            status: MissionStatus::Active,
            last_update: timestamp_now(),
        }
    }
}

impl Record for MissionState {
    const TABLE: TableName = TableName::UserMissions;

    fn from_row(row: &Row, index: usize) -> Result<Self> {
        let raw_node = required(row, "Current_Node", Self::TABLE, index)?;
        let current_node = match parse_whole_number(raw_node) {
            Some(n) if n >= 1 && n <= u32::MAX as i64 => n as u32,
            _ => {
                return Err(LaunchpadError::validation(
                    "Current_Node",
                    format!("'{}' is not a node number", raw_node),
                ));
            }
        };

        Ok(MissionState {
            email: normalize_email(required(row, "Email", Self::TABLE, index)?),
            mission_id: required(row, "Mission_ID", Self::TABLE, index)?.to_string(),
            current_node,
            status: MissionStatus::parse(cell(row, "Status"))?,
            last_update: cell(row, "Last_Update").to_string(),
        })
    }

    fn to_row(&self) -> Row {
        row_from(vec![
            ("Email", self.email.clone()),
            ("Mission_ID", self.mission_id.clone()),
            ("Current_Node", self.current_node.to_string()),
            ("Status", self.status.to_string()),
            ("Last_Update", self.last_update.clone()),
        ])
    }
}

/// The three trackable sub-tasks of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProgressFlag {
    BlogRead,
    CodeDone,
    QuizDone,
}

impl ProgressFlag {
    pub const ALL: [ProgressFlag; 3] = [
        ProgressFlag::BlogRead,
        ProgressFlag::CodeDone,
        ProgressFlag::QuizDone,
    ];

    pub fn column(&self) -> &'static str {
        match self {
            ProgressFlag::BlogRead => "Blog_Read",
            ProgressFlag::CodeDone => "Code_Done",
            ProgressFlag::QuizDone => "Quiz_Done",
        }
    }

    /// Accepts the column name in any case, or the short button names
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "blog_read" | "read" | "blog" => Ok(ProgressFlag::BlogRead),
            "code_done" | "code" => Ok(ProgressFlag::CodeDone),
            "quiz_done" | "quiz" => Ok(ProgressFlag::QuizDone),
            other => Err(LaunchpadError::validation(
                "flag",
                format!("unknown sub-task '{}'", other),
            )),
        }
    }
}

impl fmt::Display for ProgressFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// Granular progress for one (pilot, node) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeProgress {
    pub email: String,
    pub mission_id: String,
    pub node_id: NodeId,
    pub blog_read: bool,
    pub code_done: bool,
    pub quiz_done: bool,
    pub complete: bool,
}

impl NodeProgress {
    pub fn new(email: &str, mission_id: &str, node_id: NodeId) -> Self {
        NodeProgress {
            email: email.to_string(),
            mission_id: mission_id.to_string(),
            node_id,
            blog_read: false,
            code_done: false,
            quiz_done: false,
            complete: false,
        }
    }

    pub fn flag(&self, flag: ProgressFlag) -> bool {
        match flag {
            ProgressFlag::BlogRead => self.blog_read,
            ProgressFlag::CodeDone => self.code_done,
            ProgressFlag::QuizDone => self.quiz_done,
        }
    }

    /// Set one sub-task and re-derive `complete`
    pub fn set_flag(&mut self, flag: ProgressFlag, value: bool) {
        match flag {
            ProgressFlag::BlogRead => self.blog_read = value,
            ProgressFlag::CodeDone => self.code_done = value,
            ProgressFlag::QuizDone => self.quiz_done = value,
        }
        self.recompute();
    }

    pub fn recompute(&mut self) {
        self.complete = self.blog_read && self.code_done && self.quiz_done;
    }

    pub fn matches(&self, email: &str, node_id: &NodeId) -> bool {
        self.email == email && &self.node_id == node_id
    }
}

impl Record for NodeProgress {
    const TABLE: TableName = TableName::NodeAnalytics;

    fn from_row(row: &Row, index: usize) -> Result<Self> {
        let mut progress = NodeProgress {
            email: normalize_email(required(row, "Email", Self::TABLE, index)?),
            mission_id: cell(row, "Mission_ID").trim().to_string(),
            node_id: NodeId::parse(required(row, "Node_ID", Self::TABLE, index)?)?,
            blog_read: coerce_bool(cell(row, "Blog_Read")),
            code_done: coerce_bool(cell(row, "Code_Done")),
            quiz_done: coerce_bool(cell(row, "Quiz_Done")),
            complete: false,
        };
        // The stored Complete cell is derived; the three flags are authoritative.
        progress.recompute();
        Ok(progress)
    }

    fn to_row(&self) -> Row {
        row_from(vec![
            ("Email", self.email.clone()),
            ("Mission_ID", self.mission_id.clone()),
            ("Node_ID", self.node_id.to_string()),
            ("Blog_Read", bool_cell(self.blog_read)),
            ("Code_Done", bool_cell(self.code_done)),
            ("Quiz_Done", bool_cell(self.quiz_done)),
            ("Complete", bool_cell(self.complete)),
        ])
    }
}
