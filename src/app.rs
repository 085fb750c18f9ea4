use crate::cache::TableCache;
use crate::config::{BackendKind, LaunchpadConfig};
use crate::downloader;
use crate::error::{LaunchpadError, Result};
use crate::loader;
use crate::login;
use crate::reconciler::{AdvanceOutcome, ProgressReconciler};
use crate::records::{NodeId, Pilot, ProgressFlag, TableName};
use crate::saving::WorkbookFile;
use crate::store::{MemoryBackend, RecordStore, TableBackend};
use crate::view::{MissionBanner, NavigatorEntry, SubtaskState, ViewComposer};
use log::info;
use std::fs;
use std::sync::Arc;

/// A dashboard command, parsed from one input line
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Register {
        email: String,
        password: String,
        full_name: String,
    },
    Login {
        email: String,
        password: String,
    },
    Logout,
    Start {
        mission_id: String,
    },
    Mark {
        flag: ProgressFlag,
        mission_id: String,
        node_id: NodeId,
    },
    Undo {
        flag: ProgressFlag,
        node_id: NodeId,
    },
    Advance,
    Status {
        json: bool,
    },
    Navigator {
        json: bool,
    },
    Import {
        path: String,
    },
    Export {
        target: String,
        path: String,
    },
    Help,
    Quit,
}

pub const HELP: &str = "\
Commands:
  register <email> <password> <full name>   register a new pilot
  login <email> <password>                  authorise entry
  logout                                    end the session
  start <mission>                           start or switch mission (cursor resets to 1)
  read|code|quiz <mission> <node>           mark a sub-task done
  undo <read|code|quiz> <node>              reset a sub-task
  advance                                   mark the current node complete
  status [--json]                           active mission banner
  nav [--json]                              mission navigator
  import <manifest.csv>                     replace the mission manifest
  export <worksheet|xlsx> <path>            export a worksheet as CSV, or the workbook as XLSX
  help                                      this text
  quit                                      leave";

fn usage(text: &str) -> LaunchpadError {
    LaunchpadError::validation("command", format!("usage: {}", text))
}

impl Command {
    pub fn parse(line: &str) -> Result<Self> {
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some((&head, args)) = words.split_first() else {
            return Err(LaunchpadError::validation("command", "empty command"));
        };
        let json = args.contains(&"--json");

        match head.to_ascii_lowercase().as_str() {
            "register" if args.len() >= 3 => Ok(Command::Register {
                email: args[0].to_string(),
                password: args[1].to_string(),
                full_name: args[2..].join(" "),
            }),
            "register" => Err(usage("register <email> <password> <full name>")),
            "login" if args.len() == 2 => Ok(Command::Login {
                email: args[0].to_string(),
                password: args[1].to_string(),
            }),
            "login" => Err(usage("login <email> <password>")),
            "logout" => Ok(Command::Logout),
            "start" if args.len() == 1 => Ok(Command::Start {
                mission_id: args[0].to_string(),
            }),
            "start" => Err(usage("start <mission>")),
            word @ ("read" | "code" | "quiz") if args.len() == 2 => Ok(Command::Mark {
                flag: ProgressFlag::parse(word)?,
                mission_id: args[0].to_string(),
                node_id: NodeId::parse(args[1])?,
            }),
            "read" | "code" | "quiz" => Err(usage("read|code|quiz <mission> <node>")),
            "undo" if args.len() == 2 => Ok(Command::Undo {
                flag: ProgressFlag::parse(args[0])?,
                node_id: NodeId::parse(args[1])?,
            }),
            "undo" => Err(usage("undo <read|code|quiz> <node>")),
            "advance" => Ok(Command::Advance),
            "status" => Ok(Command::Status { json }),
            "nav" => Ok(Command::Navigator { json }),
            "import" if args.len() == 1 => Ok(Command::Import {
                path: args[0].to_string(),
            }),
            "import" => Err(usage("import <manifest.csv>")),
            "export" if args.len() == 2 => Ok(Command::Export {
                target: args[0].to_string(),
                path: args[1].to_string(),
            }),
            "export" => Err(usage("export <worksheet|xlsx> <path>")),
            "help" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            other => Err(LaunchpadError::validation(
                "command",
                format!("unknown command '{}'", other),
            )),
        }
    }
}

/// What the dashboard should show after a command
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub message: String,
    /// Set once, on the command that completed a mission
    pub celebrate: bool,
    pub quit: bool,
}

impl Reply {
    fn text(message: impl Into<String>) -> Self {
        Reply {
            message: message.into(),
            celebrate: false,
            quit: false,
        }
    }
}

/// One dashboard session over the launchpad workbook
pub struct Launchpad {
    store: RecordStore,
    config: LaunchpadConfig,
    pilot: Option<Pilot>,
}

impl Launchpad {
    /// Open the backend the configuration names
    pub fn open(config: LaunchpadConfig) -> Result<Self> {
        let backend: Arc<dyn TableBackend> = match config.store.backend {
            BackendKind::Memory => Arc::new(MemoryBackend::new()),
            BackendKind::Workbook => Arc::new(WorkbookFile::new(config.store.path.clone())),
        };
        let store = match config.cache_ttl() {
            Some(ttl) => RecordStore::with_cache(backend, Arc::new(TableCache::new(ttl))),
            None => RecordStore::new(backend),
        };
        info!("launchpad opened with {:?} backend", config.store.backend);
        Ok(Launchpad::with_store(store, config))
    }

    pub fn with_store(store: RecordStore, config: LaunchpadConfig) -> Self {
        Launchpad {
            store,
            config,
            pilot: None,
        }
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn pilot(&self) -> Option<&Pilot> {
        self.pilot.as_ref()
    }

    fn pilot_email(&self) -> Result<String> {
        self.pilot
            .as_ref()
            .map(|p| p.email.clone())
            .ok_or_else(|| LaunchpadError::validation("session", "log in first"))
    }

    fn composer(&self) -> ViewComposer<'_> {
        ViewComposer::new(&self.store, self.config.missions.default_total_nodes)
    }

    /// Parse and run one line. Errors become the reply text; the session
    /// stays usable either way.
    pub fn execute_line(&mut self, line: &str) -> Reply {
        match Command::parse(line).and_then(|cmd| self.execute(cmd)) {
            Ok(reply) => reply,
            Err(e) => Reply::text(format!("error: {}", e)),
        }
    }

    pub fn execute(&mut self, command: Command) -> Result<Reply> {
        match command {
            Command::Register {
                email,
                password,
                full_name,
            } => {
                let pilot = login::register_pilot(
                    &self.store,
                    &full_name,
                    &email,
                    &password,
                    self.config.auth.password_scheme,
                )?;
                Ok(Reply::text(format!(
                    "Pilot {} registered. You can now log in.",
                    pilot.email
                )))
            }
            Command::Login { email, password } => {
                match login::authenticate(&self.store, &email, &password)? {
                    Some(pilot) => {
                        let message = format!(
                            "Welcome back, {} (Level {} Cadet)",
                            pilot.full_name, pilot.clearance
                        );
                        self.pilot = Some(pilot);
                        Ok(Reply::text(message))
                    }
                    None => Ok(Reply::text("Invalid credentials")),
                }
            }
            Command::Logout => {
                self.pilot = None;
                Ok(Reply::text("Logged out"))
            }
            Command::Start { mission_id } => {
                let email = self.pilot_email()?;
                let state =
                    ProgressReconciler::new(&self.store).start_or_switch_mission(&email, &mission_id)?;
                Ok(Reply::text(format!(
                    "Mission {} initialised at node {}",
                    state.mission_id, state.current_node
                )))
            }
            Command::Mark {
                flag,
                mission_id,
                node_id,
            } => {
                let email = self.pilot_email()?;
                let progress = ProgressReconciler::new(&self.store)
                    .set_node_flag(&email, &mission_id, &node_id, flag, true)?;
                let suffix = if progress.complete { " (node complete)" } else { "" };
                Ok(Reply::text(format!("Synced {} for node {}{}", flag, node_id, suffix)))
            }
            Command::Undo { flag, node_id } => {
                let email = self.pilot_email()?;
                match ProgressReconciler::new(&self.store).reset_node_flag(&email, &node_id, flag)? {
                    Some(_) => Ok(Reply::text(format!("Reset {} for node {}", flag, node_id))),
                    None => Ok(Reply::text(format!("Node {} has no progress to reset", node_id))),
                }
            }
            Command::Advance => self.advance(),
            Command::Status { json } => {
                let email = self.pilot_email()?;
                let banner = self.composer().mission_banner(&email)?;
                if json {
                    return Ok(Reply::text(to_json(&banner)?));
                }
                Ok(Reply::text(render_banner(&banner)))
            }
            Command::Navigator { json } => {
                let email = self.pilot_email()?;
                let entries = self.composer().navigator(&email)?;
                if json {
                    return Ok(Reply::text(to_json(&entries)?));
                }
                Ok(Reply::text(render_navigator(&entries)))
            }
            Command::Import { path } => {
                let count = loader::import_manifest(&self.store, &path)?;
                Ok(Reply::text(format!("Imported {} manifest nodes", count)))
            }
            Command::Export { target, path } => self.export(&target, &path),
            Command::Help => Ok(Reply::text(HELP)),
            Command::Quit => Ok(Reply {
                message: "Goodbye, pilot.".to_string(),
                celebrate: false,
                quit: true,
            }),
        }
    }

    fn advance(&mut self) -> Result<Reply> {
        let email = self.pilot_email()?;
        let composer = self.composer();
        let state = match composer.mission_state(&email)? {
            Some(state) => state,
            None => return Err(LaunchpadError::not_found("active mission", email)),
        };
        let total_nodes = composer.total_nodes(&state.mission_id)?;

        let outcome = ProgressReconciler::new(&self.store).advance_mission_node(
            &email,
            &state.mission_id,
            total_nodes,
        )?;
        Ok(match outcome {
            AdvanceOutcome::Advanced { current_node } => {
                Reply::text(format!("Advancing to node {} of {}", current_node, total_nodes))
            }
            AdvanceOutcome::Completed { .. } => Reply {
                message: format!("Mission {} completed!", state.mission_id),
                celebrate: true,
                quit: false,
            },
            AdvanceOutcome::AlreadyCompleted { .. } => Reply::text(format!(
                "Mission {} is already complete",
                state.mission_id
            )),
        })
    }

    fn export(&self, target: &str, path: &str) -> Result<Reply> {
        let write = |bytes: &[u8]| {
            fs::write(path, bytes)
                .map_err(|e| LaunchpadError::validation("export path", format!("{}: {}", path, e)))
        };

        if target.eq_ignore_ascii_case("xlsx") {
            let bytes = self.export_xlsx()?;
            write(bytes.as_slice())?;
            return Ok(Reply::text(format!("Workbook exported to {}", path)));
        }

        let table = TableName::from_sheet_name(target)
            .ok_or_else(|| LaunchpadError::not_found("worksheet", target))?;
        let rows = self.store.read_table(table)?;
        write(downloader::to_csv(table, &rows).as_bytes())?;
        Ok(Reply::text(format!("{} exported to {}", table, path)))
    }

    #[cfg(feature = "xlsx")]
    fn export_xlsx(&self) -> Result<Vec<u8>> {
        let mut sheets = Vec::new();
        for table in TableName::ALL {
            sheets.push((table, self.store.read_table(table)?));
        }
        downloader::to_xlsx(&sheets).map_err(|e| LaunchpadError::validation("xlsx", e.to_string()))
    }

    #[cfg(not(feature = "xlsx"))]
    fn export_xlsx(&self) -> Result<Vec<u8>> {
        Err(LaunchpadError::validation(
            "xlsx",
            "XLSX export requires the 'xlsx' feature",
        ))
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(|e| LaunchpadError::validation("json", e.to_string()))
}

pub fn render_banner(banner: &MissionBanner) -> String {
    match banner {
        MissionBanner::NoActiveMission => {
            "Select a mission from the navigator to begin your flight plan.".to_string()
        }
        MissionBanner::Active(active) => {
            let width = 20;
            let filled = (active.fraction * width as f64).round() as usize;
            let mut text = format!(
                "Active Mission: {}\n[{}{}] Node {} of {}",
                active.mission_id,
                "#".repeat(filled),
                "-".repeat(width - filled.min(width)),
                active.current_node,
                active.total_nodes
            );
            if let Some(briefing) = &active.briefing {
                text.push_str(&format!("\nCurrent briefing: {} <{}>", briefing.title, briefing.url));
            }
            text
        }
    }
}

fn subtask_cell(label: &str, state: &SubtaskState) -> String {
    match (state.applicable, state.done) {
        (false, _) => format!("{}: n/a", label),
        (true, true) => format!("{}: done", label),
        (true, false) => format!("{}: open", label),
    }
}

pub fn render_navigator(entries: &[NavigatorEntry]) -> String {
    if entries.is_empty() {
        return "The mission manifest is empty.".to_string();
    }

    let mut lines = Vec::new();
    for entry in entries {
        lines.push(format!("Protocol: {}", entry.mission_id));
        for node in &entry.nodes {
            lines.push(format!(
                "  [{}] {} | {} | {} | {}{}",
                node.node_id,
                node.title,
                subtask_cell("read", &node.display.read),
                subtask_cell("code", &node.display.code),
                subtask_cell("quiz", &node.display.quiz),
                if node.display.complete { " | complete" } else { "" }
            ));
        }
    }
    lines.join("\n")
}
