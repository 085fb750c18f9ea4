#![cfg(not(tarpaulin_include))]

use clap::Parser;
use launchpad::app::{HELP, Launchpad};
use launchpad::config::LaunchpadConfig;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

/// Mission control for learning pilots
#[derive(Parser, Debug)]
#[command(name = "launchpad", version)]
struct Args {
    /// TOML configuration file; missing means defaults
    #[arg(long, default_value = "launchpad.toml")]
    config: PathBuf,

    /// Run a single command and exit
    #[arg(long)]
    exec: Option<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let config = LaunchpadConfig::load(&args.config)?;
    let mut launchpad = Launchpad::open(config)?;

    if let Some(line) = args.exec {
        println!("{}", launchpad.execute_line(&line).message);
        return Ok(());
    }

    println!("ProjectAIML Launchpad\n{}", HELP);

    let stdin = io::stdin();
    let mut input = stdin.lock();
    loop {
        let prompt = match launchpad.pilot() {
            Some(pilot) => format!("({}) > ", pilot.email),
            None => "(guest) > ".to_string(),
        };
        print!("{}", prompt);
        io::stdout().flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            break;
        }
        if line.trim().is_empty() {
            continue;
        }

        let reply = launchpad.execute_line(&line);
        println!("{}", reply.message);
        if reply.celebrate {
            println!("*** Mission accomplished, pilot! ***");
        }
        if reply.quit {
            break;
        }
    }

    Ok(())
}
