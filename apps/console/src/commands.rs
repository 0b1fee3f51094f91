//! Operator commands typed at the console prompt.

use shared::domain::WireMode;

const DEFAULT_LOG_LINES: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Approve,
    Dismiss,
    SetWireMode(WireMode),
    Stats,
    Log(usize),
    Graph,
    Proposals,
    Registry(String),
    Status,
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  approve              approve the presented anchor proposal
  dismiss              dismiss the presented anchor proposal
  mode <json|quantized> switch the traffic log wire view
  stats                aggregate metrics
  log [n]              newest n traffic log entries (default 10)
  graph                topology nodes and live particles
  proposals            live proposal queue
  registry [query]     fetch the anchor registry, optionally filtered
  status               connection state
  help, ?              show this list
  quit                 close the console";

pub fn parse(line: &str) -> Result<Option<ConsoleCommand>, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let rest: Vec<&str> = words.collect();

    let command = match verb.to_ascii_lowercase().as_str() {
        "approve" | "a" => ConsoleCommand::Approve,
        "dismiss" | "d" => ConsoleCommand::Dismiss,
        "mode" => {
            let Some(raw) = rest.first() else {
                return Err("usage: mode <json|quantized>".to_string());
            };
            ConsoleCommand::SetWireMode(raw.parse().map_err(|err| format!("{err}"))?)
        }
        "stats" => ConsoleCommand::Stats,
        "log" => match rest.first() {
            None => ConsoleCommand::Log(DEFAULT_LOG_LINES),
            Some(raw) => ConsoleCommand::Log(
                raw.parse()
                    .map_err(|_| format!("log expects a line count, got {raw:?}"))?,
            ),
        },
        "graph" => ConsoleCommand::Graph,
        "proposals" | "queue" => ConsoleCommand::Proposals,
        "registry" => ConsoleCommand::Registry(rest.join(" ")),
        "status" => ConsoleCommand::Status,
        "help" | "?" => ConsoleCommand::Help,
        "quit" | "exit" | "q" => ConsoleCommand::Quit,
        other => return Err(format!("unknown command {other:?}; try `help`")),
    };
    Ok(Some(command))
}
