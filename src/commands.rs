/// Available commands, autocomplete and argument parsing
use std::collections::BTreeMap;

use crate::service::WorkOrderId;
use crate::view::StatusFilter;

#[derive(Debug, Clone)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub usage: &'static str,
  pub description: &'static str,
}

/// All available commands
pub const COMMANDS: &[Command] = &[
  Command {
    name: "list",
    aliases: &["l", "ls"],
    usage: "list",
    description: "Show the dashboard",
  },
  Command {
    name: "filter",
    aliases: &["f"],
    usage: "filter status <S|All> | filter worker <W|all>",
    description: "Filter by status or worker",
  },
  Command {
    name: "search",
    aliases: &["s", "/"],
    usage: "search [text]",
    description: "Search customer and worker names",
  },
  Command {
    name: "clear",
    aliases: &["c"],
    usage: "clear",
    description: "Clear all filters",
  },
  Command {
    name: "workers",
    aliases: &["w"],
    usage: "workers",
    description: "List worker names",
  },
  Command {
    name: "stats",
    aliases: &[],
    usage: "stats",
    description: "Show counts by status",
  },
  Command {
    name: "remote",
    aliases: &["r"],
    usage: "remote status <S> | remote worker <W>",
    description: "List orders filtered by the service",
  },
  Command {
    name: "show",
    aliases: &["get", "view"],
    usage: "show <id>",
    description: "Show one work order",
  },
  Command {
    name: "create",
    aliases: &["new", "add"],
    usage: "create customer=.. phone=.. worker=.. date=.. due=..",
    description: "Create a work order",
  },
  Command {
    name: "update",
    aliases: &["edit", "u"],
    usage: "update <id> [status=..] [notes=..] [customer=..] [worker=..] [date=..] [due=..]",
    description: "Edit a work order",
  },
  Command {
    name: "delete",
    aliases: &["rm", "del"],
    usage: "delete <id>",
    description: "Delete a work order",
  },
  Command {
    name: "seed",
    aliases: &[],
    usage: "seed",
    description: "Add demo orders if the service is empty",
  },
  Command {
    name: "refresh",
    aliases: &["reload"],
    usage: "refresh",
    description: "Refetch the dashboard",
  },
  Command {
    name: "cache",
    aliases: &[],
    usage: "cache",
    description: "Show cache entries",
  },
  Command {
    name: "mutations",
    aliases: &["m"],
    usage: "mutations [reset]",
    description: "Show or reset the state of each write",
  },
  Command {
    name: "connect",
    aliases: &[],
    usage: "connect",
    description: "Retry connecting to the service",
  },
  Command {
    name: "help",
    aliases: &["h", "?"],
    usage: "help",
    description: "Show this help",
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    usage: "quit",
    description: "Exit wo",
  },
];

/// Get autocomplete suggestions for a given input
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let input_lower = input.to_lowercase();

  if input_lower.is_empty() {
    return COMMANDS.iter().collect();
  }

  let mut matches: Vec<(&Command, u32)> = Vec::new();

  for cmd in COMMANDS {
    // Exact match on name
    if cmd.name == input_lower {
      matches.push((cmd, 0)); // Highest priority
      continue;
    }

    // Exact match on alias
    if cmd.aliases.contains(&input_lower.as_str()) {
      matches.push((cmd, 1));
      continue;
    }

    // Prefix match on name
    if cmd.name.starts_with(&input_lower) {
      matches.push((cmd, 2));
      continue;
    }

    // Prefix match on alias
    if cmd.aliases.iter().any(|a| a.starts_with(&input_lower)) {
      matches.push((cmd, 3));
      continue;
    }

    // Fuzzy match (contains)
    if cmd.name.contains(&input_lower) {
      matches.push((cmd, 4));
      continue;
    }

    // Fuzzy match on alias
    if cmd.aliases.iter().any(|a| a.contains(&input_lower)) {
      matches.push((cmd, 5));
    }
  }

  // Sort by priority
  matches.sort_by_key(|(_, priority)| *priority);

  matches.into_iter().map(|(cmd, _)| cmd).collect()
}

/// Fields given as `key=value` arguments
pub type Fields = BTreeMap<String, String>;

/// A parsed shell line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
  List,
  FilterStatus(StatusFilter),
  /// Empty means all workers
  FilterWorker(String),
  Search(String),
  Clear,
  Workers,
  Stats,
  RemoteStatus(String),
  RemoteWorker(String),
  Show(WorkOrderId),
  Create(Fields),
  Update(WorkOrderId, Fields),
  Delete(WorkOrderId),
  Seed,
  Refresh,
  Cache,
  Mutations,
  ResetMutations,
  Connect,
  Help,
  Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
  #[error("Unknown command: {0}")]
  Unknown(String),
  #[error("Usage: {0}")]
  Usage(&'static str),
  #[error("Invalid id: {0}")]
  InvalidId(String),
  #[error("Unknown field '{field}', expected one of: {expected}")]
  UnknownField {
    field: String,
    expected: &'static str,
  },
  #[error("Expected key=value, got '{0}'")]
  NotAField(String),
  #[error("Unterminated quote")]
  UnterminatedQuote,
}

const CREATE_FIELDS: &[&str] = &["customer", "phone", "worker", "date", "due"];
const UPDATE_FIELDS: &[&str] = &["status", "notes", "customer", "worker", "date", "due"];

/// Parse one input line. Blank lines yield `None`.
pub fn parse(line: &str) -> Result<Option<Action>, CommandError> {
  let args = split_args(line)?;
  let Some((head, rest)) = args.split_first() else {
    return Ok(None);
  };

  let command = get_suggestions(head)
    .into_iter()
    .next()
    .ok_or_else(|| CommandError::Unknown(head.clone()))?;
  let usage = CommandError::Usage(command.usage);

  let action = match command.name {
    "list" => Action::List,
    "filter" => match rest {
      [field, value @ ..] if field == "status" && has_text(value) => {
        Action::FilterStatus(StatusFilter::parse(&value.join(" ")))
      }
      [field, value @ ..] if field == "worker" && has_text(value) => {
        let worker = value.join(" ");
        if worker.eq_ignore_ascii_case("all") {
          Action::FilterWorker(String::new())
        } else {
          Action::FilterWorker(worker)
        }
      }
      _ => return Err(usage),
    },
    "search" => Action::Search(rest.join(" ")),
    "clear" => Action::Clear,
    "workers" => Action::Workers,
    "stats" => Action::Stats,
    "remote" => match rest {
      [field, value @ ..] if field == "status" && has_text(value) => {
        Action::RemoteStatus(value.join(" "))
      }
      [field, value @ ..] if field == "worker" && has_text(value) => {
        Action::RemoteWorker(value.join(" "))
      }
      _ => return Err(usage),
    },
    "show" => Action::Show(single_id(rest, usage)?),
    "create" => Action::Create(parse_fields(rest, CREATE_FIELDS, "customer, phone, worker, date, due")?),
    "update" => match rest {
      [id, fields @ ..] => Action::Update(
        parse_id(id)?,
        parse_fields(
          fields,
          UPDATE_FIELDS,
          "status, notes, customer, worker, date, due",
        )?,
      ),
      [] => return Err(usage),
    },
    "delete" => Action::Delete(single_id(rest, usage)?),
    "seed" => Action::Seed,
    "refresh" => Action::Refresh,
    "cache" => Action::Cache,
    "mutations" => match rest {
      [] => Action::Mutations,
      [arg] if arg == "reset" => Action::ResetMutations,
      _ => return Err(usage),
    },
    "connect" => Action::Connect,
    "help" => Action::Help,
    "quit" => Action::Quit,
    other => return Err(CommandError::Unknown(other.to_string())),
  };
  Ok(Some(action))
}

/// Whether a value made of these words is not blank
fn has_text(words: &[String]) -> bool {
  words.iter().any(|w| !w.trim().is_empty())
}

fn single_id(rest: &[String], usage: CommandError) -> Result<WorkOrderId, CommandError> {
  match rest {
    [id] => parse_id(id),
    _ => Err(usage),
  }
}

fn parse_id(value: &str) -> Result<WorkOrderId, CommandError> {
  value
    .trim_start_matches('#')
    .parse()
    .map_err(|_| CommandError::InvalidId(value.to_string()))
}

fn parse_fields(
  args: &[String],
  allowed: &[&str],
  expected: &'static str,
) -> Result<Fields, CommandError> {
  let mut fields = Fields::new();
  for arg in args {
    let (key, value) = arg
      .split_once('=')
      .ok_or_else(|| CommandError::NotAField(arg.clone()))?;
    let key = key.to_lowercase();
    if !allowed.contains(&key.as_str()) {
      return Err(CommandError::UnknownField {
        field: key,
        expected,
      });
    }
    fields.insert(key, value.to_string());
  }
  Ok(fields)
}

/// Split a line on whitespace, keeping double- or single-quoted runs together
pub fn split_args(line: &str) -> Result<Vec<String>, CommandError> {
  let mut args = Vec::new();
  let mut current = String::new();
  let mut in_arg = false;
  let mut quote: Option<char> = None;

  for c in line.chars() {
    match quote {
      Some(q) if c == q => quote = None,
      Some(_) => current.push(c),
      None if c == '"' || c == '\'' => {
        quote = Some(c);
        in_arg = true;
      }
      None if c.is_whitespace() => {
        if in_arg {
          args.push(std::mem::take(&mut current));
          in_arg = false;
        }
      }
      None => {
        current.push(c);
        in_arg = true;
      }
    }
  }

  if quote.is_some() {
    return Err(CommandError::UnterminatedQuote);
  }
  if in_arg {
    args.push(current);
  }
  Ok(args)
}
