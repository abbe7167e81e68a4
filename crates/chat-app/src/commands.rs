use alpaca_client::api::CustomModelDraft;
use alpaca_client::{ChatId, ClientError, CustomModelId};
use snafu::{OptionExt, ResultExt, Snafu};

pub const HELP: &str = "\
commands:
  <text>                               send a message on the current chat
  /new                                 start a chat with the selected model
  /chats                               list chats
  /open <id>                           open a chat
  /delete                              delete the current chat
  /models                              list models
  /model <name>                        select a model
  /custom list                         list custom models
  /custom show <id>                    show one custom model
  /custom add <name> | <base> | <prompt>
  /custom edit <id> <name> | <base> | <prompt>
  /custom rm <id>                      delete a custom model
  /online, /offline                    report network changes
  /help                                show this help
  /quit                                exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Send(String),
    NewChat,
    Chats,
    Open(ChatId),
    Delete,
    Models,
    Model(String),
    CustomList,
    CustomShow(CustomModelId),
    CustomAdd(CustomModelDraft),
    CustomEdit(CustomModelId, CustomModelDraft),
    CustomRemove(CustomModelId),
    Online,
    Offline,
    Help,
    Quit,
}

#[derive(Debug, Snafu)]
pub enum CommandError {
    #[snafu(display("unknown command '/{name}', try /help"))]
    Unknown { stage: &'static str, name: String },
    #[snafu(display("usage: {usage}"))]
    Usage {
        stage: &'static str,
        usage: &'static str,
    },
    #[snafu(display("{source}"))]
    BadId {
        stage: &'static str,
        source: ClientError,
    },
}

/// Parses one input line. Blank lines yield `None`.
pub fn parse(line: &str) -> Result<Option<Command>, CommandError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Some(Command::Send(line.to_string())));
    };

    let (name, args) = split_word(rest);
    let command = match name {
        "new" => Command::NewChat,
        "chats" => Command::Chats,
        "open" => Command::Open(parse_id(args, "/open <id>")?),
        "delete" => Command::Delete,
        "models" => Command::Models,
        "model" => {
            ensure_present(args, "/model <name>")?;
            Command::Model(args.to_string())
        }
        "custom" => parse_custom(args)?,
        "online" => Command::Online,
        "offline" => Command::Offline,
        "help" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => {
            return UnknownSnafu {
                stage: "parse-command",
                name: other.to_string(),
            }
            .fail();
        }
    };
    Ok(Some(command))
}

fn parse_custom(args: &str) -> Result<Command, CommandError> {
    let (action, rest) = split_word(args);
    match action {
        "list" | "" => Ok(Command::CustomList),
        "show" => Ok(Command::CustomShow(parse_id(rest, "/custom show <id>")?)),
        "rm" => Ok(Command::CustomRemove(parse_id(rest, "/custom rm <id>")?)),
        "add" => Ok(Command::CustomAdd(parse_draft(
            rest,
            "/custom add <name> | <base> | <prompt>",
        )?)),
        "edit" => {
            let usage = "/custom edit <id> <name> | <base> | <prompt>";
            let (id, fields) = split_word(rest);
            Ok(Command::CustomEdit(
                parse_id(id, usage)?,
                parse_draft(fields, usage)?,
            ))
        }
        _ => UsageSnafu {
            stage: "parse-custom-command",
            usage: "/custom list|show|add|edit|rm",
        }
        .fail(),
    }
}

// Fields may be blank here; the client validates drafts before saving.
fn parse_draft(args: &str, usage: &'static str) -> Result<CustomModelDraft, CommandError> {
    let mut fields = args.splitn(3, '|').map(str::trim);
    let name = fields.next().unwrap_or_default();
    let base_model = fields.next().context(UsageSnafu {
        stage: "parse-custom-draft",
        usage,
    })?;
    let system_prompt = fields.next().context(UsageSnafu {
        stage: "parse-custom-draft",
        usage,
    })?;
    Ok(CustomModelDraft::new(name, base_model, system_prompt))
}

fn parse_id<T>(args: &str, usage: &'static str) -> Result<T, CommandError>
where
    T: std::str::FromStr<Err = ClientError>,
{
    ensure_present(args, usage)?;
    args.parse::<T>().context(BadIdSnafu { stage: "parse-id" })
}

fn ensure_present(args: &str, usage: &'static str) -> Result<(), CommandError> {
    if args.is_empty() {
        return UsageSnafu {
            stage: "parse-arguments",
            usage,
        }
        .fail();
    }
    Ok(())
}

fn split_word(input: &str) -> (&str, &str) {
    let input = input.trim();
    match input.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (input, ""),
    }
}
