//! Console front end for an Alpaca chat server.
//!
//! Reads commands and messages from stdin, prints the thread and notices to
//! stdout. Diagnostics go to stderr, filtered by `RUST_LOG` (default `info`).

mod commands;
mod console;

use std::process::ExitCode;
use std::sync::Arc;

use alpaca_client::api::ModelInfo;
use alpaca_client::{
    ApiClient, ChatApp, ChatSession, ClientConfig, ClientError, ConfigError, ConnectionManager,
    Notifier, PreferencesStore, TokioReconnectScheduler, WebSocketChannel, transport,
};
use snafu::{ResultExt, Snafu};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::commands::{Command, HELP};
use crate::console::{ConsoleNotifier, ConsoleObserver};

#[derive(Debug, Snafu)]
enum CliError {
    #[snafu(display("invalid configuration on `{stage}`: {source}"))]
    Config {
        stage: &'static str,
        source: ConfigError,
    },
    #[snafu(display("no socket endpoint for the server on `{stage}`: {source}"))]
    SocketEndpoint {
        stage: &'static str,
        source: ClientError,
    },
}

type App = ChatApp<WebSocketChannel>;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(%error, "alpaca exited with error");
            eprintln!("alpaca: {error}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), CliError> {
    let config = ClientConfig::load().context(ConfigSnafu {
        stage: "load-config",
    })?;
    let server_url = config.server_url().context(ConfigSnafu {
        stage: "parse-server-url",
    })?;
    let socket_url = transport::socket_url(&config.server_url).context(SocketEndpointSnafu {
        stage: "derive-socket-url",
    })?;
    tracing::info!(server = %server_url, socket = %socket_url, "starting alpaca");

    let (inbox, mut events) = mpsc::unbounded_channel();
    let notifier: Arc<dyn Notifier> = Arc::new(ConsoleNotifier);
    let observer = Arc::new(ConsoleObserver::default());
    let preferences = Arc::new(PreferencesStore::open(config.preferences_path()));

    let session = ChatSession::new(notifier.clone(), observer.clone());
    let connection = ConnectionManager::new(
        WebSocketChannel::new(socket_url, inbox.clone()),
        config.reconnect.policy(),
        Arc::new(TokioReconnectScheduler::new(inbox)),
        notifier.clone(),
    );
    let mut app = ChatApp::new(
        ApiClient::new(server_url),
        session,
        connection,
        preferences,
        notifier,
    );

    app.initialize().await;
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if !dispatch(&mut app, &observer, &line).await {
                        break;
                    }
                }
                Ok(None) => break,
                Err(error) => {
                    tracing::error!(%error, "failed to read stdin");
                    break;
                }
            },
            Some(event) = events.recv() => app.handle_channel_event(event).await,
        }
    }

    app.shutdown();
    tracing::info!("alpaca shut down cleanly");
    Ok(())
}

/// Runs one input line. Returns false when the user asked to quit.
async fn dispatch(app: &mut App, observer: &ConsoleObserver, line: &str) -> bool {
    let command = match commands::parse(line) {
        Ok(Some(command)) => command,
        Ok(None) => return true,
        Err(error) => {
            println!("{error}");
            return true;
        }
    };

    match command {
        Command::Send(text) => {
            if let Err(rejection) = app.send_message(&text).await {
                tracing::debug!(%rejection, "message not sent");
            }
        }
        Command::NewChat => {
            observer.reset();
            app.create_new_chat().await;
        }
        Command::Chats => print_chats(app),
        Command::Open(chat_id) => {
            observer.reset();
            app.load_chat(chat_id).await;
        }
        Command::Delete => {
            app.delete_current_chat().await;
        }
        Command::Models => print_models(app),
        Command::Model(name) => {
            if app.select_model(&name) {
                println!("model: {name}");
            }
        }
        Command::CustomList => {
            if let Some(models) = app.list_custom_models().await {
                if models.is_empty() {
                    println!("no custom models");
                }
                for model in models {
                    println!(
                        "{:>4}  {} (based on {})\n      {}",
                        model.id,
                        model.name,
                        model.base_model,
                        model.prompt_preview()
                    );
                }
            }
        }
        Command::CustomShow(model_id) => {
            if let Some(model) = app.custom_model(model_id).await {
                println!(
                    "{} (based on {})\n{}",
                    model.name, model.base_model, model.system_prompt
                );
            }
        }
        Command::CustomAdd(draft) => {
            app.save_custom_model(None, draft).await;
        }
        Command::CustomEdit(model_id, draft) => {
            app.save_custom_model(Some(model_id), draft).await;
        }
        Command::CustomRemove(model_id) => {
            app.delete_custom_model(model_id).await;
        }
        Command::Online => app.network_online(),
        Command::Offline => app.network_offline(),
        Command::Help => println!("{HELP}"),
        Command::Quit => return false,
    }
    true
}

fn print_chats(app: &App) {
    if app.chats().is_empty() {
        println!("no chats yet");
        return;
    }
    let active = app.session().active_chat_id();
    for chat in app.chats() {
        let marker = if Some(chat.id) == active { '*' } else { ' ' };
        println!("{marker}{:>4}  {}  [{}]", chat.id, chat.title, chat.model);
    }
}

fn print_models(app: &App) {
    let catalog = app.catalog();
    if catalog.is_empty() {
        println!("no models available");
        return;
    }
    let selected = app.selected_model();
    let print_group = |title: &str, models: &[ModelInfo]| {
        if models.is_empty() {
            return;
        }
        println!("{title}:");
        for model in models {
            let marker = if Some(model.name.as_str()) == selected {
                '*'
            } else {
                ' '
            };
            println!("{marker} {}", model.label());
        }
    };
    print_group("Base Models", &catalog.base);
    print_group("Custom Models", &catalog.custom);
}
