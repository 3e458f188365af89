use crate::api::{ApiClient, EnvCredentials};
use crate::config::Config;
use crate::context::{
    assemble, AssembledContext, ContextSelection, ContextSources, FileBuffer, OpenArtifact,
    SourceId, LOGS_ID, LOGS_LABEL, OPENED_CONTENT_ID,
};
use crate::state::{ControllerHandle, SessionController, SessionEvent, SessionView};
use anyhow::{bail, Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const PROMPT: &str = "> ";

#[derive(Debug, Clone, Parser)]
#[command(
    name = "logchat",
    version,
    about = "Ask a language model about open files and execution logs"
)]
pub struct Cli {
    /// File treated as the currently opened artifact
    #[arg(long, value_name = "FILE")]
    pub open: Option<PathBuf>,

    /// Execution log file
    #[arg(long, value_name = "FILE")]
    pub logs: Option<PathBuf>,

    /// Additional selectable file, identified by its file name (`#2`, `#3`
    /// are appended on collisions; see /sources)
    #[arg(long = "file", value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Initial context selection, e.g. `opened` or `logs,main.rs`
    #[arg(long, value_name = "SEL", default_value = OPENED_CONTENT_ID)]
    pub context: String,

    /// Ask a single question, stream the answer and exit
    #[arg(long, value_name = "QUESTION")]
    pub ask: Option<String>,

    /// Override the model name
    #[arg(long)]
    pub model: Option<String>,

    /// Override the chat completions endpoint
    #[arg(long)]
    pub api_url: Option<String>,
}

impl Cli {
    pub fn apply(&self, config: &mut Config) {
        if let Some(model) = &self.model {
            config.model = model.trim().to_string();
        }
        if let Some(api_url) = &self.api_url {
            config.api_url = api_url.trim().to_string();
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ReplCommand {
    Ask(String),
    Context(String),
    Toggle(String),
    Sources,
    History,
    Export,
    Cancel,
    Help,
    Quit,
    Unknown(String),
    Empty,
}

fn parse_command(line: &str) -> ReplCommand {
    let line = line.trim();
    if line.is_empty() {
        return ReplCommand::Empty;
    }
    let Some(rest) = line.strip_prefix('/') else {
        return ReplCommand::Ask(line.to_string());
    };
    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };
    match name {
        "context" => ReplCommand::Context(arg.to_string()),
        "toggle" if !arg.is_empty() => ReplCommand::Toggle(arg.to_string()),
        "sources" => ReplCommand::Sources,
        "history" => ReplCommand::History,
        "export" => ReplCommand::Export,
        "cancel" => ReplCommand::Cancel,
        "help" => ReplCommand::Help,
        "quit" | "exit" | "q" => ReplCommand::Quit,
        _ => ReplCommand::Unknown(line.to_string()),
    }
}

pub async fn load_sources(cli: &Cli) -> Result<ContextSources> {
    let opened = match &cli.open {
        Some(path) => Some(OpenArtifact {
            name: display_name(path),
            text: read_file(path).await?,
        }),
        None => None,
    };
    let logs = match &cli.logs {
        Some(path) => read_file(path).await?,
        None => String::new(),
    };
    let mut sources = ContextSources {
        opened,
        logs,
        files: Vec::new(),
    };
    for path in &cli.files {
        let id = sources.add_file(FileBuffer::on_disk(path));
        tracing::debug!(id = %id, path = %path.display(), "registered context file");
    }
    Ok(sources)
}

async fn read_file(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read '{}'", path.display()))
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

pub struct App {
    handle: ControllerHandle,
    controller_task: JoinHandle<()>,
    events: mpsc::UnboundedReceiver<SessionEvent>,
    shutdown: CancellationToken,
    sources: ContextSources,
    selection: ContextSelection,
}

impl App {
    pub async fn new(config: Config, cli: &Cli) -> Result<Self> {
        let sources = load_sources(cli).await?;
        let client = ApiClient::new(&config, Arc::new(EnvCredentials))?;
        let shutdown = CancellationToken::new();
        let (event_tx, events) = mpsc::unbounded_channel();
        let (handle, controller_task) = SessionController::new(client)
            .with_shutdown(shutdown.clone())
            .with_events(event_tx)
            .spawn();
        tracing::info!(model = %config.model, api_url = %config.api_url, "logchat started");

        Ok(Self {
            handle,
            controller_task,
            events,
            shutdown,
            sources,
            selection: ContextSelection::parse(&cli.context),
        })
    }

    /// Submit one question and stream its answer to stdout.
    pub async fn ask_once(mut self, question: &str) -> Result<()> {
        let question = question.trim();
        if question.is_empty() {
            bail!("question must not be empty");
        }
        let context = self.assemble_selected().await?;
        if !self.handle.submit(question, context) {
            bail!("session controller stopped unexpectedly");
        }

        let outcome = loop {
            let event = tokio::select! {
                event = self.events.recv() => event,
                _ = tokio::signal::ctrl_c() => {
                    self.shutdown.cancel();
                    break Err(anyhow::anyhow!("interrupted"));
                }
            };
            match event {
                Some(SessionEvent::Delta { text, .. }) => print_flush(&text)?,
                Some(SessionEvent::Sealed { .. }) => {
                    println!();
                    break Ok(());
                }
                Some(SessionEvent::Discarded { error, .. }) => {
                    break Err(anyhow::anyhow!(error.unwrap_or_else(|| "cancelled".into())));
                }
                Some(SessionEvent::PreconditionFailed { error }) => {
                    break Err(anyhow::anyhow!(error));
                }
                Some(SessionEvent::Started { .. }) => {}
                None => bail!("session controller stopped unexpectedly"),
            }
        };

        self.stop().await;
        outcome
    }

    pub async fn run(mut self) -> Result<()> {
        println!("logchat: type a question, /help for commands");
        println!("context: {}", self.selection_text());
        print_flush(PROMPT)?;

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        break;
                    };
                    if !self.handle_line(&line).await? {
                        break;
                    }
                }
                Some(event) = self.events.recv() => self.render_event(event)?,
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("interrupt received, shutting down");
                    break;
                }
            }
        }

        self.stop().await;
        Ok(())
    }

    /// Returns `false` when the user asked to quit.
    async fn handle_line(&mut self, line: &str) -> Result<bool> {
        let command = parse_command(line);
        let submitted = matches!(command, ReplCommand::Ask(_));
        match command {
            ReplCommand::Empty => {}
            ReplCommand::Ask(question) => {
                let context = match self.assemble_selected().await {
                    Ok(context) => context,
                    Err(error) => {
                        eprintln!("[error] {error:#}");
                        print_flush(PROMPT)?;
                        return Ok(true);
                    }
                };
                println!("[context: {}]", context.labels.join(", "));
                if !self.handle.submit(question, context) {
                    bail!("session controller stopped unexpectedly");
                }
            }
            ReplCommand::Context(list) => {
                self.selection = if list.is_empty() {
                    ContextSelection::default()
                } else {
                    ContextSelection::parse(&list)
                };
                println!("context: {}", self.selection_text());
            }
            ReplCommand::Toggle(id) => {
                self.selection.toggle(&id);
                println!("context: {}", self.selection_text());
            }
            ReplCommand::Sources => self.print_sources(),
            ReplCommand::History => print_history(&self.handle.view()),
            ReplCommand::Export => {
                let json = serde_json::to_string_pretty(&self.handle.view())
                    .context("failed to serialise history")?;
                println!("{json}");
            }
            ReplCommand::Cancel => {
                self.handle.cancel();
            }
            ReplCommand::Help => print_help(),
            ReplCommand::Quit => return Ok(false),
            ReplCommand::Unknown(command) => {
                eprintln!("unknown command: {command} (try /help)");
            }
        }
        if !submitted {
            print_flush(PROMPT)?;
        }
        Ok(true)
    }

    fn render_event(&self, event: SessionEvent) -> Result<()> {
        match event {
            SessionEvent::Started { .. } => {}
            SessionEvent::Delta { text, .. } => print_flush(&text)?,
            SessionEvent::Sealed { .. } => {
                println!();
                print_flush(PROMPT)?;
            }
            SessionEvent::Discarded { error, .. } => {
                match error {
                    Some(error) => eprintln!("\n[error] {error}"),
                    None => println!("\n[cancelled]"),
                }
                print_flush(PROMPT)?;
            }
            SessionEvent::PreconditionFailed { error } => {
                eprintln!("[error] {error}");
                print_flush(PROMPT)?;
            }
        }
        Ok(())
    }

    async fn assemble_selected(&self) -> Result<AssembledContext> {
        assemble(&self.selection, &self.sources).await
    }

    fn selection_text(&self) -> String {
        match &self.selection {
            ContextSelection::OpenedContent => match &self.sources.opened {
                Some(artifact) => format!("opened file ({})", artifact.name),
                None => format!("opened content ({LOGS_LABEL})"),
            },
            selection => selection.display_text(&self.sources),
        }
    }

    fn print_sources(&self) {
        let marker = |selected: bool| if selected { "*" } else { " " };
        let opened = matches!(self.selection, ContextSelection::OpenedContent);
        let opened_name = self
            .sources
            .opened
            .as_ref()
            .map(|artifact| artifact.name.as_str())
            .unwrap_or("none");
        println!(
            "{} {OPENED_CONTENT_ID:<16} opened file: {opened_name}",
            marker(opened)
        );
        let logs = SourceId::Logs;
        println!(
            "{} {LOGS_ID:<16} {LOGS_LABEL} ({} bytes)",
            marker(self.selection.contains(&logs)),
            self.sources.logs.len()
        );
        for file in &self.sources.files {
            let id = SourceId::File(file.id.clone());
            println!(
                "{} {:<16} File {}",
                marker(self.selection.contains(&id)),
                file.id,
                file.name
            );
        }
    }

    async fn stop(self) {
        self.shutdown.cancel();
        drop(self.handle);
        if let Err(error) = self.controller_task.await {
            tracing::warn!(%error, "session controller task failed");
        }
    }
}

fn print_flush(text: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(text.as_bytes())?;
    stdout.flush()?;
    Ok(())
}

fn print_history(view: &SessionView) {
    if view.exchanges.is_empty() {
        println!("(no exchanges yet)");
        return;
    }
    for exchange in &view.exchanges {
        let marker = if exchange.is_sealed() { "" } else { " (streaming)" };
        println!(
            "#{} {} [{}]{marker}",
            exchange.id(),
            exchange.created_at().format("%Y-%m-%d %H:%M:%S"),
            exchange.context_labels().join(", ")
        );
        println!("  Q: {}", exchange.question());
        println!("  A: {}", exchange.answer());
    }
    if let Some(error) = &view.last_error {
        println!("last error: {error}");
    }
}

fn print_help() {
    println!("/context SEL   select sources: `opened` or a comma list like `logs,main.rs`");
    println!("/toggle ID     add or remove one source from the selection");
    println!("/sources       list selectable sources");
    println!("/history       show the conversation so far");
    println!("/export        print the conversation as JSON");
    println!("/cancel        stop the answer being streamed");
    println!("/quit          exit");
}
