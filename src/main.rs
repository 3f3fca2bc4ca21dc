//! agent-chat - terminal client for a streaming chat API
//!
//! Plain lines are sent as messages. Commands: `/clear`, `/dismiss`,
//! `/once <text>` (non-streaming request), `/quit`.

use agent_chat::runtime::{SendOutcome, SessionClosed, SessionHandle, SessionRuntime};
use agent_chat::state_machine::{Author, SessionState, TurnId};
use agent_chat::transport::{ChatTransport, HttpTransport, LoggingTransport};
use agent_chat::ClientConfig;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::wrappers::WatchStream;
use tokio_stream::StreamExt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Send(String),
    Once(String),
    Clear,
    Dismiss,
    Quit,
    Nothing,
}

fn parse_command(line: &str) -> Command {
    let line = line.trim();
    match line {
        "" => Command::Nothing,
        "/quit" | "/exit" => Command::Quit,
        "/clear" => Command::Clear,
        "/dismiss" => Command::Dismiss,
        _ => match line.strip_prefix("/once") {
            Some(rest) if rest.is_empty() || rest.starts_with(char::is_whitespace) => {
                Command::Once(rest.trim().to_string())
            }
            _ => Command::Send(line.to_string()),
        },
    }
}

/// Incremental state for the assistant turn being printed
struct Progress {
    turn_id: TurnId,
    printed: usize,
    mode_shown: bool,
}

/// Writes a reply to the terminal as it grows, by diffing snapshots
#[derive(Default)]
struct TranscriptPrinter {
    current: Option<Progress>,
    last_error: Option<String>,
}

impl TranscriptPrinter {
    fn follow(&mut self, turn_id: TurnId) {
        self.current = Some(Progress {
            turn_id,
            printed: 0,
            mode_shown: false,
        });
    }

    fn render(&mut self, state: &SessionState, out: &mut impl Write) -> std::io::Result<()> {
        if let Some(progress) = self.current.as_mut() {
            match state.turn(&progress.turn_id) {
                Some(turn) => {
                    if !progress.mode_shown {
                        if let Some(mode) = &turn.mode {
                            if progress.printed == 0 {
                                writeln!(out, "[{mode}]")?;
                            }
                            progress.mode_shown = true;
                        }
                    }
                    if let Some(fresh) = turn.text.get(progress.printed..) {
                        write!(out, "{fresh}")?;
                        progress.printed = turn.text.len();
                    }
                    if !turn.in_progress {
                        writeln!(out)?;
                        for (i, citation) in turn.citations.iter().flatten().enumerate() {
                            write!(out, "  [{}] {}", i + 1, citation.title)?;
                            if let Some(file) = &citation.file_reference {
                                write!(out, " ({file})")?;
                            }
                            writeln!(out)?;
                        }
                        self.current = None;
                    }
                }
                None => {
                    // Removed by an error or a clear
                    if progress.printed > 0 {
                        writeln!(out)?;
                    }
                    self.current = None;
                }
            }
        }

        if state.last_error != self.last_error {
            if let Some(error) = &state.last_error {
                writeln!(out, "error: {error}")?;
            }
            self.last_error.clone_from(&state.last_error);
        }

        out.flush()
    }
}

async fn follow_reply(
    session: &SessionHandle,
    printer: &mut TranscriptPrinter,
) -> Result<(), Box<dyn std::error::Error>> {
    let snapshot = session.snapshot();
    if let Some(turn) = snapshot.turns.last().filter(|t| t.author == Author::Assistant) {
        printer.follow(turn.id.clone());
    }

    let mut stdout = std::io::stdout();
    let mut updates = WatchStream::new(session.subscribe());
    while let Some(state) = updates.next().await {
        printer.render(&state, &mut stdout)?;
        if !state.busy {
            return Ok(());
        }
    }
    Err(SessionClosed.into())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agent_chat=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config = ClientConfig::from_env()?;
    tracing::info!(
        api_url = %config.api_url,
        idle_timeout_secs = ?config.idle_timeout.map(|d| d.as_secs()),
        "Starting agent-chat"
    );

    let http: Arc<dyn ChatTransport> = Arc::new(HttpTransport::new(&config)?);
    let transport: Arc<dyn ChatTransport> = Arc::new(LoggingTransport::new(http));
    let session = SessionRuntime::spawn(Arc::clone(&transport), config.idle_timeout);

    let mut printer = TranscriptPrinter::default();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        match parse_command(&line) {
            Command::Nothing => {}
            Command::Quit => break,
            Command::Clear => {
                session.clear().await?;
                printer = TranscriptPrinter::default();
                println!("(conversation cleared)");
            }
            Command::Dismiss => {
                session.dismiss_error().await?;
                printer.last_error = None;
            }
            Command::Once(text) => match transport.complete(&text).await {
                Ok(reply) => println!("{reply}"),
                Err(e) => println!("error: {e}"),
            },
            Command::Send(text) => match session.send(text).await? {
                SendOutcome::Accepted => follow_reply(&session, &mut printer).await?,
                SendOutcome::Ignored => println!("(ignored: a reply is still streaming)"),
            },
        }
    }

    tracing::info!("Exiting agent-chat");
    Ok(())
}
