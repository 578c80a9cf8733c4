//! Interactive chat loop
//!
//! Reads prompts from stdin, runs each through the controller and renders the
//! updates while the session is in flight. Slash commands drive retry, error
//! dismissal and history display.

use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use claims_chat_core::{ChatBackend, ChatController, ChatUpdate, SessionOutcome, SubmitError};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, Notify};
use tracing::debug;

use crate::render::{render_message, Output, UpdateRenderer};

const HELP: &str = "\
Commands:
  /retry        resend the last question
  /clear-error  dismiss the current error
  /history      show the conversation so far
  /help         show this help
  /quit         leave the chat
Press Ctrl-C to cancel an answer in progress.
";

/// One line of user input
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Input {
    /// A question for the assistant
    Query(String),
    /// Resend the last question
    Retry,
    /// Dismiss the current error
    ClearError,
    /// Print the history
    History,
    /// Print the command list
    Help,
    /// Leave the loop
    Quit,
    /// Nothing to do
    Empty,
    /// Unrecognized slash command
    Unknown(String),
}

/// Classify a line of input
pub fn parse_input(line: &str) -> Input {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Input::Empty;
    }

    let Some(command) = trimmed.strip_prefix('/') else {
        return Input::Query(trimmed.to_string());
    };

    match command.to_ascii_lowercase().as_str() {
        "retry" | "r" => Input::Retry,
        "clear-error" | "clear" => Input::ClearError,
        "history" | "h" => Input::History,
        "help" | "?" => Input::Help,
        "quit" | "exit" | "q" => Input::Quit,
        _ => Input::Unknown(trimmed.to_string()),
    }
}

/// Write rendered output to the process streams
pub async fn emit(outputs: Vec<Output>) -> Result<()> {
    let mut stdout = tokio::io::stdout();
    let mut stderr = tokio::io::stderr();

    for output in outputs {
        match output {
            Output::Stdout(text) => {
                stdout.write_all(text.as_bytes()).await?;
                stdout.flush().await?;
            }
            Output::Stderr(text) => {
                stderr.write_all(text.as_bytes()).await?;
                stderr.flush().await?;
            }
        }
    }
    Ok(())
}

/// Drive `operation` to completion while rendering the updates it produces
///
/// Updates are rendered as they arrive. Once the operation finishes every
/// update it sent is already queued, so the remainder is drained before
/// returning.
pub async fn pump<F: Future>(
    operation: F,
    rx: &mut mpsc::Receiver<ChatUpdate>,
    renderer: &mut UpdateRenderer,
) -> Result<F::Output> {
    tokio::pin!(operation);

    let result = loop {
        tokio::select! {
            biased;
            Some(update) = rx.recv() => emit(renderer.render(&update)).await?,
            result = &mut operation => break result,
        }
    };

    while let Ok(update) = rx.try_recv() {
        emit(renderer.render(&update)).await?;
    }

    Ok(result)
}

/// Cancel the active answer on Ctrl-C
///
/// A Ctrl-C with no answer in flight notifies the returned handle instead, so
/// the caller can leave.
pub fn spawn_interrupt_handler(canceller: claims_chat_core::Canceller) -> Arc<Notify> {
    let quit = Arc::new(Notify::new());
    let notify = Arc::clone(&quit);

    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if canceller.cancel() {
                debug!("Ctrl-C cancelled the active answer");
            } else {
                notify.notify_one();
            }
        }
    });

    quit
}

/// Run the interactive loop until `/quit`, end of input, or an idle Ctrl-C
pub async fn run_chat<B: ChatBackend + 'static>(
    controller: &mut ChatController<B>,
    rx: &mut mpsc::Receiver<ChatUpdate>,
    width: usize,
) -> Result<()> {
    let quit = spawn_interrupt_handler(controller.canceller());
    let mut renderer = UpdateRenderer::new(width);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    emit(vec![Output::Stderr(format!(
        "Conversation {}. Type /help for commands.\n\n",
        controller.conversation_id()
    ))])
    .await?;

    if !controller.history().is_empty() {
        print_history(controller, width).await?;
    }

    loop {
        emit(vec![Output::Stderr("> ".to_string())]).await?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            () = quit.notified() => None,
        };
        let Some(line) = line else {
            break;
        };

        match parse_input(&line) {
            Input::Query(query) => {
                let result = pump(controller.submit(query), rx, &mut renderer).await?;
                report_submit(result).await?;
            }
            Input::Retry => match pump(controller.retry(), rx, &mut renderer).await? {
                Ok(Some(_)) => {}
                Ok(None) => emit(vec![Output::Stderr("Nothing to retry.\n".to_string())]).await?,
                Err(e) => report_submit(Err(e)).await?,
            },
            Input::ClearError => pump(controller.clear_error(), rx, &mut renderer).await?,
            Input::History => print_history(controller, width).await?,
            Input::Help => emit(vec![Output::Stderr(HELP.to_string())]).await?,
            Input::Quit => break,
            Input::Empty => {}
            Input::Unknown(command) => {
                emit(vec![Output::Stderr(format!(
                    "Unknown command {command}. Type /help for commands.\n"
                ))])
                .await?;
            }
        }
    }

    Ok(())
}

async fn report_submit(result: Result<SessionOutcome, SubmitError>) -> Result<()> {
    match result {
        Ok(outcome) => {
            debug!(?outcome, "Turn finished");
            Ok(())
        }
        Err(e) => emit(vec![Output::Stderr(format!("{e}\n"))]).await,
    }
}

async fn print_history<B: ChatBackend + 'static>(
    controller: &ChatController<B>,
    width: usize,
) -> Result<()> {
    let outputs = controller
        .history()
        .messages()
        .iter()
        .map(|message| Output::Stdout(render_message(message, width)))
        .collect();
    emit(outputs).await
}
