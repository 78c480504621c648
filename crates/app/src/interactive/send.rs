use std::path::PathBuf;

use anyhow::{anyhow, bail};

use common::session::{Dispatcher, SendInput, SendSession, SendStep};

use super::{InputLines, Screen};

fn describe(session: &SendSession) -> String {
    let mut status = String::new();
    if let Some(failure) = session.error() {
        status.push_str(&format!("Error: {}\n", failure));
    }

    match session.step() {
        SendStep::AwaitingFile if session.is_busy() => status.push_str("Opening file..."),
        SendStep::AwaitingFile => status.push_str("Enter the path of the file to send:"),
        SendStep::ReadyingFile => status.push_str("Extracting metadata..."),
        SendStep::AwaitingPublicKey => {
            if let Some(metadata) = session.metadata() {
                status.push_str(&format!(
                    "File: {} ({} bytes, sha256 {})\n",
                    metadata.name, metadata.size, metadata.hash
                ));
            }
            status.push_str("Paste the recipient's public key, then press Enter on an empty line:");
        }
        SendStep::ReadyingPublicKey => status.push_str("Encrypting..."),
        SendStep::ReadyToSend => status.push_str("Payload ready."),
    }
    status
}

/// Run a send session until the payload is built
pub async fn run(file: Option<PathBuf>, public_key: Option<String>) -> anyhow::Result<String> {
    let (dispatcher, events) = Dispatcher::new();
    let mut input = InputLines::stdin();
    let mut screen = Screen::default();

    let (mut session, task) = SendSession::start(file, public_key);
    if let Some(task) = task {
        dispatcher.dispatch(task);
    }

    loop {
        screen.show(describe(&session));
        if session.is_done() {
            break;
        }

        let next = tokio::select! {
            event = events.recv() => match event {
                Some(event) => SendInput::Task(event),
                None => bail!("task dispatcher stopped"),
            },
            line = input.next_submission(session.step() == SendStep::AwaitingPublicKey), if !session.is_busy() => match line? {
                Some(line) if line.is_empty() => continue,
                Some(line) => match session.step() {
                    SendStep::AwaitingFile => SendInput::SelectFile(PathBuf::from(line)),
                    SendStep::AwaitingPublicKey => SendInput::SubmitPublicKey(line),
                    _ => continue,
                },
                None => bail!("input closed before the payload was ready"),
            },
            _ = tokio::signal::ctrl_c() => bail!("interrupted"),
        };

        let task;
        (session, task) = session.update(next);
        if let Some(task) = task {
            dispatcher.dispatch(task);
        }
    }

    session
        .payload()
        .map(str::to_string)
        .ok_or_else(|| anyhow!("session finished without a payload"))
}
