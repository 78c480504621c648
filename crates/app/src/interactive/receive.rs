use anyhow::bail;

use common::session::{Dispatcher, ReceiveInput, ReceiveOptions, ReceiveSession, ReceiveStep};

use super::{InputLines, Screen};

fn describe(session: &ReceiveSession) -> String {
    let mut status = String::new();
    if let Some(failure) = session.error() {
        status.push_str(&format!("Error: {}\n", failure));
    }

    match session.step() {
        ReceiveStep::GeneratingKey if session.can_retry() => {
            status.push_str("Press Enter to retry key generation (Ctrl-C to quit).")
        }
        ReceiveStep::GeneratingKey => status.push_str("Generating session key pair..."),
        ReceiveStep::AwaitingPayload => {
            if let Some(public_key) = session.public_key() {
                status.push_str(&format!(
                    "Your public key, share it with the sender:\n\n{}\n\n",
                    public_key
                ));
            }
            if session.draft_payload().is_some() {
                status.push_str(
                    "Press Enter to decrypt the loaded payload, or paste another and end it with an empty line:",
                );
            } else {
                status.push_str("Paste the payload, then press Enter on an empty line:");
            }
        }
        ReceiveStep::Decrypting => status.push_str("Decrypting..."),
        ReceiveStep::Success if session.is_busy() => status.push_str("Deleting payload file..."),
        ReceiveStep::Success => status.push_str("Done."),
    }
    status
}

fn on_line(session: &ReceiveSession, line: String) -> Option<ReceiveInput> {
    match session.step() {
        ReceiveStep::GeneratingKey if session.can_retry() => Some(ReceiveInput::Retry),
        ReceiveStep::AwaitingPayload if line.is_empty() => session
            .draft_payload()
            .map(|draft| ReceiveInput::SubmitPayload(draft.to_string())),
        ReceiveStep::AwaitingPayload => Some(ReceiveInput::SubmitPayload(line)),
        _ => None,
    }
}

/// Run a receive session until the file is saved
pub async fn run(options: ReceiveOptions) -> anyhow::Result<ReceiveSession> {
    let (dispatcher, events) = Dispatcher::new();
    let mut input = InputLines::stdin();
    let mut screen = Screen::default();

    let (mut session, task) = ReceiveSession::start(options);
    if let Some(warning) = session.warning() {
        eprintln!("Warning: {}", warning);
    }
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
                Some(event) => ReceiveInput::Task(event),
                None => bail!("task dispatcher stopped"),
            },
            line = input.next_submission(session.step() == ReceiveStep::AwaitingPayload), if !session.is_busy() => match line? {
                Some(line) => match on_line(&session, line) {
                    Some(next) => next,
                    None => continue,
                },
                None => bail!("input closed before the payload was decrypted"),
            },
            _ = tokio::signal::ctrl_c() => bail!("interrupted"),
        };

        let task;
        (session, task) = session.update(next);
        if let Some(task) = task {
            dispatcher.dispatch(task);
        }
    }

    Ok(session)
}
