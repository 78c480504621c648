//! Integration tests driving send and receive sessions through the dispatcher

mod common;

use std::path::PathBuf;

use ::common::session::{
    Dispatcher, EventReceiver, ReceiveInput, ReceiveOptions, ReceiveSession, ReceiveStep,
    SendInput, SendSession, SendStep, Task,
};
use ::common::ErrorKind;
use zeroize::Zeroizing;

/// Feed task events into a send session until it stops asking for work
async fn drive_send(
    mut session: SendSession,
    mut task: Option<Task>,
    dispatcher: &Dispatcher,
    events: &EventReceiver,
) -> SendSession {
    while let Some(next) = task.take() {
        dispatcher.dispatch(next);
        let event = events.recv().await.unwrap();
        (session, task) = session.update(event.into());
    }
    session
}

async fn drive_receive(
    mut session: ReceiveSession,
    mut task: Option<Task>,
    dispatcher: &Dispatcher,
    events: &EventReceiver,
) -> ReceiveSession {
    while let Some(next) = task.take() {
        dispatcher.dispatch(next);
        let event = events.recv().await.unwrap();
        (session, task) = session.update(event.into());
    }
    session
}

#[tokio::test]
async fn test_send_then_receive() {
    let (dispatcher, events) = Dispatcher::new();
    let data = common::random_bytes(64 * 1024);
    let (_src, file) = common::write_temp_file("photo.jpg", &data);
    let out = tempfile::tempdir().unwrap();

    // receiver comes up first and publishes its session key
    let (receiver, task) = ReceiveSession::start(ReceiveOptions {
        output_dir: out.path().to_path_buf(),
        ..Default::default()
    });
    let receiver = drive_receive(receiver, task, &dispatcher, &events).await;
    assert_eq!(receiver.step(), ReceiveStep::AwaitingPayload);
    let public_key = receiver.public_key().unwrap().to_string();

    // sender picks the file, then pastes the key
    let (sender, task) = SendSession::start(None, None);
    assert!(task.is_none());
    let (sender, task) = sender.update(SendInput::SelectFile(file));
    let sender = drive_send(sender, task, &dispatcher, &events).await;
    assert_eq!(sender.step(), SendStep::AwaitingPublicKey);
    assert_eq!(sender.metadata().unwrap().name, "photo.jpg");

    let (sender, task) = sender.update(SendInput::SubmitPublicKey(public_key));
    let sender = drive_send(sender, task, &dispatcher, &events).await;
    assert!(sender.is_done());
    let payload = sender.payload().unwrap().to_string();

    let (receiver, task) = receiver.update(ReceiveInput::SubmitPayload(payload));
    let receiver = drive_receive(receiver, task, &dispatcher, &events).await;
    assert!(receiver.is_done());

    let saved = receiver.saved_file().unwrap();
    assert_eq!(saved.path, out.path().join("photo.jpg"));
    assert_eq!(std::fs::read(&saved.path).unwrap(), data);
}

#[tokio::test]
async fn test_send_with_everything_up_front() {
    let (dispatcher, events) = Dispatcher::new();
    let (_src, file) = common::write_temp_file("notes.txt", b"meeting at noon");
    let public_key = common::recipient().public.encode().unwrap();

    let (sender, task) = SendSession::start(Some(file), Some(public_key));
    let sender = drive_send(sender, task, &dispatcher, &events).await;

    assert!(sender.is_done());
    let (plaintext, metadata) = ::common::envelope::open_envelope(
        sender.payload().unwrap(),
        &common::recipient().private,
    )
    .unwrap();
    assert_eq!(plaintext, b"meeting at noon");
    assert_eq!(metadata.name, "notes.txt");
}

#[tokio::test]
async fn test_send_recovers_from_bad_key() {
    let (dispatcher, events) = Dispatcher::new();
    let (_src, file) = common::write_temp_file("a.txt", b"abc");

    let (sender, task) = SendSession::start(Some(file), Some("definitely not a key".to_string()));
    let sender = drive_send(sender, task, &dispatcher, &events).await;

    assert_eq!(sender.step(), SendStep::AwaitingPublicKey);
    assert_eq!(sender.error().unwrap().kind, ErrorKind::Format);

    let good = common::recipient().public.encode().unwrap();
    let (sender, task) = sender.update(SendInput::SubmitPublicKey(good));
    let sender = drive_send(sender, task, &dispatcher, &events).await;
    assert!(sender.is_done());
    assert!(sender.error().is_none());
}

#[tokio::test]
async fn test_send_missing_file() {
    let (dispatcher, events) = Dispatcher::new();

    let (sender, task) = SendSession::start(Some(PathBuf::from("/no/such/file.txt")), None);
    let sender = drive_send(sender, task, &dispatcher, &events).await;

    assert_eq!(sender.step(), SendStep::AwaitingFile);
    assert!(sender.selected_file().is_none());
    assert_eq!(sender.error().unwrap().kind, ErrorKind::Io);
}

#[tokio::test]
async fn test_receive_from_file_and_delete() {
    let (dispatcher, events) = Dispatcher::new();
    let key_pair = common::recipient();
    let data = b"payload content";
    let payload = ::common::envelope::build_envelope(
        common::metadata_for("doc.txt", data),
        &key_pair.public,
        data,
    )
    .unwrap();
    let (_in, payload_path) = common::write_temp_file("payload.abp", format!("{payload}\n").as_bytes());
    let out = tempfile::tempdir().unwrap();

    let (receiver, task) = ReceiveSession::start(ReceiveOptions {
        private_key_pem: Some(Zeroizing::new(key_pair.private.to_pem().unwrap().as_bytes().to_vec())),
        payload: Some(std::fs::read_to_string(&payload_path).unwrap()),
        payload_path: Some(payload_path.clone()),
        delete_payload: true,
        output_dir: out.path().to_path_buf(),
    });
    assert_eq!(receiver.step(), ReceiveStep::Decrypting);
    let receiver = drive_receive(receiver, task, &dispatcher, &events).await;

    assert!(receiver.is_done());
    assert_eq!(std::fs::read(out.path().join("doc.txt")).unwrap(), data);
    assert!(!payload_path.exists());
    assert_eq!(receiver.removed_payload(), Some(payload_path.as_path()));
}

#[tokio::test]
async fn test_receive_wrong_key_returns_to_payload_entry() {
    let (dispatcher, events) = Dispatcher::new();
    let data = b"not for you";
    let payload = ::common::envelope::build_envelope(
        common::metadata_for("x.txt", data),
        &common::recipient().public,
        data,
    )
    .unwrap();
    let out = tempfile::tempdir().unwrap();

    let (receiver, task) = ReceiveSession::start(ReceiveOptions {
        private_key_pem: Some(Zeroizing::new(common::stranger().to_pem().unwrap().as_bytes().to_vec())),
        payload: Some(payload),
        output_dir: out.path().to_path_buf(),
        ..Default::default()
    });
    let receiver = drive_receive(receiver, task, &dispatcher, &events).await;

    assert_eq!(receiver.step(), ReceiveStep::AwaitingPayload);
    assert_eq!(receiver.error().unwrap().kind, ErrorKind::Crypto);
    assert!(receiver.draft_payload().is_none());
    assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);
}
