use super::connection::{Connection, DisconnectReason};
use crate::router::Namespace;
use tokio::sync::mpsc;
use tungstenite::protocol::Message as WsMessage;
use tungstenite::protocol::frame::coding::CloseCode;

#[test]
fn test_connection_new() {
    let (tx, _) = mpsc::unbounded_channel::<WsMessage>();
    let connection = Connection::new(Namespace::parse("/admin"), None, tx);
    assert!(!connection.id.is_empty());
    assert_eq!(connection.namespace.as_str(), "/admin");
    assert!(connection.age() >= chrono::Duration::zero());
}

#[test]
fn test_connection_ids_are_unique() {
    let (tx, _) = mpsc::unbounded_channel::<WsMessage>();
    let a = Connection::new(Namespace::root(), None, tx.clone());
    let b = Connection::new(Namespace::root(), None, tx);
    assert_ne!(a.id, b.id);
}

#[test]
fn test_close_queues_close_frame() {
    let (tx, mut rx) = mpsc::unbounded_channel::<WsMessage>();
    let connection = Connection::new(Namespace::root(), None, tx);

    assert!(connection.close(CloseCode::Away, "restarting"));

    match rx.try_recv().unwrap() {
        WsMessage::Close(Some(frame)) => {
            assert_eq!(frame.code, CloseCode::Away);
            assert_eq!(frame.reason.as_str(), "restarting");
        }
        other => panic!("Expected a close frame, got {other:?}"),
    }
}

#[test]
fn test_close_after_task_gone() {
    let (tx, rx) = mpsc::unbounded_channel::<WsMessage>();
    let connection = Connection::new(Namespace::root(), None, tx);
    drop(rx);
    assert!(!connection.close(CloseCode::Away, "restarting"));
}

#[test]
fn test_disconnect_reason_display() {
    assert_eq!(DisconnectReason::PingTimeout.to_string(), "ping timeout");
    assert_eq!(DisconnectReason::ServerClosed.to_string(), "server closed");
}
