use rollbook::store::Role;
use rollbook::{directory, ops};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

#[test]
fn direct_message_needs_no_registered_receiver() {
    let workspace = temp_dir("rollbook-msg-direct");
    let conn = rollbook::db::open_db(&workspace).expect("open db");

    let sent = ops::send_message(&conn, "T1", "Ghost", "hello?").expect("send");
    assert_eq!(sent.sender, "T1");
    assert_eq!(sent.receiver, "Ghost");
    assert!(!sent.sent_at.is_empty());

    let inbox = ops::messages_received(&conn, "Ghost").expect("inbox");
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].body, "hello?");

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn broadcast_creates_one_message_per_student() {
    let workspace = temp_dir("rollbook-msg-broadcast");
    let conn = rollbook::db::open_db(&workspace).expect("open db");

    directory::register_student(&conn, "Ann", 12, "7th").expect("Ann");
    directory::register_student(&conn, "Ben", 11, "6th").expect("Ben");
    directory::register_student(&conn, "Cleo", 12, "7th").expect("Cleo");
    directory::register(&conn, "Pat", Role::Parent).expect("Pat");

    let n = ops::broadcast(&conn, "T1", Role::Student, "field trip friday").expect("broadcast");
    assert_eq!(n, 3);

    let sent = ops::messages_sent(&conn, "T1").expect("outbox");
    assert_eq!(sent.len(), 3);
    let receivers: BTreeSet<&str> = sent.iter().map(|m| m.receiver.as_str()).collect();
    assert_eq!(
        receivers,
        BTreeSet::from(["Ann", "Ben", "Cleo"])
    );
    for msg in &sent {
        assert_eq!(msg.body, "field trip friday");
        assert_eq!(msg.sent_at, sent[0].sent_at);
    }

    // The parent is not a Student and gets nothing.
    assert!(ops::messages_received(&conn, "Pat").expect("Pat inbox").is_empty());

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn inbox_filters_by_receiver_in_insertion_order() {
    let workspace = temp_dir("rollbook-msg-inbox");
    let conn = rollbook::db::open_db(&workspace).expect("open db");

    ops::send_message(&conn, "T1", "Ann", "first").expect("send");
    ops::send_message(&conn, "T1", "Ben", "not yours").expect("send");
    ops::send_message(&conn, "P1", "Ann", "second").expect("send");

    let inbox = ops::messages_received(&conn, "Ann").expect("inbox");
    assert_eq!(inbox.len(), 2);
    assert_eq!(inbox[0].body, "first");
    assert_eq!(inbox[0].sender, "T1");
    assert_eq!(inbox[1].body, "second");
    assert_eq!(inbox[1].sender, "P1");

    // An empty inbox is a normal outcome, not an error.
    assert!(ops::messages_received(&conn, "Zed").expect("empty inbox").is_empty());

    let _ = std::fs::remove_dir_all(workspace);
}
