use rollbook::directory;
use rollbook::store::Role;
use rusqlite::Connection;
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

fn count(conn: &Connection, sql: &str) -> i64 {
    conn.query_row(sql, [], |r| r.get(0)).expect("count query")
}

#[test]
fn register_then_lookup_returns_matching_identity() {
    let workspace = temp_dir("rollbook-dir-roundtrip");
    let conn = rollbook::db::open_db(&workspace).expect("open db");

    let reg = directory::register(&conn, "Ms. Frizzle", Role::Teacher).expect("register");
    assert_eq!(reg.name, "Ms. Frizzle");
    assert_eq!(reg.role, Role::Teacher);
    assert!(!reg.id.is_empty());

    let found = directory::lookup(&conn, "Ms. Frizzle", Role::Teacher)
        .expect("lookup")
        .expect("identity present");
    assert_eq!(found.id, reg.id);
    assert_eq!(found.name, "Ms. Frizzle");
    assert_eq!(found.role, Role::Teacher);

    assert!(directory::lookup(&conn, "Ms. Frizzle", Role::Parent)
        .expect("lookup other role")
        .is_none());
    assert!(directory::lookup(&conn, "Nobody", Role::Teacher)
        .expect("lookup unknown name")
        .is_none());

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn duplicate_name_role_fails_but_new_role_is_a_second_identity() {
    let workspace = temp_dir("rollbook-dir-duplicate");
    let conn = rollbook::db::open_db(&workspace).expect("open db");

    let first = directory::register(&conn, "Sam", Role::Parent).expect("first register");
    let dup = directory::register(&conn, "Sam", Role::Parent);
    assert!(dup.is_err(), "duplicate (name, role) must fail");

    let second = directory::register(&conn, "Sam", Role::Teacher).expect("same name, new role");
    assert_ne!(first.id, second.id);

    let held = directory::identities_for(&conn, "Sam").expect("identities_for");
    assert_eq!(held.len(), 2);
    assert_eq!(held[0].role, Role::Parent);
    assert_eq!(held[1].role, Role::Teacher);

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn register_student_creates_identity_and_profile() {
    let workspace = temp_dir("rollbook-dir-student");
    let conn = rollbook::db::open_db(&workspace).expect("open db");

    let ann = directory::register_student(&conn, "Ann", 12, "7th").expect("register student");
    assert_eq!(ann.role, Role::Student);

    assert_eq!(count(&conn, "SELECT COUNT(*) FROM users"), 1);
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM students"), 1);

    let (user_id, age, grade): (String, i64, String) = conn
        .query_row("SELECT user_id, age, grade FROM students", [], |r| {
            Ok((r.get(0)?, r.get(1)?, r.get(2)?))
        })
        .expect("profile row");
    assert_eq!(user_id, ann.id);
    assert_eq!(age, 12);
    assert_eq!(grade, "7th");

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn register_student_duplicate_rolls_back_without_orphans() {
    let workspace = temp_dir("rollbook-dir-rollback");
    let conn = rollbook::db::open_db(&workspace).expect("open db");

    directory::register_student(&conn, "Ann", 12, "7th").expect("first register");
    let dup = directory::register_student(&conn, "Ann", 13, "8th");
    assert!(dup.is_err(), "second student registration for the same name must fail");

    // The failed attempt must not leave a second identity or profile behind.
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM users"), 1);
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM students"), 1);

    let _ = std::fs::remove_dir_all(workspace);
}
