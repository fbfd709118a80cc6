use std::path::{Path, PathBuf};

use chrono::Local;
use rusqlite::Connection;

use crate::console::Console;
use crate::directory;
use crate::store::{self, AttendanceStatus, Identity, Message, Role};

/// Malformed numeric operator input. Fatal to the current operation only; the
/// session reports it and stays in the menu so the operation can be restarted.
#[derive(Debug)]
pub struct InputError {
    pub field: &'static str,
    pub raw: String,
}

impl std::fmt::Display for InputError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid number for {}: '{}'", self.field, self.raw)
    }
}

impl std::error::Error for InputError {}

fn prompt_number(console: &mut dyn Console, msg: &str, field: &'static str) -> anyhow::Result<i64> {
    let raw = console.prompt(msg)?;
    raw.trim().parse::<i64>().map_err(|_| {
        anyhow::Error::new(InputError {
            field,
            raw: raw.trim().to_string(),
        })
    })
}

/// Prompts for a new student's details and registers identity + profile.
pub fn register_student_interactive(
    conn: &Connection,
    console: &mut dyn Console,
) -> anyhow::Result<Identity> {
    let name = console.prompt("Student name: ")?;
    let age = prompt_number(console, "Student age: ", "age")?;
    let grade = console.prompt("Student grade: ")?;
    let identity = directory::register_student(conn, &name, age, &grade)?;
    console.say(&format!(
        "Student '{}' registered with ID {}.",
        identity.name, identity.id
    ));
    Ok(identity)
}

/// Solicits one Present/Absent judgement per registered student and records
/// it under today's date. Covers every student on each invocation; any answer
/// other than "present" (case-insensitive) is coerced to Absent.
pub fn mark_attendance_for_all(conn: &Connection, console: &mut dyn Console) -> anyhow::Result<()> {
    let roster = store::student_roster(conn)?;
    let today = Local::now().date_naive().to_string();
    console.say("Marking attendance for all students:");
    for student in &roster {
        let raw = console.prompt(&format!(
            "Is {} (ID {}) present? (Present/Absent): ",
            student.name, student.user_id
        ))?;
        let status = AttendanceStatus::coerce(&raw);
        store::insert_attendance(conn, &student.user_id, &today, status)?;
    }
    console.say("Attendance recorded.");
    Ok(())
}

/// Solicits a subject list once, then a score per (student, subject). Each
/// triple becomes one grade row. A non-numeric count or score aborts the
/// operation; rows inserted before the failure stay (no all-or-nothing).
pub fn assign_grades_for_all(conn: &Connection, console: &mut dyn Console) -> anyhow::Result<()> {
    let roster = store::student_roster(conn)?;
    let count = prompt_number(
        console,
        "How many subjects for all students? ",
        "subject count",
    )?;
    let mut subjects = Vec::new();
    for i in 0..count.max(0) {
        subjects.push(console.prompt(&format!("Enter name for subject {}: ", i + 1))?);
    }
    for student in &roster {
        console.say(&format!(
            "Entering marks for {} (ID {}):",
            student.name, student.user_id
        ));
        for subject in &subjects {
            let score = prompt_number(console, &format!("Score for {}: ", subject), "score")?;
            store::insert_grade(conn, &student.user_id, subject, score)?;
        }
    }
    console.say("Grades recorded.");
    Ok(())
}

/// Inserts one message stamped at creation time. The receiver is a loose name
/// reference; no existence check is made.
pub fn send_message(
    conn: &Connection,
    sender: &str,
    receiver: &str,
    body: &str,
) -> anyhow::Result<Message> {
    let sent_at = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let id = store::insert_message(conn, sender, receiver, body, &sent_at)?;
    Ok(Message {
        id,
        sender: sender.to_string(),
        receiver: receiver.to_string(),
        body: body.to_string(),
        sent_at,
    })
}

/// One message per identity of the target role, sharing body and timestamp
/// but recorded independently. Returns the recipient count.
pub fn broadcast(
    conn: &Connection,
    sender: &str,
    to_role: Role,
    body: &str,
) -> anyhow::Result<usize> {
    let recipients = store::identities_by_role(conn, to_role)?;
    let sent_at = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    for identity in &recipients {
        store::insert_message(conn, sender, &identity.name, body, &sent_at)?;
    }
    Ok(recipients.len())
}

pub fn messages_received(conn: &Connection, name: &str) -> anyhow::Result<Vec<Message>> {
    store::messages_received(conn, name)
}

pub fn messages_sent(conn: &Connection, name: &str) -> anyhow::Result<Vec<Message>> {
    store::messages_sent(conn, name)
}

fn csv_quote(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// Writes every identity of `role` to `<role-lowercase>s_export.csv` under
/// `dir`, overwriting any previous export. Returns the written path.
pub fn export_role(conn: &Connection, dir: &Path, role: Role) -> anyhow::Result<PathBuf> {
    let identities = store::identities_by_role(conn, role)?;
    let mut out = String::from("ID,Name,Role\n");
    for identity in &identities {
        out.push_str(&format!(
            "{},{},{}\n",
            csv_quote(&identity.id),
            csv_quote(&identity.name),
            identity.role
        ));
    }
    let path = dir.join(role.export_file_name());
    std::fs::write(&path, out)?;
    Ok(path)
}
