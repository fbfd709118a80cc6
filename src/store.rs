use rusqlite::Connection;
use uuid::Uuid;

/// The fixed role enumeration. Role drives every menu and authorization
/// decision, so anything outside this set is rejected at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Student,
    Teacher,
    Parent,
    Admin,
}

impl Role {
    pub fn parse(raw: &str) -> Option<Role> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "student" => Some(Role::Student),
            "teacher" => Some(Role::Teacher),
            "parent" => Some(Role::Parent),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "Student",
            Role::Teacher => "Teacher",
            Role::Parent => "Parent",
            Role::Admin => "Admin",
        }
    }

    /// File name for the roster export of this role, e.g. `students_export.csv`.
    pub fn export_file_name(&self) -> String {
        format!("{}s_export.csv", self.as_str().to_ascii_lowercase())
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttendanceStatus {
    Present,
    Absent,
}

impl AttendanceStatus {
    /// Free-form operator input collapses to the two canonical values.
    /// Anything that is not "present" (case-insensitive) counts as Absent.
    pub fn coerce(raw: &str) -> AttendanceStatus {
        if raw.trim().eq_ignore_ascii_case("present") {
            AttendanceStatus::Present
        } else {
            AttendanceStatus::Absent
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "Present",
            AttendanceStatus::Absent => "Absent",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Identity {
    pub id: String,
    pub name: String,
    pub role: Role,
}

/// A student profile joined to its identity for display.
#[derive(Debug, Clone)]
pub struct StudentRecord {
    pub user_id: String,
    pub name: String,
    pub age: i64,
    pub grade: String,
}

#[derive(Debug, Clone)]
pub struct Message {
    pub id: String,
    pub sender: String,
    pub receiver: String,
    pub body: String,
    pub sent_at: String,
}

fn role_from_db(raw: &str) -> rusqlite::Result<Role> {
    Role::parse(raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            format!("unknown role: {raw}").into(),
        )
    })
}

pub fn insert_identity(conn: &Connection, id: &str, name: &str, role: Role) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO users (id, name, role) VALUES (?, ?, ?)",
        (id, name, role.as_str()),
    )?;
    Ok(())
}

pub fn insert_student_profile(
    conn: &Connection,
    user_id: &str,
    age: i64,
    grade: &str,
) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO students (user_id, age, grade) VALUES (?, ?, ?)",
        (user_id, age, grade),
    )?;
    Ok(())
}

pub fn insert_attendance(
    conn: &Connection,
    student_id: &str,
    date: &str,
    status: AttendanceStatus,
) -> anyhow::Result<String> {
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO attendance (id, student_id, date, status) VALUES (?, ?, ?, ?)",
        (&id, student_id, date, status.as_str()),
    )?;
    Ok(id)
}

pub fn insert_grade(
    conn: &Connection,
    student_id: &str,
    subject: &str,
    score: i64,
) -> anyhow::Result<String> {
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO grades (id, student_id, subject, score) VALUES (?, ?, ?, ?)",
        (&id, student_id, subject, score),
    )?;
    Ok(id)
}

pub fn insert_message(
    conn: &Connection,
    sender: &str,
    receiver: &str,
    body: &str,
    sent_at: &str,
) -> anyhow::Result<String> {
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO messages (id, sender, receiver, body, sent_at) VALUES (?, ?, ?, ?, ?)",
        (&id, sender, receiver, body, sent_at),
    )?;
    Ok(id)
}

fn collect_identities(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> anyhow::Result<Vec<Identity>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, |r| {
            let role: String = r.get(2)?;
            Ok(Identity {
                id: r.get(0)?,
                name: r.get(1)?,
                role: role_from_db(&role)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn identities_by_role(conn: &Connection, role: Role) -> anyhow::Result<Vec<Identity>> {
    collect_identities(
        conn,
        "SELECT id, name, role FROM users WHERE role = ? ORDER BY rowid",
        [role.as_str()],
    )
}

pub fn identities_by_name(conn: &Connection, name: &str) -> anyhow::Result<Vec<Identity>> {
    collect_identities(
        conn,
        "SELECT id, name, role FROM users WHERE name = ? ORDER BY rowid",
        [name],
    )
}

pub fn student_roster(conn: &Connection) -> anyhow::Result<Vec<StudentRecord>> {
    let mut stmt = conn.prepare(
        "SELECT s.user_id, u.name, s.age, s.grade
         FROM students s
         JOIN users u ON u.id = s.user_id
         ORDER BY s.rowid",
    )?;
    let rows = stmt
        .query_map([], |r| {
            Ok(StudentRecord {
                user_id: r.get(0)?,
                name: r.get(1)?,
                age: r.get(2)?,
                grade: r.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn collect_messages(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> anyhow::Result<Vec<Message>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, |r| {
            Ok(Message {
                id: r.get(0)?,
                sender: r.get(1)?,
                receiver: r.get(2)?,
                body: r.get(3)?,
                sent_at: r.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn messages_received(conn: &Connection, name: &str) -> anyhow::Result<Vec<Message>> {
    collect_messages(
        conn,
        "SELECT id, sender, receiver, body, sent_at
         FROM messages WHERE receiver = ? ORDER BY rowid",
        [name],
    )
}

pub fn messages_sent(conn: &Connection, name: &str) -> anyhow::Result<Vec<Message>> {
    collect_messages(
        conn,
        "SELECT id, sender, receiver, body, sent_at
         FROM messages WHERE sender = ? ORDER BY rowid",
        [name],
    )
}

pub fn all_messages(conn: &Connection) -> anyhow::Result<Vec<Message>> {
    collect_messages(
        conn,
        "SELECT id, sender, receiver, body, sent_at FROM messages ORDER BY rowid",
        [],
    )
}
