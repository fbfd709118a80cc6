use anyhow::Context;
use rusqlite::{Connection, OptionalExtension};
use uuid::Uuid;

use crate::store::{self, Identity, Role};

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(f, _)
            if f.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

/// Creates a new identity. A duplicate (name, role) pair is a hard failure,
/// never a silent no-op.
pub fn register(conn: &Connection, name: &str, role: Role) -> anyhow::Result<Identity> {
    let id = Uuid::new_v4().to_string();
    store::insert_identity(conn, &id, name, role).map_err(|e| {
        match e.downcast_ref::<rusqlite::Error>() {
            Some(se) if is_unique_violation(se) => {
                anyhow::anyhow!("{} '{}' is already registered", role, name)
            }
            _ => e,
        }
    })?;
    Ok(Identity {
        id,
        name: name.to_string(),
        role,
    })
}

/// Exact (name, role) lookup. The role is required: a name may hold several
/// identities, and disambiguation happens at the caller, not here.
pub fn lookup(conn: &Connection, name: &str, role: Role) -> anyhow::Result<Option<Identity>> {
    let found = conn
        .query_row(
            "SELECT id FROM users WHERE name = ? AND role = ?",
            (name, role.as_str()),
            |r| r.get::<_, String>(0),
        )
        .optional()?;
    Ok(found.map(|id| Identity {
        id,
        name: name.to_string(),
        role,
    }))
}

/// Every identity registered under `name`, in registration order.
pub fn identities_for(conn: &Connection, name: &str) -> anyhow::Result<Vec<Identity>> {
    store::identities_by_name(conn, name)
}

/// Registers a student identity together with its profile row. Both inserts
/// run in one transaction so a failure leaves no orphaned identity.
pub fn register_student(
    conn: &Connection,
    name: &str,
    age: i64,
    grade: &str,
) -> anyhow::Result<Identity> {
    let tx = conn.unchecked_transaction()?;
    let identity = register(&tx, name, Role::Student)
        .with_context(|| format!("registering student '{}'", name))?;
    store::insert_student_profile(&tx, &identity.id, age, grade)?;
    tx.commit()?;
    Ok(identity)
}
