use rusqlite::Connection;

use crate::console::Console;
use crate::directory;
use crate::ops::{self, InputError};
use crate::store::{self, Identity, Message, Role};

/// Where a menu dispatch leaves the state machine. Unknown commands stay in
/// place with no output and no mutation; logout is role-scoped or full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Stay,
    LogoutRole,
    LogoutSystem,
}

const DIVIDER: &str = "------------------------------";

/// Runs the interactive session until a system logout or a fatal rejection.
///
/// Each iteration of the outer loop is one login: name resolution, role
/// selection or resume, then the role menu until a logout. A role-scoped
/// logout loops back here under the same store, so identities registered
/// earlier in the run can be resumed.
pub fn run(conn: &Connection, console: &mut dyn Console) -> anyhow::Result<()> {
    loop {
        console.say("Welcome to the Student Management System");
        let name = console.prompt("Enter your name: ")?;

        let identity = match resolve_login(conn, console, &name)? {
            Some(v) => v,
            // Out-of-enumeration role: fatal to the whole session.
            None => return Ok(()),
        };

        match role_menu(conn, console, &identity)? {
            Transition::LogoutSystem => {
                console.say("Logged out of the system.");
                return Ok(());
            }
            _ => {
                console.say(&format!("Logged out from {} role.", identity.role));
            }
        }
    }
}

fn prompt_role(console: &mut dyn Console, msg: &str) -> anyhow::Result<Option<Role>> {
    let raw = console.prompt(msg)?;
    match Role::parse(&raw) {
        Some(role) => Ok(Some(role)),
        None => {
            console.say("Invalid role. Exiting.");
            Ok(None)
        }
    }
}

/// Resolves the operator's name to an identity, registering one if needed.
/// Returns None on an invalid role declaration, which ends the session.
fn resolve_login(
    conn: &Connection,
    console: &mut dyn Console,
    name: &str,
) -> anyhow::Result<Option<Identity>> {
    let held = directory::identities_for(conn, name)?;
    if held.is_empty() {
        let Some(role) = prompt_role(
            console,
            "Enter your role (Student / Teacher / Parent / Admin): ",
        )?
        else {
            return Ok(None);
        };
        let identity = directory::register(conn, name, role)?;
        console.say(&format!(
            "{} '{}' registered with ID {}.",
            identity.role, identity.name, identity.id
        ));
        return Ok(Some(identity));
    }

    let roles = held
        .iter()
        .map(|i| i.role.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    console.say(&format!("'{}' is already registered as: {}.", name, roles));
    let fresh = console.prompt("Register a new role for this name? (yes/no): ")?;
    if fresh.trim().eq_ignore_ascii_case("yes") {
        let Some(role) = prompt_role(
            console,
            "Enter your new role (Student / Teacher / Parent / Admin): ",
        )?
        else {
            return Ok(None);
        };
        let identity = directory::register(conn, name, role)?;
        console.say(&format!(
            "{} '{}' registered with ID {}.",
            identity.role, identity.name, identity.id
        ));
        return Ok(Some(identity));
    }

    if held.len() == 1 {
        return Ok(held.into_iter().next());
    }

    // The name holds several roles; make the operator pick one explicitly.
    let Some(role) = prompt_role(console, &format!("Resume as which role ({})? ", roles))? else {
        return Ok(None);
    };
    match held.into_iter().find(|i| i.role == role) {
        Some(identity) => Ok(Some(identity)),
        None => {
            console.say(&format!("'{}' holds no {} identity. Exiting.", name, role));
            Ok(None)
        }
    }
}

fn role_menu(
    conn: &Connection,
    console: &mut dyn Console,
    identity: &Identity,
) -> anyhow::Result<Transition> {
    loop {
        show_menu(console, identity.role);
        let choice = console.prompt("Enter your choice: ")?;
        match dispatch(conn, console, identity, choice.trim()) {
            Ok(Transition::Stay) => continue,
            Ok(t) => return Ok(t),
            Err(e) => {
                // Malformed numeric input aborts the operation, not the
                // session; everything else is a hard stop.
                if e.downcast_ref::<InputError>().is_some() {
                    console.say(&format!("{}. Operation aborted.", e));
                    continue;
                }
                return Err(e);
            }
        }
    }
}

fn show_menu(console: &mut dyn Console, role: Role) {
    console.say(&format!("MENU ({})", role));
    match role {
        Role::Teacher => {
            console.say("1. Register New Student");
            console.say("2. View All Students");
            console.say("3. Mark Attendance for All");
            console.say("4. Assign Grades to All Students");
            console.say("5. Send Message");
            console.say("6. Export Students CSV");
            console.say("7. View Sent Messages");
        }
        Role::Student => {
            console.say("1. View Messages");
        }
        Role::Parent => {
            console.say("1. View Messages");
            console.say("2. Send Message to Teacher");
        }
        Role::Admin => {
            console.say("1. View All Messages");
            console.say("2. Export Students");
            console.say("3. Export Teachers");
            console.say("4. Export Parents");
        }
    }
    console.say("9. Logout");
}

/// One menu command under `identity`'s role. Public so tests can drive the
/// state machine without the interactive loop; an unrecognized choice is a
/// silent `Stay` that mutates nothing.
pub fn dispatch(
    conn: &Connection,
    console: &mut dyn Console,
    identity: &Identity,
    choice: &str,
) -> anyhow::Result<Transition> {
    if choice == "9" {
        return logout(console);
    }
    match identity.role {
        Role::Teacher => teacher_command(conn, console, identity, choice),
        Role::Student => student_command(conn, console, identity, choice),
        Role::Parent => parent_command(conn, console, identity, choice),
        Role::Admin => admin_command(conn, console, choice),
    }
}

fn logout(console: &mut dyn Console) -> anyhow::Result<Transition> {
    let scope = console.prompt("Logout from system or just current role? (system/role): ")?;
    if scope.trim().eq_ignore_ascii_case("system") {
        Ok(Transition::LogoutSystem)
    } else {
        Ok(Transition::LogoutRole)
    }
}

fn teacher_command(
    conn: &Connection,
    console: &mut dyn Console,
    identity: &Identity,
    choice: &str,
) -> anyhow::Result<Transition> {
    match choice {
        "1" => {
            ops::register_student_interactive(conn, console)?;
        }
        "2" => {
            console.say("All Students:");
            for student in store::identities_by_role(conn, Role::Student)? {
                console.say(&format!(
                    "ID: {}, Name: {}, Role: {}",
                    student.id, student.name, student.role
                ));
            }
        }
        "3" => ops::mark_attendance_for_all(conn, console)?,
        "4" => ops::assign_grades_for_all(conn, console)?,
        "5" => send_message_menu(conn, console, identity)?,
        "6" => export_to_cwd(conn, console, Role::Student)?,
        "7" => {
            console.say(&format!("Messages sent by {}:", identity.name));
            for msg in ops::messages_sent(conn, &identity.name)? {
                console.say(&format!("To: {}, Date: {}", msg.receiver, msg.sent_at));
                console.say(&format!("Message: {}", msg.body));
                console.say(DIVIDER);
            }
        }
        _ => {}
    }
    Ok(Transition::Stay)
}

fn send_message_menu(
    conn: &Connection,
    console: &mut dyn Console,
    identity: &Identity,
) -> anyhow::Result<()> {
    console.say("Send message to:");
    console.say("1. Single Student");
    console.say("2. Single Parent");
    console.say("3. Group of Students");
    console.say("4. Group of Parents");
    let opt = console.prompt("Choice: ")?;
    match opt.trim() {
        "1" | "2" => {
            let who = if opt.trim() == "1" { "Student" } else { "Parent" };
            let receiver = console.prompt(&format!("{} name: ", who))?;
            let body = console.prompt("Enter message: ")?;
            ops::send_message(conn, &identity.name, &receiver, &body)?;
            console.say(&format!(
                "Message sent from {} to {}.",
                identity.name, receiver
            ));
        }
        "3" => {
            let body = console.prompt("Enter group message to Students: ")?;
            let n = ops::broadcast(conn, &identity.name, Role::Student, &body)?;
            console.say(&format!("Message sent to {} Students.", n));
        }
        "4" => {
            let body = console.prompt("Enter group message to Parents: ")?;
            let n = ops::broadcast(conn, &identity.name, Role::Parent, &body)?;
            console.say(&format!("Message sent to {} Parents.", n));
        }
        _ => {}
    }
    Ok(())
}

fn show_inbox(console: &mut dyn Console, name: &str, messages: &[Message]) {
    if messages.is_empty() {
        console.say(&format!("No messages found for {}.", name));
        return;
    }
    console.say(&format!("Messages for {}:", name));
    for msg in messages {
        console.say(&format!("From: {}, Date: {}", msg.sender, msg.sent_at));
        console.say(&format!("Message: {}", msg.body));
        console.say(DIVIDER);
    }
}

fn student_command(
    conn: &Connection,
    console: &mut dyn Console,
    identity: &Identity,
    choice: &str,
) -> anyhow::Result<Transition> {
    if choice == "1" {
        let inbox = ops::messages_received(conn, &identity.name)?;
        show_inbox(console, &identity.name, &inbox);
    }
    Ok(Transition::Stay)
}

fn parent_command(
    conn: &Connection,
    console: &mut dyn Console,
    identity: &Identity,
    choice: &str,
) -> anyhow::Result<Transition> {
    match choice {
        "1" => {
            let inbox = ops::messages_received(conn, &identity.name)?;
            show_inbox(console, &identity.name, &inbox);
        }
        "2" => {
            let receiver = console.prompt("Send message to Teacher name: ")?;
            let body = console.prompt("Enter message: ")?;
            ops::send_message(conn, &identity.name, &receiver, &body)?;
            console.say(&format!(
                "Message sent from {} to {}.",
                identity.name, receiver
            ));
        }
        _ => {}
    }
    Ok(Transition::Stay)
}

fn export_to_cwd(conn: &Connection, console: &mut dyn Console, role: Role) -> anyhow::Result<()> {
    let path = ops::export_role(conn, &std::env::current_dir()?, role)?;
    console.say(&format!("{}s exported to: {}", role, path.display()));
    Ok(())
}

fn admin_command(
    conn: &Connection,
    console: &mut dyn Console,
    choice: &str,
) -> anyhow::Result<Transition> {
    match choice {
        "1" => {
            console.say("All Messages:");
            for msg in store::all_messages(conn)? {
                console.say(&format!(
                    "From: {} To: {} Date: {}",
                    msg.sender, msg.receiver, msg.sent_at
                ));
                console.say(&format!("Message: {}", msg.body));
                console.say(DIVIDER);
            }
        }
        "2" => export_to_cwd(conn, console, Role::Student)?,
        "3" => export_to_cwd(conn, console, Role::Teacher)?,
        "4" => export_to_cwd(conn, console, Role::Parent)?,
        _ => {}
    }
    Ok(Transition::Stay)
}
