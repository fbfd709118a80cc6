use rollbook::console::StdioConsole;
use rollbook::{db, session};

fn main() -> anyhow::Result<()> {
    let workspace = std::env::current_dir()?;
    let conn = db::open_db(&workspace)?;
    let mut console = StdioConsole;
    session::run(&conn, &mut console)
}
