use std::io::{self, BufRead, Write};

/// The interactive text channel. The session and the domain operations only
/// ever talk to the operator through this trait, so everything above it can
/// run against a scripted console in tests.
pub trait Console {
    /// Prints `msg` without a trailing newline and blocks for one line of input.
    fn prompt(&mut self, msg: &str) -> anyhow::Result<String>;

    /// Prints `msg` followed by a newline.
    fn say(&mut self, msg: &str);
}

/// Console over the process's stdin/stdout.
pub struct StdioConsole;

impl Console for StdioConsole {
    fn prompt(&mut self, msg: &str) -> anyhow::Result<String> {
        let mut stdout = io::stdout();
        write!(stdout, "{msg}")?;
        stdout.flush()?;
        let mut line = String::new();
        let n = io::stdin().lock().read_line(&mut line)?;
        if n == 0 {
            anyhow::bail!("input channel closed");
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    fn say(&mut self, msg: &str) {
        println!("{msg}");
    }
}
