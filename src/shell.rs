use std::io::{BufRead, Write};
use std::path::PathBuf;

use crate::ingest::read_upload;
use crate::report::{render_text, OutputFormat};
use crate::session::ViewState;

const COMMANDS: &str = "\
Commands:
  login <id> <password>   open the results view
  upload <path>           load a spreadsheet (first sheet only)
  all                     calculate all results
  blocks                  list blocks found in the upload
  select <block>          choose a block (empty to clear)
  block                   calculate results for the selected block
  report [text|json]      print everything calculated so far
  help                    how to use this tool
  close                   close the help text
  quit                    leave the session";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Login { id: String, password: String },
    Upload(PathBuf),
    All,
    Blocks,
    Select(String),
    Block,
    Report(Option<OutputFormat>),
    Help,
    Close,
    Quit,
    Invalid(String),
}

impl ShellCommand {
    /// `None` for a blank line.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let (word, rest) = line
            .split_once(char::is_whitespace)
            .map(|(word, rest)| (word, rest.trim()))
            .unwrap_or((line, ""));

        let command = match word {
            "login" => {
                let mut parts = rest.split_whitespace();
                match (parts.next(), parts.next(), parts.next()) {
                    (Some(id), Some(password), None) => ShellCommand::Login {
                        id: id.to_string(),
                        password: password.to_string(),
                    },
                    _ => ShellCommand::Invalid("usage: login <id> <password>".to_string()),
                }
            }
            "upload" if rest.is_empty() => {
                ShellCommand::Invalid("usage: upload <path>".to_string())
            }
            "upload" => ShellCommand::Upload(PathBuf::from(rest)),
            "all" => ShellCommand::All,
            "blocks" => ShellCommand::Blocks,
            "select" => ShellCommand::Select(rest.to_string()),
            "block" => ShellCommand::Block,
            "report" => match rest {
                "" => ShellCommand::Report(None),
                "text" => ShellCommand::Report(Some(OutputFormat::Text)),
                "json" => ShellCommand::Report(Some(OutputFormat::Json)),
                _ => ShellCommand::Invalid("usage: report [text|json]".to_string()),
            },
            "help" => ShellCommand::Help,
            "close" => ShellCommand::Close,
            "quit" | "exit" => ShellCommand::Quit,
            other => ShellCommand::Invalid(format!("unknown command '{other}'\n{COMMANDS}")),
        };
        Some(command)
    }
}

/// Drives `state` from `input` one command per line until `quit` or EOF.
///
/// Action failures are printed and the session carries on.
pub async fn run<R, W>(
    state: &mut ViewState,
    input: R,
    output: &mut W,
    format: OutputFormat,
) -> anyhow::Result<()>
where
    R: BufRead,
    W: Write,
{
    writeln!(output, "Excel Result Analyzer. Log in to continue.")?;
    writeln!(output, "{COMMANDS}")?;

    for line in input.lines() {
        let Some(command) = ShellCommand::parse(&line?) else {
            continue;
        };

        match command {
            ShellCommand::Login { id, password } => match state.login(&id, &password) {
                Ok(()) => writeln!(output, "Logged in.")?,
                Err(err) => writeln!(output, "{err}")?,
            },
            ShellCommand::Upload(path) => match read_upload(&path).await {
                Ok(upload) => {
                    let count = upload.rows.len();
                    match state.upload(upload) {
                        Ok(blocks) => writeln!(
                            output,
                            "Loaded {count} rows; {} blocks found.",
                            blocks.len()
                        )?,
                        Err(err) => writeln!(output, "{err}")?,
                    }
                }
                Err(err) => writeln!(output, "error: {err:#}")?,
            },
            ShellCommand::All => match state.calculate_all() {
                Ok(result) => write!(output, "{}", render_text("All Results", result))?,
                Err(err) => writeln!(output, "{err}")?,
            },
            ShellCommand::Blocks => {
                if state.blocks.is_empty() {
                    writeln!(output, "No blocks found.")?;
                }
                for block in &state.blocks {
                    let marker = if state.selected_block.as_deref() == Some(block.as_str()) {
                        "*"
                    } else {
                        " "
                    };
                    writeln!(output, "{marker} {block}")?;
                }
            }
            ShellCommand::Select(block) => match state.select_block(&block) {
                Ok(()) if block.is_empty() => writeln!(output, "Block selection cleared.")?,
                Ok(()) => writeln!(output, "Selected block {block}.")?,
                Err(err) => writeln!(output, "{err}")?,
            },
            ShellCommand::Block => match state.calculate_block() {
                Ok(result) => {
                    let title = match &result.filter {
                        Some(block) => format!("Block {block}"),
                        None => "All Blocks".to_string(),
                    };
                    write!(output, "{}", render_text(&title, result))?;
                }
                Err(err) => writeln!(output, "{err}")?,
            },
            ShellCommand::Report(requested) => {
                let rendered = state.report().render(requested.unwrap_or(format))?;
                writeln!(output, "{rendered}")?;
            }
            ShellCommand::Help => writeln!(output, "{}", state.open_help())?,
            ShellCommand::Close => state.close_help(),
            ShellCommand::Quit => break,
            ShellCommand::Invalid(message) => writeln!(output, "{message}")?,
        }
    }

    Ok(())
}
