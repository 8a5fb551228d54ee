use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use result_analyzer::config::Config;
use result_analyzer::ingest::read_upload;
use result_analyzer::report::OutputFormat;
use result_analyzer::session::ViewState;
use result_analyzer::{logging, shell};

#[derive(Parser)]
#[command(name = "result-analyzer")]
#[command(about = "Pass/fail and letter-grade statistics for a spreadsheet of results", long_about = None)]
struct Cli {
    /// TOML file with `id`, `password` and `default_format`
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log debug detail to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct Login {
    #[arg(long)]
    id: String,
    #[arg(long)]
    password: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Calculate all results, and block results when a block is given
    Analyze {
        #[command(flatten)]
        login: Login,
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        block: Option<String>,
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// List the blocks found in a spreadsheet
    Blocks {
        #[command(flatten)]
        login: Login,
        #[arg(long)]
        file: PathBuf,
    },
    /// Interactive session reading commands from stdin
    Shell {
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose)?;

    let config = Config::load(cli.config.as_deref())?;
    let mut state = ViewState::new(config.credentials());

    match cli.command {
        Commands::Analyze {
            login,
            file,
            block,
            format,
            out,
        } => {
            state.login(&login.id, &login.password)?;
            let upload = read_upload(&file).await?;
            state.upload(upload)?;
            state.calculate_all()?;
            if let Some(block) = block.as_deref() {
                state.select_block(block)?;
                state.calculate_block()?;
            }

            let rendered = state
                .report()
                .render(format.unwrap_or(config.default_format))?;
            match out {
                Some(out) => {
                    std::fs::write(&out, rendered)
                        .with_context(|| format!("failed to write {}", out.display()))?;
                    println!("Report written to {}.", out.display());
                }
                None => print!("{rendered}"),
            }
        }
        Commands::Blocks { login, file } => {
            state.login(&login.id, &login.password)?;
            let upload = read_upload(&file).await?;
            let blocks = state.upload(upload)?;
            if blocks.is_empty() {
                println!("No blocks found in {}.", file.display());
            }
            for block in blocks {
                println!("{block}");
            }
        }
        Commands::Shell { format } => {
            let stdin = std::io::stdin();
            let mut stdout = std::io::stdout();
            shell::run(
                &mut state,
                stdin.lock(),
                &mut stdout,
                format.unwrap_or(config.default_format),
            )
            .await?;
        }
    }

    Ok(())
}
