use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use issue_maker::logging::{self, LogFormat};

mod cmd;

#[derive(Parser)]
#[command(name = "issue-maker")]
#[command(version, about = "Turn a markdown requirements document into GitHub issues")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log line format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the web server (API + embedded frontend)
    Serve {
        /// Port to serve on (overrides PORT)
        #[arg(short, long)]
        port: Option<u16>,

        /// Address to bind (overrides HOST)
        #[arg(long)]
        host: Option<String>,

        /// Enable dev mode (CORS permissive for a local frontend dev server)
        #[arg(long)]
        dev: bool,
    },
    /// Generate issue suggestions for a markdown file and print them as JSON
    Generate {
        /// Markdown requirements document (built-in sample when omitted)
        file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.log_format);

    match &cli.command {
        Commands::Serve { port, host, dev } => {
            cmd::cmd_serve(*port, host.clone(), *dev).await?;
        }
        Commands::Generate { file } => {
            cmd::cmd_generate(file.as_deref()).await?;
        }
    }
    Ok(())
}
