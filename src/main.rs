use clap::{Parser, Subcommand};
use topn_excel::cmd::{GenerateCommand, TitleCommand};

#[derive(Parser, Debug)]
#[command(name = "topn-excel", version, about = "Per-store daily Top-N best-seller Excel reports")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate the combined (and optionally per-store) report workbook
    Generate(GenerateCommand),
    /// Preview a report title
    Title(TitleCommand),
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Command::Generate(cmd) => cmd.exec(),
        Command::Title(cmd) => cmd.exec(),
    }
}
