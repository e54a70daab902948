use std::path::PathBuf;

use clap::Subcommand;

#[derive(Subcommand)]
pub enum GenerateSubcommands {
    /// JSON schema of the instance document
    JsonSchema {
        #[arg(long, short = 'o')]
        out: PathBuf,
    },
    /// JSON schema of the task graph document
    GraphSchema {
        #[arg(long, short = 'o')]
        out: PathBuf,
    },
}

fn write_schema(out: PathBuf, schema: String) -> Result<(), anyhow::Error> {
    if let Some(parent) = out.parent() {
        std::fs::create_dir_all(parent)?;
    }

    std::fs::write(out, schema)?;

    Ok(())
}

pub fn run(subcommand: GenerateSubcommands) -> Result<(), anyhow::Error> {
    match subcommand {
        GenerateSubcommands::JsonSchema { out } => write_schema(
            out,
            charon_scheduler::json::schema::generate_instance_schema()?,
        ),
        GenerateSubcommands::GraphSchema { out } => write_schema(
            out,
            charon_scheduler::json::schema::generate_taskgraph_schema()?,
        ),
    }
}
