use std::path::PathBuf;

use anyhow::Context;
use charon_scheduler::json::io::load_instance;
use clap::Args;
use comfy_table::{Table, presets::UTF8_FULL_CONDENSED};
use indicatif::{ProgressBar, ProgressStyle};

use crate::file_utils::instance_paths;

#[derive(Args)]
pub struct CheckArgs {
    /// Instance JSON file or a folder of them
    #[arg(short, long)]
    input: PathBuf,
}

pub fn run(args: CheckArgs) -> anyhow::Result<()> {
    let paths = instance_paths(&args.input)?;

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED).set_header(vec![
        "Instance",
        "Vehicles",
        "Trips",
        "Refuel points",
        "Warnings",
        "Errors",
    ]);

    let bar = ProgressBar::new(paths.len() as u64);
    bar.set_style(ProgressStyle::default_bar().template("[{bar:40}] {pos}/{len}")?);

    let mut invalid = 0;
    for path in &paths {
        let instance =
            load_instance(path).with_context(|| format!("Cannot load {}", path.display()))?;
        let report = instance.check();
        if !report.is_valid() {
            invalid += 1;
        }

        table.add_row(vec![
            path.display().to_string(),
            instance.vehicles().len().to_string(),
            instance.trips().len().to_string(),
            instance.refuel_points().len().to_string(),
            report.warnings().count().to_string(),
            report.errors().count().to_string(),
        ]);
        bar.inc(1);
    }
    bar.finish_and_clear();

    println!("{table}");

    if invalid > 0 {
        anyhow::bail!("{invalid} of {} instances are invalid", paths.len());
    }

    Ok(())
}
