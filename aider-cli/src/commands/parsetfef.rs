use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use aider::tfevents::{self, ScalarSeries};
use anyhow::{Context, Result};
use itertools::Itertools;

/// Parse a TensorBoard event file and print its scalar series.
#[derive(clap::Args, Debug)]
pub struct Args {
    /// Event file to parse
    pub file: PathBuf,
    /// Save the parsed result to a CSV file
    #[arg(long)]
    pub save_csv: Option<PathBuf>,
}

pub fn run(args: Args) -> Result<()> {
    let scalars = tfevents::read_scalars(&args.file)
        .with_context(|| format!("failed to parse {}", args.file.display()))?;

    print_table(&scalars);

    if let Some(csv_path) = &args.save_csv {
        fs::write(csv_path, to_csv(&scalars))
            .with_context(|| format!("failed to write {}", csv_path.display()))?;
    }
    Ok(())
}

/// All steps seen across every series, ascending and deduplicated.
fn sorted_steps(scalars: &BTreeMap<String, ScalarSeries>) -> Vec<i64> {
    scalars
        .values()
        .flat_map(|series| series.steps.iter().copied())
        .unique()
        .sorted()
        .collect()
}

fn value_at(series: &ScalarSeries, step: i64) -> Option<f32> {
    let index = series.steps.iter().position(|&s| s == step)?;
    Some(series.values[index])
}

/// Lowest non-NaN value in a series, with its step.
fn lowest_point(series: &ScalarSeries) -> Option<(i64, f32)> {
    let mut best: Option<(i64, f32)> = None;
    for (&step, &value) in series.steps.iter().zip(&series.values) {
        if value.is_nan() {
            continue;
        }
        match best {
            Some((_, low)) if value >= low => {}
            _ => best = Some((step, value)),
        }
    }
    best
}

fn print_table(scalars: &BTreeMap<String, ScalarSeries>) {
    print!("{:<10}", "Step");
    for tag in scalars.keys() {
        print!("{tag:<20}");
    }
    println!();

    for step in sorted_steps(scalars) {
        print!("{step:<10}");
        for series in scalars.values() {
            match value_at(series, step) {
                Some(value) if value.is_nan() => print!("{:<20}", "NaN"),
                Some(value) => print!("{:<20}", format!("{value:.6}")),
                None => print!("{:<20}", ""),
            }
        }
        println!();
    }

    println!();
    println!("Lowest points for each tag:");
    for (tag, series) in scalars {
        match lowest_point(series) {
            Some((step, value)) => {
                println!("{tag:<20}: Value = {:<15}, Step = {step}", format!("{value:.6}"))
            }
            None => println!("{tag:<20}: No data or empty"),
        }
    }
}

fn to_csv(scalars: &BTreeMap<String, ScalarSeries>) -> String {
    let mut out = String::from("Step");
    for tag in scalars.keys() {
        out.push(',');
        out.push_str(&csv_field(tag));
    }
    out.push('\n');

    for step in sorted_steps(scalars) {
        out.push_str(&step.to_string());
        for series in scalars.values() {
            out.push(',');
            if let Some(value) = value_at(series, step) {
                out.push_str(&value.to_string());
            }
        }
        out.push('\n');
    }
    out
}

fn csv_field(field: &str) -> String {
    if field.contains([',', '"', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
