//! geosite2abp: convert Geosite rule lists into an AutoProxy rule file.

use clap::Parser;
use geosite2abp::{pipeline, Config, HttpSource};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "geosite2abp")]
#[command(version)]
#[command(about = "Convert Geosite rule lists into AdBlock Plus / AutoProxy format", long_about = None)]
#[command(after_help = "Example: geosite2abp gfw china-list,apple-cn -o my_rules.txt")]
struct Cli {
    /// Rule lists to convert; commas separate several in one argument.
    /// Defaults to: gfw, gfwfire, google, microsoft, openai,
    /// category-scholar-!cn, category-scholar-cn
    identifiers: Vec<String>,

    /// Output file [default: test.txt]
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Load the config file (or defaults), then apply flags on top of it.
fn load_config(cli: &Cli) -> geosite2abp::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(timeout) = cli.timeout {
        config.timeout_secs = timeout;
    }
    if let Some(output) = &cli.output {
        config.output = output.clone();
    }
    config.validate()?;
    Ok(config)
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&cli)?;

    let source = HttpSource::new(config.clone())?;
    let conversion = pipeline::run(&cli.identifiers, &config, &source, &config.output)?;

    if cli.verbose {
        for list in &conversion.lists {
            println!(
                "  {}: {} entries, {} includes, {} skipped lines",
                list.identifier,
                list.entries,
                list.includes.len(),
                list.warnings.len()
            );
        }
    }

    println!(
        "Successfully converted {} -> {:?} ({} rules)",
        conversion.identifiers.join(", "),
        config.output,
        conversion.rule_count()
    );
    Ok(())
}
