mod render;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use openrate_core::{
    Clock, DeviceMix, FixedClock, PredictionEngine, PredictionFactors, RandomJitter,
    ScoringTables, SendTime, SystemClock, Tone, parse_utc_offset, score_variants,
};
use rand::SeedableRng;
use rand::rngs::SmallRng;

#[derive(Parser)]
#[command(name = "openrate", about = "Predict email open rates and generate subject lines")]
struct Cli {
    /// TOML file overriding the built-in scoring tables
    #[arg(long, global = true)]
    tables: Option<PathBuf>,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Predict the open rate of a subject line
    Predict {
        /// Subject line to score
        subject: String,

        #[command(flatten)]
        send: SendArgs,

        /// Historical open rate of this list, 0..1
        #[arg(long)]
        historical: Option<f64>,

        /// Segment engagement multiplier
        #[arg(long, default_value_t = 1.0)]
        segment: f64,

        /// Share of mobile opens
        #[arg(long, default_value_t = 0.6)]
        mobile: f64,

        /// Share of desktop opens
        #[arg(long, default_value_t = 0.3)]
        desktop: f64,

        /// Share of tablet opens
        #[arg(long, default_value_t = 0.1)]
        tablet: f64,

        /// Print JSON instead of a report
        #[arg(long)]
        json: bool,
    },

    /// Generate subject lines for a topic and score each one
    Generate {
        /// What the newsletter is about
        topic: String,

        /// professional, casual or exciting
        #[arg(long, default_value_t = Tone::Professional)]
        tone: Tone,

        /// Number of variants
        #[arg(long, default_value_t = openrate_core::DEFAULT_VARIANT_COUNT)]
        count: usize,

        #[command(flatten)]
        send: SendArgs,

        /// Print JSON instead of a report
        #[arg(long)]
        json: bool,
    },

    /// List available tones
    Tones,

    /// Print the active scoring tables as TOML
    Tables,
}

#[derive(Args)]
struct SendArgs {
    /// Send time, YYYY-MM-DDTHH:MM[:SS][Z|±HH:MM] (default: now)
    #[arg(long)]
    at: Option<String>,

    /// Recipient UTC offset, e.g. +02:00 (default: UTC)
    #[arg(long, allow_hyphen_values = true)]
    utc_offset: Option<String>,

    /// Seed the jitter RNG for reproducible output
    #[arg(long)]
    seed: Option<u64>,

    /// Disable jitter entirely
    #[arg(long)]
    no_jitter: bool,
}

impl SendArgs {
    fn send_time(&self) -> Result<SendTime> {
        let offset = match &self.utc_offset {
            Some(raw) => parse_utc_offset(raw).context("invalid --utc-offset")?,
            None => 0,
        };
        match &self.at {
            Some(at) => SendTime::parse_iso8601(at, offset).context("invalid --at"),
            None => Ok(SystemClock::with_offset(offset).now()),
        }
    }

    fn jitter(&self) -> RandomJitter<SmallRng> {
        let rng = match self.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_os_rng(),
        };
        RandomJitter::new(rng)
    }

    /// `--no-jitter` zeroes the jitter amplitude of the active tables.
    fn apply(&self, mut tables: ScoringTables) -> ScoringTables {
        if self.no_jitter {
            tables.jitter_amplitude = 0.0;
        }
        tables
    }
}

fn load_tables(cli: &Cli) -> Result<ScoringTables> {
    let path = cli
        .tables
        .clone()
        .or_else(|| std::env::var("OPENRATE_TABLES").ok().map(PathBuf::from));
    match path {
        Some(path) => read_tables(&path),
        None => Ok(ScoringTables::builtin().clone()),
    }
}

fn read_tables(path: &Path) -> Result<ScoringTables> {
    let tables = ScoringTables::load(path)
        .with_context(|| format!("failed to load scoring tables from {}", path.display()))?;
    tracing::info!("using scoring tables from {}", path.display());
    Ok(tables)
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let tables = load_tables(&cli)?;

    match &cli.command {
        Commands::Predict {
            subject,
            send,
            historical,
            segment,
            mobile,
            desktop,
            tablet,
            json,
        } => {
            let mut factors = PredictionFactors::new(subject.as_str())
                .with_segment_engagement(*segment)
                .with_device_mix(DeviceMix::new(*mobile, *desktop, *tablet));
            factors.historical_open_rate = *historical;
            cmd_predict(send.apply(tables), factors, send, *json)
        }
        Commands::Generate {
            topic,
            tone,
            count,
            send,
            json,
        } => cmd_generate(send.apply(tables), topic, *tone, *count, send, *json),
        Commands::Tones => {
            println!("{}", render::tones_report());
            Ok(())
        }
        Commands::Tables => cmd_tables(&tables),
    }
}

fn cmd_predict(
    tables: ScoringTables,
    factors: PredictionFactors,
    send: &SendArgs,
    json: bool,
) -> Result<()> {
    let send_time = send.send_time()?;
    let factors = factors.with_send_time(send_time);
    let engine = PredictionEngine::new(&tables);
    let outcome = engine.predict(&factors, &FixedClock(send_time), &mut send.jitter());

    if json {
        println!("{}", render::to_json(&outcome).context("failed to serialize prediction")?);
    } else {
        println!(
            "{}",
            render::prediction_report(&factors.subject, send_time, &outcome)
        );
    }
    Ok(())
}

fn cmd_generate(
    tables: ScoringTables,
    topic: &str,
    tone: Tone,
    count: usize,
    send: &SendArgs,
    json: bool,
) -> Result<()> {
    if topic.trim().is_empty() {
        bail!("topic must not be empty");
    }
    let send_time = send.send_time()?;
    let engine = PredictionEngine::new(&tables);
    let variants = score_variants(
        topic,
        tone,
        count,
        &engine,
        &FixedClock(send_time),
        &mut send.jitter(),
    );

    if json {
        println!("{}", render::to_json(&variants).context("failed to serialize variants")?);
    } else if variants.is_empty() {
        println!("(no variants requested)");
    } else {
        println!("{}", render::variants_report(&variants));
    }
    Ok(())
}

fn cmd_tables(tables: &ScoringTables) -> Result<()> {
    let text = tables
        .to_toml_string()
        .context("failed to serialize scoring tables")?;
    print!("{text}");
    Ok(())
}
