use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::{fs::File, path::PathBuf, time::Duration};

pub(crate) const DEFAULT_HIGH_SCORE_FILE: &str = "highscore.txt";

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum Variant {
    /// Quarter-split playfield, ball in motion from the start, adjustable speed
    Classic,
    /// Half-width playfield, ball waits on the paddle until launched
    Launch,
    /// Launch rules plus a brick grid, score and persisted high score
    Breakout,
}

impl Variant {
    pub(crate) fn launch_gated(self) -> bool {
        !matches!(self, Variant::Classic)
    }

    pub(crate) fn has_bricks(self) -> bool {
        matches!(self, Variant::Breakout)
    }

    pub(crate) fn default_driver(self) -> DriverKind {
        match self {
            Variant::Classic => DriverKind::Cooperative,
            _ => DriverKind::Threaded,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum DriverKind {
    /// Single thread: input wait bounded by the next tick deadline
    Cooperative,
    /// Physics thread plus input loop sharing one mutex
    Threaded,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "paddleball")]
#[command(about = "Terminal ball-and-paddle game (pong and breakout rules)", long_about = None)]
pub(crate) struct Args {
    /// Rule set to play
    #[arg(long, value_enum, default_value_t = Variant::Breakout)]
    pub(crate) variant: Variant,

    /// Timing driver; defaults to cooperative for classic, threaded otherwise
    #[arg(long, value_enum)]
    pub(crate) driver: Option<DriverKind>,

    /// Tick interval in milliseconds (classic and launch rules)
    #[arg(long, default_value_t = 100)]
    pub(crate) interval_ms: u64,

    /// Plain-text file holding the high score
    #[arg(long, default_value = DEFAULT_HIGH_SCORE_FILE)]
    pub(crate) high_score_file: PathBuf,

    /// RNG seed for reproducible games
    #[arg(long)]
    pub(crate) seed: Option<u64>,

    /// Write logs here (the screen is taken by the game)
    #[arg(long)]
    pub(crate) log_file: Option<PathBuf>,
}

#[derive(Clone, Debug)]
pub(crate) struct Settings {
    pub(crate) variant: Variant,
    pub(crate) driver: DriverKind,
    pub(crate) interval: Duration,
    pub(crate) high_score_file: PathBuf,
    pub(crate) seed: Option<u64>,
}

impl Settings {
    pub(crate) fn from_args(args: &Args) -> Self {
        Self {
            variant: args.variant,
            driver: args.driver.unwrap_or_else(|| args.variant.default_driver()),
            interval: Duration::from_millis(
                args.interval_ms
                    .clamp(crate::sim::MIN_INTERVAL_MS, crate::sim::MAX_INTERVAL_MS),
            ),
            high_score_file: args.high_score_file.clone(),
            seed: args.seed,
        }
    }
}

/// Logs go to a file when one is given; otherwise logging stays off so
/// nothing is written over the game screen.
pub(crate) fn init_logging(log_file: Option<&PathBuf>) -> Result<()> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    builder.format_timestamp_millis();
    match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("could not open log file {}", path.display()))?;
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }
        None => {
            builder.filter_level(log::LevelFilter::Off);
        }
    }
    builder.try_init().context("logger already initialized")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["paddleball"]);
        let s = Settings::from_args(&args);
        assert_eq!(s.variant, Variant::Breakout);
        assert_eq!(s.driver, DriverKind::Threaded);
        assert_eq!(s.interval, Duration::from_millis(100));
        assert_eq!(s.high_score_file, PathBuf::from(DEFAULT_HIGH_SCORE_FILE));
        assert!(s.seed.is_none());
    }

    #[test]
    fn test_classic_defaults_to_cooperative() {
        let args = Args::parse_from(["paddleball", "--variant", "classic"]);
        let s = Settings::from_args(&args);
        assert_eq!(s.driver, DriverKind::Cooperative);
        assert!(!s.variant.launch_gated());
    }

    #[test]
    fn test_driver_override_and_interval_floor() {
        let args = Args::parse_from([
            "paddleball",
            "--variant",
            "launch",
            "--driver",
            "cooperative",
            "--interval-ms",
            "1",
            "--seed",
            "7",
        ]);
        let s = Settings::from_args(&args);
        assert_eq!(s.driver, DriverKind::Cooperative);
        assert_eq!(s.interval, Duration::from_millis(10));
        assert_eq!(s.seed, Some(7));
    }

    #[test]
    fn test_interval_ceiling() {
        let args = Args::parse_from(["paddleball", "--interval-ms", "18446744073709551615"]);
        let s = Settings::from_args(&args);
        assert_eq!(s.interval, Duration::from_millis(10_000));
    }
}
