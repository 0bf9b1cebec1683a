use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(
    name = "quakewatch",
    version,
    about = "P/S-wave earthquake detector for triaxial accelerometer streams",
    long_about = "Calibrate against an at-rest accelerometer, detect P-wave onset, wait for the\n\
                  S-wave and estimate the distance to the source from the P-S delay.\n\
                  Detected events are reported to an HTTP alerting service when\n\
                  --alerts-url or $QUAKE_ALERTS_URL is set."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Command {
    /// Detect one earthquake event from a live or recorded stream
    Run(RunArgs),
    /// Check a recorded stream for well-formed readings
    Validate(ValidateArgs),
    /// Estimate source distance from a P-S arrival delay
    Distance(DistanceArgs),
}

/// Exactly one input stream
#[derive(Args)]
#[group(required = true, multiple = false)]
pub struct SourceArgs {
    /// Serial port the accelerometer is attached to (e.g. /dev/ttyACM0)
    #[arg(long)]
    pub serial: Option<String>,

    /// Replay a recorded stream from a file
    #[arg(long)]
    pub file: Option<String>,

    /// Read from a TCP bridge as HOST:PORT
    #[arg(long)]
    pub tcp: Option<String>,

    /// Read from standard input
    #[arg(long, default_value_t = false)]
    pub stdin: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum LifecycleArg {
    /// Report distance and time, deactivate the alert afterwards
    Full,
    /// Report amplitudes only
    Basic,
}

#[derive(Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Serial baud rate
    #[arg(long, default_value_t = 9600)]
    pub baud: u32,

    /// Seconds to wait after opening the serial port
    #[arg(long, default_value_t = 2.0)]
    pub settle_secs: f64,

    /// Delay between replayed file lines in milliseconds
    #[arg(long)]
    pub line_delay_ms: Option<u64>,

    /// JSON detector configuration file; flags below override it
    #[arg(long)]
    pub config: Option<String>,

    /// Number of parsed readings before the baseline is taken
    #[arg(long)]
    pub calibration_index: Option<u64>,

    /// Per-axis deviation that signals P-wave onset
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Length of the P-wave capture window in seconds
    #[arg(long)]
    pub capture_secs: Option<f64>,

    /// Settling time after calibration in seconds
    #[arg(long)]
    pub buffer_secs: Option<f64>,

    /// Give up waiting for the S-wave after this many seconds
    #[arg(long)]
    pub swave_timeout_secs: Option<f64>,

    /// Alerting service collection URL
    #[arg(long, env = "QUAKE_ALERTS_URL")]
    pub alerts_url: Option<String>,

    /// Sensor identifier sent with each alert
    #[arg(long)]
    pub sensor_id: Option<i64>,

    /// Alert payload and lifecycle
    #[arg(long, value_enum)]
    pub lifecycle: Option<LifecycleArg>,

    /// Seconds between creating an alert and marking it inactive
    #[arg(long)]
    pub deactivate_after_secs: Option<f64>,

    /// Wave data output file
    #[arg(short, long, default_value = "wave_data.txt")]
    pub output: String,

    /// Write a JSON run summary to this path ("-" for stdout)
    #[arg(long)]
    pub summary: Option<String>,

    /// Compact JSON output (no indentation)
    #[arg(long, default_value_t = false)]
    pub compact: bool,

    /// Suppress progress messages on stderr
    #[arg(long, default_value_t = false)]
    pub quiet: bool,
}

#[derive(Args)]
pub struct ValidateArgs {
    /// Recorded stream to check
    #[arg(long)]
    pub file: String,

    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args)]
pub struct DistanceArgs {
    /// Delay between P-wave and S-wave arrival in seconds
    #[arg(long)]
    pub delta: f64,

    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}
