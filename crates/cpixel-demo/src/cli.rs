#![forbid(unsafe_code)]

//! Command-line argument parsing for the demo.
//!
//! Parses args by hand. Every option can also come from a `CPIXEL_DEMO_*`
//! environment variable; explicit flags win.

use std::env;
use std::path::PathBuf;
use std::process;

const VERSION: &str = env!("CARGO_PKG_VERSION");

const HELP_TEXT: &str = "\
cpixel-demo: drive the conscious-pixel frame loop headless

USAGE:
    cpixel-demo [OPTIONS]

OPTIONS:
    --duration-ms=N          Run for N milliseconds (default: 10000)
    --fps=N                  Target frame rate (default: 60)
    --simulate               Use a simulated clock instead of sleeping
    --inspect                Start with ?inspect=true in the page URL
    --pause-after-ms=N       Press the pause chord at N ms
    --resume-after-ms=N      Press the pause chord again at N ms
    --hide-after-ms=N        Background the page at N ms
    --show-after-ms=N        Foreground the page at N ms
    --inspect-interval-ms=N  Override the inspection check interval
    --perf-probe             Enable the performance-drop probe
    --config=PATH            Load a JSON config file
    --log-json               Emit JSON log lines
    --help, -h               Show this help message
    --version, -V            Show version

ENVIRONMENT VARIABLES:
    CPIXEL_DEMO_DURATION_MS   Override --duration-ms
    CPIXEL_DEMO_FPS           Override --fps
    CPIXEL_DEMO_SIMULATE      Set to 1 for --simulate
    CPIXEL_DEMO_CONFIG        Override --config
    CPIXEL_LOG                Log filter (default: info)
    CPIXEL_LOG_FORMAT         pretty | json
    CPIXEL_*                  Gate settings, see cpixel_core::config";

/// Parsed command-line options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opts {
    /// Total run time.
    pub duration_ms: u64,
    /// Target frame rate.
    pub fps: u32,
    /// Simulated clock.
    pub simulate: bool,
    /// Start with the inspect query parameter.
    pub inspect: bool,
    /// Pause chord time.
    pub pause_after_ms: Option<u64>,
    /// Second pause chord time.
    pub resume_after_ms: Option<u64>,
    /// Hide time.
    pub hide_after_ms: Option<u64>,
    /// Show time.
    pub show_after_ms: Option<u64>,
    /// Inspection check interval override.
    pub inspect_interval_ms: Option<u64>,
    /// Enable the performance-drop probe.
    pub perf_probe: bool,
    /// JSON config file.
    pub config: Option<PathBuf>,
    /// JSON log output.
    pub log_json: bool,
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            duration_ms: 10_000,
            fps: 60,
            simulate: false,
            inspect: false,
            pause_after_ms: None,
            resume_after_ms: None,
            hide_after_ms: None,
            show_after_ms: None,
            inspect_interval_ms: None,
            perf_probe: false,
            config: None,
            log_json: false,
        }
    }
}

/// What the arguments asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parsed {
    /// Run the demo.
    Run(Opts),
    /// Print help and exit.
    Help,
    /// Print the version and exit.
    Version,
}

impl Opts {
    /// Parse process arguments and environment, exiting on `--help`,
    /// `--version` or a bad argument.
    pub fn parse() -> Self {
        let args: Vec<String> = env::args().skip(1).collect();
        match Self::parse_from(&args, |key| env::var(key).ok()) {
            Ok(Parsed::Run(opts)) => opts,
            Ok(Parsed::Help) => {
                println!("{HELP_TEXT}");
                process::exit(0);
            }
            Ok(Parsed::Version) => {
                println!("cpixel-demo {VERSION}");
                process::exit(0);
            }
            Err(message) => {
                eprintln!("{message}");
                eprintln!("Run with --help for usage information.");
                process::exit(1);
            }
        }
    }

    /// Parse `args` with environment lookups through `env`.
    pub fn parse_from(
        args: &[String],
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Parsed, String> {
        let mut opts = Self::default();

        // Environment first; flags below override it.
        if let Some(n) = env("CPIXEL_DEMO_DURATION_MS").and_then(|v| v.parse().ok()) {
            opts.duration_ms = n;
        }
        if let Some(n) = env("CPIXEL_DEMO_FPS").and_then(|v| v.parse().ok()) {
            opts.fps = n;
        }
        if let Some(v) = env("CPIXEL_DEMO_SIMULATE") {
            opts.simulate = matches!(v.as_str(), "1" | "true");
        }
        if let Some(v) = env("CPIXEL_DEMO_CONFIG").filter(|v| !v.is_empty()) {
            opts.config = Some(PathBuf::from(v));
        }

        for arg in args {
            match arg.as_str() {
                "--help" | "-h" => return Ok(Parsed::Help),
                "--version" | "-V" => return Ok(Parsed::Version),
                "--simulate" => opts.simulate = true,
                "--inspect" => opts.inspect = true,
                "--perf-probe" => opts.perf_probe = true,
                "--log-json" => opts.log_json = true,
                other => {
                    let Some((flag, val)) = other.split_once('=') else {
                        return Err(format!("Unknown argument: {other}"));
                    };
                    match flag {
                        "--duration-ms" => opts.duration_ms = number(flag, val)?,
                        "--fps" => opts.fps = number(flag, val)?,
                        "--pause-after-ms" => opts.pause_after_ms = Some(number(flag, val)?),
                        "--resume-after-ms" => opts.resume_after_ms = Some(number(flag, val)?),
                        "--hide-after-ms" => opts.hide_after_ms = Some(number(flag, val)?),
                        "--show-after-ms" => opts.show_after_ms = Some(number(flag, val)?),
                        "--inspect-interval-ms" => {
                            opts.inspect_interval_ms = Some(number(flag, val)?);
                        }
                        "--config" => opts.config = Some(PathBuf::from(val)),
                        _ => return Err(format!("Unknown argument: {other}")),
                    }
                }
            }
        }

        Ok(Parsed::Run(opts))
    }
}

fn number<T: std::str::FromStr>(flag: &str, val: &str) -> Result<T, String> {
    val.parse().map_err(|_| format!("Invalid {flag} value: {val}"))
}
