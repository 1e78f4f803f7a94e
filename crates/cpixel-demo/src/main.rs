#![forbid(unsafe_code)]

//! Conscious-pixel demo binary entry point.

use std::time::Duration;

use cpixel_core::{LogConfig, LogFormat};
use cpixel_demo::cli;
use cpixel_demo::script;

fn main() {
    let opts = cli::Opts::parse();

    let mut log = LogConfig::from_env();
    if opts.log_json {
        log = log.with_format(LogFormat::Json);
    }
    if let Err(e) = log.install() {
        eprintln!("Logging disabled: {e}");
    }

    let config = match script::load_config(&opts, |key| std::env::var(key).ok()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            std::process::exit(1);
        }
    };

    let events = script::schedule(&opts, &config);
    let (frame_loop, readers) = script::build(&config);
    let host = script::page(opts.inspect);
    let duration = Duration::from_millis(opts.duration_ms);

    tracing::info!(
        target: "cpixel.loop",
        duration_ms = opts.duration_ms,
        fps = opts.fps,
        simulate = opts.simulate,
        events = events.len(),
        "demo starting"
    );

    let report = if opts.simulate {
        script::run_simulated(frame_loop, &readers, host, &events, opts.fps, duration)
    } else {
        script::run_realtime(frame_loop, &readers, host, &events, opts.fps, duration)
    };

    println!("{report}");
}
