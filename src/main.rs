use std::env;
use std::process;

use resub::cli::{self, Parsed};
use resub::config;
use resub::engine;
use resub::error::ResubError;
use resub::logger;
use resub::patch;

fn main() {
    process::exit(run());
}

fn run() -> i32 {
    let parsed = match cli::parse_args(env::args().skip(1)) {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("resub: {e}");
            eprintln!("{}", cli::USAGE_HINT);
            return 2;
        }
    };

    let run_config = match parsed {
        Parsed::Help => {
            print!("{}", cli::USAGE);
            return 0;
        }
        Parsed::Run(run_config) => run_config,
    };

    // A broken config file must not block a search; fall back to defaults.
    let app_config = match config::load_config() {
        Ok(app_config) => app_config,
        Err(e) => {
            eprintln!("resub: warning: {e:#}");
            config::Config::default()
        }
    };

    if let Err(e) = logger::init_debug_logging(app_config.log.debug) {
        eprintln!("resub: warning: {e:#}");
    }
    tracing::debug!(?run_config, "starting run");

    // SIGINT/SIGTERM can arrive while the run is blocked in the external
    // editor; the staged patch buffer must not survive the process.
    if let Err(e) = ctrlc::set_handler(|| {
        patch::remove_active_buffer();
        process::exit(130);
    }) {
        tracing::debug!("could not install interrupt handler: {e}");
    }

    match engine::run(&run_config, &app_config) {
        Ok(result) => {
            tracing::debug!(
                matched_any = result.matched_any,
                files_changed = result.files_changed,
                "run finished"
            );
            result.exit_code()
        }
        Err(ResubError::NoMatch) => {
            if !run_config.quiet {
                eprintln!("resub: no files matched");
            }
            1
        }
        Err(e) => {
            eprintln!("resub: {e}");
            e.exit_code()
        }
    }
}
