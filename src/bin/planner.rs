use anyhow::Result;
use campus_planner::cli;
use campus_planner::context::StandardContext;
use simplelog::{ColorChoice, ConfigBuilder, LevelFilter, TermLogger, TerminalMode};
use std::env;
use std::io;
use std::str::FromStr;

fn init_logging() {
    let level = env::var("PLANNER_LOG")
        .ok()
        .and_then(|v| LevelFilter::from_str(&v).ok())
        .unwrap_or(LevelFilter::Warn);

    let config = ConfigBuilder::new()
        .set_time_level(LevelFilter::Off)
        .build();

    // Ignore the error if a logger is already installed.
    let _ = TermLogger::init(level, config, TerminalMode::Stderr, ColorChoice::Auto);
}

fn main() -> Result<()> {
    init_logging();

    let args: Vec<String> = env::args().skip(1).collect();
    let invocation = match cli::parse_args(&args) {
        Ok(inv) => inv,
        Err(msg) => {
            eprintln!("error: {}", msg);
            eprintln!("Run 'planner help' for usage.");
            std::process::exit(2);
        }
    };

    let ctx = StandardContext::new(invocation.root);
    let stdout = io::stdout();
    let mut out = stdout.lock();
    cli::execute(invocation.command, &ctx, &mut out)
}
