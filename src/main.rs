use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use pdns_tld::{pipeline, report, utils, Args, Config, FarsightClient, RunOptions};

fn main() -> Result<()> {
    let args = Args::parse();
    utils::validate_args(&args)?;

    let config = Config::load(&args.config)?;
    utils::setup_logging(args.verbose, &config.log);
    info!(
        action = "load",
        component = "config",
        path = ?args.config,
        log_format = %config.log.format,
        "Configuration loaded"
    );

    let iocs = utils::expand_ioc_args(&args.iocs)?;
    let options = RunOptions {
        periods: utils::normalize_periods(&args.periods),
        limit: args.limit,
    };

    let client = FarsightClient::new(&config.farsight)?;
    let result = pipeline::run(&client, &iocs, &options);

    if !args.no_excel {
        match report::render(&result, &options.periods, args.top, &args.path) {
            Ok(path) => println!("\nFull breakdown saved to - \"{}\"\n", path.display()),
            Err(e) => {
                error!(action = "save", component = "report", error = %e, "Error: {}", e);
                std::process::exit(1);
            }
        }
    }

    print!("{}", pipeline::summary(&result, options.limit));
    Ok(())
}
