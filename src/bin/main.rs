use std::process;

use clap::Parser;

#[macro_use]
extern crate log;

/// Parse command line arguments and run `engine::run()`
fn main() {
    // ----------------------------- Run CLI Parser
    let cli = parser::Cli::parse();

    // ----------------------------- Init logger.
    logger::init_logger(cli.verbose);
    if cli.quiet {
        logger::quiet();
    }

    // ----------------------------- Serialize command line arguments
    if let Err(e) = cli.serialize() {
        warn!("{e}");
    }

    // ----------------------------- Predict.
    match engine::run(&cli) {
        Ok(()) => (),
        Err(e) => {
            error!("{e:?}");
            process::exit(1);
        }
    };
}
