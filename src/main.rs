use clap::Parser;
use tracing::debug;

use ferrite_cnn::cli::Cli;
use ferrite_cnn::{logging, Error};

fn main() -> Result<(), Error> {
    let cli = Cli::parse();
    logging::init(cli.verbose)?;
    debug!(command = ?cli.command, "ferrite-cnn starting");
    cli.command.run()
}
