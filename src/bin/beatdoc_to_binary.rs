use beatdoc::cli::{self, ToBinaryOptions};
use clap::Parser;
use std::process;

fn main() {
    let options = ToBinaryOptions::parse();
    cli::init_logging();

    match cli::run_to_binary(&options) {
        Ok(report) => {
            println!("{}", report.summary());
        }
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(e.exit_code());
        }
    }
}
