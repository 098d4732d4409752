use beatdoc::cli::{self, ToDocumentOptions};
use clap::Parser;
use std::process;

fn main() {
    let options = ToDocumentOptions::parse();
    cli::init_logging();

    match cli::run_to_document(&options) {
        Ok((path, report)) => {
            println!("{}", report.summary());
            println!("saved to {}", path.display());
        }
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(e.exit_code());
        }
    }
}
