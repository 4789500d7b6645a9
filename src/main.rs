//! Kodegen Bundler Microarch - packs every GOAMD64 level of a Go program into
//! one launcher that picks the best one for the CPU it runs on.

use kodegen_bundler_microarch::cli;
use std::process;

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::init();

    // Run CLI and get exit code
    let exit_code = match cli::run().await {
        Ok(code) => code,
        Err(e) => {
            println!("Error: {e}");
            e.exit_code()
        }
    };

    process::exit(exit_code);
}
