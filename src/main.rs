//! chat-snatch: archive chat server history and new messages to JSON and CSV.

use std::process::ExitCode;

use chat_snatch::{cli, config};

fn main() -> ExitCode {
    // Must run before argument parsing so `.env` values feed clap's env fallbacks
    config::load_dotenv();

    match cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");

            if std::env::var("RUST_BACKTRACE").is_ok() {
                if let Some(source) = std::error::Error::source(&e) {
                    eprintln!("Caused by: {source}");
                }
            }

            ExitCode::from(u8::try_from(e.exit_code()).unwrap_or(1))
        }
    }
}
