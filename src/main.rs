//! PUISNE launcher binary entry point.
//!
//! Delegates the entire pipeline to [`puisne::plan_handoff`], then performs
//! whichever terminal action its [`puisne::Outcome`] describes: printing
//! help text and exiting, or replacing the process image with the
//! packaged entry point.

use std::process::ExitCode;

use puisne::{launcher, Outcome};

fn main() -> ExitCode {
    env_logger::init();

    let argv: Vec<String> = std::env::args().collect();

    match puisne::plan_handoff(&argv) {
        Ok(Outcome::EmptyBundle { message, help_text }) => {
            println!("{message}");
            if let Some(text) = help_text {
                println!("{text}");
            }
            ExitCode::SUCCESS
        }
        Ok(Outcome::HelpRequested { help_text }) => {
            if let Some(text) = help_text {
                println!("{text}");
            }
            ExitCode::SUCCESS
        }
        Ok(Outcome::Handoff(handoff)) => match launcher::perform(&handoff) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("PUISNE: {e}");
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            eprintln!("{}", e.stderr_line());
            ExitCode::FAILURE
        }
    }
}
