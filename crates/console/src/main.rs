//! `cardform-console` -- line-oriented host shell for the form engine.
//!
//! Reads commands from stdin (`card <text>`, `blur cvc`, `submit`, ...),
//! pushes them into the engine's sinks and prints the signals that changed.
//! Payment outcomes are printed as they arrive.
//!
//! # Environment variables
//!
//! | Variable                         | Default            |
//! |----------------------------------|--------------------|
//! | `CARDFORM_PAYMENT_DELAY_MS`      | `1000`             |
//! | `CARDFORM_SUBMIT_POLICY`         | `allow_concurrent` |
//! | `CARDFORM_BLOCK_INVALID_SUBMIT`  | `true`             |
//! | `CARDFORM_EVENT_CAPACITY`        | `64`               |
//! | `CARDFORM_SHUTDOWN_TIMEOUT_SECS` | `5`                |
//! | `RUST_LOG`                       | `cardform_console=info,cardform_engine=info` |

mod command;
mod view;

use cardform_engine::{EngineConfig, FormEngine, FormHandle};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::command::{Command, CommandError, HELP};
use crate::view::FormView;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cardform_console=info,cardform_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = EngineConfig::from_env();
    tracing::info!(
        payment_delay = ?config.payment_delay,
        submit_policy = %config.submit_policy,
        "Starting cardform console",
    );

    let mut engine = FormEngine::simulated(config);
    let form = match engine.start() {
        Ok(form) => form,
        Err(e) => {
            tracing::error!(error = %e, "Failed to start form engine");
            std::process::exit(1);
        }
    };

    let mut view = FormView::new(&form);
    let mut events = form.payment_events();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("{HELP}");
    print_lines(view.render_all());

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => {
                        if !handle_line(&form, &mut view, &line) {
                            break;
                        }
                    }
                    Ok(None) => {
                        tracing::info!("Input closed");
                        break;
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to read stdin");
                        break;
                    }
                }
            }
            event = events.recv() => {
                match event {
                    Ok(event) => println!("{}", view::event_line(&event)),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Console fell behind on payment events");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    engine.stop().await;
}

/// Apply one input line. Returns `false` when the console should exit.
fn handle_line(form: &FormHandle, view: &mut FormView, line: &str) -> bool {
    let command = match command::parse(line) {
        Ok(command) => command,
        Err(CommandError::Empty) => return true,
        Err(e) => {
            println!("{e}");
            return true;
        }
    };

    match command {
        Command::Input { field, text } => form.push_input(field, Some(text.as_str())),
        Command::Blur(field) => form.push_blur(field),
        Command::Submit => {
            if let Some(id) = form.submit_form() {
                println!("submit {id} sent");
            }
        }
        Command::Status => {
            let status = view::status_json(form);
            match serde_json::to_string_pretty(&status) {
                Ok(text) => println!("{text}"),
                Err(e) => tracing::error!(error = %e, "Failed to render status"),
            }
            print_lines(view.render_all());
            return true;
        }
        Command::Help => {
            println!("{HELP}");
            return true;
        }
        Command::Quit => return false,
    }

    print_lines(view.render_changes());
    true
}

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{line}");
    }
}
