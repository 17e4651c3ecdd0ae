// src/main.rs

use std::io::BufReader;
use std::sync::Arc;

use dotenvy::dotenv;
use proctor::config::Config;
use proctor::console::{self, HELP};
use proctor::portal::HttpPortal;
use proctor::runner::{SessionOutcome, spawn_session};
use proctor::session::{SessionController, SessionSettings};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenv().ok();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    };

    let file_appender = tracing_appender::rolling::daily(&config.log_dir, "proctor.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    // stdout belongs to the test itself, so the console layer goes to stderr
    let console_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    tracing::info!(
        "Starting test {} for student {} against {}",
        config.test_id,
        config.student_id,
        config.portal_url
    );

    let portal = Arc::new(HttpPortal::from_config(&config));
    let controller = SessionController::new(
        config.test_id.clone(),
        config.student_id.clone(),
        SessionSettings::default(),
    );
    let (mut handle, session) = spawn_session(portal, controller, config.tick);

    // Forward stdin lines as session input until 'q' or EOF.
    println!("{}", HELP);
    console::spawn_input_reader(BufReader::new(std::io::stdin()), handle.inputs.clone());
    drop(handle.inputs);

    // Print notices as they come and the question whenever it changes.
    let mut last_shown = None;
    let mut view_open = true;
    loop {
        tokio::select! {
            notice = handle.notices.recv() => match notice {
                Some(notice) => println!("\n*** {}", notice),
                None => break,
            },
            changed = handle.view.changed(), if view_open => {
                if changed.is_err() {
                    view_open = false;
                    continue;
                }
                let view = handle.view.borrow_and_update().clone();
                let key = (view.status, view.question_index, view.selected, view.answered);
                if last_shown != Some(key) {
                    last_shown = Some(key);
                    println!("\n{}", console::render(&view));
                }
            }
        }
    }

    match session.await {
        Ok(SessionOutcome::Completed(done)) => {
            tracing::info!("Session finished ({})", done.reason);
            if let Some(id) = done.result.attempt_id {
                println!("Attempt id: {}", id);
            }
        }
        Ok(SessionOutcome::Unavailable(failure)) => {
            println!("{}. Back to the test list.", failure);
            std::process::exit(1);
        }
        Ok(SessionOutcome::Abandoned(reason)) => {
            println!("Submission ({}) was never delivered; your answers were not recorded.", reason);
            std::process::exit(1);
        }
        Err(e) => {
            tracing::error!("Session task failed: {}", e);
            std::process::exit(1);
        }
    }
}
