// src/console.rs

//! Line-oriented stand-in for the browser presentation layer.

use std::io::BufRead;
use std::str::FromStr;
use std::thread::{self, JoinHandle};

use tokio::sync::mpsc;

use crate::{
    runner::SessionInput,
    session::{FocusSignal, SessionStatus, SessionView},
};

pub const HELP: &str = "\
commands:
  a <n>      answer the current question with option n (1-based)
  n | p      next / previous question
  j <n>      jump to question n (1-based)
  s          submit (final question only)
  r          retry a failed submission
  hide|show  page visibility lost / regained
  blur|focus window focus lost / regained
  q          stop sending input";

/// A parsed console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Input(SessionInput),
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut parts = line.split_whitespace();
        let Some(verb) = parts.next() else {
            return Err("empty command".to_string());
        };

        let mut number = || -> Result<usize, String> {
            let raw = parts
                .next()
                .ok_or_else(|| format!("'{}' needs a number", verb))?;
            let n: usize = raw.parse().map_err(|_| format!("not a number: {}", raw))?;
            n.checked_sub(1)
                .ok_or_else(|| "numbers start at 1".to_string())
        };

        let input = match verb {
            "a" | "answer" => SessionInput::SelectCurrent(number()?),
            "n" | "next" => SessionInput::Next,
            "p" | "prev" | "previous" => SessionInput::Previous,
            "j" | "jump" => SessionInput::JumpTo(number()?),
            "s" | "submit" => SessionInput::Submit,
            "r" | "retry" => SessionInput::Retry,
            "hide" => SessionInput::Focus(FocusSignal::Hidden),
            "show" => SessionInput::Focus(FocusSignal::Visible),
            "blur" => SessionInput::Focus(FocusSignal::Blur),
            "focus" => SessionInput::Focus(FocusSignal::Focus),
            "h" | "help" | "?" => return Ok(Command::Help),
            "q" | "quit" => return Ok(Command::Quit),
            other => return Err(format!("unknown command: {}", other)),
        };

        Ok(Command::Input(input))
    }
}

/// Forwards console lines from `reader` as session input until `q`, end of
/// input, or the session stops listening.
/// Runs on a plain OS thread so a pending read never delays runtime shutdown.
pub fn spawn_input_reader<R>(reader: R, inputs: mpsc::Sender<SessionInput>) -> JoinHandle<()>
where
    R: BufRead + Send + 'static,
{
    thread::spawn(move || {
        for line in reader.lines() {
            let Ok(line) = line else {
                break;
            };
            if line.trim().is_empty() {
                continue;
            }
            match line.parse::<Command>() {
                Ok(Command::Input(input)) => {
                    if inputs.blocking_send(input).is_err() {
                        break;
                    }
                }
                Ok(Command::Help) => println!("{}", HELP),
                Ok(Command::Quit) => break,
                Err(e) => println!("{}", e),
            }
        }
        tracing::debug!("Console input closed");
    })
}

/// Renders the header and the question on screen.
pub fn render(view: &SessionView) -> String {
    let status = match view.status {
        SessionStatus::Loading => "LOADING",
        SessionStatus::Unavailable => "UNAVAILABLE",
        SessionStatus::InProgress => "IN PROGRESS",
        SessionStatus::Submitting => "SUBMITTING",
        SessionStatus::Suspended => "SUSPENDED",
        SessionStatus::Completed => "COMPLETED",
    };

    let mut out = format!(
        "[{}] Question {} of {} | Tab switches: {}/{} | {}{}",
        status,
        (view.question_index + 1).min(view.question_count),
        view.question_count,
        view.violations,
        view.violation_threshold,
        view.clock,
        if view.low_time { " (!)" } else { "" }
    );

    if let Some(question) = &view.question {
        out.push_str(&format!("\n\n{}\n", question.text));
        for (i, option) in question.options.iter().enumerate() {
            let mark = if view.selected == Some(i) { "x" } else { " " };
            out.push_str(&format!("  [{}] {}. {}\n", mark, i + 1, option));
        }
        out.push_str(&format!(
            "\nProgress: {:.0}% | Answered: {}/{}",
            view.progress_percent(),
            view.answered,
            view.question_count
        ));
        if view.can_submit {
            out.push_str(" | 's' to submit");
        }
        if view.can_retry {
            out.push_str(" | 'r' to retry submission");
        }
        out.push_str(&format!("\n{}", navigator(view)));
    }

    out
}

/// One cell per question: `*` marks an answer, brackets mark the current one.
fn navigator(view: &SessionView) -> String {
    let cells: Vec<String> = view
        .answered_questions
        .iter()
        .enumerate()
        .map(|(i, answered)| {
            let cell = format!("{}{}", i + 1, if *answered { "*" } else { "" });
            if i == view.question_index {
                format!("[{}]", cell)
            } else {
                cell
            }
        })
        .collect();
    format!("Questions: {}", cells.join(" "))
}
