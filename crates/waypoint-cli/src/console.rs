//! Console operator.

use std::io::{self, BufRead, Write};
use std::ops::RangeInclusive;

use tracing::{debug, warn};
use waypoint_routing::Operator;

/// Operator answering on stdin.
///
/// Prompts block until a valid answer arrives. End of input counts as "no"
/// and as the lowest choice.
#[derive(Debug, Default)]
pub struct ConsoleOperator;

impl ConsoleOperator {
    pub fn new() -> Self {
        Self
    }

    fn prompt(text: &str) {
        print!("{text} ");
        if let Err(e) = io::stdout().flush() {
            warn!("Failed to flush stdout: {}", e);
        }
    }

    async fn read_line() -> Option<String> {
        let read = tokio::task::spawn_blocking(|| {
            let mut line = String::new();
            io::stdin().lock().read_line(&mut line).map(|n| (n, line))
        })
        .await;

        match read {
            Ok(Ok((0, _))) => {
                debug!("Console input closed");
                None
            }
            Ok(Ok((_, line))) => Some(line),
            Ok(Err(e)) => {
                warn!("Failed to read console input: {}", e);
                None
            }
            Err(e) => {
                warn!("Console reader task failed: {}", e);
                None
            }
        }
    }
}

impl Operator for ConsoleOperator {
    async fn confirm(&mut self, question: &str) -> bool {
        loop {
            Self::prompt(&format!("{question} (y/n)"));
            let Some(line) = Self::read_line().await else {
                return false;
            };
            match parse_yes_no(&line) {
                Some(answer) => return answer,
                None => println!("Please answer y or n"),
            }
        }
    }

    async fn choose(&mut self, question: &str, range: RangeInclusive<u8>) -> u8 {
        loop {
            Self::prompt(question);
            let Some(line) = Self::read_line().await else {
                return *range.start();
            };
            match parse_choice(&line, &range) {
                Some(choice) => return choice,
                None => println!(
                    "Please enter a number from {} to {}",
                    range.start(),
                    range.end()
                ),
            }
        }
    }

    fn notice(&mut self, message: &str) {
        println!("{message}");
    }
}

/// Parse a yes/no answer, ignoring case and surrounding whitespace.
pub fn parse_yes_no(line: &str) -> Option<bool> {
    match line.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

/// Parse a number and check it lies within `range`.
pub fn parse_choice(line: &str, range: &RangeInclusive<u8>) -> Option<u8> {
    line.trim().parse().ok().filter(|n| range.contains(n))
}
