//! Operator capability.
//!
//! The coordinator never talks to a console directly. Questions and notices
//! go through [`Operator`], so the same routing logic runs behind an
//! interactive terminal or a scripted test double.

#![allow(async_fn_in_trait)]

use std::collections::VecDeque;
use std::ops::RangeInclusive;
use std::sync::{Arc, Mutex, MutexGuard};

/// Someone who answers questions at the controller.
///
/// Prompts wait as long as it takes for an answer.
pub trait Operator: Send {
    /// Ask a yes/no question.
    async fn confirm(&mut self, question: &str) -> bool;

    /// Ask for a number within `range`.
    async fn choose(&mut self, question: &str, range: RangeInclusive<u8>) -> u8;

    /// Show a status line.
    fn notice(&mut self, message: &str);
}

/// Operator answering from a prepared script.
///
/// An exhausted script answers "no" and `0`. Clones share the same script
/// and transcript.
#[derive(Debug, Clone, Default)]
pub struct ScriptedOperator {
    inner: Arc<Mutex<Script>>,
}

#[derive(Debug, Default)]
struct Script {
    confirms: VecDeque<bool>,
    choices: VecDeque<u8>,
    questions: Vec<String>,
    notices: Vec<String>,
}

impl ScriptedOperator {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Queue the answer to the next yes/no question.
    pub fn answer_confirm(&self, answer: bool) -> &Self {
        self.script().confirms.push_back(answer);
        self
    }

    /// Queue the answer to the next number question.
    pub fn answer_choice(&self, answer: u8) -> &Self {
        self.script().choices.push_back(answer);
        self
    }

    /// Every question asked so far.
    pub fn questions(&self) -> Vec<String> {
        self.script().questions.clone()
    }

    /// Every notice shown so far.
    pub fn notices(&self) -> Vec<String> {
        self.script().notices.clone()
    }

    /// Returns `true` if some notice contains `needle`.
    pub fn saw(&self, needle: &str) -> bool {
        self.script().notices.iter().any(|n| n.contains(needle))
    }
}

impl Operator for ScriptedOperator {
    async fn confirm(&mut self, question: &str) -> bool {
        let mut script = self.script();
        script.questions.push(question.to_string());
        script.confirms.pop_front().unwrap_or(false)
    }

    async fn choose(&mut self, question: &str, range: RangeInclusive<u8>) -> u8 {
        let mut script = self.script();
        script.questions.push(question.to_string());
        script
            .choices
            .pop_front()
            .filter(|n| range.contains(n))
            .unwrap_or(*range.start())
    }

    fn notice(&mut self, message: &str) {
        self.script().notices.push(message.to_string());
    }
}
