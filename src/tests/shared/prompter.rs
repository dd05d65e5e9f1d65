use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::MutexGuard;

use async_trait::async_trait;
use zeroize::Zeroizing;

use crate::api::collaborators::engine::ProofProgress;
use crate::api::collaborators::prompt::MenuView;
use crate::api::collaborators::prompt::Notice;
use crate::api::collaborators::Prompter;

/// One scripted user response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// pick the menu entry with this label
    Select(String),
    Input(String),
    Password(String),
    Confirm(bool),

    /// cancel whatever prompt comes next
    Cancel,
}

impl Step {
    pub fn select(label: &str) -> Self {
        Self::Select(label.to_string())
    }

    pub fn input(text: &str) -> Self {
        Self::Input(text.to_string())
    }

    pub fn password(secret: &str) -> Self {
        Self::Password(secret.to_string())
    }

    pub fn confirm(answer: bool) -> Self {
        Self::Confirm(answer)
    }
}

#[derive(Debug, Default)]
struct Recorded {
    steps: VecDeque<Step>,
    menus: Vec<MenuView>,
    notices: Vec<(Notice, String)>,
    progress: Vec<f64>,
    passwords_asked: usize,
}

/// A [`Prompter`] that answers from a script and records what it was shown.
///
/// Once the script runs out every prompt is cancelled. A step that does not
/// fit the prompt it meets fails the test.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    recorded: Mutex<Recorded>,
}

impl ScriptedPrompter {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            recorded: Mutex::new(Recorded {
                steps: steps.into(),
                ..Recorded::default()
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Recorded> {
        self.recorded.lock().unwrap()
    }

    fn next_step(&self, prompt: &str) -> Option<Step> {
        let step = self.lock().steps.pop_front()?;
        if step == Step::Cancel {
            return None;
        }
        tracing::debug!("scripted answer to {}: {:?}", prompt, step);
        Some(step)
    }

    pub fn menus_seen(&self) -> Vec<MenuView> {
        self.lock().menus.clone()
    }

    pub fn notices_at(&self, level: Notice) -> Vec<String> {
        self.lock()
            .notices
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, text)| text.clone())
            .collect()
    }

    pub fn progress_seen(&self) -> Vec<f64> {
        self.lock().progress.clone()
    }

    pub fn passwords_asked(&self) -> usize {
        self.lock().passwords_asked
    }

    pub fn remaining_steps(&self) -> usize {
        self.lock().steps.len()
    }
}

#[async_trait]
impl Prompter for ScriptedPrompter {
    async fn select(&self, menu: &MenuView) -> Option<usize> {
        self.lock().menus.push(menu.clone());
        match self.next_step(&menu.message)? {
            Step::Select(label) => {
                let index = menu.labels().iter().position(|l| *l == label);
                assert!(
                    index.is_some(),
                    "no entry `{}` in menu `{}`: {:?}",
                    label,
                    menu.message,
                    menu.labels()
                );
                index
            }
            other => panic!("menu `{}` met scripted {:?}", menu.message, other),
        }
    }

    async fn input(&self, message: &str, _initial: Option<&str>) -> Option<String> {
        match self.next_step(message)? {
            Step::Input(text) => Some(text),
            other => panic!("input `{}` met scripted {:?}", message, other),
        }
    }

    async fn password(&self, message: &str) -> Option<Zeroizing<String>> {
        self.lock().passwords_asked += 1;
        match self.next_step(message)? {
            Step::Password(secret) => Some(Zeroizing::new(secret)),
            other => panic!("password `{}` met scripted {:?}", message, other),
        }
    }

    async fn confirm(&self, message: &str) -> bool {
        match self.next_step(message) {
            Some(Step::Confirm(answer)) => answer,
            None => false,
            Some(other) => panic!("confirm `{}` met scripted {:?}", message, other),
        }
    }

    fn notify(&self, level: Notice, message: &str) {
        self.lock().notices.push((level, message.to_string()));
    }

    fn progress(&self, progress: &ProofProgress) {
        self.lock().progress.push(progress.fraction);
    }
}
