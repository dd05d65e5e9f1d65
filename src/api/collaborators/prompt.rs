//! the interactive prompt seam.
//!
//! every prompt may be cancelled by the user, which is reported as `None`
//! and means "abort this step, go back" rather than an error.

use async_trait::async_trait;
use zeroize::Zeroizing;

use super::engine::ProofProgress;

/// Severity of a message shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum Notice {
    Info,
    Success,
    Warning,
    Error,
}

/// One rendered menu entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceView {
    pub label: String,
    pub hint: Option<String>,
    pub enabled: bool,
}

/// A menu as the prompter renders it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuView {
    pub header: Option<String>,
    pub message: String,
    pub choices: Vec<ChoiceView>,
}

impl MenuView {
    pub fn labels(&self) -> Vec<&str> {
        self.choices.iter().map(|c| c.label.as_str()).collect()
    }
}

/// Terminal input and output.
#[async_trait]
pub trait Prompter: Send + Sync + std::fmt::Debug {
    /// index of the chosen entry
    async fn select(&self, menu: &MenuView) -> Option<usize>;

    async fn input(&self, message: &str, initial: Option<&str>) -> Option<String>;

    async fn password(&self, message: &str) -> Option<Zeroizing<String>>;

    async fn confirm(&self, message: &str) -> bool;

    fn notify(&self, level: Notice, message: &str);

    fn progress(&self, progress: &ProofProgress);
}

#[derive(Debug, Clone)]
struct Choice<T> {
    value: T,
    view: ChoiceView,
}

/// A typed menu, resolved to a value of `T`.
#[derive(Debug, Clone)]
pub struct Menu<T> {
    header: Option<String>,
    message: String,
    choices: Vec<Choice<T>>,
}

impl<T: Clone> Menu<T> {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            header: None,
            message: message.into(),
            choices: vec![],
        }
    }

    pub fn header(mut self, header: impl Into<String>) -> Self {
        self.header = Some(header.into());
        self
    }

    pub fn choice(self, value: T, label: impl Into<String>) -> Self {
        self.entry(value, label, None, true)
    }

    pub fn entry(
        mut self,
        value: T,
        label: impl Into<String>,
        hint: Option<String>,
        enabled: bool,
    ) -> Self {
        self.choices.push(Choice {
            value,
            view: ChoiceView {
                label: label.into(),
                hint,
                enabled,
            },
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.choices.is_empty()
    }

    pub fn view(&self) -> MenuView {
        MenuView {
            header: self.header.clone(),
            message: self.message.clone(),
            choices: self.choices.iter().map(|c| c.view.clone()).collect(),
        }
    }

    /// Presents the menu until an enabled entry is chosen or the user
    /// cancels.
    pub async fn run(&self, prompter: &dyn Prompter) -> Option<T> {
        let view = self.view();
        loop {
            let index = prompter.select(&view).await?;
            match self.choices.get(index) {
                Some(choice) if choice.view.enabled => return Some(choice.value.clone()),
                Some(choice) => prompter.notify(
                    Notice::Warning,
                    &format!("{} is not available right now", choice.view.label),
                ),
                None => return None,
            }
        }
    }
}

/// Prompts for text until `parse` accepts it or the user cancels.
///
/// Rejections are shown and the prompt repeats immediately.
pub async fn input_until_valid<T>(
    prompter: &dyn Prompter,
    message: &str,
    initial: Option<&str>,
    mut parse: impl FnMut(&str) -> Result<T, String> + Send,
) -> Option<T> {
    loop {
        let raw = prompter.input(message, initial).await?;
        match parse(&raw) {
            Ok(value) => return Some(value),
            Err(reason) => prompter.notify(Notice::Warning, &reason),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use macro_rules_attr::apply;

    use super::*;
    use crate::tests::shared::prompter::ScriptedPrompter;
    use crate::tests::shared::prompter::Step;
    use crate::tests::shared_tokio_runtime;

    #[apply(shared_tokio_runtime)]
    async fn disabled_entries_are_reprompted() {
        let prompter = ScriptedPrompter::new(vec![
            Step::select("Generate Proof"),
            Step::select("Cancel"),
        ]);
        let menu = Menu::new("pick")
            .entry(1, "Generate Proof", None, false)
            .choice(2, "Cancel");

        assert_eq!(Some(2), menu.run(&prompter).await);
        assert_eq!(2, prompter.menus_seen().len());
    }

    #[apply(shared_tokio_runtime)]
    async fn invalid_input_is_rejected_until_valid() {
        let prompter = ScriptedPrompter::new(vec![Step::input("abc"), Step::input("42")]);
        let value = input_until_valid(&prompter, "number", None, |s| {
            s.parse::<u32>().map_err(|e| e.to_string())
        })
        .await;

        assert_eq!(Some(42), value);
        assert_eq!(1, prompter.notices_at(Notice::Warning).len());
    }

    #[apply(shared_tokio_runtime)]
    async fn cancelled_input_yields_none() {
        let prompter = ScriptedPrompter::new(vec![Step::Cancel]);
        let value = input_until_valid(&prompter, "number", None, |s| {
            s.parse::<u32>().map_err(|e| e.to_string())
        })
        .await;
        assert!(value.is_none());
    }
}
