use tui_input::{Input, InputRequest};

/// Editable kernel expression with a history of submitted values.
///
/// Owned by the app for its whole lifetime, so the text survives closing
/// and reopening the editor popup.
pub struct ExpressionEditor {
    input: Input,
    history: Vec<String>,
    browsing: Option<usize>,
}

impl ExpressionEditor {
    pub const DEFAULT_EXPRESSION: &str = "1 if (x-1)**2 + (y-1)**2 < 1 else 0";

    pub fn new(initial: &str) -> Self {
        Self {
            input: Input::new(initial.to_string()),
            history: Vec::new(),
            browsing: None,
        }
    }

    pub fn value(&self) -> &str {
        self.input.value()
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub(crate) fn input(&self) -> &Input {
        &self.input
    }

    pub(crate) fn handle(&mut self, request: InputRequest) {
        if self.input.handle(request).is_some() {
            self.browsing = None;
        }
    }

    /// Record the current text as submitted. Repeats of the latest entry are
    /// not stored twice.
    pub fn commit(&mut self) {
        let value = self.input.value().trim();

        if !value.is_empty() && self.history.last().map(String::as_str) != Some(value) {
            self.history.push(value.to_string());
        }
        self.browsing = None;
    }

    pub fn previous(&mut self) {
        if self.history.is_empty() {
            return;
        }

        let index = match self.browsing {
            Some(index) => index.saturating_sub(1),
            None => self.history.len() - 1,
        };
        self.show(index);
    }

    pub fn next(&mut self) {
        let Some(index) = self.browsing else {
            return;
        };

        if index + 1 < self.history.len() {
            self.show(index + 1);
        }
    }

    fn show(&mut self, index: usize) {
        self.input = Input::new(self.history[index].clone());
        self.browsing = Some(index);
    }
}

impl Default for ExpressionEditor {
    fn default() -> Self {
        Self::new(Self::DEFAULT_EXPRESSION)
    }
}
