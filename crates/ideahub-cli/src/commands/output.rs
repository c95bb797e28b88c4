use serde::Serialize;

/// Where command results go: human-readable lines or pretty JSON.
#[derive(Debug, Clone, Copy)]
pub struct Output {
    json: bool,
}

impl Output {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    /// Prints `value` as JSON, or runs `human` for plain output.
    pub fn emit<T: Serialize>(&self, value: &T, human: impl FnOnce()) -> anyhow::Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            human();
        }
        Ok(())
    }

    pub fn message(&self, text: &str) -> anyhow::Result<()> {
        self.emit(&serde_json::json!({ "message": text }), || println!("{}", text))
    }
}
