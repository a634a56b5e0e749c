//! Prompt assembly and input bounding.

/// Marker appended when the acronym scan input is cut.
pub const TRUNCATION_MARKER: &str = "\n[Content truncated for processing]";

/// First `limit` characters of `text`.
pub fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// A generation prompt: instruction, labeled context blocks, output rules.
#[derive(Debug, Clone, Default)]
pub struct Prompt {
    instruction: String,
    blocks: Vec<(String, String)>,
    rules: Vec<String>,
}

impl Prompt {
    pub fn new(instruction: impl Into<String>) -> Self {
        Self {
            instruction: instruction.into(),
            ..Default::default()
        }
    }

    /// Add a labeled context block. Blank content is skipped.
    pub fn context(mut self, label: &str, content: impl Into<String>) -> Self {
        let content = content.into();
        if !content.trim().is_empty() {
            self.blocks.push((label.to_string(), content));
        }
        self
    }

    /// Add an output rule.
    pub fn rule(mut self, rule: impl Into<String>) -> Self {
        self.rules.push(rule.into());
        self
    }

    pub fn build(&self) -> String {
        let mut out = self.instruction.trim().to_string();
        for (label, content) in &self.blocks {
            out.push_str(&format!("\n\n{}:\n{}", label, content.trim()));
        }
        if !self.rules.is_empty() {
            out.push_str("\n\nRules:");
            for rule in &self.rules {
                out.push_str(&format!("\n- {}", rule));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_counts_chars() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abc", 0), "");
    }

    #[test]
    fn test_prompt_layout() {
        let prompt = Prompt::new("Summarize.")
            .context("PROTOCOL", "Step 1")
            .context("EMPTY", "  ")
            .rule("Plain text only")
            .build();
        assert_eq!(prompt, "Summarize.\n\nPROTOCOL:\nStep 1\n\nRules:\n- Plain text only");
    }
}
