//! Request types passed to a [`super::Generator`].

use std::collections::BTreeMap;

use syllabus_store::StageKind;

/// A prompt with `{name}` placeholders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptTemplate {
    pub name: &'static str,
    pub text: &'static str,
}

/// The structured record a generation call is expected to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputShape {
    /// Record name, e.g. `KnowledgeGap`.
    pub name: &'static str,
    /// Top-level JSON keys the record must contain; checked by
    /// [`super::check_fields`] before deserializing.
    pub fields: &'static [&'static str],
    /// Example JSON object shown to the model.
    pub example: &'static str,
}

/// One call to the generation capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub stage: StageKind,
    pub template: PromptTemplate,
    pub inputs: BTreeMap<String, String>,
    pub shape: OutputShape,
}

impl GenerationRequest {
    pub fn new(stage: StageKind, template: PromptTemplate, shape: OutputShape) -> Self {
        Self {
            stage,
            template,
            inputs: BTreeMap::new(),
            shape,
        }
    }

    /// Add a template input.
    pub fn with_input(mut self, name: &str, value: impl Into<String>) -> Self {
        self.inputs.insert(name.to_string(), value.into());
        self
    }

    /// Substitute every `{name}` placeholder with its input and append the
    /// output contract. Placeholders without an input are left as-is, and
    /// substituted values are never expanded again.
    pub fn render(&self) -> String {
        let text = self.template.text;
        let mut prompt = String::with_capacity(text.len() + self.shape.example.len() + 256);

        let mut rest = text;
        while let Some(open) = rest.find('{') {
            prompt.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            match after.find('}') {
                Some(close) => {
                    let name = &after[..close];
                    match self.inputs.get(name) {
                        Some(value) => prompt.push_str(value),
                        None => {
                            prompt.push('{');
                            prompt.push_str(name);
                            prompt.push('}');
                        }
                    }
                    rest = &after[close + 1..];
                }
                None => {
                    prompt.push_str(&rest[open..]);
                    rest = "";
                }
            }
        }
        prompt.push_str(rest);

        prompt.push_str("\n\nRespond with a single JSON object describing a ");
        prompt.push_str(self.shape.name);
        prompt.push_str(" in exactly this format:\n");
        prompt.push_str(self.shape.example);
        prompt.push_str("\nReturn JSON only, with no surrounding prose.\n");
        prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE: PromptTemplate = PromptTemplate {
        name: "test",
        text: "Learn {topic} as a {background} using {format}.",
    };

    const SHAPE: OutputShape = OutputShape {
        name: "Thing",
        fields: &["a"],
        example: r#"{"a": "text"}"#,
    };

    #[test]
    fn render_substitutes_inputs() {
        let req = GenerationRequest::new(StageKind::GapAnalysis, TEMPLATE, SHAPE)
            .with_input("topic", "Rust")
            .with_input("background", "C programmer")
            .with_input("format", "video");
        let prompt = req.render();
        assert!(prompt.starts_with("Learn Rust as a C programmer using video."));
        assert!(prompt.contains("describing a Thing"));
        assert!(prompt.contains(r#"{"a": "text"}"#));
    }

    #[test]
    fn render_leaves_unknown_placeholders() {
        let req = GenerationRequest::new(StageKind::GapAnalysis, TEMPLATE, SHAPE)
            .with_input("topic", "Rust");
        assert!(req.render().contains("{background}"));
    }

    #[test]
    fn input_values_are_not_reexpanded() {
        let req = GenerationRequest::new(StageKind::GapAnalysis, TEMPLATE, SHAPE)
            .with_input("topic", "{background}")
            .with_input("background", "x");
        assert!(req.render().starts_with("Learn {background} as a x"));
    }
}
