//! Prompt Builder
//!
//! System prompts for lesson sub-tasks share one layout: a role, a focus
//! block that pins the model to the transcript, numbered objectives and the
//! JSON object shape to return. User content (transcript, earlier phase
//! outputs) is assembled separately by the pipeline context.

/// Prompt section types
#[derive(Debug, Clone)]
pub enum PromptSection {
    Role { expertise: String, task: String },
    /// Numbered objectives
    Objectives(Vec<String>),
    Focus {
        target: String,
        restrictions: Vec<String>,
    },
    /// Expected JSON object shape
    OutputJson(String),
}

#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    sections: Vec<PromptSection>,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn role(mut self, expertise: &str, task: &str) -> Self {
        self.sections.push(PromptSection::Role {
            expertise: expertise.to_string(),
            task: task.to_string(),
        });
        self
    }

    pub fn objectives(mut self, objectives: Vec<&str>) -> Self {
        self.sections.push(PromptSection::Objectives(
            objectives.into_iter().map(String::from).collect(),
        ));
        self
    }

    /// Restrict the answer to `target`
    pub fn focus(mut self, target: &str, restrictions: Vec<&str>) -> Self {
        self.sections.push(PromptSection::Focus {
            target: target.to_string(),
            restrictions: restrictions.into_iter().map(String::from).collect(),
        });
        self
    }

    /// Require a JSON object shaped like `shape`
    pub fn output_json(mut self, shape: &str) -> Self {
        self.sections.push(PromptSection::OutputJson(shape.to_string()));
        self
    }

    pub fn build(self) -> String {
        let mut prompt = String::new();

        for section in self.sections {
            match section {
                PromptSection::Role { expertise, task } => {
                    prompt.push_str(&format!(
                        "<ROLE>\nYou are an experienced {} reviewing {}.\n</ROLE>\n\n",
                        expertise, task
                    ));
                }
                PromptSection::Objectives(objectives) => {
                    prompt.push_str("<OBJECTIVES>\n");
                    for (i, obj) in objectives.iter().enumerate() {
                        prompt.push_str(&format!("{}. {}\n", i + 1, obj));
                    }
                    prompt.push_str("</OBJECTIVES>\n\n");
                }
                PromptSection::Focus {
                    target,
                    restrictions,
                } => {
                    prompt.push_str(&format!("<FOCUS>\nWork only from {}.\n", target));
                    for restriction in restrictions {
                        prompt.push_str(&format!("- {}\n", restriction));
                    }
                    prompt.push_str("</FOCUS>\n\n");
                }
                PromptSection::OutputJson(shape) => {
                    prompt.push_str("<OUTPUT>\nReply with one JSON object of this shape and nothing else:\n");
                    prompt.push_str(&shape);
                    prompt.push_str("\n</OUTPUT>\n\n");
                }
            }
        }

        prompt.trim_end().to_string()
    }
}

/// Preset prompt templates
pub struct PromptTemplates;

impl PromptTemplates {
    /// Base template for lesson-transcript sub-tasks
    pub fn lesson_task(task: &str) -> PromptBuilder {
        PromptBuilder::new()
            .role("pedagogical analyst", task)
            .focus(
                "the lesson transcript and findings provided by the user",
                vec![
                    "Quote the transcript when citing evidence",
                    "Never describe events the transcript does not contain",
                    "Write free-text fields in the transcript's language",
                ],
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_objectives_are_numbered() {
        let prompt = PromptBuilder::new()
            .role("pedagogical analyst", "lesson structure")
            .objectives(vec!["Identify phases", "Estimate timing"])
            .build();

        assert!(prompt.starts_with("<ROLE>"));
        assert!(prompt.contains("reviewing lesson structure"));
        assert!(prompt.contains("1. Identify phases\n2. Estimate timing"));
    }

    #[test]
    fn test_lesson_task_layout() {
        let prompt = PromptTemplates::lesson_task("classroom climate")
            .output_json("{\"score\": 0}")
            .build();

        let focus = prompt.find("<FOCUS>").unwrap();
        let output = prompt.find("<OUTPUT>").unwrap();
        assert!(focus < output);
        assert!(prompt.contains("classroom climate"));
        assert!(prompt.ends_with("{\"score\": 0}\n</OUTPUT>"));
    }
}
