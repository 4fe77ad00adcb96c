// Classification Prompt Builder for the copilot
// Feature: AI Copilot orchestration core
//
// Constructs the system prompt sent with a remote tool classification:
// - Defines the classifier's role
// - Enumerates every specialized tool (id, trigger, description, keywords)
// - Requires the answer to be exactly one tool id or the fallback id

use crate::models::tool::{Tool, ToolRegistry, GENERAL_TOOL_ID};

/// Builder for the tool classification system prompt
pub struct ClassificationPromptBuilder {
    /// Role and identity section
    role_section: String,
    /// Tools the model may choose from (fallback excluded)
    tools: Vec<ToolSummary>,
    /// Id to answer when no specialized tool applies
    fallback_id: String,
    /// Extra rules appended after the answer format
    constraints: Vec<String>,
}

struct ToolSummary {
    id: String,
    trigger: String,
    description: String,
    keywords: Vec<String>,
}

impl From<&Tool> for ToolSummary {
    fn from(tool: &Tool) -> Self {
        Self {
            id: tool.id.clone(),
            trigger: tool.trigger.clone(),
            description: tool.description.clone(),
            keywords: tool.keywords.clone(),
        }
    }
}

impl ClassificationPromptBuilder {
    /// Create a builder listing every specialized tool of the registry
    pub fn new(registry: &ToolRegistry) -> Self {
        Self {
            role_section: Self::default_role_section(),
            tools: registry.specialized().map(ToolSummary::from).collect(),
            fallback_id: registry
                .fallback()
                .map(|t| t.id.clone())
                .unwrap_or_else(|| GENERAL_TOOL_ID.to_string()),
            constraints: Vec::new(),
        }
    }

    /// Set the role section
    pub fn with_role(mut self, role: String) -> Self {
        self.role_section = role;
        self
    }

    /// Add a constraint
    pub fn add_constraint(mut self, constraint: String) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Build the complete system prompt
    pub fn build(&self) -> String {
        let mut sections = vec![self.role_section.clone()];

        sections.push(self.build_tool_section());

        sections.push(format!(
            "## Answer Format\n\n\
            Respond with exactly one tool id from the list above, or `{}` if none of them fits. \
            Output only the id: no punctuation, no explanation, no markdown.",
            self.fallback_id
        ));

        if !self.constraints.is_empty() {
            sections.push(format!(
                "## Important Rules\n\n{}",
                self.constraints
                    .iter()
                    .map(|c| format!("- {}", c))
                    .collect::<Vec<_>>()
                    .join("\n")
            ));
        }

        sections.join("\n\n")
    }

    fn build_tool_section(&self) -> String {
        if self.tools.is_empty() {
            return "## Available Tools\n\nNo specialized tools are registered.".to_string();
        }

        let entries = self
            .tools
            .iter()
            .map(|tool| {
                let keywords = if tool.keywords.is_empty() {
                    "none".to_string()
                } else {
                    tool.keywords.join(", ")
                };
                format!(
                    "- **{}**\n  - Trigger: {}\n  - Description: {}\n  - Keywords: {}",
                    tool.id, tool.trigger, tool.description, keywords
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        format!("## Available Tools\n\n{}", entries)
    }

    fn default_role_section() -> String {
        r#"# Role

You route user messages inside an administrative console copilot. Read the user's message and decide which specialized tool should handle it."#
            .to_string()
    }
}

/// Build the classification prompt for a registry
pub fn build_classification_prompt(registry: &ToolRegistry) -> String {
    ClassificationPromptBuilder::new(registry).build()
}
