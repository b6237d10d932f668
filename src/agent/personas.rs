//! Built-in agent personas.
//!
//! Personas are plain data: a system prompt, a sampling temperature and
//! whether the agent may call tools. One shared loop runs all of them.

use serde::{Deserialize, Serialize};

use crate::conversation::AgentRole;

/// Agent configuration, fixed when the agent is constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Persona {
    /// Display name.
    pub name: String,
    /// Role the agent's messages are authored as.
    pub role: AgentRole,
    /// System prompt sent first on every model call.
    pub system_prompt: String,
    /// Sampling temperature. Providers apply their default when absent.
    #[serde(default)]
    pub temperature: Option<f32>,
    /// Whether the tool manifest is offered to the model.
    #[serde(default)]
    pub use_tools: bool,
    /// Template for direct task requests; `{task}` is replaced.
    #[serde(default)]
    pub task_template: Option<String>,
}

impl Persona {
    /// Persona without tools, temperature or task template.
    pub fn new(name: impl Into<String>, role: AgentRole, system_prompt: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role,
            system_prompt: system_prompt.into(),
            temperature: None,
            use_tools: false,
            task_template: None,
        }
    }

    /// Set the temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Offer tools to the model.
    pub fn with_tools(mut self, use_tools: bool) -> Self {
        self.use_tools = use_tools;
        self
    }

    /// Set the task template.
    pub fn with_task_template(mut self, template: impl Into<String>) -> Self {
        self.task_template = Some(template.into());
        self
    }

    /// Prompt asking this persona to work on `task`.
    pub fn task_prompt(&self, task: &str) -> String {
        match &self.task_template {
            Some(template) => template.replace("{task}", task),
            None => task.to_string(),
        }
    }

    /// Default persona for an agent role; `None` for [`AgentRole::User`].
    pub fn for_role(role: AgentRole) -> Option<Self> {
        match role {
            AgentRole::Coder => Some(coder()),
            AgentRole::Critic => Some(critic()),
            AgentRole::Debugger => Some(debugger()),
            AgentRole::Architect => Some(architect()),
            AgentRole::EndUser => Some(end_user()),
            AgentRole::Questioner => Some(questioner()),
            AgentRole::User => None,
        }
    }

    /// All six default personas.
    pub fn defaults() -> Vec<Self> {
        AgentRole::AGENTS
            .iter()
            .filter_map(|role| Self::for_role(*role))
            .collect()
    }
}

const TEAM_NOTE: &str = "You work in a team of agents (Architect, Coder, Critic, Debugger, End User, \
Questioner) that share one conversation. Messages from others are prefixed with their role, \
for example [CRITIC]. Build on what they said instead of repeating it.";

fn coder() -> Persona {
    Persona::new(
        "The Coder",
        AgentRole::Coder,
        format!(
            "You are the Coder, the developer of the team.\n\n\
             - Implement what the user and the Architect ask for.\n\
             - Address every point the Critic raises, or explain why not.\n\
             - Handle errors and edge cases, and comment non-obvious logic.\n\
             - Put code in fenced blocks tagged with the language, e.g. ```rust.\n\n{}",
            TEAM_NOTE
        ),
    )
    .with_temperature(0.7)
    .with_task_template(
        "Please implement the following: {task}\n\nTake the conversation and any design decisions into account.",
    )
}

fn critic() -> Persona {
    Persona::new(
        "The Critic",
        AgentRole::Critic,
        format!(
            "You are the Critic, the code reviewer of the team.\n\n\
             Use the tools (shell, read_file, list_files) to look at the actual code, run linters \
             and tests. Point to exact locations and propose concrete fixes. Check logic, security, \
             error handling, performance and whether the requirements are met.\n\n\
             End every review with exactly one verdict line:\n\
             - APPROVED: ready to use\n\
             - NEEDS CHANGES: followed by the issues to fix\n\
             - NEEDS DISCUSSION: when the user or another agent must clarify something\n\n{}",
            TEAM_NOTE
        ),
    )
    .with_temperature(0.5)
    .with_tools(true)
    .with_task_template("Please review the following: {task}")
}

fn debugger() -> Persona {
    Persona::new(
        "The Debugger",
        AgentRole::Debugger,
        format!(
            "You are the Debugger.\n\n\
             Reproduce the problem with the tools (shell, read_file, list_files, edit_file), find \
             the root cause, and fix it directly in the code. Compare expected and actual behaviour \
             first, then narrow down where it diverges. Explain each step of the investigation.\n\n{}",
            TEAM_NOTE
        ),
    )
    .with_temperature(0.3)
    .with_tools(true)
    .with_task_template(
        "Please help debug the following issue: {task}\n\nFind the cause and propose a specific fix.",
    )
}

fn architect() -> Persona {
    Persona::new(
        "The Architect",
        AgentRole::Architect,
        format!(
            "You are the Architect.\n\n\
             Turn requirements into a structure the Coder can implement: components, interfaces, \
             data flow and the trade-offs between alternatives. Break large work into tasks and \
             call out risks early. ASCII diagrams are welcome.\n\n{}",
            TEAM_NOTE
        ),
    )
    .with_temperature(0.6)
    .with_task_template("Please design a solution for: {task}")
}

fn end_user() -> Persona {
    Persona::new(
        "The End User",
        AgentRole::EndUser,
        format!(
            "You are the End User, speaking for the people who will use the result.\n\n\
             Check that the solution solves the problem the user described, is easy to use, and \
             fails gracefully. Ask the \"what if\" questions a real user would ask and push back \
             on over-engineering.\n\n{}",
            TEAM_NOTE
        ),
    )
    .with_temperature(0.8)
    .with_task_template("From an end user perspective, please evaluate: {task}")
}

fn questioner() -> Persona {
    Persona::new(
        "The Questioner",
        AgentRole::Questioner,
        format!(
            "You are the Questioner. Other agents hand you the questions they raised so work can \
             continue without waiting for the user.\n\n\
             Answer from the conversation history first, then from the project itself using the \
             tools. Where the answer is a matter of convention, pick a sensible default and say so. \
             When you cannot determine an answer, say \"I don't know\" plainly. Keep answers short.\n\n{}",
            TEAM_NOTE
        ),
    )
    .with_temperature(0.7)
    .with_tools(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_cover_every_agent_role() {
        let personas = Persona::defaults();
        assert_eq!(personas.len(), 6);
        for role in AgentRole::AGENTS {
            assert!(personas.iter().any(|p| p.role == role));
        }
        assert!(Persona::for_role(AgentRole::User).is_none());
    }

    #[test]
    fn test_tool_flags_and_temperatures() {
        let critic = Persona::for_role(AgentRole::Critic).unwrap();
        assert!(critic.use_tools);
        assert_eq!(critic.temperature, Some(0.5));
        assert!(critic.system_prompt.contains("NEEDS CHANGES"));

        let coder = Persona::for_role(AgentRole::Coder).unwrap();
        assert!(!coder.use_tools);
        assert_eq!(coder.temperature, Some(0.7));

        let questioner = Persona::for_role(AgentRole::Questioner).unwrap();
        assert!(questioner.system_prompt.contains("I don't know"));
    }

    #[test]
    fn test_task_prompt() {
        let debugger = Persona::for_role(AgentRole::Debugger).unwrap();
        assert!(debugger
            .task_prompt("panic on empty input")
            .starts_with("Please help debug the following issue: panic on empty input"));

        let plain = Persona::new("Plain", AgentRole::Coder, "prompt");
        assert_eq!(plain.task_prompt("do it"), "do it");
    }
}
