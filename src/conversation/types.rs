//! Message and role types for the shared conversation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CrewError;

/// Author of a conversation message.
///
/// The six agent personas plus the human `User`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    /// Writes and updates code.
    Coder,
    /// Reviews code and issues a verdict.
    Critic,
    /// Investigates failures.
    Debugger,
    /// Designs structure and trade-offs.
    Architect,
    /// Represents the person who will use the result.
    #[serde(rename = "enduser")]
    EndUser,
    /// Answers questions raised by other agents.
    Questioner,
    /// The human driving the session.
    User,
}

impl AgentRole {
    /// Every agent persona, in declaration order. Excludes `User`.
    pub const AGENTS: [AgentRole; 6] = [
        AgentRole::Coder,
        AgentRole::Critic,
        AgentRole::Debugger,
        AgentRole::Architect,
        AgentRole::EndUser,
        AgentRole::Questioner,
    ];

    /// Lowercase identifier used in configuration and on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentRole::Coder => "coder",
            AgentRole::Critic => "critic",
            AgentRole::Debugger => "debugger",
            AgentRole::Architect => "architect",
            AgentRole::EndUser => "enduser",
            AgentRole::Questioner => "questioner",
            AgentRole::User => "user",
        }
    }

    /// Tag prepended to history lines, e.g. `[CRITIC]`.
    pub fn tag(&self) -> String {
        format!("[{}]", self.as_str().to_uppercase())
    }

    /// True for every role except `User`.
    pub fn is_agent(&self) -> bool {
        !matches!(self, AgentRole::User)
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentRole {
    type Err = CrewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "coder" => Ok(AgentRole::Coder),
            "critic" => Ok(AgentRole::Critic),
            "debugger" => Ok(AgentRole::Debugger),
            "architect" => Ok(AgentRole::Architect),
            "enduser" | "end_user" | "end-user" => Ok(AgentRole::EndUser),
            "questioner" | "asker" => Ok(AgentRole::Questioner),
            "user" => Ok(AgentRole::User),
            other => Err(CrewError::validation(format!("Unknown agent role: {}", other))),
        }
    }
}

/// One entry of the conversation log. Never modified after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique identifier.
    pub id: String,
    /// Author of the message.
    pub role: AgentRole,
    /// Message text.
    pub content: String,
    /// Creation time.
    pub timestamp: DateTime<Utc>,
    /// Message this one answers, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
}

/// A fenced code fragment extracted from a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeBlock {
    /// Unique identifier.
    pub id: String,
    /// Fence language tag, `text` when absent.
    pub language: String,
    /// Trimmed code body.
    pub code: String,
    /// Time the source message was stored.
    pub timestamp: DateTime<Utc>,
    /// Author of the source message.
    pub author_role: AgentRole,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip_through_str() {
        for role in AgentRole::AGENTS {
            assert_eq!(role.as_str().parse::<AgentRole>().unwrap(), role);
        }
        assert_eq!("asker".parse::<AgentRole>().unwrap(), AgentRole::Questioner);
        assert!("manager".parse::<AgentRole>().is_err());
    }

    #[test]
    fn test_role_tag_and_serde() {
        assert_eq!(AgentRole::EndUser.tag(), "[ENDUSER]");
        assert_eq!(
            serde_json::to_string(&AgentRole::EndUser).unwrap(),
            "\"enduser\""
        );
        assert!(!AgentRole::User.is_agent());
    }
}
