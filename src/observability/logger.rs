//! Markdown transcript of an orchestration session.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Transcript logger for agent turns, tool calls and protocol decisions.
///
/// Every entry is appended to a markdown file so a session can be reviewed
/// after the fact. Console output goes through `tracing`.
#[derive(Debug)]
pub struct Logger {
    log_file: PathBuf,
    log_level: String,
}

impl Logger {
    /// Initialize logger.
    ///
    /// # Arguments
    /// * `log_file` - Path to log file. If None, creates a timestamped file in temp directory.
    /// * `log_level` - Logging level (defaults to "INFO").
    pub fn new(log_file: Option<&Path>, log_level: Option<&str>) -> Result<Self> {
        let log_file = match log_file {
            Some(p) => p.to_path_buf(),
            None => std::env::temp_dir().join("crewkit-logs").join(format!(
                "session_{}_{}.md",
                Utc::now().timestamp_millis(),
                std::process::id()
            )),
        };

        if let Some(parent) = log_file.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create log directory: {}", parent.display()))?;
        }

        let logger = Self {
            log_file,
            log_level: log_level.unwrap_or("INFO").to_uppercase(),
        };

        if !logger.log_file.exists() {
            logger.initialize_log_file()?;
        }

        Ok(logger)
    }

    fn initialize_log_file(&self) -> Result<()> {
        let mut file = File::create(&self.log_file)
            .with_context(|| format!("Failed to create log file: {}", self.log_file.display()))?;

        let now: DateTime<Utc> = Utc::now();
        writeln!(file, "# Agent Interaction Log\n")?;
        writeln!(file, "Log started: {}\n", now.to_rfc3339())?;
        writeln!(file, "---\n")?;
        Ok(())
    }

    fn append_to_log(&self, content: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_file)
            .with_context(|| format!("Failed to open log file: {}", self.log_file.display()))?;

        write!(file, "{}", content).with_context(|| "Failed to write to log file")?;
        Ok(())
    }

    fn is_debug(&self) -> bool {
        matches!(self.log_level.as_str(), "DEBUG" | "TRACE")
    }

    /// Log session start with the effective settings.
    pub fn log_session_start(
        &self,
        session: &str,
        config: &HashMap<String, serde_json::Value>,
    ) -> Result<()> {
        let content = format!(
            "## Session Started - {}\n\n**Session:** {}\n**Config:** {}\n\n",
            Utc::now().to_rfc3339(),
            session,
            serde_json::to_string_pretty(config).unwrap_or_default()
        );
        self.append_to_log(&content)?;
        info!(session, "Session started");
        Ok(())
    }

    /// Log a finished agent turn.
    ///
    /// Empty answers are skipped. Outside debug level only the first 500
    /// characters of the answer are kept.
    pub fn log_agent_turn(&self, role: &str, content: &str, iterations: u32) -> Result<()> {
        if content.trim().is_empty() {
            return Ok(());
        }

        let body = if self.is_debug() || content.chars().count() <= 500 {
            content.to_string()
        } else {
            let head: String = content.chars().take(500).collect();
            format!("{}\n... [truncated]", head)
        };

        let entry = format!(
            "### Agent Turn - {}\n\n**Role:** {}\n**Model turns:** {}\n\n```\n{}\n```\n\n",
            Utc::now().to_rfc3339(),
            role,
            iterations,
            body
        );
        self.append_to_log(&entry)
    }

    /// Log tool execution with its result.
    pub fn log_tool_execution(
        &self,
        tool_name: &str,
        tool_args: &str,
        result: &str,
        success: bool,
    ) -> Result<()> {
        let status = if success { "Result" } else { "Error" };
        let content = format!(
            "### Tool Execution - {}\n\n**Tool:** {}\n**Args:** {}\n**{}:** {}\n\n",
            Utc::now().to_rfc3339(),
            tool_name,
            tool_args,
            status,
            result
        );
        self.append_to_log(&content)
    }

    /// Log a critic verdict from the review protocol.
    pub fn log_review_verdict(&self, cycle: u32, approved: bool, forced: bool) -> Result<()> {
        let verdict = match (approved, forced) {
            (true, true) => "APPROVED (cycle limit reached)",
            (true, false) => "APPROVED",
            (false, _) => "NEEDS CHANGES",
        };
        let content = format!(
            "### Review Cycle {} - {}\n\n**Verdict:** {}\n\n",
            cycle,
            Utc::now().to_rfc3339(),
            verdict
        );
        self.append_to_log(&content)
    }

    /// Log questions routed from one agent to another.
    pub fn log_handoff(&self, from: &str, to: &str, questions: &[String]) -> Result<()> {
        let list = questions
            .iter()
            .map(|q| format!("- {}", q))
            .collect::<Vec<_>>()
            .join("\n");
        let content = format!(
            "### Question Hand-off - {}\n\n**From:** {}\n**To:** {}\n\n{}\n\n",
            Utc::now().to_rfc3339(),
            from,
            to,
            list
        );
        self.append_to_log(&content)
    }

    /// Log error with context.
    pub fn log_error(
        &self,
        error: &str,
        context: Option<&HashMap<String, serde_json::Value>>,
    ) -> Result<()> {
        let mut content = format!(
            "### Error - {}\n\n**Error:** {}\n\n",
            Utc::now().to_rfc3339(),
            error
        );

        if let Some(ctx) = context {
            content.push_str(&format!(
                "**Context:** {}\n\n",
                serde_json::to_string_pretty(ctx).unwrap_or_default()
            ));
        }

        self.append_to_log(&content)?;
        error!(error, "Session error");
        Ok(())
    }

    /// Log session completion.
    pub fn log_completion(&self, reason: &str) -> Result<()> {
        let content = format!(
            "### Session Completed - {}\n\n**Reason:** {}\n\n---\n\n",
            Utc::now().to_rfc3339(),
            reason
        );
        self.append_to_log(&content)?;
        info!(reason, "Session completed");
        Ok(())
    }

    /// Get the log file path.
    pub fn log_file(&self) -> &Path {
        &self.log_file
    }

    /// Get the log level.
    pub fn log_level(&self) -> &str {
        &self.log_level
    }
}
