use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::PathBuf;

use crate::config::ToolsConfig;
use crate::error::{CrewError, CrewResult};
use crate::provider::ToolDefinition;
use crate::tools::registry::Tool;
use crate::tools::validation::{resolve_path, validate_path, PathAccess};

use super::{base_dir, parse_args};

const NAME: &str = "edit_file";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EditArgs {
    path: String,
    search: String,
    replace: String,
    #[serde(default, alias = "is_regex")]
    is_regex: bool,
    #[serde(default)]
    all: bool,
}

/// Replaces text in an existing file, by exact match or regex.
pub struct EditFileTool {
    definition: ToolDefinition,
    base_dir: Option<PathBuf>,
}

impl EditFileTool {
    /// Tool resolving relative paths against the configured working directory.
    pub fn from_config(config: &ToolsConfig) -> Self {
        let definition = ToolDefinition::new(
            NAME,
            "Edit an existing file by replacing specific text. Supports exact string matching or regex patterns.",
            json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "The file path to edit"
                    },
                    "search": {
                        "type": "string",
                        "description": "The text or regex pattern to search for"
                    },
                    "replace": {
                        "type": "string",
                        "description": "The replacement text"
                    },
                    "isRegex": {
                        "type": "boolean",
                        "description": "Whether to treat the search string as a regex pattern (optional, defaults to false)"
                    },
                    "all": {
                        "type": "boolean",
                        "description": "Whether to replace all occurrences (optional, defaults to false)"
                    }
                },
                "required": ["path", "search", "replace"]
            }),
        );
        Self {
            definition,
            base_dir: base_dir(config),
        }
    }
}

/// Apply the edit, returning the new content and the number of replacements.
fn apply_edit(content: &str, args: &EditArgs) -> CrewResult<(String, usize)> {
    if args.search.is_empty() {
        return Err(CrewError::validation("Search text cannot be empty"));
    }

    if args.is_regex {
        let pattern = Regex::new(&format!("(?m){}", args.search))
            .map_err(|e| CrewError::validation(format!("Invalid regex '{}': {}", args.search, e)))?;
        let found = pattern.find_iter(content).count();
        let count = if args.all { found } else { found.min(1) };
        let limit = if args.all { 0 } else { 1 };
        let edited = pattern.replacen(content, limit, args.replace.as_str()).into_owned();
        return Ok((edited, count));
    }

    let found = content.matches(args.search.as_str()).count();
    if args.all {
        Ok((content.replace(&args.search, &args.replace), found))
    } else {
        let edited = content.replacen(&args.search, &args.replace, 1);
        Ok((edited, found.min(1)))
    }
}

#[async_trait]
impl Tool for EditFileTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, args: Value) -> CrewResult<String> {
        let args: EditArgs = parse_args(NAME, args)?;
        validate_path(&args.path, PathAccess::Write)?;

        let target = resolve_path(self.base_dir.as_deref(), &args.path);
        let content = tokio::fs::read_to_string(&target)
            .await
            .map_err(|e| CrewError::file_system(target.display().to_string(), e.to_string()))?;

        let (edited, count) = apply_edit(&content, &args)?;
        if count == 0 {
            return Err(CrewError::tool(NAME, format!("No matches found for: {}", args.search)));
        }

        tokio::fs::write(&target, edited.as_bytes())
            .await
            .map_err(|e| CrewError::file_system(target.display().to_string(), e.to_string()))?;

        Ok(format!(
            "File edited successfully: {} ({} replacement{} made)",
            args.path,
            count,
            if count > 1 { "s" } else { "" }
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(search: &str, replace: &str, is_regex: bool, all: bool) -> EditArgs {
        EditArgs {
            path: "f.txt".into(),
            search: search.into(),
            replace: replace.into(),
            is_regex,
            all,
        }
    }

    #[test]
    fn test_exact_single_and_all() {
        let (first, n) = apply_edit("a b a", &args("a", "x", false, false)).unwrap();
        assert_eq!((first.as_str(), n), ("x b a", 1));

        let (every, n) = apply_edit("a b a", &args("a", "x", false, true)).unwrap();
        assert_eq!((every.as_str(), n), ("x b x", 2));
    }

    #[test]
    fn test_regex_with_groups() {
        let (edited, n) = apply_edit(
            "let x = 1;\nlet y = 2;",
            &args(r"^let (\w+)", "const $1", true, true),
        )
        .unwrap();
        assert_eq!(edited, "const x = 1;\nconst y = 2;");
        assert_eq!(n, 2);
    }

    #[test]
    fn test_invalid_regex() {
        let err = apply_edit("abc", &args("(", "x", true, false)).unwrap_err();
        assert!(err.to_string().starts_with("Invalid regex"));
    }

    #[tokio::test]
    async fn test_zero_matches_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("code.rs");
        std::fs::write(&file, "fn main() {}\n").unwrap();

        let tool = EditFileTool::from_config(&ToolsConfig::default());
        let err = tool
            .execute(json!({
                "path": file.display().to_string(),
                "search": "missing",
                "replace": "found"
            }))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "No matches found for: missing");
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "fn main() {}\n");
    }

    #[tokio::test]
    async fn test_reports_replacement_count() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("notes.txt");
        std::fs::write(&file, "todo todo todo").unwrap();
        let path = file.display().to_string();

        let tool = EditFileTool::from_config(&ToolsConfig::default());
        let output = tool
            .execute(json!({"path": path, "search": "todo", "replace": "done", "all": true}))
            .await
            .unwrap();

        assert_eq!(output, format!("File edited successfully: {} (3 replacements made)", path));
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "done done done");
    }
}
