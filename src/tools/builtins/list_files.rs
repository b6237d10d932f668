use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

use crate::config::ToolsConfig;
use crate::error::{CrewError, CrewResult};
use crate::provider::ToolDefinition;
use crate::tools::registry::Tool;
use crate::tools::validation::{resolve_path, validate_path, PathAccess};

use super::{base_dir, parse_args};

const NAME: &str = "list_files";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListArgs {
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    recursive: bool,
    #[serde(default, alias = "max_depth")]
    max_depth: Option<usize>,
}

#[derive(Debug)]
struct Entry {
    path: PathBuf,
    size: Option<u64>,
}

/// Lists directory entries, optionally recursing to a maximum depth.
pub struct ListFilesTool {
    definition: ToolDefinition,
    base_dir: Option<PathBuf>,
    default_depth: usize,
    excluded_dirs: Vec<String>,
}

impl ListFilesTool {
    /// Tool using the configured working directory, depth and exclusions.
    pub fn from_config(config: &ToolsConfig) -> Self {
        let definition = ToolDefinition::new(
            NAME,
            "List files and directories in a given path.",
            json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "The directory path to list (optional, defaults to current directory)"
                    },
                    "recursive": {
                        "type": "boolean",
                        "description": "Whether to list recursively (optional, defaults to false)"
                    },
                    "maxDepth": {
                        "type": "number",
                        "description": "Maximum recursion depth (optional, defaults to 3)"
                    }
                },
                "required": []
            }),
        );
        Self {
            definition,
            base_dir: base_dir(config),
            default_depth: config.list_max_depth,
            excluded_dirs: config.excluded_dirs.clone(),
        }
    }

    fn is_skipped(&self, name: &str) -> bool {
        name.starts_with('.') || self.excluded_dirs.iter().any(|d| d == name)
    }

    async fn collect(&self, root: &Path, recursive: bool, max_depth: usize) -> CrewResult<Vec<Entry>> {
        let mut entries = Vec::new();
        // Pre-order walk: a directory is followed by its own children.
        let mut stack: Vec<(Entry, usize)> = self
            .read_level(root)
            .await?
            .into_iter()
            .rev()
            .map(|entry| (entry, 0))
            .collect();

        while let Some((entry, depth)) = stack.pop() {
            if entry.size.is_none() && recursive && depth < max_depth {
                let children = self.read_level(&entry.path).await?;
                stack.extend(children.into_iter().rev().map(|child| (child, depth + 1)));
            }
            entries.push(entry);
        }
        Ok(entries)
    }

    async fn read_level(&self, dir: &Path) -> CrewResult<Vec<Entry>> {
        let mut reader = tokio::fs::read_dir(dir)
            .await
            .map_err(|e| CrewError::file_system(dir.display().to_string(), e.to_string()))?;

        let mut level = Vec::new();
        while let Some(item) = reader
            .next_entry()
            .await
            .map_err(|e| CrewError::file_system(dir.display().to_string(), e.to_string()))?
        {
            let name = item.file_name().to_string_lossy().to_string();
            if self.is_skipped(&name) {
                continue;
            }
            let metadata = match tokio::fs::metadata(item.path()).await {
                Ok(metadata) => metadata,
                Err(_) => continue,
            };
            level.push(Entry {
                path: item.path(),
                size: if metadata.is_dir() { None } else { Some(metadata.len()) },
            });
        }
        level.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(level)
    }
}

/// Human-readable size with one decimal above bytes.
pub(crate) fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}

#[async_trait]
impl Tool for ListFilesTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, args: Value) -> CrewResult<String> {
        let args: ListArgs = parse_args(NAME, args)?;
        let requested = args.path.unwrap_or_else(|| ".".to_string());
        validate_path(&requested, PathAccess::Read)?;

        let root = resolve_path(self.base_dir.as_deref(), &requested);
        let max_depth = args.max_depth.unwrap_or(self.default_depth);
        let entries = self.collect(&root, args.recursive, max_depth).await?;

        if entries.is_empty() {
            return Ok("(empty directory)".to_string());
        }
        Ok(entries
            .iter()
            .map(|entry| match entry.size {
                Some(size) => format!("📄 {} ({})", entry.path.display(), format_size(size)),
                None => format!("📁 {}", entry.path.display()),
            })
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool_in(dir: &Path) -> ListFilesTool {
        ListFilesTool::from_config(&ToolsConfig {
            working_dir: Some(dir.display().to_string()),
            ..Default::default()
        })
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
    }

    #[tokio::test]
    async fn test_empty_directory_sentinel() {
        let dir = tempfile::tempdir().unwrap();
        let output = tool_in(dir.path()).execute(json!({})).await.unwrap();
        assert_eq!(output, "(empty directory)");
    }

    #[tokio::test]
    async fn test_skips_hidden_and_excluded() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".secret"), "x").unwrap();
        std::fs::create_dir(dir.path().join("node_modules")).unwrap();
        std::fs::write(dir.path().join("main.rs"), "fn main() {}").unwrap();

        let output = tool_in(dir.path()).execute(json!({})).await.unwrap();
        assert_eq!(output.lines().count(), 1);
        assert!(output.starts_with("📄 "));
        assert!(output.ends_with("main.rs (12 B)"));
    }

    #[tokio::test]
    async fn test_recursion_respects_depth() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("a/b/c")).unwrap();
        std::fs::write(dir.path().join("a/b/c/deep.txt"), "x").unwrap();
        std::fs::write(dir.path().join("a/top.txt"), "x").unwrap();
        let tool = tool_in(dir.path());

        let flat = tool.execute(json!({"path": "a"})).await.unwrap();
        assert_eq!(flat.lines().count(), 2);

        let shallow = tool
            .execute(json!({"path": "a", "recursive": true, "maxDepth": 1}))
            .await
            .unwrap();
        let lines: Vec<&str> = shallow.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("📁 ") && lines[0].ends_with("b"));
        assert!(lines[1].ends_with("c"));
        assert!(lines[2].contains("top.txt"));

        let full = tool
            .execute(json!({"path": "a", "recursive": true}))
            .await
            .unwrap();
        assert!(full.contains("deep.txt (1 B)"));
    }

    #[tokio::test]
    async fn test_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = tool_in(dir.path())
            .execute(json!({"path": "nope"}))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "FILE_SYSTEM_ERROR");
    }
}
