use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::{QaError, QaResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedTestStep {
    /// 1-based index as written by the author.
    pub index: u32,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedTest {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub preconditions: Vec<String>,
    pub steps: Vec<ParsedTestStep>,
    pub assertions: Vec<String>,
    pub tags: Vec<String>,
}

struct Patterns {
    test: Regex,
    title: Regex,
    url: Regex,
    tags: Regex,
    preconditions: Regex,
    steps: Regex,
    assertions: Regex,
    step_line: Regex,
    list_split: Regex,
    list_bullet: Regex,
    tag_split: Regex,
}

fn field(label: &str) -> Regex {
    Regex::new(&format!(r"(?m)^{label}:\s*(.+)$")).expect("field pattern is valid")
}

fn block(label: &str) -> Regex {
    Regex::new(&format!(r"(?i){label}:\n([\s\S]*?)(?:\n\n|$)")).expect("block pattern is valid")
}

static PATTERNS: LazyLock<Patterns> = LazyLock::new(|| Patterns {
    test: field("TEST"),
    title: field("TITLE"),
    url: field("URL"),
    tags: field("TAGS"),
    preconditions: block("PRECONDITIONS"),
    steps: block("STEPS"),
    assertions: block("ASSERTIONS"),
    step_line: Regex::new(r"^(\d+)\.\s*(.+)$").expect("step pattern is valid"),
    list_split: Regex::new(r"\n-").expect("list pattern is valid"),
    list_bullet: Regex::new(r"^[-\s]+").expect("bullet pattern is valid"),
    tag_split: Regex::new(r",\s*").expect("tag pattern is valid"),
});

/// Parser for the line-oriented test-definition format
/// (`TEST:`, `TITLE:`, `URL:`, `PRECONDITIONS:`, `STEPS:`, `ASSERTIONS:`, `TAGS:`).
#[derive(Debug, Default, Clone, Copy)]
pub struct TestParser;

impl TestParser {
    pub fn new() -> Self {
        Self
    }

    pub async fn parse_file(&self, path: &Path) -> QaResult<ParsedTest> {
        let content = tokio::fs::read_to_string(path).await?;
        self.parse(&content).map_err(|e| match e {
            QaError::Parse(msg) => QaError::Parse(format!("{}: {msg}", path.display())),
            other => other,
        })
    }

    pub fn parse(&self, content: &str) -> QaResult<ParsedTest> {
        let content = content.replace("\r\n", "\n");
        let p = &*PATTERNS;

        let id = capture(&p.test, &content);
        let title = capture(&p.title, &content);
        let (Some(id), Some(title)) = (id, title) else {
            return Err(QaError::Parse("Test definition missing TEST or TITLE".into()));
        };

        let tags = capture(&p.tags, &content)
            .map(|raw| {
                p.tag_split
                    .split(&raw)
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(ParsedTest {
            id,
            title,
            url: capture(&p.url, &content),
            preconditions: parse_list(capture(&p.preconditions, &content)),
            steps: parse_steps(capture(&p.steps, &content))?,
            assertions: parse_list(capture(&p.assertions, &content)),
            tags,
        })
    }
}

fn capture(pattern: &Regex, content: &str) -> Option<String> {
    pattern
        .captures(content)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn parse_list(block: Option<String>) -> Vec<String> {
    let Some(block) = block else {
        return Vec::new();
    };
    let p = &*PATTERNS;
    p.list_split
        .split(&block)
        .map(|line| p.list_bullet.replace(line, "").trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

fn parse_steps(block: Option<String>) -> QaResult<Vec<ParsedTestStep>> {
    let Some(block) = block else {
        return Ok(Vec::new());
    };
    block
        .lines()
        .map(str::trim)
        .filter_map(|line| PATTERNS.step_line.captures(line))
        .map(|caps| {
            let index = caps[1].parse::<u32>().map_err(|_| {
                QaError::Parse(format!("step number '{}' is out of range", &caps[1]))
            })?;
            Ok(ParsedTestStep {
                index,
                description: caps[2].to_string(),
            })
        })
        .collect()
}
