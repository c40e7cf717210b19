use std::path::PathBuf;

use async_trait::async_trait;

use crate::agent::types::RunSummary;
use crate::config::AgentConfig;
use crate::errors::QaResult;
use crate::reporting::{write_artifact, Reporter};

pub struct HtmlReporter;

#[async_trait]
impl Reporter for HtmlReporter {
    fn name(&self) -> &'static str {
        "html"
    }

    async fn write(&self, summaries: &[RunSummary], config: &AgentConfig) -> QaResult<PathBuf> {
        write_artifact(&config.output_dir, "report.html", render(summaries, config)).await
    }
}

fn render(summaries: &[RunSummary], config: &AgentConfig) -> String {
    let rows = summaries
        .iter()
        .map(|s| {
            format!(
                "      <tr class=\"{}\"><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                s.status.to_string().to_lowercase(),
                escape(&s.test_id),
                escape(&s.title),
                s.status,
                s.steps.len()
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"<!DOCTYPE html>
<html>
  <head>
    <meta charset="utf-8">
    <title>QA Pilot Report</title>
    <style>
      table {{ border-collapse: collapse; }}
      td, th {{ border: 1px solid #ccc; padding: 4px 8px; }}
      tr.passed td {{ background: #e8f5e9; }}
      tr.failed td {{ background: #ffebee; }}
    </style>
  </head>
  <body>
    <h1>QA Pilot Report ({env})</h1>
    <p>Total tests: {total}</p>
    <table>
      <tr><th>ID</th><th>Title</th><th>Status</th><th>Steps</th></tr>
{rows}
    </table>
  </body>
</html>
"#,
        env = escape(&config.environment.to_string()),
        total = summaries.len(),
    )
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporting::fixtures::summaries;

    #[tokio::test]
    async fn writes_escaped_table() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AgentConfig::with_base_url("https://app.test");
        config.output_dir = dir.path().to_path_buf();

        let path = HtmlReporter.write(&summaries(), &config).await.unwrap();
        let html = std::fs::read_to_string(path).unwrap();
        assert!(html.contains("<h1>QA Pilot Report (qa)</h1>"));
        assert!(html.contains("Total tests: 2"));
        assert!(html.contains("<td>Checkout &amp; pay</td><td>PASSED</td><td>2</td>"));
        assert!(html.contains("<tr class=\"failed\"><td>T-2</td>"));
    }

    #[test]
    fn escape_covers_markup_characters() {
        assert_eq!(escape(r#"<a href="x">'&'</a>"#), "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;");
    }
}
