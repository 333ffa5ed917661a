//! Plain-text rendering of search results for the terminal

use super::SearchResult;
use std::fmt::Write;

#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
    /// Print the relevance explanation under each hit
    pub explain: bool,
}

/// Highlight markers used by Elasticsearch, replaced for terminal output
const HIGHLIGHT_OPEN: &str = "<em>";
const HIGHLIGHT_CLOSE: &str = "</em>";

fn terminal_highlight(fragment: &str) -> String {
    fragment
        .replace(HIGHLIGHT_OPEN, "\x1b[1m")
        .replace(HIGHLIGHT_CLOSE, "\x1b[0m")
}

/// Render hits as title / content / score blocks separated by `---`.
///
/// Content shows the highlighted fragment when there is one, the raw content
/// otherwise.
pub fn render_result(result: &SearchResult, options: RenderOptions) -> String {
    let mut out = String::new();
    if result.hits.is_empty() {
        out.push_str("No results found.\n");
        return out;
    }

    let _ = writeln!(out, "Total hits: {}", result.total);
    for hit in &result.hits {
        let content = match (&hit.highlight, &hit.content) {
            (Some(fragment), _) => terminal_highlight(fragment),
            (None, Some(content)) => content.clone(),
            (None, None) => "No content available".to_string(),
        };

        let _ = writeln!(out, "Title: {}", hit.title.as_deref().unwrap_or("No title"));
        let _ = writeln!(out, "Content: {}", content);
        let _ = writeln!(out, "Score: {}", hit.score);

        if options.explain {
            match &hit.explanation {
                Some(explanation) => {
                    out.push_str("Why is this relevant?\n");
                    let pretty = serde_json::to_string_pretty(explanation)
                        .unwrap_or_else(|_| explanation.to_string());
                    for line in pretty.lines() {
                        let _ = writeln!(out, "  {}", line);
                    }
                }
                None => out.push_str("(No relevance explanation available)\n"),
            }
        }
        out.push_str("---\n");
    }
    out
}
