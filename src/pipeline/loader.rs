use std::fs;
use std::path::Path;

use reqwest::Client;

use crate::core::errors::PipelineError;

const SERVICE: &str = "source fetch";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Url,
    File,
    RawText,
}

#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub text: String,
    pub kind: SourceKind,
}

/// Resolves an `add` source string into plain text.
///
/// A string starting with an HTTP scheme is fetched and de-tagged; a path
/// to an existing file is read from disk; anything else is taken as the
/// text itself.
pub struct SourceLoader {
    client: Client,
}

impl SourceLoader {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    pub async fn resolve(&self, source: &str) -> Result<SourceDocument, PipelineError> {
        if source.starts_with("http://") || source.starts_with("https://") {
            return self.fetch_url(source).await;
        }

        let path = Path::new(source);
        if path.is_file() {
            let raw = fs::read_to_string(path).map_err(|e| PipelineError::SourceRead {
                path: source.to_string(),
                source: e,
            })?;
            let text = if is_html_path(source) {
                strip_html_tags(&raw)
            } else {
                raw
            };
            return Ok(SourceDocument {
                text,
                kind: SourceKind::File,
            });
        }

        Ok(SourceDocument {
            text: source.to_string(),
            kind: SourceKind::RawText,
        })
    }

    async fn fetch_url(&self, url: &str) -> Result<SourceDocument, PipelineError> {
        let res = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| PipelineError::transport(SERVICE, e))?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let text = res.text().await.unwrap_or_default();
            return Err(PipelineError::api(SERVICE, status, text));
        }

        let body = res
            .text()
            .await
            .map_err(|e| PipelineError::transport(SERVICE, e))?;

        Ok(SourceDocument {
            text: strip_html_tags(&body),
            kind: SourceKind::Url,
        })
    }
}

impl Default for SourceLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn is_html_path(source: &str) -> bool {
    let lower = source.to_lowercase();
    lower.ends_with(".html") || lower.ends_with(".htm")
}

/// Drops markup, scripts and styles, keeping the visible text one line
/// per block.
pub fn strip_html_tags(html: &str) -> String {
    let chars: Vec<char> = html.chars().collect();
    let mut result = String::new();
    let mut in_tag = false;
    let mut skip_until: Option<&str> = None;

    let mut i = 0;
    while i < chars.len() {
        if let Some(closer) = skip_until {
            if matches_at(&chars, i, closer) {
                i += closer.chars().count();
                skip_until = None;
            } else {
                i += 1;
            }
            continue;
        }

        let c = chars[i];
        if c == '<' {
            if matches_at(&chars, i, "<script") {
                skip_until = Some("</script>");
                i += 1;
                continue;
            }
            if matches_at(&chars, i, "<style") {
                skip_until = Some("</style>");
                i += 1;
                continue;
            }
            in_tag = true;
        } else if c == '>' {
            in_tag = false;
        } else if !in_tag {
            result.push(c);
        }

        i += 1;
    }

    let lines: Vec<&str> = result
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    lines.join("\n")
}

fn matches_at(chars: &[char], start: usize, pattern: &str) -> bool {
    pattern.chars().enumerate().all(|(offset, p)| {
        chars
            .get(start + offset)
            .map_or(false, |c| c.eq_ignore_ascii_case(&p))
    })
}
