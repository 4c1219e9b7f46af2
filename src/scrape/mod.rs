//! Creator-program web page scraping.
//!
//! The public program page renders the current season as an HTML table.
//! Rows are read from `<tr>`/`<td>` cells first; when that yields nothing
//! (layout change, client-side rendering) a text pattern over the page's
//! visible text is tried instead.

use std::collections::HashSet;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::Client;
use scraper::error::SelectorErrorKind;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::models::{normalize_handle, MindshareUnit, NewEntry};

/// Errors that can occur while scraping the program page.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("http request failed for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("unexpected status {status} for {url}")]
    UnexpectedStatus {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("invalid CSS selector: {0}")]
    Selector(String),
}

impl<'a> From<SelectorErrorKind<'a>> for ScrapeError {
    fn from(err: SelectorErrorKind<'a>) -> Self {
        ScrapeError::Selector(err.to_string())
    }
}

fn handle_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"@[\w_]+").expect("valid handle regex"))
}

fn text_row_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(🥇|🥈|🥉|\d+)\s+([^\s@][^@\n]*?)\s+(@[\w_]+)\s+(\d+(?:\.\d+)?)")
            .expect("valid row regex")
    })
}

fn medal_rank(token: &str) -> Option<u32> {
    match token {
        "🥇" => Some(1),
        "🥈" => Some(2),
        "🥉" => Some(3),
        _ => None,
    }
}

/// Parse the numeric prefix of a string the way a lenient float reader would
/// (`"0.45%"` → 0.45).
fn leading_float(s: &str) -> Option<f64> {
    let s = s.trim();
    let mut seen_dot = false;
    let end = s
        .char_indices()
        .find(|&(_, c)| {
            if c == '.' && !seen_dot {
                seen_dot = true;
                false
            } else {
                !c.is_ascii_digit()
            }
        })
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    s[..end].parse().ok()
}

fn cell_text(cell: ElementRef) -> String {
    cell.text().collect::<Vec<_>>().join(" ").trim().to_string()
}

/// Parse leaderboard rows from page HTML, falling back to text patterns.
pub fn parse_leaderboard_html(html: &str) -> Result<Vec<NewEntry>, ScrapeError> {
    let document = Html::parse_document(html);
    let row_sel = Selector::parse("tr")?;
    let cell_sel = Selector::parse("td")?;
    let span_sel = Selector::parse("span")?;

    let mut entries = Vec::new();

    for row in document.select(&row_sel) {
        let cells: Vec<ElementRef> = row.select(&cell_sel).collect();
        if cells.len() < 3 {
            continue;
        }

        let rank_text = cell_text(cells[0]);
        let digits: String = rank_text.chars().filter(|c| c.is_ascii_digit()).collect();
        let Some(rank) = digits.parse::<u32>().ok().or_else(|| medal_rank(rank_text.trim()))
        else {
            continue;
        };

        let user_text = cell_text(cells[1]);
        let username = cells[1]
            .select(&span_sel)
            .next()
            .map(cell_text)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| {
                user_text
                    .split('@')
                    .next()
                    .unwrap_or_default()
                    .trim()
                    .to_string()
            });

        let handle = handle_pattern()
            .find(&user_text)
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| format!("@user{}", rank));

        let mindshare = leading_float(&cell_text(cells[2])).unwrap_or(0.0);

        if !username.is_empty() && mindshare > 0.0 {
            entries.push(NewEntry {
                rank,
                username,
                handle,
                mindshare,
                mindshare_unit: MindshareUnit::Score,
            });
        }
    }

    if entries.is_empty() {
        debug!("Table parsing found no rows, trying text patterns");
        let text = document.root_element().text().collect::<Vec<_>>().join("\n");
        return Ok(parse_leaderboard_text(&text));
    }

    Ok(entries)
}

/// Parse `<rank> <name> @handle <mindshare>` sequences out of plain text.
/// The first occurrence of each handle wins.
pub fn parse_leaderboard_text(text: &str) -> Vec<NewEntry> {
    let mut seen = HashSet::new();
    let mut entries = Vec::new();

    for caps in text_row_pattern().captures_iter(text) {
        let rank_token = &caps[1];
        let Some(rank) = rank_token.parse::<u32>().ok().or_else(|| medal_rank(rank_token)) else {
            continue;
        };
        let username = caps[2].trim().to_string();
        let handle = caps[3].to_string();
        let Ok(mindshare) = caps[4].parse::<f64>() else {
            continue;
        };

        if username.is_empty() || mindshare <= 0.0 {
            continue;
        }
        if !seen.insert(normalize_handle(&handle)) {
            continue;
        }

        entries.push(NewEntry {
            rank,
            username,
            handle,
            mindshare,
            mindshare_unit: MindshareUnit::Score,
        });
    }

    entries
}

/// Fetches and parses the program page.
pub struct HtmlScraper {
    client: Client,
}

impl HtmlScraper {
    pub fn new(user_agent: &str, timeout: Option<Duration>) -> Result<Self, ScrapeError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(user_agent)
                .unwrap_or_else(|_| HeaderValue::from_static("creator-leaderboard/0.1.0")),
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );

        let mut builder = Client::builder().default_headers(headers);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(ScrapeError::Client)?;

        Ok(Self { client })
    }

    #[instrument(skip(self))]
    pub async fn scrape(&self, url: &str) -> Result<Vec<NewEntry>, ScrapeError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| ScrapeError::Http {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::UnexpectedStatus {
                url: url.to_string(),
                status,
            });
        }

        let html = response.text().await.map_err(|source| ScrapeError::Http {
            url: url.to_string(),
            source,
        })?;

        let entries = parse_leaderboard_html(&html)?;
        info!("Scraped {} rows from {}", entries.len(), url);
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE_HTML: &str = r#"
        <html><body><table>
          <tr><th>Rank</th><th>User</th><th>Mindshare</th></tr>
          <tr><td>#1</td><td><span>Rand Hindi</span> @randhindi</td><td>1.5902</td></tr>
          <tr><td>2</td><td>Zun @Zun2025</td><td>1.15%</td></tr>
          <tr><td>3</td><td><span>No Handle</span></td><td>0.9</td></tr>
          <tr><td>4</td><td><span>Zero</span> @zero</td><td>0</td></tr>
          <tr><td>x</td><td>bad</td><td>1.0</td></tr>
        </table></body></html>
    "#;

    #[test]
    fn test_parse_table_rows() {
        let entries = parse_leaderboard_html(TABLE_HTML).unwrap();

        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].rank, 1);
        assert_eq!(entries[0].username, "Rand Hindi");
        assert_eq!(entries[0].handle, "@randhindi");
        assert!((entries[0].mindshare - 1.5902).abs() < 1e-9);

        assert_eq!(entries[1].username, "Zun");
        assert_eq!(entries[1].handle, "@Zun2025");
        assert!((entries[1].mindshare - 1.15).abs() < 1e-9);

        // Missing handle gets a placeholder
        assert_eq!(entries[2].handle, "@user3");
    }

    #[test]
    fn test_falls_back_to_text_when_no_table() {
        let html = r#"
            <html><body>
              <div>🥇 Alice @alice 2.5</div>
              <div>2 Bob Builder @bob_b 1.25</div>
              <div>3 Dup @alice 1.0</div>
            </body></html>
        "#;

        let entries = parse_leaderboard_html(html).unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].rank, 1);
        assert_eq!(entries[0].handle, "@alice");
        assert_eq!(entries[1].username, "Bob Builder");
        assert_eq!(entries[1].rank, 2);
    }

    #[test]
    fn test_parse_text_skips_zero_mindshare() {
        let entries = parse_leaderboard_text("1 Alice @alice 0\n2 Bob @bob 0.5");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].handle, "@bob");
    }

    #[test]
    fn test_empty_page_yields_nothing() {
        assert!(parse_leaderboard_html("<html></html>").unwrap().is_empty());
    }

    #[test]
    fn test_leading_float() {
        assert_eq!(leading_float("0.45%"), Some(0.45));
        assert_eq!(leading_float(" 12 "), Some(12.0));
        assert_eq!(leading_float("1.2.3"), Some(1.2));
        assert_eq!(leading_float("abc"), None);
    }
}
