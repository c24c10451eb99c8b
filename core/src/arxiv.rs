use async_trait::async_trait;
use chrono::DateTime;
use log::{debug, warn};
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::Client;

use crate::errors::{ProviderError, ProviderResult};
use crate::providers::SearchProvider;
use crate::types::{CachedPaper, AUTHOR_CAP, CATEGORY_CAP, SUMMARY_CAP};

const ARXIV_API_URL: &str = "https://export.arxiv.org/api/query";

/// Client for the arXiv query API (Atom feed over HTTP)
#[derive(Debug, Clone)]
pub struct ArxivClient {
    client: Client,
    base_url: String,
}

impl Default for ArxivClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ArxivClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: ARXIV_API_URL.to_string(),
        }
    }

    /// Fetch one page of results, relevance-sorted, and map the feed
    /// entries to `CachedPaper` records in feed order.
    async fn query(&self, query: &str, limit: usize) -> ProviderResult<Vec<CachedPaper>> {
        let search_query = format!("all:{}", query.trim());
        debug!("Querying arXiv: '{}' (limit {})", search_query, limit);

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("search_query", search_query.as_str()),
                ("start", "0"),
                ("max_results", &limit.to_string()),
                ("sortBy", "relevance"),
                ("sortOrder", "descending"),
            ])
            .send()
            .await
            .map_err(|e| ProviderError::RequestError(format!("Failed to reach arXiv: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::HttpError {
                status_code: status.as_u16(),
                message: "arXiv query failed".to_string(),
            });
        }

        let body = response.text().await.map_err(|e| {
            ProviderError::ResponseError(format!("Failed to read arXiv response: {}", e))
        })?;

        parse_feed(&body, limit)
    }
}

#[async_trait]
impl SearchProvider for ArxivClient {
    async fn search(&self, query: &str, limit: usize) -> ProviderResult<Vec<CachedPaper>> {
        self.query(query, limit).await
    }
}

/// Fields of an `<entry>` that collect character data.
#[derive(Clone, Copy, PartialEq)]
enum TextField {
    Title,
    Summary,
    Published,
    Id,
    AuthorName,
}

#[derive(Default)]
struct EntryBuilder {
    title: String,
    summary: String,
    published: String,
    url: String,
    pdf_url: String,
    authors: Vec<String>,
    categories: Vec<String>,
}

impl EntryBuilder {
    fn finish(mut self) -> CachedPaper {
        self.authors.retain(|a| !a.is_empty());
        self.authors.truncate(AUTHOR_CAP);
        self.categories.truncate(CATEGORY_CAP);
        CachedPaper {
            title: normalize_ws(&self.title),
            authors: self.authors,
            published: format_date(&self.published),
            summary: truncate_chars(&normalize_ws(&self.summary), SUMMARY_CAP),
            url: self.url.trim().to_string(),
            pdf_url: self.pdf_url.trim().to_string(),
            categories: self.categories,
        }
    }
}

/// Parse an arXiv Atom feed into at most `cap` paper records, preserving
/// feed order (the feed is already relevance-sorted).
pub fn parse_feed(xml: &str, cap: usize) -> ProviderResult<Vec<CachedPaper>> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();

    let mut papers = Vec::new();
    let mut entry: Option<EntryBuilder> = None;
    let mut field: Option<TextField> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = e.name().as_ref().to_owned();
                match local_name(&name) {
                    b"entry" => entry = Some(EntryBuilder::default()),
                    b"title" if entry.is_some() => field = Some(TextField::Title),
                    b"summary" if entry.is_some() => field = Some(TextField::Summary),
                    b"published" if entry.is_some() => field = Some(TextField::Published),
                    b"id" if entry.is_some() => field = Some(TextField::Id),
                    b"name" if entry.is_some() => field = Some(TextField::AuthorName),
                    _ => {}
                }
                if let Some(builder) = entry.as_mut() {
                    if field == Some(TextField::AuthorName) {
                        builder.authors.push(String::new());
                    }
                }
            }
            Ok(Event::Empty(e)) => {
                let name = e.name().as_ref().to_owned();
                if let Some(builder) = entry.as_mut() {
                    match local_name(&name) {
                        b"category" => {
                            if let Some(term) = attr_value(&e, b"term") {
                                builder.categories.push(term);
                            }
                        }
                        b"link" => {
                            let is_pdf = attr_value(&e, b"title").as_deref() == Some("pdf")
                                || attr_value(&e, b"type").as_deref()
                                    == Some("application/pdf");
                            if is_pdf {
                                if let Some(href) = attr_value(&e, b"href") {
                                    builder.pdf_url = href;
                                }
                            }
                        }
                        _ => {}
                    }
                }
            }
            Ok(Event::Text(t)) => {
                if let (Some(builder), Some(current)) = (entry.as_mut(), field) {
                    let text = t
                        .xml_content()
                        .map_err(|e| ProviderError::ParsingError(e.to_string()))?;
                    match current {
                        TextField::Title => builder.title.push_str(&text),
                        TextField::Summary => builder.summary.push_str(&text),
                        TextField::Published => builder.published.push_str(&text),
                        TextField::Id => builder.url.push_str(&text),
                        TextField::AuthorName => {
                            if let Some(author) = builder.authors.last_mut() {
                                author.push_str(text.trim());
                            }
                        }
                    }
                }
            }
            Ok(Event::End(e)) => {
                let name = e.name().as_ref().to_owned();
                match local_name(&name) {
                    b"entry" => {
                        if let Some(builder) = entry.take() {
                            if papers.len() < cap {
                                papers.push(builder.finish());
                            }
                        }
                    }
                    b"title" | b"summary" | b"published" | b"id" | b"name" => field = None,
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ProviderError::ParsingError(format!(
                    "Malformed Atom feed: {}",
                    e
                )))
            }
            _ => {}
        }
        buf.clear();
    }

    debug!("Parsed {} entries from arXiv feed", papers.len());
    Ok(papers)
}

fn local_name(name: &[u8]) -> &[u8] {
    match name.rsplit(|b| *b == b':').next() {
        Some(n) => n,
        None => name,
    }
}

fn attr_value(e: &quick_xml::events::BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.try_get_attribute(key)
        .ok()
        .flatten()
        .and_then(|a| String::from_utf8(a.value.into_owned()).ok())
}

fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cut at a character boundary; byte-index truncation would panic on
/// multi-byte abstracts.
fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// arXiv publishes RFC 3339 timestamps; the cache stores `YYYY-MM-DD`.
fn format_date(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return "N/A".to_string();
    }
    match DateTime::parse_from_rfc3339(trimmed) {
        Ok(dt) => dt.format("%Y-%m-%d").to_string(),
        Err(e) => {
            warn!("Unparseable publication date '{}': {}", trimmed, e);
            "N/A".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:arxiv="http://arxiv.org/schemas/atom">
  <title>ArXiv Query Results</title>
  <entry>
    <id>http://arxiv.org/abs/2401.00001v1</id>
    <published>2024-01-05T12:30:00Z</published>
    <title>Quantum Error
      Correction Revisited</title>
    <summary>  A study of
      stabilizer codes.  </summary>
    <author><name>Alice Ames</name></author>
    <author><name>Bob Brown</name></author>
    <author><name>Carol Clay</name></author>
    <author><name>Dan Dent</name></author>
    <author><name>Eve Early</name></author>
    <author><name>Frank Field</name></author>
    <link href="http://arxiv.org/abs/2401.00001v1" rel="alternate" type="text/html"/>
    <link title="pdf" href="http://arxiv.org/pdf/2401.00001v1" rel="related" type="application/pdf"/>
    <category term="quant-ph" scheme="http://arxiv.org/schemas/atom"/>
    <category term="cs.IT" scheme="http://arxiv.org/schemas/atom"/>
    <category term="cs.ET" scheme="http://arxiv.org/schemas/atom"/>
    <category term="math.QA" scheme="http://arxiv.org/schemas/atom"/>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/2402.00002v2</id>
    <published>2024-02-10T08:00:00Z</published>
    <title>Second Paper</title>
    <summary>Another abstract.</summary>
    <author><name>Grace Gray</name></author>
    <link title="pdf" href="http://arxiv.org/pdf/2402.00002v2" rel="related" type="application/pdf"/>
    <category term="cs.LG" scheme="http://arxiv.org/schemas/atom"/>
  </entry>
</feed>"#;

    #[test]
    fn parses_entries_in_feed_order() {
        let papers = parse_feed(FEED, 10).unwrap();
        assert_eq!(papers.len(), 2);
        assert_eq!(papers[0].title, "Quantum Error Correction Revisited");
        assert_eq!(papers[1].title, "Second Paper");
    }

    #[test]
    fn applies_ingest_caps() {
        let papers = parse_feed(FEED, 10).unwrap();
        assert_eq!(papers[0].authors.len(), AUTHOR_CAP);
        assert_eq!(papers[0].authors[0], "Alice Ames");
        assert_eq!(papers[0].categories.len(), CATEGORY_CAP);
        assert_eq!(papers[0].categories, vec!["quant-ph", "cs.IT", "cs.ET"]);
    }

    #[test]
    fn extracts_links_and_dates() {
        let papers = parse_feed(FEED, 10).unwrap();
        assert_eq!(papers[0].url, "http://arxiv.org/abs/2401.00001v1");
        assert_eq!(papers[0].pdf_url, "http://arxiv.org/pdf/2401.00001v1");
        assert_eq!(papers[0].published, "2024-01-05");
        assert_eq!(papers[0].summary, "A study of stabilizer codes.");
    }

    #[test]
    fn respects_result_cap() {
        let papers = parse_feed(FEED, 1).unwrap();
        assert_eq!(papers.len(), 1);
    }

    #[test]
    fn empty_feed_is_empty_not_error() {
        let papers =
            parse_feed("<feed xmlns=\"http://www.w3.org/2005/Atom\"></feed>", 5).unwrap();
        assert!(papers.is_empty());
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let s = "héllo wörld";
        assert_eq!(truncate_chars(s, 4), "héll");
        assert_eq!(truncate_chars("short", 100), "short");
    }

    #[test]
    fn unknown_date_becomes_na() {
        assert_eq!(format_date("not-a-date"), "N/A");
        assert_eq!(format_date(""), "N/A");
    }
}
