//! PubMed literature search (NCBI E-utilities)
//!
//! `esearch.fcgi` (JSON) returns matching PMIDs, `efetch.fcgi` (XML) returns
//! the articles. Only three fields are read from each `PubmedArticle`:
//! `ArticleTitle`, the first `Abstract/AbstractText` and the `PMID`.

use async_trait::async_trait;
use medimind_foundation::LiteratureConfig;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::sync::OnceLock;
use tracing::debug;

use crate::error::ProviderError;
use crate::r#trait::{Article, LiteratureSearch};

pub const NO_TITLE: &str = "No title";
pub const NO_ABSTRACT: &str = "No abstract available";
const ARTICLE_URL: &str = "https://pubmed.ncbi.nlm.nih.gov";

/// PubMed client
#[derive(Debug, Clone)]
pub struct PubMedClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl PubMedClient {
    pub fn from_config(config: &LiteratureConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key(),
        })
    }

    fn with_key(&self, mut params: Vec<(&'static str, String)>) -> Vec<(&'static str, String)> {
        if let Some(key) = &self.api_key {
            params.push(("api_key", key.clone()));
        }
        params
    }

    /// PMIDs matching `query`
    pub async fn search_ids(&self, query: &str, max_results: usize) -> Result<Vec<String>, ProviderError> {
        let params = self.with_key(vec![
            ("db", "pubmed".to_string()),
            ("term", query.to_string()),
            ("retmax", max_results.to_string()),
            ("retmode", "json".to_string()),
        ]);

        let response = self
            .client
            .get(format!("{}/esearch.fcgi", self.base_url))
            .query(&params)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_http_status(status, &body));
        }

        let body: ESearchResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        Ok(body.esearchresult.idlist)
    }

    /// Raw efetch XML for a list of PMIDs
    pub async fn fetch_articles(&self, ids: &[String]) -> Result<String, ProviderError> {
        let params = self.with_key(vec![
            ("db", "pubmed".to_string()),
            ("id", ids.join(",")),
            ("retmode", "xml".to_string()),
        ]);

        let response = self
            .client
            .get(format!("{}/efetch.fcgi", self.base_url))
            .query(&params)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_http_status(status, &body));
        }

        response
            .text()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl LiteratureSearch for PubMedClient {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<Article>, ProviderError> {
        let ids = self.search_ids(query, max_results).await?;
        debug!(query, found = ids.len(), "pubmed search");
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let xml = self.fetch_articles(&ids).await?;
        parse_articles(&xml)
    }
}

#[derive(Debug, Deserialize)]
struct ESearchResponse {
    #[serde(default)]
    esearchresult: ESearchResult,
}

#[derive(Debug, Default, Deserialize)]
struct ESearchResult {
    #[serde(default)]
    idlist: Vec<String>,
}

// ============================================================================
// efetch XML
// ============================================================================

struct XmlPatterns {
    article: Regex,
    title: Regex,
    abstract_text: Regex,
    pmid: Regex,
    tag: Regex,
}

impl XmlPatterns {
    fn compile() -> Result<Self, regex::Error> {
        Ok(Self {
            article: Regex::new(r"(?s)<PubmedArticle\b[^>]*>(.*?)</PubmedArticle>")?,
            title: Regex::new(r"(?s)<ArticleTitle\b[^>]*>(.*?)</ArticleTitle>")?,
            abstract_text: Regex::new(
                r"(?s)<Abstract\b[^>]*>.*?<AbstractText\b[^>]*>(.*?)</AbstractText>",
            )?,
            pmid: Regex::new(r"<PMID\b[^>]*>\s*(\d+)\s*</PMID>")?,
            tag: Regex::new(r"<[^>]+>")?,
        })
    }
}

fn patterns() -> Result<&'static XmlPatterns, ProviderError> {
    static PATTERNS: OnceLock<Result<XmlPatterns, String>> = OnceLock::new();
    PATTERNS
        .get_or_init(|| XmlPatterns::compile().map_err(|e| e.to_string()))
        .as_ref()
        .map_err(|e| ProviderError::Parse(format!("invalid article pattern: {}", e)))
}

/// Parse efetch XML into articles
pub fn parse_articles(xml: &str) -> Result<Vec<Article>, ProviderError> {
    let patterns = patterns()?;

    let text_of = |re: &Regex, block: &str| -> Option<String> {
        re.captures(block)
            .and_then(|c| c.get(1))
            .map(|m| unescape_xml(&patterns.tag.replace_all(m.as_str(), "")))
            .map(|s| s.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|s| !s.is_empty())
    };

    Ok(patterns
        .article
        .captures_iter(xml)
        .filter_map(|c| c.get(1))
        .map(|block| {
            let block = block.as_str();
            let pmid = patterns
                .pmid
                .captures(block)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string());

            Article {
                title: text_of(&patterns.title, block).unwrap_or_else(|| NO_TITLE.to_string()),
                abstract_text: text_of(&patterns.abstract_text, block)
                    .unwrap_or_else(|| NO_ABSTRACT.to_string()),
                link: pmid
                    .map(|id| format!("{}/{}/", ARTICLE_URL, id))
                    .unwrap_or_else(|| "#".to_string()),
            }
        })
        .collect())
}

fn unescape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        rest = &rest[start..];

        let Some(end) = rest.find(';') else {
            break;
        };
        let entity = &rest[1..end];
        let decoded = match entity {
            "lt" => Some('<'),
            "gt" => Some('>'),
            "amp" => Some('&'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
                .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                .and_then(char::from_u32),
        };

        match decoded {
            Some(c) => {
                out.push(c);
                rest = &rest[end + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" ?>
<PubmedArticleSet>
<PubmedArticle>
  <MedlineCitation Status="MEDLINE" Owner="NLM">
    <PMID Version="1">38012345</PMID>
    <Article PubModel="Print">
      <ArticleTitle>Metformin &amp; <i>glycemic</i> control in type 2 diabetes.</ArticleTitle>
      <Abstract>
        <AbstractText Label="BACKGROUND">HbA1c &lt; 7% was
          the target.</AbstractText>
        <AbstractText Label="RESULTS">Second section.</AbstractText>
      </Abstract>
    </Article>
  </MedlineCitation>
</PubmedArticle>
<PubmedArticle>
  <MedlineCitation>
    <Article>
      <ArticleTitle></ArticleTitle>
    </Article>
  </MedlineCitation>
</PubmedArticle>
</PubmedArticleSet>"#;

    #[test]
    fn test_parse_articles() {
        let articles = parse_articles(SAMPLE).unwrap();
        assert_eq!(articles.len(), 2);

        assert_eq!(
            articles[0].title,
            "Metformin & glycemic control in type 2 diabetes."
        );
        assert_eq!(articles[0].abstract_text, "HbA1c < 7% was the target.");
        assert_eq!(articles[0].link, "https://pubmed.ncbi.nlm.nih.gov/38012345/");

        assert_eq!(articles[1].title, NO_TITLE);
        assert_eq!(articles[1].abstract_text, NO_ABSTRACT);
        assert_eq!(articles[1].link, "#");
    }

    #[test]
    fn test_parse_empty() {
        assert!(parse_articles("").unwrap().is_empty());
        assert!(parse_articles("<PubmedArticleSet/>").unwrap().is_empty());
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape_xml("a &amp; b"), "a & b");
        assert_eq!(unescape_xml("&#946;-blocker &#x3B1;"), "β-blocker α");
        assert_eq!(unescape_xml("AT&T; &bogus"), "AT&T; &bogus");
    }

    #[test]
    fn test_esearch_response() {
        let body = r#"{"header": {}, "esearchresult": {"count": "2", "idlist": ["1", "2"]}}"#;
        let parsed: ESearchResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.esearchresult.idlist, vec!["1", "2"]);

        let parsed: ESearchResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.esearchresult.idlist.is_empty());
    }

    #[test]
    fn test_api_key_param() {
        let mut client = PubMedClient::from_config(&LiteratureConfig::default()).unwrap();
        assert_eq!(client.with_key(vec![]).len(), 0);
        client.api_key = Some("k".to_string());
        assert_eq!(client.with_key(vec![]), vec![("api_key", "k".to_string())]);
    }
}
