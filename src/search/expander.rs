// Query expansion: one help request -> up to five short search phrases

use tracing::{debug, info};

use crate::config::LLMConfig;
use crate::llm::provider::{LLMProviderConfig, LLM};
use crate::types::{AppResult, LLMMessage, LLMRequest};

pub const MAX_PHRASES: usize = 5;

const SYSTEM_PROMPT: &str = r#"You are a query refiner for an alumni help-matching system. The user is asking for HELP (e.g. resume advice, job at a company, career in an industry). Your job is to output 3 to 5 short SEARCH PHRASES that will find relevant alumni profiles in a vector database. Each phrase should be 1-4 words.

Include:
- Company names mentioned (e.g. "Microsoft", "big tech company")
- Role or job type (e.g. "software engineering", "product manager")
- Kind of help (e.g. "resume", "interview", "career advice", "mentoring")
- Industry if relevant (e.g. "healthcare", "finance")

Output ONLY the phrases, one per line. No numbering, bullets, or explanation. Example output:
Microsoft company
big tech
resume
software engineering
career advice"#;

/// Outcome of expanding one query.
#[derive(Debug, Clone, PartialEq)]
pub enum Expansion {
    /// Blank query; nothing to search
    Empty,
    /// No language model configured, or it produced nothing usable; the trimmed query is the only phrase
    Degraded(String),
    Expanded(Vec<String>),
}

impl Expansion {
    pub fn phrases(&self) -> Vec<String> {
        match self {
            Expansion::Empty => Vec::new(),
            Expansion::Degraded(query) => vec![query.clone()],
            Expansion::Expanded(phrases) => phrases.clone(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Expansion::Degraded(_))
    }
}

pub struct QueryExpander {
    llm: Option<LLM>,
    model: String,
    max_tokens: u32,
}

impl QueryExpander {
    pub fn new(llm: Option<LLM>, model: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            llm,
            model: model.into(),
            max_tokens,
        }
    }

    /// Expander without a language model: every query degrades to itself
    pub fn disabled() -> Self {
        Self::new(None, String::new(), 0)
    }

    /// An empty API key leaves expansion disabled rather than failing.
    pub fn from_config(config: &LLMConfig) -> AppResult<Self> {
        if config.api_key.trim().is_empty() {
            info!(provider = %config.provider, "No API key for query expansion, using the raw query");
            return Ok(Self::disabled());
        }
        let llm = LLM::new(LLMProviderConfig {
            name: config.provider.clone(),
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
        })?;
        Ok(Self::new(Some(llm), &config.model, config.max_tokens))
    }

    pub fn is_enabled(&self) -> bool {
        self.llm.is_some()
    }

    /// Model failures propagate; they are not retried here.
    pub async fn expand(&self, query: &str) -> AppResult<Expansion> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Expansion::Empty);
        }
        let Some(llm) = &self.llm else {
            return Ok(Expansion::Degraded(query.to_string()));
        };

        let request = LLMRequest {
            model: self.model.clone(),
            messages: vec![LLMMessage::system(SYSTEM_PROMPT), LLMMessage::user(query)],
            max_tokens: Some(self.max_tokens),
            temperature: None,
        };
        let response = llm.create_chat_completion(&request).await?;

        let phrases = parse_phrases(&response.content);
        debug!(provider = llm.provider_name(), ?phrases, "Expanded query");
        if phrases.is_empty() {
            return Ok(Expansion::Degraded(query.to_string()));
        }
        Ok(Expansion::Expanded(phrases))
    }
}

/// One phrase per line, list markers stripped, at most `MAX_PHRASES`.
pub fn parse_phrases(output: &str) -> Vec<String> {
    output
        .lines()
        .map(strip_marker)
        .filter(|phrase| !phrase.is_empty())
        .take(MAX_PHRASES)
        .map(str::to_string)
        .collect()
}

/// Drops a leading `1.`/`2)` number or bullet and any bold markers around the phrase.
/// Digits that are part of the phrase (`3M`) are kept.
fn strip_marker(line: &str) -> &str {
    let line = line.trim();
    let unnumbered = line.trim_start_matches(|c: char| c.is_ascii_digit());
    let line = match unnumbered.strip_prefix(['.', ')']) {
        Some(rest) if unnumbered.len() < line.len() => rest,
        _ => line,
    };
    line.trim_start_matches(|c: char| c.is_whitespace() || matches!(c, '-' | '*' | '•'))
        .trim_matches(|c: char| c.is_whitespace() || c == '*')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StaticAdapter;
    use crate::types::AppError;

    fn expander(adapter: StaticAdapter) -> QueryExpander {
        QueryExpander::new(
            Some(LLM::from_adapter(Box::new(adapter), "static")),
            "gpt-4o-mini",
            150,
        )
    }

    #[tokio::test]
    async fn test_blank_query_is_empty() {
        let expansion = expander(StaticAdapter::replying("resume")).expand("   ").await.unwrap();
        assert_eq!(expansion, Expansion::Empty);
        assert!(expansion.phrases().is_empty());
    }

    #[tokio::test]
    async fn test_without_model_degrades_to_trimmed_query() {
        let expansion = QueryExpander::disabled().expand("  resume help ").await.unwrap();
        assert_eq!(expansion, Expansion::Degraded("resume help".to_string()));
        assert_eq!(expansion.phrases(), vec!["resume help"]);
    }

    #[tokio::test]
    async fn test_strips_markers_and_caps_at_five() {
        let expansion = expander(StaticAdapter::replying(
            "1. Microsoft\n2) big tech\n- resume\n\n* interview\n• software engineering\n6. career advice",
        ))
        .expand("I need resume help for big tech")
        .await
        .unwrap();

        assert_eq!(
            expansion,
            Expansion::Expanded(vec![
                "Microsoft".to_string(),
                "big tech".to_string(),
                "resume".to_string(),
                "interview".to_string(),
                "software engineering".to_string(),
            ])
        );
    }

    #[tokio::test]
    async fn test_unusable_output_falls_back() {
        let expansion = expander(StaticAdapter::replying("1.\n - \n\n"))
            .expand("finance mentor")
            .await
            .unwrap();
        assert_eq!(expansion, Expansion::Degraded("finance mentor".to_string()));
    }

    #[tokio::test]
    async fn test_model_error_propagates() {
        let err = expander(StaticAdapter::failing("upstream down"))
            .expand("resume")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::LLMApi(_)));
    }

    #[test]
    fn test_from_config_without_key_is_disabled() {
        let config = LLMConfig {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: String::new(),
            base_url: None,
            max_tokens: 150,
        };
        assert!(!QueryExpander::from_config(&config).unwrap().is_enabled());
    }

    #[test]
    fn test_keeps_leading_digits_and_strips_bold() {
        assert_eq!(
            parse_phrases("3M company\n**Microsoft**\n1. **Goldman Sachs**\n- *2U*\n10) 401k planning"),
            vec!["3M company", "Microsoft", "Goldman Sachs", "2U", "401k planning"]
        );
    }

    #[test]
    fn test_parse_phrases_bounds() {
        for output in ["a\nb", "x\n\n\n", "1\n2\n3", "one\ntwo\nthree\nfour\nfive\nsix\nseven"] {
            let phrases = parse_phrases(output);
            assert!(phrases.len() <= MAX_PHRASES);
            assert!(phrases.iter().all(|p| !p.is_empty() && p.trim() == p));
        }
    }
}
