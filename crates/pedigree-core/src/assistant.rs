//! Optional language-model parsing path.
//!
//! The assistant receives the raw description and must answer with the interchange schema
//! (`individuals` + `relationships`). Its reply is decoded into the same [`ParseResult`] the text
//! parser produces. Callers never merge the two: on any [`AssistantError`] they use the text
//! parser's result instead.

use crate::config::PedigreeConfig;
use crate::model::{
    IndividualRecord, ParseResult, ParseSource, RelationshipKind, RelationshipRecord, Sex, Status,
};
use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use serde_json::Value;
use std::time::Duration;

/// Upper bound on retries, whatever the configuration asks for.
pub const MAX_ASSISTANT_RETRIES: u8 = 2;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssistantError {
    #[error("assistant request timed out after {0:?}")]
    Timeout(Duration),

    #[error("assistant request failed: {0}")]
    Transport(String),

    #[error("assistant quota or rate limit exceeded")]
    RateLimited,

    #[error("assistant returned HTTP status {status}")]
    HttpStatus { status: u16 },

    #[error("assistant response was malformed: {0}")]
    MalformedResponse(String),

    #[error("assistant is not configured: {0}")]
    NotConfigured(String),
}

impl AssistantError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Transport(_) | Self::MalformedResponse(_) => true,
            Self::HttpStatus { status } => *status >= 500,
            Self::RateLimited | Self::NotConfigured(_) => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub max_retries: u8,
}

impl AssistantConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: None,
            timeout: Duration::from_secs(30),
            max_retries: 1,
        }
    }

    /// Reads `assistant.endpoint`, `assistant.timeoutSecs`, and `assistant.maxRetries`.
    /// The API key is never part of the config document; set it on the returned value.
    pub fn from_config(config: &PedigreeConfig) -> Self {
        let defaults = PedigreeConfig::defaults();
        let endpoint = config
            .get_str("assistant.endpoint")
            .or_else(|| defaults.get_str("assistant.endpoint"))
            .unwrap_or_default()
            .to_string();
        let timeout_secs = config.get_u64("assistant.timeoutSecs").unwrap_or(30);
        let retries = config.get_u64("assistant.maxRetries").unwrap_or(1);
        Self {
            endpoint,
            api_key: None,
            timeout: Duration::from_secs(timeout_secs),
            max_retries: u8::try_from(retries).unwrap_or(MAX_ASSISTANT_RETRIES),
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn effective_retries(&self) -> u8 {
        self.max_retries.min(MAX_ASSISTANT_RETRIES)
    }
}

/// The external call interface: send a prompt, get the model's raw text back.
pub trait AssistantTransport {
    fn complete(&self, config: &AssistantConfig, prompt: &str) -> Result<String, AssistantError>;
}

impl<F> AssistantTransport for F
where
    F: Fn(&AssistantConfig, &str) -> Result<String, AssistantError>,
{
    fn complete(&self, config: &AssistantConfig, prompt: &str) -> Result<String, AssistantError> {
        self(config, prompt)
    }
}

const SYSTEM_PROMPT: &str = r#"You are a medical genetics expert. Convert the following family description into a strictly valid JSON object for pedigree chart generation.

REQUIRED JSON STRUCTURE:
{
  "individuals": [
    {
      "id": "unique_id",
      "name": "Full Name",
      "sex": "male|female|unknown",
      "age": number|null,
      "status": "affected|carrier|unaffected|unknown",
      "deceased": boolean,
      "conditions": ["condition1"]
    }
  ],
  "relationships": [
    { "type": "partnership", "members": ["id1", "id2"] },
    { "type": "parent-child", "members": ["child_id"], "parents": ["parent_id1", "parent_id2"] }
  ]
}

RULES:
1) Output ONLY raw JSON with double quotes; no markdown or prose.
2) Use lowercase names as ids (e.g., "john").
3) If information is missing, use "unknown" or null rather than guessing.
4) Every id used in relationships must appear in individuals.
5) Keep arrays present even if empty."#;

pub fn build_prompt(text: &str) -> String {
    format!("{SYSTEM_PROMPT}\n\nFAMILY DESCRIPTION:\n{text}")
}

/// Asks the assistant to parse `text`, retrying at most [`AssistantConfig::effective_retries`]
/// times on transient failures.
pub fn parse_with_assistant(
    text: &str,
    config: &AssistantConfig,
    transport: &dyn AssistantTransport,
) -> Result<ParseResult, AssistantError> {
    if config.endpoint.trim().is_empty() {
        return Err(AssistantError::NotConfigured(
            "no endpoint configured".to_string(),
        ));
    }

    let prompt = build_prompt(text);
    let attempts = 1 + usize::from(config.effective_retries());
    let mut last_err = AssistantError::Transport("no attempt made".to_string());

    for attempt in 1..=attempts {
        let outcome = transport
            .complete(config, &prompt)
            .and_then(|reply| decode_reply(&reply));
        match outcome {
            Ok(result) => return Ok(result),
            Err(err) => {
                tracing::warn!(attempt, attempts, error = %err, "assistant parse attempt failed");
                let retryable = err.is_retryable();
                last_err = err;
                if !retryable {
                    break;
                }
            }
        }
    }
    Err(last_err)
}

fn extract_json_object(reply: &str) -> Option<&str> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    (end > start).then(|| &reply[start..=end])
}

/// Decodes and cleans a model reply into a [`ParseResult`]. Records that refer to undeclared ids
/// make the whole reply malformed.
pub fn decode_reply(reply: &str) -> Result<ParseResult, AssistantError> {
    let json = extract_json_object(reply)
        .ok_or_else(|| AssistantError::MalformedResponse("no JSON object in reply".to_string()))?;
    let value: Value = serde_json::from_str(json)
        .map_err(|e| AssistantError::MalformedResponse(e.to_string()))?;

    let Some(raw_individuals) = value.get("individuals").and_then(Value::as_array) else {
        return Err(AssistantError::MalformedResponse(
            "missing individuals array".to_string(),
        ));
    };

    let mut individuals = Vec::with_capacity(raw_individuals.len());
    let mut ids: FxHashSet<String> = FxHashSet::default();
    for (i, person) in raw_individuals.iter().enumerate() {
        let record = clean_individual(i, person)?;
        if !ids.insert(record.id.clone()) {
            return Err(AssistantError::MalformedResponse(format!(
                "duplicate individual id: {}",
                record.id
            )));
        }
        individuals.push(record);
    }

    let relationships = match value.get("relationships").and_then(Value::as_array) {
        Some(raw) => clean_relationships(raw, &ids)?,
        None => Vec::new(),
    };

    Ok(ParseResult {
        source: ParseSource::Assistant,
        individuals,
        relationships,
        unresolved: Vec::new(),
    })
}

fn clean_individual(index: usize, person: &Value) -> Result<IndividualRecord, AssistantError> {
    if !person.is_object() {
        return Err(AssistantError::MalformedResponse(format!(
            "individual #{index} is not an object"
        )));
    }
    let str_field = |key: &str| {
        person
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    };

    let name = str_field("name")
        .map(str::to_string)
        .unwrap_or_else(|| format!("Person {}", index + 1));
    let id = str_field("id")
        .map(str::to_string)
        .unwrap_or_else(|| name.to_lowercase());

    let mut record = IndividualRecord::new(id, name);
    record.sex = str_field("sex")
        .or_else(|| str_field("gender"))
        .and_then(Sex::from_token)
        .unwrap_or_default();

    let status = str_field("status").unwrap_or("unknown");
    if status.eq_ignore_ascii_case("deceased") {
        record.deceased = true;
    } else {
        record.status = Status::from_token(status).unwrap_or_default();
    }
    record.deceased |= person
        .get("deceased")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    record.age = match person.get("age") {
        Some(Value::Number(n)) => n.as_u64().and_then(|a| u32::try_from(a).ok()),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    };

    if let Some(conds) = person.get("conditions").and_then(Value::as_array) {
        record.conditions = conds
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect();
    }
    Ok(record)
}

fn id_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn clean_relationships(
    raw: &[Value],
    ids: &FxHashSet<String>,
) -> Result<Vec<RelationshipRecord>, AssistantError> {
    let check = |id: &str| {
        if ids.contains(id) {
            Ok(())
        } else {
            Err(AssistantError::MalformedResponse(format!(
                "relationship references unknown id: {id}"
            )))
        }
    };

    let mut out = Vec::new();
    // Legacy pairwise parent-child records, grouped by child in first-seen order.
    let mut pairwise: IndexMap<String, Vec<String>> = IndexMap::new();

    for rel in raw {
        let kind = rel.get("type").and_then(Value::as_str).unwrap_or("");
        let person1 = rel.get("person1").and_then(Value::as_str);
        let person2 = rel.get("person2").and_then(Value::as_str);
        match kind {
            "partnership" | "marriage" => {
                let members = match (person1, person2) {
                    (Some(a), Some(b)) => vec![a.to_string(), b.to_string()],
                    _ => id_list(rel.get("members")),
                };
                if members.len() != 2 {
                    return Err(AssistantError::MalformedResponse(
                        "partnership must have exactly two members".to_string(),
                    ));
                }
                for m in &members {
                    check(m)?;
                }
                out.push(RelationshipRecord::partnership(
                    members[0].clone(),
                    members[1].clone(),
                ));
            }
            "parent-child" => {
                if let (Some(parent), Some(child)) = (person1, person2) {
                    check(parent)?;
                    check(child)?;
                    let parents = pairwise.entry(child.to_string()).or_default();
                    if !parents.iter().any(|p| p == parent) {
                        parents.push(parent.to_string());
                    }
                    continue;
                }
                let children = id_list(rel.get("members"));
                let parents = id_list(rel.get("parents"));
                if children.is_empty() || parents.is_empty() || parents.len() > 2 {
                    return Err(AssistantError::MalformedResponse(
                        "parent-child record needs children and one or two parents".to_string(),
                    ));
                }
                for id in children.iter().chain(parents.iter()) {
                    check(id)?;
                }
                for child in children {
                    out.push(RelationshipRecord::parent_child(child, parents.clone()));
                }
            }
            // Sibling links carry no information the builder needs.
            _ => {}
        }
    }

    for (child, parents) in pairwise {
        if parents.len() > 2 {
            return Err(AssistantError::MalformedResponse(format!(
                "{child} has more than two parents"
            )));
        }
        out.push(RelationshipRecord::parent_child(child, parents));
    }

    debug_assert!(out.iter().all(|r| match r.kind {
        RelationshipKind::Partnership => r.members.len() == 2,
        RelationshipKind::ParentChild => !r.parents.is_empty(),
    }));
    Ok(out)
}

/// Blocking HTTP transport for a Gemini-style `generateContent` endpoint.
#[cfg(feature = "assistant-http")]
#[derive(Debug, Clone, Default)]
pub struct HttpAssistant;

#[cfg(feature = "assistant-http")]
impl HttpAssistant {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(feature = "assistant-http")]
impl AssistantTransport for HttpAssistant {
    fn complete(&self, config: &AssistantConfig, prompt: &str) -> Result<String, AssistantError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.timeout.min(Duration::from_secs(10)))
            .build()
            .map_err(|e| AssistantError::Transport(e.to_string()))?;

        let mut request = client.post(&config.endpoint);
        if let Some(key) = config.api_key.as_deref() {
            request = request.query(&[("key", key)]);
        }
        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let response = request.json(&body).send().map_err(|e| {
            if e.is_timeout() {
                AssistantError::Timeout(config.timeout)
            } else {
                AssistantError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(AssistantError::RateLimited);
        }
        if !status.is_success() {
            return Err(AssistantError::HttpStatus {
                status: status.as_u16(),
            });
        }

        let data: Value = response
            .json()
            .map_err(|e| AssistantError::MalformedResponse(e.to_string()))?;
        let text: String = data
            .pointer("/candidates/0/content/parts")
            .and_then(Value::as_array)
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|p| p.get("text").and_then(Value::as_str))
                    .collect()
            })
            .unwrap_or_default();
        if text.is_empty() {
            return Err(AssistantError::MalformedResponse(
                "no candidate text in reply".to_string(),
            ));
        }
        Ok(text)
    }
}
