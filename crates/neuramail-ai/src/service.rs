use std::cmp::Ordering;

use neuramail_core::{ReplyTone, Ticket};
use regex::Regex;
use serde::Deserialize;

use crate::AiError;

/// Tuning for the chat-completions endpoint. Reply drafting and mailbox
/// queries carry separate budgets: drafts stay short and warm, queries get
/// a cooler temperature and more room for the structured verdict.
#[derive(Debug, Clone)]
pub struct AssistantRuntime {
    pub api_base: String,
    pub model: String,
    pub default_tone: ReplyTone,
    pub max_context_chars: usize,
    pub reply_budget: GenerationBudget,
    pub query_budget: GenerationBudget,
}

#[derive(Debug, Clone, Copy)]
pub struct GenerationBudget {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for AssistantRuntime {
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com/v1".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            default_tone: ReplyTone::Professional,
            max_context_chars: 2000,
            reply_budget: GenerationBudget {
                temperature: 0.7,
                max_tokens: 500,
            },
            query_budget: GenerationBudget {
                temperature: 0.5,
                max_tokens: 1500,
            },
        }
    }
}

/// One ticket the model judged relevant to a query.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RelevantTicket {
    pub ticket_number: String,
    pub relevance_score: f64,
    #[serde(default)]
    pub summary: String,
}

#[derive(Debug, Deserialize)]
struct ParsedQueryReply {
    #[serde(default)]
    relevant_tickets: Vec<RelevantTicket>,
    #[serde(default)]
    total_relevant: usize,
    #[serde(default)]
    ai_reply: String,
}

/// Outcome of a mailbox query: the model's prose answer plus the tickets it
/// named, cross-checked against the real ticket set.
#[derive(Debug, Clone)]
pub struct AssistantAnswer {
    pub reply: String,
    pub relevant_tickets: Vec<RelevantTicket>,
    pub total_relevant: usize,
    pub matched_emails: Vec<Ticket>,
}

#[derive(Clone)]
pub struct AssistantService {
    runtime: AssistantRuntime,
    api_key: String,
    http: reqwest::Client,
}

impl AssistantService {
    pub fn new(runtime: AssistantRuntime, api_key: String) -> Self {
        Self {
            runtime,
            api_key,
            http: reqwest::Client::new(),
        }
    }

    /// Reads the API key from `NEURAMAIL_OPENAI_API_KEY`, falling back to
    /// the conventional `OPENAI_API_KEY`.
    pub fn from_env(runtime: AssistantRuntime) -> Result<Self, AiError> {
        let api_key = std::env::var("NEURAMAIL_OPENAI_API_KEY")
            .or_else(|_| std::env::var("OPENAI_API_KEY"))
            .map_err(|_| AiError::MissingApiKey)?;
        Ok(Self::new(runtime, api_key))
    }

    /// Drafts a reply for a ticket from its subject and prior messages.
    pub async fn generate_email_reply(
        &self,
        subject: &str,
        previous_messages: &[String],
        tone: Option<ReplyTone>,
    ) -> Result<String, AiError> {
        let tone = tone.unwrap_or(self.runtime.default_tone);
        let prompt = self.reply_prompt(subject, previous_messages, tone);

        let completion = self.complete(&prompt, self.runtime.reply_budget).await?;
        if completion.trim().is_empty() {
            return Err(AiError::EmptyCompletion);
        }
        Ok(completion.trim().to_string())
    }

    /// Answers a free-text question about the mailbox. The model is asked
    /// for a strict JSON verdict; tickets it invents are dropped silently
    /// when cross-referencing against `tickets`.
    pub async fn process_assistant_query(
        &self,
        query: &str,
        tickets: &[Ticket],
    ) -> Result<AssistantAnswer, AiError> {
        let prompt = self.query_prompt(query, tickets);
        let completion = self.complete(&prompt, self.runtime.query_budget).await?;

        let parsed = parse_query_reply(&completion)?;
        let matched_emails = match_tickets(&parsed.relevant_tickets, tickets);
        tracing::debug!(
            named = parsed.relevant_tickets.len(),
            matched = matched_emails.len(),
            "assistant query resolved"
        );
        Ok(AssistantAnswer {
            reply: parsed.ai_reply,
            total_relevant: parsed.total_relevant,
            relevant_tickets: parsed.relevant_tickets,
            matched_emails,
        })
    }

    fn reply_prompt(&self, subject: &str, previous_messages: &[String], tone: ReplyTone) -> String {
        let history = previous_messages
            .iter()
            .map(|message| sanitize_text(message))
            .collect::<Vec<_>>()
            .join("\n");
        let context = truncate_text(&history, self.runtime.max_context_chars);

        format!(
            "Generate a professional email reply for the following context:\n\
             Subject: {}\n\
             Previous Messages: {context}\n\
             Tone: {tone}\n\n\
             Please generate a concise and appropriate reply:",
            sanitize_text(subject)
        )
    }

    fn query_prompt(&self, query: &str, tickets: &[Ticket]) -> String {
        let mut context = String::new();
        for ticket in tickets {
            context.push_str(&format!(
                "Ticket {}: From: {}, Subject: {}\n",
                ticket.ticket_no,
                ticket.sender_email,
                sanitize_text(&ticket.subject)
            ));
            for message in &ticket.thread {
                let snippet = truncate_text(&sanitize_text(&message.email_body), 500);
                context.push_str(&format!("  {snippet}\n"));
            }
            context.push('\n');
        }

        format!(
            "Based on the following support tickets, answer the user's question.\n\
             User Question: {}\n\n\
             Tickets:\n{context}\
             Respond with JSON only, in exactly this shape:\n\
             {{\"relevant_tickets\": [{{\"ticket_number\": \"...\", \"relevance_score\": 0.0, \"summary\": \"...\"}}], \
             \"total_relevant\": 0, \"ai_reply\": \"...\"}}\n\
             Order relevant_tickets by relevance_score descending.",
            sanitize_text(query)
        )
    }

    async fn complete(&self, prompt: &str, budget: GenerationBudget) -> Result<String, AiError> {
        let endpoint = format!(
            "{}/chat/completions",
            self.runtime.api_base.trim_end_matches('/')
        );

        let response = self
            .http
            .post(endpoint)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "model": self.runtime.model,
                "messages": [{"role": "user", "content": prompt}],
                "temperature": budget.temperature,
                "max_tokens": budget.max_tokens,
            }))
            .send()
            .await?
            .error_for_status()?;

        let json: serde_json::Value = response.json().await?;
        Ok(json
            .pointer("/choices/0/message/content")
            .and_then(|value| value.as_str())
            .unwrap_or_default()
            .to_string())
    }
}

/// Parses the model's JSON verdict, tolerating Markdown code fences, and
/// re-sorts tickets by relevance in case the model ignored the ordering ask.
fn parse_query_reply(completion: &str) -> Result<ParsedQueryReply, AiError> {
    let body = strip_code_fences(completion);
    if body.is_empty() {
        return Err(AiError::EmptyCompletion);
    }

    let mut parsed: ParsedQueryReply =
        serde_json::from_str(body).map_err(|err| AiError::MalformedReply(err.to_string()))?;
    parsed.relevant_tickets.sort_by(|a, b| {
        b.relevance_score
            .partial_cmp(&a.relevance_score)
            .unwrap_or(Ordering::Equal)
    });
    Ok(parsed)
}

fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}

/// Keeps only the named tickets that exist, preserving the model's
/// relevance order.
fn match_tickets(relevant: &[RelevantTicket], tickets: &[Ticket]) -> Vec<Ticket> {
    relevant
        .iter()
        .filter_map(|candidate| {
            tickets
                .iter()
                .find(|ticket| ticket.ticket_no == candidate.ticket_number)
        })
        .cloned()
        .collect()
}

/// Strips control characters and collapses whitespace runs before text is
/// embedded in a prompt.
fn sanitize_text(text: &str) -> String {
    let control = Regex::new(r"[\x00-\x1F\x7F-\x9F]").expect("valid control char regex");
    let stripped = control.replace_all(text, "");
    let whitespace = Regex::new(r"\s+").expect("valid whitespace regex");
    whitespace.replace_all(&stripped, " ").trim().to_string()
}

/// Cuts at a word boundary and appends an ellipsis when anything was lost.
fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let cut: String = text.chars().take(max_chars).collect();
    match cut.rfind(' ') {
        Some(last_space) if last_space > 0 => format!("{}...", &cut[..last_space]),
        _ => format!("{cut}..."),
    }
}
