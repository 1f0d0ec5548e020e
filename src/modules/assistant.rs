use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use clap::ValueEnum;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::modules::grid::Direction;
use crate::modules::menu::MapHint;
use crate::modules::profile::Profile;

/// Most recent conversation messages kept when pruning history.
const HISTORY_LIMIT: usize = 12;
/// Transport attempts per turn before the call is declared failed.
const MAX_ATTEMPTS: u32 = 3;

/// The agent's structured answer for one turn. `choice` is the raw menu
/// number as stated; the guard decides whether it is legal.
#[derive(Clone, Debug, PartialEq)]
pub struct TurnReply {
    pub choice: i64,
    pub direction: Option<Direction>,
    pub justification: String,
}

/// The decision-making collaborator. Stateful per run: implementations keep
/// their own conversation context. A malformed but delivered answer comes
/// back as a `TurnReply` (and trips the guard); only transport failures are
/// errors.
pub trait Assistant {
    fn submit_turn(&mut self, prompt: &str, context: Option<&MapHint>) -> Result<TurnReply, String>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LlmProvider {
    /// OpenAI-style /v1/chat/completions endpoint.
    Openai,
    /// Local Ollama /api/chat endpoint.
    Ollama,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub host: String,
    pub model: String,
    pub provider: LlmProvider,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct OllamaChatRequest {
    model: String,
    stream: bool,
    format: &'static str,
    messages: Vec<Message>,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: Message,
}

#[derive(Serialize)]
struct OpenAiChatRequest {
    model: String,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    messages: Vec<Message>,
}

#[derive(Deserialize)]
struct OpenAiChatResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: Message,
}

/// Chat-model assistant speaking the JSON reply schema
/// (NumericAnswer / Direction / Justification).
pub struct LlmAssistant {
    http: Client,
    config: LlmConfig,
    system: String,
    history: Vec<Message>,
}

impl LlmAssistant {
    pub fn new(profile: Profile, control: bool, config: LlmConfig) -> Result<Self, String> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| format!("build http client: {}", e))?;
        Ok(Self {
            http,
            system: system_prompt(profile, control),
            config,
            history: Vec::new(),
        })
    }

    fn messages_for(&self, prompt: &str, context: Option<&MapHint>) -> Vec<Message> {
        let mut messages = Vec::with_capacity(self.history.len() + 3);
        messages.push(Message {
            role: "system".into(),
            content: self.system.clone(),
        });
        messages.extend(self.history.iter().cloned());
        messages.push(Message {
            role: "user".into(),
            content: prompt.to_string(),
        });
        if let Some(hint) = context {
            messages.push(Message {
                role: "user".into(),
                content: format!(
                    "These are the dungeon details you have uncovered. They are not options:\n{}",
                    render_hint(hint)
                ),
            });
        }
        messages
    }

    fn call(&self, messages: Vec<Message>) -> Result<String, String> {
        let mut attempts = 0;
        let mut last_err = String::new();

        while attempts < MAX_ATTEMPTS {
            attempts += 1;
            if attempts > 1 {
                // simple jitter: 50-150ms
                let jitter_ms = 50 + (rand::random::<u64>() % 100);
                std::thread::sleep(Duration::from_millis(jitter_ms));
            }

            let result = match self.config.provider {
                LlmProvider::Ollama => self.call_ollama(&messages),
                LlmProvider::Openai => self.call_openai(&messages),
            };
            match result {
                Ok(text) => return Ok(text),
                Err(err) => last_err = err,
            }
        }

        Err(format!(
            "llm failed after {} attempt(s): {}",
            attempts, last_err
        ))
    }

    fn call_ollama(&self, messages: &[Message]) -> Result<String, String> {
        let url = format!("{}/api/chat", self.config.host.trim_end_matches('/'));
        let body = OllamaChatRequest {
            model: self.config.model.clone(),
            stream: false,
            format: "json",
            messages: messages.to_vec(),
        };
        let request_json =
            serde_json::to_string_pretty(&body).map_err(|e| format!("encode request: {}", e))?;

        let resp = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| format!("http: {}", e))?;
        let status = resp.status();
        let raw_body = resp.text().map_err(|e| format!("read body: {}", e))?;

        let parsed: OllamaChatResponse = serde_json::from_str(&raw_body)
            .map_err(|e| format!("decode: {}; status={} body={}", e, status, raw_body))?;
        log_llm_call("ollama", &self.config.model, &request_json, &raw_body);
        Ok(parsed.message.content)
    }

    fn call_openai(&self, messages: &[Message]) -> Result<String, String> {
        let url = {
            let trimmed = self.config.host.trim_end_matches('/');
            if trimmed.ends_with("/v1/chat/completions") {
                trimmed.to_string()
            } else {
                format!("{}/v1/chat/completions", trimmed)
            }
        };
        let body = OpenAiChatRequest {
            model: self.config.model.clone(),
            stream: false,
            temperature: None,
            messages: messages.to_vec(),
        };
        let request_json =
            serde_json::to_string_pretty(&body).map_err(|e| format!("encode request: {}", e))?;

        let resp = self
            .http
            .post(&url)
            .headers(build_openai_headers(&self.config.api_key)?)
            .json(&body)
            .send()
            .map_err(|e| format!("http: {}", e))?;
        let status = resp.status();
        let raw_body = resp.text().map_err(|e| format!("read body: {}", e))?;

        let parsed: OpenAiChatResponse = serde_json::from_str(&raw_body)
            .map_err(|e| format!("decode: {}; status={} body={}", e, status, raw_body))?;
        log_llm_call("openai", &self.config.model, &request_json, &raw_body);
        parsed
            .choices
            .first()
            .map(|choice| choice.message.content.clone())
            .ok_or_else(|| format!("empty choices; status={}", status))
    }

    fn remember(&mut self, prompt: &str, reply: &str) {
        self.history.push(Message {
            role: "user".into(),
            content: prompt.to_string(),
        });
        self.history.push(Message {
            role: "assistant".into(),
            content: reply.to_string(),
        });
        if self.history.len() > HISTORY_LIMIT {
            let drop = self.history.len() - HISTORY_LIMIT;
            self.history.drain(0..drop);
        }
    }
}

impl Assistant for LlmAssistant {
    fn submit_turn(&mut self, prompt: &str, context: Option<&MapHint>) -> Result<TurnReply, String> {
        let messages = self.messages_for(prompt, context);
        let text = self.call(messages)?;
        self.remember(prompt, &text);
        Ok(parse_reply(&text))
    }
}

fn build_openai_headers(api_key: &Option<String>) -> Result<reqwest::header::HeaderMap, String> {
    use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    match api_key {
        Some(key) => {
            let value = format!("Bearer {}", key);
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&value).map_err(|e| e.to_string())?,
            );
        }
        None => return Err("missing LLM API key; set --llm-api-key or LLM_API_KEY".into()),
    }
    Ok(headers)
}

fn render_hint(hint: &MapHint) -> String {
    let value = serde_json::to_value(hint).unwrap_or_default();
    serde_toon::to_string_pretty(&value).unwrap_or_else(|_| value.to_string())
}

/// Parse the agent's JSON reply. A reply that cannot be parsed becomes an
/// out-of-range choice so the guard's correction path handles it; only the
/// transport layer produces hard errors.
pub fn parse_reply(text: &str) -> TurnReply {
    let fallback = |raw: &str| TurnReply {
        choice: 0,
        direction: None,
        justification: truncate(raw, 200),
    };

    let Ok(value) = serde_json::from_str::<serde_json::Value>(text) else {
        return fallback(text);
    };
    let Some(object) = value.as_object() else {
        return fallback(text);
    };

    let field = |name: &str| {
        object
            .iter()
            .find(|(key, _)| key.to_lowercase().replace('_', "") == name)
            .map(|(_, v)| v)
    };

    let choice = field("numericanswer")
        .or_else(|| field("action"))
        .and_then(|v| {
            v.as_i64()
                .or_else(|| v.as_str().and_then(|s| s.trim().parse::<i64>().ok()))
        });
    let Some(choice) = choice else {
        return fallback(text);
    };

    let direction = field("direction")
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse::<Direction>().ok());
    let justification = field("justification")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    TurnReply {
        choice,
        direction,
        justification,
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max).collect();
        format!("{}…", cut)
    }
}

fn system_prompt(profile: Profile, control: bool) -> String {
    let reply_contract = "STRICTLY FOLLOW THESE INSTRUCTIONS:\n\
        YOUR NUMERICANSWER MUST COME FROM THE PROVIDED LIST\n\
        YOUR DIRECTION MUST BE MENTIONED IN THE STRING FOLLOWING THE NUMBER (WHEN APPLICABLE)\n\
        YOU MUST REPLY IN JSON FORMAT:\n\
        'NumericAnswer': The number from the provided list\n\
        'Direction': If you choose to move, the direction from the list. If not, the value should be N/A\n\
        'Justification': Explain your answer\n\
        VALIDATE THE ACTION AND NUMBER IN YOUR RESPONSE ARE ACCURATE\n\
        When moving prioritize unexplored rooms\n\
        EVALUATE YOUR PREVIOUS 3 MOVES TO ENSURE YOU DON'T GET STUCK";

    if control {
        return format!(
            "You are playing a text based dungeon crawler game. \
             If you have already been to a room '(VISITED)' will appear after the direction. \
             Available actions are preceded by a number '(#)'. The dungeon is a 5x5 grid.\n\n{}\n\nGOAL:\n1. Find the exit",
            reply_contract
        );
    }

    match (profile.alignment, profile.motivation) {
        (Some(alignment), Some(motivation)) => format!(
            "You are playing a text based dungeon crawler game. You are a character of {} alignment \
             who is motivated by {}. The game's objective is to stay true to your motivation and \
             alignment and find the exit in under 35 moves.\n\n\
             {} is defined as: '{}'\n\n\
             Avoid revisiting rooms: only in extreme cases should you go back to a room you've \
             already been in. The dungeon is a 5x5 grid.\n\n{}\n\
             DO NOT MENTION YOUR ALIGNMENT OR MOTIVATION IN THE JUSTIFICATION",
            alignment,
            motivation,
            motivation,
            motivation.definition(),
            reply_contract
        ),
        (Some(alignment), None) => format!(
            "You are a {} character. You will play a game. The game's objective is to choose \
             actions that a {} character would and find the exit in under 35 moves. \
             Avoid revisiting rooms: only in extreme cases should you go back to a room you've \
             already been in. You have the necessary skills and abilities to handle all \
             encounters. The dungeon is a 5x5 grid.\n\n{}\n\
             DO NOT MENTION YOUR ALIGNMENT IN THE JUSTIFICATION",
            alignment, alignment, reply_contract
        ),
        (None, Some(motivation)) => format!(
            "You are playing a text based dungeon crawler game. You are motivated by {}. \
             {} is defined as: '{}'. If you have already been to a room '(VISITED)' will appear \
             after the direction. The dungeon is a 5x5 grid.\n\n{}\n\
             DO NOT MENTION YOUR MOTIVATION IN THE JUSTIFICATION\n\n\
             GOAL:\n1. Stay true to your motivation\n2. Find the exit",
            motivation,
            motivation,
            motivation.definition(),
            reply_contract
        ),
        (None, None) => system_prompt(profile, true),
    }
}

/// Deterministic assistant for tests and control runs: answers a fixed
/// sequence of menu numbers (repeating the last one), inferring the stated
/// direction from the prompt's own option listing.
pub struct ScriptedAssistant {
    script: Vec<i64>,
    cursor: usize,
}

impl ScriptedAssistant {
    /// Always picks the first catalog entry.
    pub fn first_choice() -> Self {
        Self::sequence(vec![1])
    }

    pub fn sequence(script: Vec<i64>) -> Self {
        Self { script, cursor: 0 }
    }

    fn next_choice(&mut self) -> i64 {
        let choice = self
            .script
            .get(self.cursor)
            .or_else(|| self.script.last())
            .copied()
            .unwrap_or(1);
        if self.cursor < self.script.len() {
            self.cursor += 1;
        }
        choice
    }
}

impl Assistant for ScriptedAssistant {
    fn submit_turn(
        &mut self,
        prompt: &str,
        _context: Option<&MapHint>,
    ) -> Result<TurnReply, String> {
        let choice = self.next_choice();
        let direction = menu_line(prompt, choice).and_then(|line| stated_direction(&line));
        Ok(TurnReply {
            choice,
            direction,
            justification: "scripted".into(),
        })
    }
}

/// Extract the text of menu line `(number) ...` from a rendered prompt.
pub fn menu_line(prompt: &str, number: i64) -> Option<String> {
    let marker = format!("({}) ", number);
    prompt
        .lines()
        .find(|line| line.trim_start().starts_with(&marker))
        .map(|line| line.trim_start()[marker.len()..].to_string())
}

fn stated_direction(line: &str) -> Option<Direction> {
    Direction::ALL
        .into_iter()
        .find(|direction| line.contains(direction.name()))
}

fn log_llm_call(provider: &str, model: &str, request_json: &str, response_json: &str) {
    use std::fs::OpenOptions;
    let timestamp = Utc::now().to_rfc3339();
    let dir = PathBuf::from("logs");
    if let Err(err) = fs::create_dir_all(&dir) {
        eprintln!("warn: failed to create logs dir: {}", err);
        return;
    }
    let path = dir.join("llm.log");
    let content = format!(
        "[{}] provider={} model={}\nrequest:\n{}\nresponse:\n{}\n\n",
        timestamp, provider, model, request_json, response_json
    );
    let result = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .and_then(|mut f| std::io::Write::write_all(&mut f, content.as_bytes()));
    if let Err(err) = result {
        eprintln!("warn: failed to write llm log {}: {}", path.display(), err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_reply_schema() {
        let reply = parse_reply(
            r#"{"NumericAnswer": 3, "Direction": "North", "Justification": "The unexplored room."}"#,
        );
        assert_eq!(reply.choice, 3);
        assert_eq!(reply.direction, Some(Direction::North));
        assert_eq!(reply.justification, "The unexplored room.");
    }

    #[test]
    fn accepts_case_variants_and_numeric_strings() {
        let reply = parse_reply(r#"{"numeric_answer": "2", "direction": "N/A"}"#);
        assert_eq!(reply.choice, 2);
        assert_eq!(reply.direction, None);

        let reply = parse_reply(r#"{"Action": 1}"#);
        assert_eq!(reply.choice, 1);
    }

    #[test]
    fn malformed_replies_become_out_of_range_choices() {
        let reply = parse_reply("I think I shall go north!");
        assert_eq!(reply.choice, 0);
        assert_eq!(reply.direction, None);

        let reply = parse_reply(r#"{"Direction": "South"}"#);
        assert_eq!(reply.choice, 0);
    }

    #[test]
    fn scripted_assistant_reads_directions_from_the_prompt() {
        let prompt = "A room.\n\nProvide the number of the action you'd like to take:\n(1) Take the idol\n(2) North\n(3) East (This room has been explored)";
        let mut scripted = ScriptedAssistant::sequence(vec![2, 3, 1]);

        let reply = scripted.submit_turn(prompt, None).unwrap();
        assert_eq!(reply.choice, 2);
        assert_eq!(reply.direction, Some(Direction::North));

        let reply = scripted.submit_turn(prompt, None).unwrap();
        assert_eq!(reply.choice, 3);
        assert_eq!(reply.direction, Some(Direction::East));

        let reply = scripted.submit_turn(prompt, None).unwrap();
        assert_eq!(reply.direction, None);

        // The script repeats its last answer once exhausted.
        let reply = scripted.submit_turn(prompt, None).unwrap();
        assert_eq!(reply.choice, 1);
    }
}
