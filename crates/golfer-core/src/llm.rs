use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

use anyhow::Context;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::game::session::{PlannedShot, ShotPlanner};
use crate::game::wire::{DecisionLimits, EXECUTE_SHOT_TOOL, parse_shot_arguments};

const SYSTEM_PROMPT: &str = "You are a professional and slightly witty miniature golf robot. \
Your goal is to sink the ball. You cannot see the course; rely entirely on the feedback \
from previous shots. Call the execute_shot function to take your turn.";

/// Config for an OpenAI-style `POST /v1/chat/completions` endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Full endpoint URL, e.g. `https://api.openai.com/v1/chat/completions`.
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ToolCallMsg>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ToolCallMsg {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    function: FunctionCall,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FunctionCall {
    name: String,
    /// JSON-encoded arguments object, as the API ships it.
    arguments: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessage,
}

impl ChatMessage {
    fn system(text: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: Some(text.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: Some(text.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    fn tool(call_id: String, text: String) -> Self {
        Self {
            role: "tool".to_string(),
            content: Some(text),
            tool_calls: None,
            tool_call_id: Some(call_id),
        }
    }
}

fn execute_shot_tool() -> serde_json::Value {
    json!([{
        "type": "function",
        "function": {
            "name": EXECUTE_SHOT_TOOL,
            "description": "Aims the club and strikes the golf ball.",
            "parameters": {
                "type": "object",
                "properties": {
                    "aim_degrees": {
                        "type": "integer",
                        "description": "Aim angle in degrees. Smaller is left, larger is right."
                    },
                    "strike_force": {
                        "type": "integer",
                        "description": "The force of the shot, from 1 (light tap) to 100 (full power)."
                    },
                    "commentary": {
                        "type": "string",
                        "description": "A brief, witty, or analytical comment about the planned shot."
                    }
                },
                "required": ["aim_degrees", "strike_force", "commentary"]
            }
        }
    }])
}

/// Stateful planner over an OpenAI-style chat endpoint.
///
/// Planning turns force exactly one `execute_shot` tool invocation. The
/// conversation (system prompt, prompts, tool calls, tool results, banter) is
/// committed only after a fully valid exchange, so a failed turn leaves no
/// trace and the retry re-issues an equivalent prompt.
pub struct OpenAiPlanner {
    cfg: OpenAiConfig,
    limits: DecisionLimits,
    client: Client,
    messages: Mutex<Vec<ChatMessage>>,
}

impl OpenAiPlanner {
    pub fn new(cfg: OpenAiConfig, limits: DecisionLimits) -> Self {
        Self {
            cfg,
            limits,
            client: Client::new(),
            messages: Mutex::new(vec![ChatMessage::system(SYSTEM_PROMPT)]),
        }
    }

    fn chat_body(&self, messages: &[ChatMessage], force_tool: bool) -> serde_json::Value {
        let mut body = json!({
            "model": self.cfg.model,
            "messages": messages,
        });
        if force_tool {
            body["tools"] = execute_shot_tool();
            body["tool_choice"] = json!({
                "type": "function",
                "function": { "name": EXECUTE_SHOT_TOOL }
            });
        }
        body
    }

    async fn request_chat(
        &self,
        messages: &[ChatMessage],
        force_tool: bool,
    ) -> anyhow::Result<ChatMessage> {
        let body = self.chat_body(messages, force_tool);
        let res = self
            .client
            .post(&self.cfg.endpoint)
            .bearer_auth(&self.cfg.api_key)
            .json(&body)
            .send()
            .await
            .context("planner request failed")?
            .error_for_status()
            .context("planner non-2xx response")?
            .json::<ChatResponse>()
            .await
            .context("planner response decode failed")?;

        res.choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| anyhow::anyhow!("planner returned no choices"))
    }
}

impl ShotPlanner for OpenAiPlanner {
    fn plan_shot<'a>(
        &'a self,
        prompt: String,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<PlannedShot>> + Send + 'a>> {
        Box::pin(async move {
            let mut messages = self.messages.lock().unwrap().clone();
            messages.push(ChatMessage::user(prompt));

            let reply = self.request_chat(&messages, true).await?;
            let call = reply
                .tool_calls
                .as_deref()
                .and_then(|calls| calls.first())
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("planner returned no tool call"))?;
            if call.function.name != EXECUTE_SHOT_TOOL {
                anyhow::bail!("planner called unknown tool {}", call.function.name);
            }
            let decision = parse_shot_arguments(&call.function.arguments, &self.limits)?;

            messages.push(reply);
            *self.messages.lock().unwrap() = messages;
            Ok(PlannedShot {
                decision,
                call_id: call.id,
            })
        })
    }

    fn record_result(&self, call_id: String, summary: String) {
        self.messages
            .lock()
            .unwrap()
            .push(ChatMessage::tool(call_id, summary));
    }

    fn banter<'a>(
        &'a self,
        prompt: String,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + 'a>> {
        Box::pin(async move {
            let mut messages = self.messages.lock().unwrap().clone();
            messages.push(ChatMessage::user(prompt));

            let reply = self.request_chat(&messages, false).await?;
            let text = reply
                .content
                .clone()
                .filter(|t| !t.trim().is_empty())
                .ok_or_else(|| anyhow::anyhow!("planner returned empty banter"))?;

            messages.push(reply);
            *self.messages.lock().unwrap() = messages;
            Ok(text)
        })
    }
}
