use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://api.deepseek.com";
pub const DEFAULT_MODEL: &str = "deepseek-chat";
pub const DEFAULT_API_KEY_ENV: &str = "DEEPSEEK_API_KEY";
const DEFAULT_TEMPERATURE: f64 = 0.4;

const SYSTEM_PROMPT: &str = "You reconstruct source code from a programming \
tutorial video. You receive text read by OCR from the distinct code frames of \
the video, keyed by frame number in chronological order. Later frames show \
later states of the same file.";

const USER_PREAMBLE: &str = "Reconstruct the final state of the source file \
shown in the video. Fix obvious OCR mistakes such as confused characters, \
broken indentation and garbled identifiers, using the progression between \
frames to resolve ambiguities. Reply with nothing but the file contents.";

#[derive(clap::Args, Debug)]
pub struct LlmCli {
    /// Base URL of an OpenAI compatible chat completions API
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    llm_base_url: String,

    /// Model name to request
    #[arg(long, default_value = DEFAULT_MODEL)]
    llm_model: String,

    /// Environment variable holding the API key
    #[arg(long, default_value = DEFAULT_API_KEY_ENV)]
    api_key_env: String,
}

impl LlmCli {
    pub fn to_args(&self) -> LlmArgs {
        LlmArgs::default()
            .base_url(self.llm_base_url.clone())
            .model(self.llm_model.clone())
            .api_key_env(self.api_key_env.clone())
    }
}

#[derive(Debug, Clone)]
pub struct LlmArgs {
    base_url: String,
    model: String,
    api_key_env: String,
    temperature: f64,
}

impl Default for LlmArgs {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

impl LlmArgs {
    pub fn base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn model(mut self, model: String) -> Self {
        self.model = model;
        self
    }

    pub fn api_key_env(mut self, api_key_env: String) -> Self {
        self.api_key_env = api_key_env;
        self
    }

    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReconstructError {
    #[error("environment variable {0} with the API key is not set")]
    MissingKey(String),
    #[error("cannot serialize the frame texts: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("chat request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("chat response contained no choices")]
    EmptyResponse,
    #[error("cannot write reconstructed file {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f64,
    stream: bool,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: String,
}

/// Asks a chat model to rebuild the source file out of the per frame OCR
/// text. One request, no retries; failures bubble up to the caller.
pub struct Reconstructor {
    args: LlmArgs,
}

impl Reconstructor {
    pub fn new(args: LlmArgs) -> Self {
        Self { args }
    }

    pub fn reconstruct(
        &self,
        frame_texts: &BTreeMap<u32, String>,
    ) -> Result<String, ReconstructError> {
        let key = std::env::var(&self.args.api_key_env)
            .map_err(|_| ReconstructError::MissingKey(self.args.api_key_env.clone()))?;

        let request = ChatRequest {
            model: &self.args.model,
            messages: vec![
                Message {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                Message {
                    role: "user",
                    content: format!(
                        "{USER_PREAMBLE}\n\nInput:\n{}",
                        serde_json::to_string_pretty(frame_texts)?
                    ),
                },
            ],
            temperature: self.args.temperature,
            stream: false,
        };

        log::info!(
            "asking {} at {} to reconstruct the source file",
            self.args.model,
            self.args.base_url
        );
        let client = reqwest::blocking::Client::builder().build()?;
        let response: ChatResponse = client
            .post(format!(
                "{}/chat/completions",
                self.args.base_url.trim_end_matches('/')
            ))
            .bearer_auth(key)
            .json(&request)
            .send()?
            .error_for_status()?
            .json()?;

        let content = response
            .choices
            .into_iter()
            .next()
            .ok_or(ReconstructError::EmptyResponse)?
            .message
            .content;

        Ok(strip_code_fence(&content).to_string())
    }
}

/// Chat models love wrapping files in markdown fences even when told not to.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return content;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return content;
    };

    // the fence line may carry a language tag
    match body.split_once('\n') {
        Some((_, code)) => code,
        None => body,
    }
}

/// Writes the reconstructed file under `out_dir`, creating it if needed.
pub fn write_source_file(
    out_dir: &Path,
    file_name: &str,
    content: &str,
) -> Result<PathBuf, ReconstructError> {
    fs::create_dir_all(out_dir).map_err(|source| ReconstructError::Write {
        path: out_dir.to_owned(),
        source,
    })?;

    let path = out_dir.join(file_name);
    fs::write(&path, content).map_err(|source| ReconstructError::Write {
        path: path.clone(),
        source,
    })?;

    log::info!("wrote reconstructed source to {}", path.display());
    Ok(path)
}
