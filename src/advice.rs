//! Advice collaborator — a short per-medication tip fetched once at
//! creation. Failures never block creation: any error degrades to the
//! fixed fallback text and the stored advice is immutable afterwards.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Advice stored when the collaborator is unavailable or fails.
pub const FALLBACK_ADVICE: &str = "Lembre-se de tomar com água.";

const SYSTEM_INSTRUCTION: &str = "Você é um assistente médico especializado em orientações para idosos. \
NUNCA repita a mesma dica genérica para medicamentos diferentes. \
Para CADA medicamento, dê uma orientação ESPECÍFICA baseada em: \
interações com alimentos, horário ideal, efeitos colaterais comuns e cuidados especiais. \
Seja breve (máximo 2 frases), direto, gentil e em português. \
Use o NOME DO MEDICAMENTO na resposta para personalizar. \
NUNCA use formatação markdown.";

#[derive(Error, Debug)]
pub enum AdviceError {
    #[error("Cannot connect to advice service at {0}")]
    Connection(String),
    #[error("Advice request timed out after {0}s")]
    Timeout(u64),
    #[error("Advice service returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("Cannot parse advice response: {0}")]
    Parse(String),
    #[error("Cannot build HTTP client: {0}")]
    Client(String),
    #[error("No advice API key configured")]
    NotConfigured,
}

/// Seam for the advice collaborator. Blocking; callers in async context
/// go through `advice_or_fallback`.
pub trait AdviceProvider: Send + Sync {
    fn fetch_advice(&self, name: &str, dosage: &str) -> Result<String, AdviceError>;
}

/// Gemini REST client with a bounded request timeout.
///
/// Holds configuration only. The blocking HTTP client is built per
/// call on the blocking thread: reqwest's blocking client cannot be
/// constructed inside the async runtime.
pub struct GeminiClient {
    base_url: String,
    model: String,
    api_key: String,
    timeout_secs: u64,
}

impl GeminiClient {
    pub fn new(base_url: &str, model: &str, api_key: &str, timeout_secs: u64) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
            timeout_secs,
        }
    }
}

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: String,
}

impl AdviceProvider for GeminiClient {
    fn fetch_advice(&self, name: &str, dosage: &str) -> Result<String, AdviceError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let prompt = format!(
            "Medicamento: {name}\nDosagem: {dosage}\n\n\
             Dê uma orientação ESPECÍFICA e PERSONALIZADA para este medicamento. \
             Foque em informações únicas deste remédio (horário, alimentos, efeitos). \
             Não use dicas genéricas que servem para qualquer remédio."
        );
        let body = GenerateContentRequest {
            system_instruction: Content {
                parts: vec![Part { text: SYSTEM_INSTRUCTION }],
            },
            contents: vec![Content {
                parts: vec![Part { text: &prompt }],
            }],
        };

        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(self.timeout_secs))
            .build()
            .map_err(|e| AdviceError::Client(e.to_string()))?;

        let response = client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_connect() {
                    AdviceError::Connection(self.base_url.clone())
                } else if e.is_timeout() {
                    AdviceError::Timeout(self.timeout_secs)
                } else {
                    AdviceError::Parse(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(AdviceError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateContentResponse = response
            .json()
            .map_err(|e| AdviceError::Parse(e.to_string()))?;

        let text = parsed
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AdviceError::Parse("empty candidate list".to_string()))?;

        Ok(text)
    }
}

/// Provider used when no API key is configured at startup.
pub struct DisabledAdvice;

impl AdviceProvider for DisabledAdvice {
    fn fetch_advice(&self, _name: &str, _dosage: &str) -> Result<String, AdviceError> {
        Err(AdviceError::NotConfigured)
    }
}

/// Fetch advice on a blocking thread, absorbing every failure into the
/// fallback text. Creation must never fail because of this collaborator.
pub async fn advice_or_fallback(
    provider: Arc<dyn AdviceProvider>,
    name: &str,
    dosage: &str,
) -> String {
    let name = name.to_string();
    let dosage = dosage.to_string();
    tracing::info!(medication = %name, "Fetching advice");

    let result =
        tokio::task::spawn_blocking(move || provider.fetch_advice(&name, &dosage)).await;

    match result {
        Ok(Ok(text)) => text,
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Advice unavailable, using fallback");
            FALLBACK_ADVICE.to_string()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Advice task failed, using fallback");
            FALLBACK_ADVICE.to_string()
        }
    }
}

/// Test double with a configurable response or forced failure.
#[cfg(test)]
pub struct MockAdvice {
    response: Option<String>,
}

#[cfg(test)]
impl MockAdvice {
    pub fn returning(text: &str) -> Self {
        Self {
            response: Some(text.to_string()),
        }
    }

    pub fn failing() -> Self {
        Self { response: None }
    }
}

#[cfg(test)]
impl AdviceProvider for MockAdvice {
    fn fetch_advice(&self, _name: &str, _dosage: &str) -> Result<String, AdviceError> {
        match &self.response {
            Some(text) => Ok(text.clone()),
            None => Err(AdviceError::Connection("mock".to_string())),
        }
    }
}
