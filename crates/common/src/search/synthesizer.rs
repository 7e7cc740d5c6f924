//! Answer synthesis over the refined candidate set
//!
//! Candidates are rendered as a numbered context block (`[1]`, `[2]`, ...)
//! and a single completion call produces the answer. The numbering is the
//! citation contract: marker `[N]` refers to the N-th candidate.

use super::model::{Candidate, Language};
use crate::errors::Result;
use crate::llm::{CompletionRequest, CompletionService};
use crate::metrics;
use sea_orm::prelude::Decimal;
use std::sync::Arc;
use std::time::Instant;

pub const SYNTHESIS_TEMPERATURE: f32 = 0.7;

pub const SYNTHESIS_MAX_TOKENS: u32 = 500;

const SYSTEM_PROMPT_EN: &str = "You are a helpful real estate assistant. Answer questions about properties using the provided context. Always cite sources using [1], [2], [3] format. Be concise and accurate. Format prices in millions (M) for readability.";

const SYSTEM_PROMPT_AR: &str = "أنت مساعد عقاري مفيد. أجب عن الأسئلة حول العقارات باستخدام السياق المقدم. استشهد دائماً بالمصادر باستخدام [١], [٢], [٣]. كن موجزاً ودقيقاً.";

/// System instruction for `language`
pub fn system_prompt(language: Language) -> &'static str {
    match language {
        Language::En => SYSTEM_PROMPT_EN,
        Language::Ar => SYSTEM_PROMPT_AR,
    }
}

/// Numbered context block, one paragraph per candidate in input order
pub fn build_context(candidates: &[Candidate], language: Language) -> String {
    candidates
        .iter()
        .enumerate()
        .map(|(idx, c)| context_line(idx + 1, c, language))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn context_line(position: usize, c: &Candidate, language: Language) -> String {
    format!(
        "[{}] {} in {} by {}: {}BR/{}BA, {}m², {} EGP. {}",
        position,
        c.localized_name(language),
        c.localized_city(language),
        c.developer_name.as_deref().unwrap_or_default(),
        c.bedrooms,
        c.bathrooms.normalize(),
        c.size_sqm.normalize(),
        group_thousands(&c.price_egp),
        c.project_description.as_deref().unwrap_or_default(),
    )
}

/// `4500000.00` -> `4,500,000`; at most two fraction digits are kept
fn group_thousands(value: &Decimal) -> String {
    let text = value.round_dp(2).normalize().to_string();
    let (sign, unsigned) = match text.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", text.as_str()),
    };
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (unsigned, None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match frac_part {
        Some(f) => format!("{}{}.{}", sign, grouped, f),
        None => format!("{}{}", sign, grouped),
    }
}

/// Build the synthesis request
pub fn synthesis_request(query: &str, candidates: &[Candidate], language: Language) -> CompletionRequest {
    CompletionRequest {
        instruction: system_prompt(language).to_string(),
        user_content: format!(
            "Context:\n{}\n\nQuestion: {}\n\nProvide a helpful answer with citations.",
            build_context(candidates, language),
            query
        ),
        temperature: SYNTHESIS_TEMPERATURE,
        max_output_tokens: SYNTHESIS_MAX_TOKENS,
    }
}

/// Completion-backed answer generation
pub struct AnswerSynthesizer {
    completion: Arc<dyn CompletionService>,
}

impl AnswerSynthesizer {
    pub fn new(completion: Arc<dyn CompletionService>) -> Self {
        Self { completion }
    }

    /// Generate an answer to `query` grounded in `candidates`.
    ///
    /// An empty candidate list still makes the call, so the model can say
    /// nothing matched. Completion failures propagate.
    pub async fn synthesize(&self, query: &str, candidates: &[Candidate], language: Language) -> Result<String> {
        let request = synthesis_request(query, candidates, language);
        let provider = self.completion.provider();
        let start = Instant::now();

        let outcome = self.completion.complete(&request).await;
        metrics::record_completion(start.elapsed().as_secs_f64(), "synthesis", provider, outcome.is_ok());

        let completion = outcome?;
        tracing::debug!(
            provider,
            context_entries = candidates.len(),
            answer_chars = completion.text.chars().count(),
            "Answer synthesized"
        );
        Ok(completion.text)
    }
}
