//! Narrative generation contract.
//!
//! The actual text-generation service is an external collaborator; this
//! crate owns everything around it: the audience/depth options and their
//! token budgets, the size-bounded prompt assembly, the backend trait, and
//! a deterministic local fallback that always succeeds.

mod fallback;
mod prompt;

pub use fallback::fallback_comment;
pub use prompt::{build_prompt, shrink_payload, ShrunkPayload, HEAD_ROWS, TAIL_ROWS};

use medley_engine::{Analysis, Payload};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Who the generated commentary is written for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Audience {
    #[default]
    MediaExpert,
    Executive,
    MarketingStrategist,
}

/// How long and detailed the commentary should be.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Depth {
    Deep,
    #[default]
    Standard,
    Brief,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrativeOptions {
    /// BCP-47-ish language code the narrative should be written in.
    pub language: String,
    pub audience: Audience,
    pub depth: Depth,
}

impl Default for NarrativeOptions {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            audience: Audience::default(),
            depth: Depth::default(),
        }
    }
}

/// Fixed output-length ceiling, in tokens, per audience and depth.
pub fn token_budget(audience: Audience, depth: Depth) -> usize {
    match audience {
        Audience::MediaExpert => match depth {
            Depth::Deep => 1200,
            Depth::Standard => 800,
            Depth::Brief => 450,
        },
        Audience::Executive | Audience::MarketingStrategist => match depth {
            Depth::Deep => 900,
            Depth::Standard => 600,
            Depth::Brief => 350,
        },
    }
}

/// What a backend receives: the fully assembled prompt plus the response
/// budget it must honor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NarrativeRequest {
    pub prompt: String,
    pub max_tokens: usize,
}

#[derive(Debug, Error)]
pub enum NarrativeError {
    #[error("narrative backend unavailable: {0}")]
    Unavailable(String),
    #[error("narrative backend misconfigured: {0}")]
    Misconfigured(String),
    #[error("narrative backend timed out")]
    Timeout,
    #[error("narrative backend failed: {0}")]
    Backend(String),
}

/// A synchronous text-generation backend. Implementations are expected to
/// enforce their own timeout and surface it as [`NarrativeError::Timeout`].
pub trait NarrativeBackend {
    fn generate(&self, request: &NarrativeRequest) -> Result<String, NarrativeError>;
}

/// Commentary plus, when the backend could not be used, the non-blocking
/// reason the deterministic fallback was taken instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commentary {
    pub text: String,
    pub fallback_reason: Option<String>,
}

/// Produces commentary for a pivot payload.
///
/// Backend failures never propagate: any error (or an absent backend)
/// resolves to the local fallback, with the reason carried as a warning.
pub fn comment_on_pivot(
    backend: Option<&dyn NarrativeBackend>,
    payload: &Payload,
    analysis: &Analysis,
    options: &NarrativeOptions,
) -> Commentary {
    let Some(backend) = backend else {
        return Commentary {
            text: fallback_comment(payload),
            fallback_reason: Some("no narrative backend configured".to_string()),
        };
    };

    let request = NarrativeRequest {
        prompt: build_prompt(payload, analysis, options),
        max_tokens: token_budget(options.audience, options.depth),
    };
    match backend.generate(&request) {
        Ok(text) => Commentary {
            text,
            fallback_reason: None,
        },
        Err(err) => Commentary {
            text: fallback_comment(payload),
            fallback_reason: Some(err.to_string()),
        },
    }
}
