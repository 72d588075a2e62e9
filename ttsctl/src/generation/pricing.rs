//! Cost model and request validation for speech generation.

use crate::errors::Error;
use crate::types::Credits;

/// Characters covered by one credit
pub const CHARS_PER_CREDIT: usize = 100;

/// Value used for `exaggeration` and `cfg_weight` when the caller omits them
pub const DEFAULT_CONTROL_PARAMETER: f64 = 0.5;

/// Language codes the multilingual synthesis model accepts
pub const SUPPORTED_LANGUAGES: &[&str] = &[
    "ar", "da", "de", "el", "en", "es", "fi", "fr", "he", "hi", "it", "ja", "ko", "ms", "nl", "no", "pl", "pt", "ru", "sv", "sw",
    "tr", "zh",
];

/// Credits charged for synthesizing `text`: one per started block of 100 characters, at least one.
///
/// Length is counted in Unicode scalar values so that multi-byte scripts are not
/// charged more than Latin text of the same visible length.
pub fn cost(text: &str) -> Credits {
    let chars = text.chars().count();
    chars.div_ceil(CHARS_PER_CREDIT).max(1) as Credits
}

/// Generation input as received, before validation
#[derive(Debug, Clone, Default)]
pub struct GenerationInput {
    pub text: Option<String>,
    pub voice_s3_key: Option<String>,
    pub language: Option<String>,
    pub exaggeration: Option<f64>,
    pub cfg_weight: Option<f64>,
}

/// Input that passed validation, with defaults applied
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedGeneration {
    pub text: String,
    pub voice_s3_key: String,
    pub language: String,
    pub exaggeration: f64,
    pub cfg_weight: f64,
    pub cost: Credits,
}

fn required(field: &str, value: Option<String>) -> Result<String, Error> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(Error::Validation {
            message: format!("Missing required field: {field}"),
        }),
    }
}

fn control_parameter(field: &str, value: Option<f64>) -> Result<f64, Error> {
    let value = value.unwrap_or(DEFAULT_CONTROL_PARAMETER);
    if !value.is_finite() {
        return Err(Error::Validation {
            message: format!("{field} must be a finite number"),
        });
    }
    Ok(value)
}

/// Check required fields, length and language, and price the request.
///
/// Runs before any balance check or external call, so a failure here has no side effects.
pub fn validate(input: GenerationInput, max_text_chars: usize) -> Result<ValidatedGeneration, Error> {
    let text = required("text", input.text)?;
    let voice_s3_key = required("voice_s3_key", input.voice_s3_key)?;
    let language = required("language", input.language)?.trim().to_ascii_lowercase();

    let chars = text.chars().count();
    if chars > max_text_chars {
        return Err(Error::Validation {
            message: format!("Text is {chars} characters long; the maximum is {max_text_chars}"),
        });
    }

    if !SUPPORTED_LANGUAGES.contains(&language.as_str()) {
        return Err(Error::Validation {
            message: format!("Unsupported language: {language}"),
        });
    }

    let exaggeration = control_parameter("exaggeration", input.exaggeration)?;
    let cfg_weight = control_parameter("cfg_weight", input.cfg_weight)?;

    Ok(ValidatedGeneration {
        cost: cost(&text),
        text,
        voice_s3_key,
        language,
        exaggeration,
        cfg_weight,
    })
}
