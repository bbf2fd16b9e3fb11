//! Prompts for LLM OCR and LLM cleanup.
//!
//! Kept in one place so prompt changes touch exactly one file and tests can
//! inspect them without a model.

use crate::language::language_name;

/// System prompt for the cleanup call. `{language}` is substituted.
const CLEANUP_SYSTEM_PROMPT: &str = "You are an expert OCR text corrector. The text below is in \
{language}. Correct misspellings, diacritics, hyphenation across line breaks and punctuation \
errors based on context. Preserve paragraph structure, language, and meaning. Do not translate. \
Do not invent new content; only fix recognition errors. Return only the cleaned text.";

/// System prompt for LLM OCR.
pub const OCR_SYSTEM_PROMPT: &str =
    "You are a meticulous OCR transcriber for document page images.";

/// Instruction sent ahead of the page images in LLM OCR.
const OCR_INSTRUCTION: &str = "Transcribe the text from the CURRENT page image. Use the PREVIOUS \
and NEXT page images only as context to resolve broken words or lines across page boundaries. \
Return only the text that visually appears on the CURRENT page. The document is in {language}. \
Preserve original language, accents, and punctuation; do not summarize or invent content.";

pub const PREVIOUS_PAGE_LABEL: &str = "=== PREVIOUS PAGE (context only) ===";
pub const CURRENT_PAGE_LABEL: &str = "=== CURRENT PAGE (to transcribe) ===";
pub const NEXT_PAGE_LABEL: &str = "=== NEXT PAGE (context only) ===";

/// Cleanup system prompt for the configured language code.
pub fn cleanup_system_prompt(language: &str) -> String {
    CLEANUP_SYSTEM_PROMPT.replace("{language}", &language_name(language))
}

/// LLM OCR instruction for the configured language code.
pub fn ocr_instruction(language: &str) -> String {
    OCR_INSTRUCTION.replace("{language}", &language_name(language))
}
