//! Language codes: ISO 639-1 as configured, mapped to what each consumer needs.
//!
//! tesseract wants its own three-letter pack names (`spa`, `deu`, …) and the
//! cleanup prompt reads better with an English language name. Unknown codes
//! pass through unchanged so a caller can hand tesseract a pack name directly
//! (e.g. `chi_sim`).

const LANGUAGES: &[(&str, &str, &str)] = &[
    ("ar", "ara", "Arabic"),
    ("ca", "cat", "Catalan"),
    ("cs", "ces", "Czech"),
    ("da", "dan", "Danish"),
    ("de", "deu", "German"),
    ("el", "ell", "Greek"),
    ("en", "eng", "English"),
    ("es", "spa", "Spanish"),
    ("fi", "fin", "Finnish"),
    ("fr", "fra", "French"),
    ("he", "heb", "Hebrew"),
    ("hi", "hin", "Hindi"),
    ("hu", "hun", "Hungarian"),
    ("it", "ita", "Italian"),
    ("ja", "jpn", "Japanese"),
    ("ko", "kor", "Korean"),
    ("nl", "nld", "Dutch"),
    ("no", "nor", "Norwegian"),
    ("pl", "pol", "Polish"),
    ("pt", "por", "Portuguese"),
    ("ro", "ron", "Romanian"),
    ("ru", "rus", "Russian"),
    ("sv", "swe", "Swedish"),
    ("tr", "tur", "Turkish"),
    ("uk", "ukr", "Ukrainian"),
    ("zh", "chi_sim", "Chinese"),
];

fn lookup(code: &str) -> Option<&'static (&'static str, &'static str, &'static str)> {
    let code = code.trim().to_lowercase();
    LANGUAGES.iter().find(|(iso, tess, _)| *iso == code || *tess == code)
}

/// tesseract language pack for an ISO 639-1 code.
pub fn tesseract_language(code: &str) -> String {
    lookup(code)
        .map(|(_, tess, _)| (*tess).to_string())
        .unwrap_or_else(|| code.trim().to_string())
}

/// English name of the language, for prompts.
pub fn language_name(code: &str) -> String {
    lookup(code)
        .map(|(_, _, name)| (*name).to_string())
        .unwrap_or_else(|| format!("the language with code \"{}\"", code.trim()))
}
