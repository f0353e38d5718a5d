use regex::Regex;
use std::sync::OnceLock;

fn ddmmyyyy_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([0-9]{2})\.([0-9]{2})\.([0-9]{4})").unwrap())
}

/// Rewrites the first `DD.MM.YYYY` substring to `YYYY-MM-DD`.
///
/// Everything else passes through unchanged, including trailing time text.
/// There is deliberately no calendar validation: the statements are trusted
/// exports and `31.02.2021` style input is passed through reordered.
pub fn normalize_date(raw: &str) -> String {
    ddmmyyyy_re().replace(raw, "$3-$2-$1").into_owned()
}
