use std::env;
use std::sync::OnceLock;

static DATAOPS_STRICT_SPLIT: OnceLock<bool> = OnceLock::new();

fn parse_bool(value: &str) -> bool {
    let normalized = value.trim().to_ascii_lowercase();
    matches!(normalized.as_str(), "1" | "true" | "yes" | "on")
}

/// Returns `true` when `DATAOPS_STRICT_SPLIT` asks for split overflow to be an error.
pub(crate) fn strict_split_enabled() -> bool {
    *DATAOPS_STRICT_SPLIT.get_or_init(|| match env::var("DATAOPS_STRICT_SPLIT") {
        Ok(value) if !value.trim().is_empty() => parse_bool(&value),
        _ => false,
    })
}
