//! Client identity extraction from free-text project descriptions.
//!
//! Older projects carry the client name only inside the description, as a
//! `Cliente: ...` style line. Newer rows persist `client_name` directly and
//! [`resolve_client_name`] prefers that column.

use std::sync::LazyLock;

use regex::Regex;

/// Label patterns tried in order; the first match wins. Each captures the
/// rest of the line after the label.
const CLIENT_NAME_PATTERNS: &[&str] = &[
    r"(?i)Cliente:\s*([^\n]+)",
    r"(?i)Client[e]?:\s*([^\n]+)",
    r"(?i)Para:\s*([^\n]+)",
    r"(?i)Destinatário:\s*([^\n]+)",
];

static CLIENT_NAME_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    CLIENT_NAME_PATTERNS
        .iter()
        .map(|p| Regex::new(p).expect("valid regex"))
        .collect()
});

/// Extract a client name from a project description.
///
/// The captured text is trimmed and a trailing sentence period is dropped,
/// so `"Cliente: Maria Costa."` yields `"Maria Costa"`. Returns `None` when
/// no label is present or the captured text is blank.
pub fn extract_client_name(description: &str) -> Option<String> {
    CLIENT_NAME_RES.iter().find_map(|re| {
        let captured = re.captures(description)?.get(1)?.as_str();
        let name = captured.trim().trim_end_matches('.').trim_end();
        (!name.is_empty()).then(|| name.to_string())
    })
}

/// Prefer the persisted client name; fall back to parsing the description.
pub fn resolve_client_name(stored: Option<&str>, description: Option<&str>) -> Option<String> {
    match stored.map(str::trim).filter(|s| !s.is_empty()) {
        Some(name) => Some(name.to_string()),
        None => description.and_then(extract_client_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_name_up_to_newline() {
        assert_eq!(
            extract_client_name("Cliente: João Silva\nOutro texto").as_deref(),
            Some("João Silva")
        );
    }

    #[test]
    fn drops_trailing_period() {
        assert_eq!(
            extract_client_name("Moradia em Braga.\nCliente: Maria Costa.").as_deref(),
            Some("Maria Costa")
        );
    }

    #[test]
    fn english_label_matches() {
        assert_eq!(
            extract_client_name("Client: ACME Holdings").as_deref(),
            Some("ACME Holdings")
        );
    }

    #[test]
    fn earlier_pattern_wins_over_later_one() {
        let text = "Para: Câmara Municipal\nCliente: Construtora Norte";
        assert_eq!(
            extract_client_name(text).as_deref(),
            Some("Construtora Norte")
        );
    }

    #[test]
    fn falls_back_to_para_and_destinatario() {
        assert_eq!(
            extract_client_name("Para: Rui Alves").as_deref(),
            Some("Rui Alves")
        );
        assert_eq!(
            extract_client_name("Destinatário:   Ana Lopes  ").as_deref(),
            Some("Ana Lopes")
        );
    }

    #[test]
    fn label_matching_is_case_insensitive() {
        assert_eq!(
            extract_client_name("cliente: Pedro Nunes").as_deref(),
            Some("Pedro Nunes")
        );
    }

    #[test]
    fn no_label_yields_none() {
        assert!(extract_client_name("Remodelação completa de cozinha").is_none());
        assert!(extract_client_name("Obra sem dados. Cliente:   ").is_none());
    }

    #[test]
    fn stored_name_takes_precedence() {
        assert_eq!(
            resolve_client_name(Some("Grupo Sousa"), Some("Cliente: Outro")).as_deref(),
            Some("Grupo Sousa")
        );
    }

    #[test]
    fn blank_stored_name_falls_back_to_description() {
        assert_eq!(
            resolve_client_name(Some("  "), Some("Cliente: Outro")).as_deref(),
            Some("Outro")
        );
        assert!(resolve_client_name(None, None).is_none());
    }
}
