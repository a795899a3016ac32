// SPDX-FileCopyrightText: 2026 Recado Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Heuristic reply intent classification.
//!
//! Maps free-text inbound replies to a coarse intent using small keyword
//! sets in the marketplace's working language (Spanish). No network, no
//! state, no latency; fully table-testable.

use recado_core::types::{Classification, Intent};

/// Decline keywords. Checked before confirm keywords: a reply like
/// "no confirmo" reads as a refusal, not a confirmation.
///
/// Entries with spaces match as substrings of the normalized text; single
/// words match whole tokens only.
const DECLINE_KEYWORDS: &[&str] = &[
    "no gracias",
    "no quiero",
    "no me interesa",
    "no puedo",
    "ya no",
    "no",
    "cancelar",
    "cancela",
    "cancelo",
    "cancelado",
    "rechazo",
    "imposible",
];

/// Confirm keywords.
const CONFIRM_KEYWORDS: &[&str] = &[
    "de acuerdo",
    "por supuesto",
    "esta bien",
    "si",
    "confirmo",
    "confirmar",
    "confirmado",
    "acepto",
    "dale",
    "ok",
    "okay",
    "listo",
    "perfecto",
    "claro",
];

/// Classify an inbound reply body into a coarse intent.
///
/// Normalization: trim, lowercase, strip Spanish accents. Returns the
/// matched keyword for the interaction audit trail.
pub fn classify(body: &str) -> Classification {
    let normalized = normalize(body);
    let tokens: Vec<&str> = normalized
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();

    for (keywords, intent) in [
        (DECLINE_KEYWORDS, Intent::Decline),
        (CONFIRM_KEYWORDS, Intent::Confirm),
    ] {
        for keyword in keywords {
            if matches_keyword(&normalized, &tokens, keyword) {
                return Classification {
                    intent,
                    matched: Some((*keyword).to_string()),
                };
            }
        }
    }

    Classification {
        intent: Intent::Unknown,
        matched: None,
    }
}

fn matches_keyword(normalized: &str, tokens: &[&str], keyword: &str) -> bool {
    if keyword.contains(' ') {
        normalized.contains(keyword)
    } else {
        tokens.iter().any(|t| *t == keyword)
    }
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase().chars().map(strip_accent).collect()
}

fn strip_accent(c: char) -> char {
    match c {
        'á' | 'à' | 'ä' | 'â' => 'a',
        'é' | 'è' | 'ë' | 'ê' => 'e',
        'í' | 'ì' | 'ï' | 'î' => 'i',
        'ó' | 'ò' | 'ö' | 'ô' => 'o',
        'ú' | 'ù' | 'ü' | 'û' => 'u',
        'ñ' => 'n',
        _ => c,
    }
}
