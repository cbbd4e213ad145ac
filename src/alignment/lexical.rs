//! Keyword-concept similarity that needs no model.
//!
//! Always available, so it doubles as the fallback whenever a richer
//! similarity backend fails.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::AlignmentError;

const BUILTIN_CONCEPTS: &[(&str, &[&str])] = &[
    ("yes", &["是", "对的", "好的"]),
    ("no", &["不", "不是", "不要"]),
    ("look", &["看", "瞧", "看看"]),
    ("ship", &["船", "帆船"]),
    ("big", &["大", "巨大"]),
    ("why", &["为什么", "為何"]),
    ("because", &["因为", "由於"]),
    ("magic", &["神", "魔", "魔法"]),
    ("lamp", &["燈", "灯"]),
    ("hello", &["你好", "您好"]),
    ("thank you", &["谢谢", "感谢"]),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Concept {
    /// Lowercase source-language key, matched as a substring.
    pub key: String,
    /// Target-language surface forms, matched verbatim.
    pub surface_forms: Vec<String>,
}

/// Canonical concept keys mapped to their target-language surface forms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConceptTable {
    concepts: Vec<Concept>,
}

impl ConceptTable {
    pub fn new(concepts: Vec<Concept>) -> Self {
        let concepts = concepts
            .into_iter()
            .filter_map(|concept| {
                let key = concept.key.trim().to_lowercase();
                let surface_forms: Vec<String> = concept
                    .surface_forms
                    .into_iter()
                    .filter(|form| !form.trim().is_empty())
                    .collect();
                if key.is_empty() || surface_forms.is_empty() {
                    return None;
                }
                Some(Concept { key, surface_forms })
            })
            .collect();
        Self { concepts }
    }

    /// Builds a table from a JSON object of `key -> [surface forms]`.
    pub fn from_json(json: &str) -> Result<Self, AlignmentError> {
        let raw: BTreeMap<String, Vec<String>> =
            serde_json::from_str(json).map_err(|e| AlignmentError::json("parse concept table", e))?;
        let table = Self::new(
            raw.into_iter()
                .map(|(key, surface_forms)| Concept { key, surface_forms })
                .collect(),
        );
        if table.is_empty() {
            return Err(AlignmentError::invalid_input(
                "concept table has no usable entries",
            ));
        }
        Ok(table)
    }

    pub fn load(path: &Path) -> Result<Self, AlignmentError> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| AlignmentError::io("read concept table", e))?;
        Self::from_json(&data)
    }

    pub fn concepts(&self) -> &[Concept] {
        &self.concepts
    }

    pub fn len(&self) -> usize {
        self.concepts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty()
    }

    /// Fraction of applicable concepts present on both sides.
    ///
    /// `source_lower` must already be lowercased. Returns 0 when no concept
    /// applies: no evidence is no signal.
    pub fn score(&self, source_lower: &str, target: &str) -> f32 {
        let mut applicable = 0usize;
        let mut matches = 0usize;
        for concept in &self.concepts {
            let has_src = source_lower.contains(concept.key.as_str());
            let has_tgt = concept
                .surface_forms
                .iter()
                .any(|form| target.contains(form.as_str()));
            if has_src || has_tgt {
                applicable += 1;
                if has_src && has_tgt {
                    matches += 1;
                }
            }
        }
        matches as f32 / applicable.max(1) as f32
    }
}

impl Default for ConceptTable {
    fn default() -> Self {
        Self::new(
            BUILTIN_CONCEPTS
                .iter()
                .map(|(key, forms)| Concept {
                    key: (*key).to_string(),
                    surface_forms: forms.iter().map(|f| (*f).to_string()).collect(),
                })
                .collect(),
        )
    }
}

fn caption_noise() -> &'static [Regex; 3] {
    static NOISE: OnceLock<[Regex; 3]> = OnceLock::new();
    NOISE.get_or_init(|| {
        [
            // Leading speaker label, e.g. "OMAR: ".
            Regex::new(r"^[A-Z][A-Z0-9_-]*:\s*").expect("speaker pattern is valid"),
            // Sound descriptions, e.g. "(laughs)" or "[music]".
            Regex::new(r"\([^)]*\)|\[[^\]]*\]").expect("sound pattern is valid"),
            Regex::new(r"[♪♫]").expect("music pattern is valid"),
        ]
    })
}

/// Strips speaker labels, sound descriptions and music notes, then
/// collapses whitespace.
pub fn clean_text(text: &str) -> String {
    let [speaker, sounds, music] = caption_noise();
    let text = speaker.replace(text.trim(), "");
    let text = sounds.replace_all(&text, " ");
    let text = music.replace_all(&text, " ");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lexical similarity of two cleaned texts.
///
/// Texts equal after lowercasing count as a full match; otherwise the
/// concept table decides.
pub fn lexical_score(table: &ConceptTable, source: &str, target: &str) -> f32 {
    let source_lower = source.to_lowercase();
    if source_lower.is_empty() || target.is_empty() {
        return 0.0;
    }
    if source_lower == target.to_lowercase() {
        return 1.0;
    }
    table.score(&source_lower, target)
}
