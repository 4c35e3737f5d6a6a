//! Keyword heuristics over German coaching conversations.
//!
//! Both functions lower-case `a + " " + b` and do plain substring lookups
//! against fixed keyword lists. The lists and the tie-break order are part of
//! the observable behaviour; changing them changes how the coach adapts tone.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Level D: spiritual language, self-awareness, integration.
pub const LEVEL_D_KEYWORDS: &[&str] = &[
    "bewusstsein", "schwingung", "frequenz", "manifestation", "schöpfer",
    "einheit", "präsenz", "achtsamkeit", "transformation", "integration",
    "schatten", "licht", "energie", "spirituell", "erwachen",
];

/// Level C: growth mindset, self-reflection, patterns.
pub const LEVEL_C_KEYWORDS: &[&str] = &[
    "entwicklung", "wachstum", "muster", "reflektion", "erkenntnis",
    "veränderung", "prozess", "weg", "reise", "lernen", "verstehen",
];

/// Level B: questioning, seeking, opening.
pub const LEVEL_B_KEYWORDS: &[&str] = &[
    "frage", "suche", "warum", "sinn", "zweck", "richtung", "orientierung",
    "unsicher", "zweifel", "öffnung", "neugierig", "interesse",
];

/// Level A: problems, stuck, reactive.
pub const LEVEL_A_KEYWORDS: &[&str] = &[
    "problem", "schwierigkeit", "stuck", "fest", "hilfe", "nicht weiter",
    "verzweifelt", "müde", "erschöpft", "überwältigt", "stress",
];

pub const EMOTION_KEYWORDS: &[&str] = &[
    "freude", "glück", "liebe", "dankbarkeit", "frieden",
    "angst", "sorge", "trauer", "wut", "frustration",
    "unsicherheit", "zweifel", "verwirrung", "stress",
    "hoffnung", "vertrauen", "mut", "klarheit", "ruhe",
];

pub const TOPIC_KEYWORDS: &[&str] = &[
    "beruf", "arbeit", "karriere", "beziehung", "partnerschaft",
    "familie", "gesundheit", "geld", "finanzen", "spiritualität",
    "persönlichkeit", "selbstwert", "ziele", "träume", "zukunft",
];

/// Coarse consciousness tag used to modulate tone and depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ConsciousnessLevel {
    A,
    B,
    C,
    D,
}

impl ConsciousnessLevel {
    /// German display label.
    pub fn label(self) -> &'static str {
        match self {
            Self::A => "Suchend",
            Self::B => "Erwachend",
            Self::C => "Auf dem Weg",
            Self::D => "Hochbewusst",
        }
    }

    /// Progress percentage shown next to the label.
    pub fn progress(self) -> u8 {
        match self {
            Self::A => 25,
            Self::B => 50,
            Self::C => 75,
            Self::D => 100,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
        }
    }
}

impl fmt::Display for ConsciousnessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConsciousnessLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(Self::A),
            "B" => Ok(Self::B),
            "C" => Ok(Self::C),
            "D" => Ok(Self::D),
            other => Err(format!("unknown consciousness level: {other}")),
        }
    }
}

/// Emotion and topic tags found in one exchange.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insights {
    pub emotions: Vec<String>,
    pub topics: Vec<String>,
    pub patterns: Vec<String>,
    pub goals: Vec<String>,
}

fn combined_lowercase(a: &str, b: &str) -> String {
    format!("{} {}", a.to_lowercase(), b.to_lowercase())
}

fn count_keywords(keywords: &[&str], text: &str) -> usize {
    keywords.iter().filter(|keyword| text.contains(*keyword)).count()
}

fn matching_keywords(keywords: &[&str], text: &str) -> Vec<String> {
    keywords
        .iter()
        .filter(|keyword| text.contains(*keyword))
        .map(|keyword| keyword.to_string())
        .collect()
}

/// Classify `message` (plus optional surrounding context) into A..D.
///
/// Each level scores the number of its keywords present as substrings. The
/// highest score wins; ties go to the higher level; no hits at all yields B.
pub fn detect_consciousness_level(message: &str, context: Option<&str>) -> ConsciousnessLevel {
    let text = combined_lowercase(message, context.unwrap_or(""));

    // Highest level first so ties resolve upwards.
    let scores = [
        (ConsciousnessLevel::D, count_keywords(LEVEL_D_KEYWORDS, &text)),
        (ConsciousnessLevel::C, count_keywords(LEVEL_C_KEYWORDS, &text)),
        (ConsciousnessLevel::B, count_keywords(LEVEL_B_KEYWORDS, &text)),
        (ConsciousnessLevel::A, count_keywords(LEVEL_A_KEYWORDS, &text)),
    ];

    let max_score = scores.iter().map(|(_, score)| *score).max().unwrap_or(0);
    if max_score == 0 {
        return ConsciousnessLevel::B;
    }

    scores
        .iter()
        .find(|(_, score)| *score == max_score)
        .map(|(level, _)| *level)
        .unwrap_or(ConsciousnessLevel::B)
}

/// Tag the emotions and topics mentioned in one user/assistant exchange.
pub fn extract_insights(user_message: &str, assistant_response: &str) -> Insights {
    let text = combined_lowercase(user_message, assistant_response);

    Insights {
        emotions: matching_keywords(EMOTION_KEYWORDS, &text),
        topics: matching_keywords(TOPIC_KEYWORDS, &text),
        patterns: Vec::new(),
        goals: Vec::new(),
    }
}
