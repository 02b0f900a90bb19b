//! Rule-based mood classification and the palette attached to each mood.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{FeatureSet, MoodlightError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Ambient,
    Euphoric,
    Driving,
    Tense,
    Melancholic,
    Uplifting,
}

impl Mood {
    pub const ALL: [Mood; 6] = [
        Mood::Ambient,
        Mood::Euphoric,
        Mood::Driving,
        Mood::Tense,
        Mood::Melancholic,
        Mood::Uplifting,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Mood::Ambient => "ambient",
            Mood::Euphoric => "euphoric",
            Mood::Driving => "driving",
            Mood::Tense => "tense",
            Mood::Melancholic => "melancholic",
            Mood::Uplifting => "uplifting",
        }
    }

    pub fn palette(self) -> Palette {
        let (hue_degrees, saturation, lightness) = match self {
            Mood::Ambient => (200, 70, 35),
            Mood::Euphoric => (45, 90, 58),
            Mood::Driving => (14, 92, 50),
            Mood::Tense => (330, 84, 50),
            Mood::Melancholic => (245, 42, 35),
            Mood::Uplifting => (170, 78, 52),
        };
        Palette {
            hue_degrees,
            saturation,
            lightness,
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mood {
    type Err = MoodlightError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mood::ALL
            .into_iter()
            .find(|mood| mood.as_str() == s)
            .ok_or_else(|| MoodlightError::msg(format!("unknown mood `{s}`")))
    }
}

/// HSL triple, hue in degrees and saturation/lightness in percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Palette {
    pub hue_degrees: u16,
    pub saturation: u8,
    pub lightness: u8,
}

impl Palette {
    /// Hue normalised to `[0, 1)`.
    pub fn hue(&self) -> f32 {
        self.hue_degrees as f32 / 360.0
    }
}

/// Predicate over the current features and tempo estimate.
pub type MoodPredicate = fn(&FeatureSet, u32) -> bool;

/// One entry of the decision list.
#[derive(Clone, Copy)]
pub struct MoodRule {
    pub mood: Mood,
    pub predicate: MoodPredicate,
}

impl MoodRule {
    pub const fn new(mood: Mood, predicate: MoodPredicate) -> Self {
        Self { mood, predicate }
    }

    pub fn matches(&self, features: &FeatureSet, bpm: u32) -> bool {
        (self.predicate)(features, bpm)
    }
}

impl fmt::Debug for MoodRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MoodRule").field("mood", &self.mood).finish()
    }
}

/// Stock decision list. Order matters: the first matching rule wins.
pub const DEFAULT_RULES: [MoodRule; 5] = [
    MoodRule::new(Mood::Ambient, |f, _| f.energy < 0.08),
    MoodRule::new(Mood::Euphoric, |f, bpm| bpm > 138 && f.high > f.low),
    MoodRule::new(Mood::Driving, |f, bpm| f.low > 0.36 && bpm > 105),
    MoodRule::new(Mood::Tense, |f, _| f.centroid > 0.6 && f.energy > 0.2),
    MoodRule::new(Mood::Melancholic, |f, bpm| bpm < 90 && f.energy < 0.19),
];

/// Ordered decision list classifier with a fallback label.
#[derive(Debug, Clone)]
pub struct MoodClassifier {
    rules: Vec<MoodRule>,
    fallback: Mood,
}

impl Default for MoodClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_RULES.to_vec(), Mood::Uplifting)
    }
}

impl MoodClassifier {
    pub fn new(rules: Vec<MoodRule>, fallback: Mood) -> Self {
        Self { rules, fallback }
    }

    pub fn rules(&self) -> &[MoodRule] {
        &self.rules
    }

    pub fn fallback(&self) -> Mood {
        self.fallback
    }

    pub fn classify(&self, features: &FeatureSet, bpm: u32) -> Mood {
        self.rules
            .iter()
            .find(|rule| rule.matches(features, bpm))
            .map(|rule| rule.mood)
            .unwrap_or(self.fallback)
    }
}
