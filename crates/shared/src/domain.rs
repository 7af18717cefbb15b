use serde::{Deserialize, Serialize};

/// Interactive capabilities a question may switch off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    Tooltip,
    Highlight,
    Animation,
    Switching,
}

impl Feature {
    pub fn as_str(&self) -> &'static str {
        match self {
            Feature::Tooltip => "tooltip",
            Feature::Highlight => "highlight",
            Feature::Animation => "animation",
            Feature::Switching => "switching",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interactivity {
    pub deactivate: Vec<Feature>,
}

/// One step of a survey program. Unknown `type` tags parse into
/// `Unrecognized` so a stale program file surfaces at dispatch time instead
/// of failing the whole load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Question {
    Animation {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        interactive: Option<Interactivity>,
    },
    #[serde(rename = "3maps")]
    ThreeMaps {
        map: String,
        maps: serde_json::Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        interactive: Option<Interactivity>,
    },
    Population {
        map: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        colors: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        interactive: Option<Interactivity>,
    },
    Cartogram {
        data: String,
        map: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        interactive: Option<Interactivity>,
    },
    #[serde(other)]
    Unrecognized,
}

impl Question {
    pub fn interactive(&self) -> Option<&Interactivity> {
        match self {
            Question::Animation { interactive, .. }
            | Question::ThreeMaps { interactive, .. }
            | Question::Population { interactive, .. }
            | Question::Cartogram { interactive, .. } => interactive.as_ref(),
            Question::Unrecognized => None,
        }
    }

    /// Features the question switches off; empty when `interactive` is
    /// absent, meaning full interactivity.
    pub fn deactivations(&self) -> &[Feature] {
        self.interactive()
            .map(|interactive| interactive.deactivate.as_slice())
            .unwrap_or(&[])
    }
}

/// The active survey: the program document tagged with the name it was
/// loaded under. Replaced wholesale on every load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub name: String,
    pub questions: Vec<Question>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_question_kind() {
        let raw = r#"[
            {"type": "animation", "name": "intro"},
            {"type": "3maps", "map": "world", "maps": ["a", "b", "c"]},
            {"type": "population", "map": "world", "colors": "rainbow"},
            {"type": "cartogram", "data": "gdp", "map": "world"}
        ]"#;
        let questions: Vec<Question> = serde_json::from_str(raw).expect("parse");

        assert!(matches!(questions[0], Question::Animation { .. }));
        assert!(matches!(questions[1], Question::ThreeMaps { .. }));
        assert!(matches!(questions[2], Question::Population { .. }));
        assert!(matches!(questions[3], Question::Cartogram { .. }));
        assert!(questions.iter().all(|q| q.interactive().is_none()));
    }

    #[test]
    fn unknown_type_tags_become_unrecognized() {
        let question: Question =
            serde_json::from_str(r#"{"type": "slideshow", "name": "x"}"#).expect("parse");
        assert_eq!(question, Question::Unrecognized);
    }

    #[test]
    fn deactivations_default_to_empty() {
        let question: Question = serde_json::from_str(
            r#"{"type": "population", "map": "world",
                "interactive": {"deactivate": ["tooltip", "animation"]}}"#,
        )
        .expect("parse");
        assert_eq!(
            question.deactivations(),
            [Feature::Tooltip, Feature::Animation]
        );

        let bare: Question =
            serde_json::from_str(r#"{"type": "population", "map": "world"}"#).expect("parse");
        assert!(bare.deactivations().is_empty());
    }
}
