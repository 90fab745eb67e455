//! Distraction rules over gaze and detected objects

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::gaze::GazeDirection;

/// Pixel-space box, corners inclusive of the top-left
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

/// Object reported by the object detector for one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedObject {
    /// Class label, e.g. "cell phone"
    pub label: String,
    pub bbox: BoundingBox,
    /// Detector confidence (0-1)
    #[serde(default)]
    pub confidence: f32,
}

impl DetectedObject {
    pub fn new(label: impl Into<String>, bbox: BoundingBox) -> Self {
        Self {
            label: label.into(),
            bbox,
            confidence: 1.0,
        }
    }
}

/// Per-frame distraction verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DistractionStatus {
    Distracted,
    NotDistracted,
    Focused,
}

impl DistractionStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Distracted => "DISTRACTED",
            Self::NotDistracted => "NOT DISTRACTED",
            Self::Focused => "FOCUSED",
        }
    }
}

impl fmt::Display for DistractionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Object labels the rules look for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistractionRules {
    pub phone_label: String,
    pub notebook_label: String,
}

impl Default for DistractionRules {
    fn default() -> Self {
        Self {
            phone_label: "cell phone".to_string(),
            notebook_label: "notebook".to_string(),
        }
    }
}

/// Rule table:
///
/// | looking down | phone | notebook | status         |
/// |--------------|-------|----------|----------------|
/// | no           | -     | -        | FOCUSED        |
/// | yes          | yes   | any      | DISTRACTED     |
/// | yes          | no    | yes      | NOT DISTRACTED |
/// | yes          | no    | no       | FOCUSED        |
///
/// A separate "phone and notebook while looking down" rule is subsumed by
/// the phone row and is not encoded.
#[derive(Debug, Clone, Default)]
pub struct DistractionClassifier {
    rules: DistractionRules,
}

impl DistractionClassifier {
    pub fn new(rules: DistractionRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &DistractionRules {
        &self.rules
    }

    pub fn classify(&self, gaze: GazeDirection, objects: &[DetectedObject]) -> DistractionStatus {
        if gaze != GazeDirection::Down {
            return DistractionStatus::Focused;
        }

        let present = |label: &str| objects.iter().any(|o| o.label == label);

        if present(&self.rules.phone_label) {
            DistractionStatus::Distracted
        } else if present(&self.rules.notebook_label) {
            DistractionStatus::NotDistracted
        } else {
            DistractionStatus::Focused
        }
    }
}

/// Classify with the default labels
pub fn classify_distraction(gaze: GazeDirection, objects: &[DetectedObject]) -> DistractionStatus {
    DistractionClassifier::default().classify(gaze, objects)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn obj(label: &str) -> DetectedObject {
        DetectedObject::new(label, BoundingBox::default())
    }

    #[test]
    fn test_phone_while_looking_down_is_distracted() {
        assert_eq!(
            classify_distraction(GazeDirection::Down, &[obj("cell phone")]),
            DistractionStatus::Distracted
        );
    }

    #[test]
    fn test_notebook_while_looking_down_is_not_distracted() {
        assert_eq!(
            classify_distraction(GazeDirection::Down, &[obj("notebook")]),
            DistractionStatus::NotDistracted
        );
    }

    #[test]
    fn test_phone_takes_precedence_over_notebook() {
        for objects in [
            vec![obj("cell phone"), obj("notebook")],
            vec![obj("notebook"), obj("cell phone")],
        ] {
            assert_eq!(
                classify_distraction(GazeDirection::Down, &objects),
                DistractionStatus::Distracted
            );
        }
    }

    #[test]
    fn test_not_looking_down_is_always_focused() {
        for gaze in [
            GazeDirection::Left,
            GazeDirection::Right,
            GazeDirection::Up,
            GazeDirection::Center,
        ] {
            assert_eq!(
                classify_distraction(gaze, &[obj("cell phone")]),
                DistractionStatus::Focused
            );
        }
    }

    #[test]
    fn test_looking_down_without_objects_is_focused() {
        assert_eq!(
            classify_distraction(GazeDirection::Down, &[]),
            DistractionStatus::Focused
        );
        assert_eq!(
            classify_distraction(GazeDirection::Down, &[obj("cup"), obj("person")]),
            DistractionStatus::Focused
        );
    }

    #[test]
    fn test_labels_match_exactly() {
        assert_eq!(
            classify_distraction(GazeDirection::Down, &[obj("Cell Phone")]),
            DistractionStatus::Focused
        );
    }

    #[test]
    fn test_custom_labels() {
        let classifier = DistractionClassifier::new(DistractionRules {
            phone_label: "phone".into(),
            notebook_label: "book".into(),
        });
        assert_eq!(
            classifier.classify(GazeDirection::Down, &[obj("book")]),
            DistractionStatus::NotDistracted
        );
        assert_eq!(
            classifier.classify(GazeDirection::Down, &[obj("cell phone")]),
            DistractionStatus::Focused
        );
    }

    #[test]
    fn test_status_serializes_screaming_snake() {
        let json = serde_json::to_string(&DistractionStatus::NotDistracted).unwrap();
        assert_eq!(json, "\"NOT_DISTRACTED\"");
        assert_eq!(DistractionStatus::NotDistracted.to_string(), "NOT DISTRACTED");
    }

    fn label_strategy() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("cell phone".to_string()),
            Just("notebook".to_string()),
            Just("cup".to_string()),
            Just("laptop".to_string()),
        ]
    }

    proptest! {
        #[test]
        fn classification_is_order_independent(
            labels in proptest::collection::vec(label_strategy(), 0..6),
        ) {
            let objects: Vec<_> = labels.iter().map(|l| obj(l)).collect();
            let mut reversed = objects.clone();
            reversed.reverse();

            prop_assert_eq!(
                classify_distraction(GazeDirection::Down, &objects),
                classify_distraction(GazeDirection::Down, &reversed)
            );
        }
    }
}
