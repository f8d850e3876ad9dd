use serde::{Deserialize, Serialize};
use std::fmt;

/// Training label assigned by extremum detection.
///
/// The discriminant is the classifier output index: buy = 0, hold = 1, sell = 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Buy,
    Hold,
    Sell,
}

impl Label {
    /// All labels in class-index order.
    pub const ALL: [Label; 3] = [Label::Buy, Label::Hold, Label::Sell];

    /// Classifier output index for this label.
    pub fn class_index(&self) -> usize {
        match self {
            Label::Buy => 0,
            Label::Hold => 1,
            Label::Sell => 2,
        }
    }

    pub fn from_class_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Buy => "buy",
            Label::Hold => "hold",
            Label::Sell => "sell",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ternary trading decision for one time step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Buy,
    Sell,
    #[default]
    Hold,
}

impl Decision {
    /// Parse from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "buy" => Some(Self::Buy),
            "sell" => Some(Self::Sell),
            "hold" => Some(Self::Hold),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Buy => "buy",
            Decision::Sell => "sell",
            Decision::Hold => "hold",
        }
    }

    /// The label this decision predicts.
    pub fn as_label(&self) -> Label {
        match self {
            Decision::Buy => Label::Buy,
            Decision::Sell => Label::Sell,
            Decision::Hold => Label::Hold,
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
