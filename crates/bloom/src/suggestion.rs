use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
  High,
  Medium,
  Low,
}

impl fmt::Display for Importance {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Importance::High => "high",
      Importance::Medium => "medium",
      Importance::Low => "low",
    };
    f.write_str(name)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionCategory {
  StressManagement,
  PhysicalActivity,
  Nutrition,
  Sleep,
}

impl SuggestionCategory {
  /// Every category, in the order suggestions are presented
  pub const ALL: [SuggestionCategory; 4] = [
    SuggestionCategory::StressManagement,
    SuggestionCategory::PhysicalActivity,
    SuggestionCategory::Nutrition,
    SuggestionCategory::Sleep,
  ];

  /// Response field carrying this category's advice
  pub fn field(&self) -> &'static str {
    match self {
      SuggestionCategory::StressManagement => "stress_management",
      SuggestionCategory::PhysicalActivity => "physical_activity",
      SuggestionCategory::Nutrition => "nutrition",
      SuggestionCategory::Sleep => "sleep",
    }
  }

  pub fn title(&self) -> &'static str {
    match self {
      SuggestionCategory::StressManagement => "Stress Management",
      SuggestionCategory::PhysicalActivity => "Physical Activity",
      SuggestionCategory::Nutrition => "Nutrition",
      SuggestionCategory::Sleep => "Sleep",
    }
  }

  /// Fixed tier per category, regardless of where the advice came from
  pub fn importance(&self) -> Importance {
    match self {
      SuggestionCategory::StressManagement => Importance::High,
      SuggestionCategory::PhysicalActivity => Importance::Medium,
      SuggestionCategory::Nutrition => Importance::High,
      SuggestionCategory::Sleep => Importance::Medium,
    }
  }

  fn fallback_advice(&self) -> &'static str {
    match self {
      SuggestionCategory::StressManagement => {
        "Set aside ten minutes a day for slow breathing, prenatal yoga or a quiet walk. \
         Talking through worries with your partner or care team also helps."
      }
      SuggestionCategory::PhysicalActivity => {
        "Aim for about 30 minutes of gentle activity such as walking or swimming on most days, \
         unless your provider has advised otherwise."
      }
      SuggestionCategory::Nutrition => {
        "Eat regular balanced meals with plenty of vegetables, whole grains and protein, keep \
         taking your prenatal vitamins and drink water throughout the day."
      }
      SuggestionCategory::Sleep => {
        "Try to keep a consistent bedtime, sleep on your side with a supportive pillow and wind \
         down away from screens in the hour before bed."
      }
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
  pub category: SuggestionCategory,
  pub title: String,
  pub description: String,
  pub importance: Importance,
  pub timestamp: DateTime<Utc>,
}

impl Suggestion {
  /// Title and importance are derived from the category
  pub fn new(
    category: SuggestionCategory,
    description: impl Into<String>,
    timestamp: DateTime<Utc>,
  ) -> Self {
    Self {
      category,
      title: category.title().to_string(),
      description: description.into(),
      importance: category.importance(),
      timestamp,
    }
  }
}

/// The canned four-item set used whenever synthesis yields nothing usable
pub fn fallback_suggestions(timestamp: DateTime<Utc>) -> Vec<Suggestion> {
  SuggestionCategory::ALL
    .iter()
    .map(|category| Suggestion::new(*category, category.fallback_advice(), timestamp))
    .collect()
}
