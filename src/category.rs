use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Yoga,
    Spin,
    Strength,
    Cardio,
    Aqua,
    Dance,
    MindBody,
    #[default]
    General,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Yoga => "yoga",
            Category::Spin => "spin",
            Category::Strength => "strength",
            Category::Cardio => "cardio",
            Category::Aqua => "aqua",
            Category::Dance => "dance",
            Category::MindBody => "mind_body",
            Category::General => "general",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rules are checked top to bottom; the first hit decides the category, so
/// "Yoga for Cyclists" is yoga and "Water Aerobics" is cardio.
static RULES: Lazy<Vec<(Category, Regex)>> = Lazy::new(|| {
    [
        (Category::Yoga, r"yoga"),
        (Category::Spin, r"spin|cycling|cycle"),
        (Category::Strength, r"strength|weights?|lift|lifting|barbell"),
        (Category::Cardio, r"cardio|hiit|bootcamp|boot camp|aerobics?"),
        (Category::Aqua, r"swim|aqua|pool|water"),
        (Category::Dance, r"dance|zumba|barre"),
        (Category::MindBody, r"pilates|tai chi|meditation|stretch"),
    ]
    .into_iter()
    .map(|(category, words)| {
        let pattern = format!(r"(?i)\b(?:{words})\b");
        (category, Regex::new(&pattern).expect("category regex compiles"))
    })
    .collect()
});

pub fn classify(name: &str) -> Category {
    RULES
        .iter()
        .find(|(_, pattern)| pattern.is_match(name))
        .map(|(category, _)| *category)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_known_keywords() {
        assert_eq!(classify("Morning Yoga Flow"), Category::Yoga);
        assert_eq!(classify("Spin Express"), Category::Spin);
        assert_eq!(classify("Indoor Cycling"), Category::Spin);
        assert_eq!(classify("Barbell Strength"), Category::Strength);
        assert_eq!(classify("HIIT 45"), Category::Cardio);
        assert_eq!(classify("Lap Swim"), Category::Aqua);
        assert_eq!(classify("Zumba Gold"), Category::Dance);
        assert_eq!(classify("Tai Chi for Beginners"), Category::MindBody);
    }

    #[test]
    fn test_classify_is_case_insensitive() {
        assert_eq!(classify("YOGA"), Category::Yoga);
        assert_eq!(classify("pilates mat"), Category::MindBody);
    }

    #[test]
    fn test_classify_requires_whole_words() {
        assert_eq!(classify("Spinach Cooking Demo"), Category::General);
        assert_eq!(classify("Poolside Party"), Category::General);
    }

    #[test]
    fn test_classify_first_rule_wins() {
        assert_eq!(classify("Yoga for Cyclists"), Category::Yoga);
        assert_eq!(classify("Spin & Strength"), Category::Spin);
        assert_eq!(classify("Water Aerobics"), Category::Cardio);
    }

    #[test]
    fn test_classify_falls_back_to_general() {
        assert_eq!(classify("Book Club"), Category::General);
        assert_eq!(classify(""), Category::General);
    }

    #[test]
    fn test_category_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&Category::MindBody).unwrap(),
            r#""mind_body""#
        );
        assert_eq!(Category::MindBody.to_string(), "mind_body");
    }
}
