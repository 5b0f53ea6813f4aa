//! Rule-based category tagging
//!
//! Items that arrive without categories are tagged by keyword: a category
//! applies when any of its phrases occurs in the text as whole words. At most
//! [`MAX_CATEGORIES`] are kept, in table order. Text matching nothing falls
//! back to [`FALLBACK_CATEGORY`], so rating feedback on it still reaches the
//! item's score through the category multiplier.

use regex::Regex;
use std::sync::LazyLock;

use crate::FALLBACK_CATEGORY;

/// Most categories assigned to one item
pub const MAX_CATEGORIES: usize = 3;

const CATEGORY_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "industrial_automation",
        &[
            "industrial", "automation", "manufacturing", "factory", "assembly",
            "production", "warehouse", "logistics", "supply chain", "industry 4.0",
        ],
    ),
    (
        "educational_robotics",
        &[
            "education", "learning", "teaching", "student", "school", "university",
            "academic", "curriculum", "stem",
        ],
    ),
    (
        "robotics_ethics",
        &[
            "ethics", "ethical", "responsible", "safety", "regulation", "policy",
            "governance", "bias", "fairness", "transparency", "accountability",
        ],
    ),
    (
        "agricultural_robotics",
        &[
            "agriculture", "farming", "crop", "harvest", "irrigation", "agtech",
            "farm", "food production", "horticulture",
        ],
    ),
    (
        "medical_robotics",
        &[
            "medical", "healthcare", "surgery", "surgical", "hospital", "patient",
            "diagnosis", "treatment", "rehabilitation", "prosthetics", "telemedicine",
        ],
    ),
    (
        "autonomous_vehicles",
        &[
            "autonomous", "self-driving", "vehicle", "car", "transportation",
            "mobility", "driverless",
        ],
    ),
    (
        "humanoid_robotics",
        &["humanoid", "human-like", "bipedal", "anthropomorphic", "android"],
    ),
    (
        "swarm_robotics",
        &["swarm", "collective", "multi-robot", "distributed", "coordination"],
    ),
    (
        "soft_robotics",
        &["soft robot", "soft robotics", "flexible", "compliant", "deformable"],
    ),
    (
        "research_robotics",
        &[
            "research", "study", "experiment", "investigation", "analysis",
            "scientific", "paper",
        ],
    ),
    (
        "consumer_robotics",
        &[
            "consumer", "home", "domestic", "personal", "household", "entertainment",
        ],
    ),
    (
        "military_robotics",
        &["military", "defense", "weapon", "combat", "surveillance"],
    ),
    (
        "space_robotics",
        &["space", "satellite", "rover", "mars", "nasa", "spacecraft"],
    ),
    (
        "underwater_robotics",
        &["underwater", "marine", "ocean", "submarine", "aquatic"],
    ),
    (
        "aerial_robotics",
        &["aerial", "drone", "drones", "uav", "quadcopter", "flying", "airborne"],
    ),
    (
        "collaborative_robotics",
        &["collaborative", "cobot", "cobots", "human-robot", "collaboration", "cooperation"],
    ),
    (
        "mobile_robotics",
        &[
            "mobile", "navigation", "localization", "mapping", "path planning", "slam",
        ],
    ),
    (
        "robotics_software",
        &[
            "software", "algorithm", "programming", "code", "framework", "library",
            "ros", "ros 2",
        ],
    ),
    (
        "robotics_hardware",
        &[
            "hardware", "sensor", "sensors", "actuator", "actuators", "motor",
            "controller", "mechanical",
        ],
    ),
    (
        "ai_robotics",
        &[
            "ai", "artificial intelligence", "machine learning", "deep learning",
            "neural network", "reinforcement learning",
        ],
    ),
];

static CATEGORY_MATCHERS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    CATEGORY_KEYWORDS
        .iter()
        .filter_map(|(category, keywords)| {
            let alternatives: Vec<String> = keywords.iter().map(|k| regex::escape(k)).collect();
            let pattern = format!(r"(?i)\b(?:{})\b", alternatives.join("|"));
            Regex::new(&pattern).ok().map(|re| (*category, re))
        })
        .collect()
});

/// Categories for `text`; never empty
pub fn categorize(text: &str) -> Vec<String> {
    let mut categories: Vec<String> = CATEGORY_MATCHERS
        .iter()
        .filter(|(_, re)| re.is_match(text))
        .map(|(category, _)| category.to_string())
        .take(MAX_CATEGORIES)
        .collect();

    if categories.is_empty() {
        categories.push(FALLBACK_CATEGORY.to_string());
    }
    categories
}
