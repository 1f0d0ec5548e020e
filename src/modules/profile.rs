use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The nine alignments an agent can be asked to role-play.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Alignment {
    #[serde(rename = "Lawful Good")]
    LawfulGood,
    #[serde(rename = "Lawful Neutral")]
    LawfulNeutral,
    #[serde(rename = "Lawful Evil")]
    LawfulEvil,
    #[serde(rename = "Neutral Good")]
    NeutralGood,
    #[serde(rename = "True Neutral")]
    TrueNeutral,
    #[serde(rename = "Neutral Evil")]
    NeutralEvil,
    #[serde(rename = "Chaotic Good")]
    ChaoticGood,
    #[serde(rename = "Chaotic Neutral")]
    ChaoticNeutral,
    #[serde(rename = "Chaotic Evil")]
    ChaoticEvil,
}

impl Alignment {
    pub const ALL: [Alignment; 9] = [
        Alignment::LawfulGood,
        Alignment::LawfulNeutral,
        Alignment::LawfulEvil,
        Alignment::NeutralGood,
        Alignment::TrueNeutral,
        Alignment::NeutralEvil,
        Alignment::ChaoticGood,
        Alignment::ChaoticNeutral,
        Alignment::ChaoticEvil,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Alignment::LawfulGood => "Lawful Good",
            Alignment::LawfulNeutral => "Lawful Neutral",
            Alignment::LawfulEvil => "Lawful Evil",
            Alignment::NeutralGood => "Neutral Good",
            Alignment::TrueNeutral => "True Neutral",
            Alignment::NeutralEvil => "Neutral Evil",
            Alignment::ChaoticGood => "Chaotic Good",
            Alignment::ChaoticNeutral => "Chaotic Neutral",
            Alignment::ChaoticEvil => "Chaotic Evil",
        }
    }

    pub const fn short_key(self) -> &'static str {
        match self {
            Alignment::LawfulGood => "LG",
            Alignment::LawfulNeutral => "LN",
            Alignment::LawfulEvil => "LE",
            Alignment::NeutralGood => "NG",
            Alignment::TrueNeutral => "TN",
            Alignment::NeutralEvil => "NE",
            Alignment::ChaoticGood => "CG",
            Alignment::ChaoticNeutral => "CN",
            Alignment::ChaoticEvil => "CE",
        }
    }
}

impl fmt::Display for Alignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Alignment {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        for alignment in Alignment::ALL {
            if trimmed.eq_ignore_ascii_case(alignment.name())
                || trimmed.eq_ignore_ascii_case(alignment.short_key())
            {
                return Ok(alignment);
            }
        }
        Err(format!(
            "unknown alignment '{}'; use a full name (e.g. 'Lawful Good') or short key (e.g. LG)",
            input
        ))
    }
}

/// The four motivations an agent can be asked to role-play.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Motivation {
    Wealth,
    Safety,
    Wanderlust,
    Speed,
}

impl Motivation {
    pub const ALL: [Motivation; 4] = [
        Motivation::Wealth,
        Motivation::Safety,
        Motivation::Wanderlust,
        Motivation::Speed,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Motivation::Wealth => "Wealth",
            Motivation::Safety => "Safety",
            Motivation::Wanderlust => "Wanderlust",
            Motivation::Speed => "Speed",
        }
    }

    /// Glossary definition injected into the agent's system prompt.
    pub const fn definition(self) -> &'static str {
        match self {
            Motivation::Wealth => {
                "If it has value, you must have it. You have no qualms about risking life and limb in pursuing riches."
            }
            Motivation::Safety => {
                "Your personal safety is your concern. Items that protect and ensure your safety are of the utmost importance."
            }
            Motivation::Wanderlust => {
                "You want to explore as much as possible. Items that extend your time or allow you to wander further are important to you."
            }
            Motivation::Speed => {
                "Efficiency is key. Items that help reduce turns and make navigation easier are what you want and must have."
            }
        }
    }
}

impl fmt::Display for Motivation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Motivation {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        for motivation in Motivation::ALL {
            if trimmed.eq_ignore_ascii_case(motivation.name()) {
                return Ok(motivation);
            }
        }
        Err(format!(
            "unknown motivation '{}'; use Wealth, Safety, Wanderlust, or Speed",
            input
        ))
    }
}

/// The behavioral axis a run is scored against. At least one of the two
/// components is always present.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub alignment: Option<Alignment>,
    pub motivation: Option<Motivation>,
}

impl Profile {
    pub const fn alignment_only(alignment: Alignment) -> Self {
        Self {
            alignment: Some(alignment),
            motivation: None,
        }
    }

    pub const fn motivation_only(motivation: Motivation) -> Self {
        Self {
            alignment: None,
            motivation: Some(motivation),
        }
    }

    pub const fn full(alignment: Alignment, motivation: Motivation) -> Self {
        Self {
            alignment: Some(alignment),
            motivation: Some(motivation),
        }
    }

    /// Short run key, e.g. "LG-Wealth", "Lawful Good", or "Wealth".
    pub fn key(&self) -> String {
        match (self.alignment, self.motivation) {
            (Some(a), Some(m)) => format!("{}-{}", a.short_key(), m.name()),
            (Some(a), None) => a.name().to_string(),
            (None, Some(m)) => m.name().to_string(),
            (None, None) => "Unassigned".to_string(),
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

impl FromStr for Profile {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        if let Some((align, motive)) = trimmed.split_once('-') {
            let alignment = align.parse::<Alignment>()?;
            let motivation = motive.parse::<Motivation>()?;
            return Ok(Profile::full(alignment, motivation));
        }
        if let Ok(alignment) = trimmed.parse::<Alignment>() {
            return Ok(Profile::alignment_only(alignment));
        }
        if let Ok(motivation) = trimmed.parse::<Motivation>() {
            return Ok(Profile::motivation_only(motivation));
        }
        Err(format!(
            "unknown profile '{}'; use an alignment, a motivation, or a combined key like LG-Wealth",
            input
        ))
    }
}

/// Expand a named alignment group ("lawful", "good", "neutrals", ...) into
/// its member alignments.
pub fn alignment_group(name: &str) -> Option<Vec<Alignment>> {
    let members: &[Alignment] = match name.to_lowercase().as_str() {
        "lawful" => &[
            Alignment::LawfulGood,
            Alignment::LawfulNeutral,
            Alignment::LawfulEvil,
        ],
        "neutral" => &[
            Alignment::NeutralGood,
            Alignment::TrueNeutral,
            Alignment::NeutralEvil,
        ],
        "chaotic" => &[
            Alignment::ChaoticGood,
            Alignment::ChaoticNeutral,
            Alignment::ChaoticEvil,
        ],
        "good" => &[
            Alignment::LawfulGood,
            Alignment::NeutralGood,
            Alignment::ChaoticGood,
        ],
        "neutrals" => &[
            Alignment::LawfulNeutral,
            Alignment::TrueNeutral,
            Alignment::ChaoticNeutral,
        ],
        "evil" => &[
            Alignment::LawfulEvil,
            Alignment::NeutralEvil,
            Alignment::ChaoticEvil,
        ],
        _ => return None,
    };
    Some(members.to_vec())
}

/// Profile set for a batch: every alignment, every motivation, or every
/// alignment-motivation pair, optionally restricted to a named group.
pub fn batch_profiles(
    mode: BatchMode,
    group: Option<&str>,
) -> Result<Vec<Profile>, String> {
    let alignments = match group {
        Some(name) => alignment_group(name)
            .ok_or_else(|| format!("unknown alignment group '{}'", name))?,
        None => Alignment::ALL.to_vec(),
    };

    let profiles = match mode {
        BatchMode::Alignment => alignments
            .into_iter()
            .map(Profile::alignment_only)
            .collect(),
        BatchMode::Motivation => {
            if group.is_some() {
                return Err("motivation batches do not take an alignment group".into());
            }
            Motivation::ALL.into_iter().map(Profile::motivation_only).collect()
        }
        BatchMode::Combined => {
            let mut set = Vec::new();
            for alignment in alignments {
                for motivation in Motivation::ALL {
                    set.push(Profile::full(alignment, motivation));
                }
            }
            set
        }
    };
    Ok(profiles)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BatchMode {
    Alignment,
    Motivation,
    Combined,
}

impl FromStr for BatchMode {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_lowercase().as_str() {
            "alignment" | "a" => Ok(BatchMode::Alignment),
            "motivation" | "l" => Ok(BatchMode::Motivation),
            "combined" | "b" => Ok(BatchMode::Combined),
            other => Err(format!(
                "unknown batch mode '{}'; use alignment, motivation, or combined",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_short_and_full_keys() {
        assert_eq!("LG".parse::<Alignment>().unwrap(), Alignment::LawfulGood);
        assert_eq!(
            "Chaotic Neutral".parse::<Alignment>().unwrap(),
            Alignment::ChaoticNeutral
        );
        assert_eq!(
            "TN-Speed".parse::<Profile>().unwrap(),
            Profile::full(Alignment::TrueNeutral, Motivation::Speed)
        );
        assert_eq!(
            "Wanderlust".parse::<Profile>().unwrap(),
            Profile::motivation_only(Motivation::Wanderlust)
        );
        assert!("LG-Glory".parse::<Profile>().is_err());
    }

    #[test]
    fn profile_key_round_trips() {
        let profile = Profile::full(Alignment::NeutralEvil, Motivation::Safety);
        assert_eq!(profile.key(), "NE-Safety");
        assert_eq!(profile.key().parse::<Profile>().unwrap(), profile);
    }

    #[test]
    fn combined_batch_covers_all_pairs() {
        let profiles = batch_profiles(BatchMode::Combined, None).unwrap();
        assert_eq!(profiles.len(), 36);
        let lawful = batch_profiles(BatchMode::Combined, Some("lawful")).unwrap();
        assert_eq!(lawful.len(), 12);
        assert!(lawful.iter().all(|p| p.alignment.is_some() && p.motivation.is_some()));
    }

    #[test]
    fn unknown_group_is_rejected() {
        assert!(batch_profiles(BatchMode::Alignment, Some("heroic")).is_err());
    }
}
