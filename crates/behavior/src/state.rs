//! Pet behavior states.
//!
//! The sub-state is carried inside the root variant, so a (root, sub) pair
//! that does not belong together cannot be constructed.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Top-level behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RootState {
    Idle,
    Interaction,
    Working,
    Angry,
    Sleeping,
}

impl RootState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RootState::Idle => "IDLE",
            RootState::Interaction => "INTERACTION",
            RootState::Working => "WORKING",
            RootState::Angry => "ANGRY",
            RootState::Sleeping => "SLEEPING",
        }
    }

    /// Roots reachable from this one (besides itself).
    pub fn successors(&self) -> &'static [RootState] {
        use RootState::*;
        match self {
            Idle => &[Interaction, Working, Angry, Sleeping],
            Interaction => &[Idle, Angry],
            Working => &[Idle, Angry, Interaction],
            Angry => &[Idle, Interaction],
            Sleeping => &[Idle, Interaction],
        }
    }

    /// Self-transitions are always allowed.
    pub fn can_transition_to(&self, next: RootState) -> bool {
        *self == next || self.successors().contains(&next)
    }
}

impl fmt::Display for RootState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdleMood {
    Normal,
    Sleepy,
    Anxious,
    Bored,
    Excited,
    Hungry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    BeingTouched,
    Chatting,
    Playing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkKind {
    Monitoring,
    Celebrating,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningLevel {
    L1,
    L2,
    L3,
}

impl WarningLevel {
    /// 1..=3
    pub fn number(&self) -> u8 {
        match self {
            WarningLevel::L1 => 1,
            WarningLevel::L2 => 2,
            WarningLevel::L3 => 3,
        }
    }

    /// Clamps to 1..=3.
    pub fn from_number(n: u8) -> Self {
        match n {
            0 | 1 => WarningLevel::L1,
            2 => WarningLevel::L2,
            _ => WarningLevel::L3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SleepDepth {
    Light,
    Deep,
}

/// Exactly one active (root, sub) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "root", content = "sub", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PetState {
    Idle(IdleMood),
    Interaction(InteractionKind),
    Working(WorkKind),
    Angry(WarningLevel),
    Sleeping(SleepDepth),
}

impl Default for PetState {
    fn default() -> Self {
        PetState::Idle(IdleMood::Normal)
    }
}

impl PetState {
    pub fn root(&self) -> RootState {
        match self {
            PetState::Idle(_) => RootState::Idle,
            PetState::Interaction(_) => RootState::Interaction,
            PetState::Working(_) => RootState::Working,
            PetState::Angry(_) => RootState::Angry,
            PetState::Sleeping(_) => RootState::Sleeping,
        }
    }

    pub fn sub_name(&self) -> &'static str {
        match self {
            PetState::Idle(m) => match m {
                IdleMood::Normal => "normal",
                IdleMood::Sleepy => "sleepy",
                IdleMood::Anxious => "anxious",
                IdleMood::Bored => "bored",
                IdleMood::Excited => "excited",
                IdleMood::Hungry => "hungry",
            },
            PetState::Interaction(k) => match k {
                InteractionKind::BeingTouched => "being_touched",
                InteractionKind::Chatting => "chatting",
                InteractionKind::Playing => "playing",
            },
            PetState::Working(w) => match w {
                WorkKind::Monitoring => "monitoring",
                WorkKind::Celebrating => "celebrating",
            },
            PetState::Angry(l) => match l {
                WarningLevel::L1 => "warning_l1",
                WarningLevel::L2 => "warning_l2",
                WarningLevel::L3 => "warning_l3",
            },
            PetState::Sleeping(d) => match d {
                SleepDepth::Light => "light_sleep",
                SleepDepth::Deep => "deep_sleep",
            },
        }
    }

    pub fn is_sleeping(&self) -> bool {
        matches!(self, PetState::Sleeping(_))
    }
}

impl fmt::Display for PetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.root(), self.sub_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn successor_table() {
        use RootState::*;
        assert!(Idle.can_transition_to(Sleeping));
        assert!(Sleeping.can_transition_to(Interaction));
        assert!(Sleeping.can_transition_to(Idle));
        assert!(!Sleeping.can_transition_to(Working));
        assert!(!Interaction.can_transition_to(Working));
        assert!(!Angry.can_transition_to(Sleeping));
        for root in [Idle, Interaction, Working, Angry, Sleeping] {
            assert!(root.can_transition_to(root));
        }
    }

    #[test]
    fn display_shows_root_and_sub() {
        assert_eq!(PetState::Angry(WarningLevel::L2).to_string(), "ANGRY/warning_l2");
        assert_eq!(PetState::default().to_string(), "IDLE/normal");
    }

    #[test]
    fn serializes_as_root_and_sub() {
        let json = serde_json::to_string(&PetState::Sleeping(SleepDepth::Deep)).unwrap();
        assert_eq!(json, r#"{"root":"SLEEPING","sub":"deep"}"#);
        let back: PetState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, PetState::Sleeping(SleepDepth::Deep));
    }

    #[test]
    fn warning_level_clamps() {
        assert_eq!(WarningLevel::from_number(0), WarningLevel::L1);
        assert_eq!(WarningLevel::from_number(9), WarningLevel::L3);
        assert_eq!(WarningLevel::L2.number(), 2);
    }
}
