//! Task specification types and the category/subject compatibility table.
//!
//! Categories and subjects are closed sets. The compatibility mapping lives
//! here as explicit functions so downstream context selection never sees a
//! pair the knowledge base cannot serve.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Longest episode the analyzer may request, in seconds.
pub const MAX_EPISODE_LENGTH_S: f64 = 20.0;

/// Parallel-instance count used when the analyzer leaves it unset.
pub const DEFAULT_INSTANCE_COUNT: u32 = 4096;

/// Upper bound on the parallel-instance count.
pub const MAX_INSTANCE_COUNT: u32 = 32_768;

/// Closed set of supported task categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskCategory {
    /// End-effector reaching with a fixed-base manipulator.
    #[serde(rename = "manipulation-reach")]
    ManipulationReach,
    /// Pole balancing on a sliding cart.
    #[serde(rename = "classic-balance")]
    ClassicBalance,
    /// Velocity tracking on flat ground.
    #[serde(rename = "locomotion-flat")]
    LocomotionFlat,
    /// Velocity tracking on procedurally rough terrain.
    #[serde(rename = "locomotion-rough")]
    LocomotionRough,
}

impl TaskCategory {
    /// Every category, in declaration order.
    pub const ALL: [TaskCategory; 4] = [
        TaskCategory::ManipulationReach,
        TaskCategory::ClassicBalance,
        TaskCategory::LocomotionFlat,
        TaskCategory::LocomotionRough,
    ];

    /// Wire name of this category.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TaskCategory::ManipulationReach => "manipulation-reach",
            TaskCategory::ClassicBalance => "classic-balance",
            TaskCategory::LocomotionFlat => "locomotion-flat",
            TaskCategory::LocomotionRough => "locomotion-rough",
        }
    }

    /// Short suffix used when deriving module-style task names.
    #[must_use]
    pub fn suffix(self) -> &'static str {
        match self {
            TaskCategory::ManipulationReach => "reach",
            TaskCategory::ClassicBalance => "balance",
            TaskCategory::LocomotionFlat => "flat",
            TaskCategory::LocomotionRough => "rough",
        }
    }

    /// The subject substituted when the analyzer proposes an incompatible pair.
    #[must_use]
    pub fn canonical_subject(self) -> Subject {
        match self {
            TaskCategory::ManipulationReach => Subject::ArmManipulator,
            TaskCategory::ClassicBalance => Subject::PoleCart,
            TaskCategory::LocomotionFlat | TaskCategory::LocomotionRough => Subject::Quadruped,
        }
    }

    /// Whether `subject` may be paired with this category.
    #[must_use]
    pub fn allows(self, subject: Subject) -> bool {
        self.canonical_subject() == subject
    }

    /// Default episode length in seconds for this category.
    #[must_use]
    pub fn default_episode_length(self) -> f64 {
        match self {
            TaskCategory::ManipulationReach | TaskCategory::ClassicBalance => 5.0,
            TaskCategory::LocomotionFlat | TaskCategory::LocomotionRough => 20.0,
        }
    }
}

impl fmt::Display for TaskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed set of supported subjects (robot platforms).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Subject {
    /// Fixed-base 7-DoF arm (Franka Panda).
    #[serde(rename = "arm-manipulator")]
    ArmManipulator,
    /// Cart with an unactuated pole (classic cartpole).
    #[serde(rename = "pole-cart")]
    PoleCart,
    /// Quadruped walker (ANYmal-D).
    #[serde(rename = "quadruped")]
    Quadruped,
}

impl Subject {
    /// Wire name of this subject.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Subject::ArmManipulator => "arm-manipulator",
            Subject::PoleCart => "pole-cart",
            Subject::Quadruped => "quadruped",
        }
    }

    /// Platform name used inside downstream task identifiers.
    #[must_use]
    pub fn platform(self) -> &'static str {
        match self {
            Subject::ArmManipulator => "Franka",
            Subject::PoleCart => "Cartpole",
            Subject::Quadruped => "Anymal-D",
        }
    }

    /// Platform slug used when deriving module-style task names.
    #[must_use]
    pub fn module_slug(self) -> &'static str {
        match self {
            Subject::ArmManipulator => "franka_panda",
            Subject::PoleCart => "cartpole",
            Subject::Quadruped => "anymal_d",
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Subject {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "arm-manipulator" => Ok(Subject::ArmManipulator),
            "pole-cart" => Ok(Subject::PoleCart),
            "quadruped" => Ok(Subject::Quadruped),
            other => {
                Err(format!("unknown subject '{other}' (expected arm-manipulator, pole-cart, or quadruped)"))
            }
        }
    }
}

/// Requested training difficulty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    /// Generous tolerances, fewer penalty terms.
    Easy,
    /// Balanced shaping.
    #[default]
    Medium,
    /// Tight tolerances, full penalty set.
    Hard,
}

impl Difficulty {
    /// Wire name of this difficulty.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

/// The structured interpretation of a free-text request.
///
/// Immutable once produced by the analyzer; every later stage reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSpecification {
    /// Task category.
    pub category: TaskCategory,
    /// Robot platform, guaranteed compatible with `category`.
    pub subject: Subject,
    /// The original free text, preserved verbatim for later stages.
    pub description: String,
    /// What the policy should achieve (never empty).
    pub objectives: Vec<String>,
    /// Restrictions on how it may achieve it (may be empty).
    pub constraints: Vec<String>,
    /// Requested difficulty.
    pub difficulty: Difficulty,
    /// Episode length in seconds, within (0, 20].
    pub episode_length_s: f64,
    /// Parallel environment instances, within [1, 32768].
    pub instance_count: u32,
}

impl TaskSpecification {
    /// Clamps a proposed episode length into the valid range, falling back
    /// to the category default when unset or out of range.
    #[must_use]
    pub fn clamp_episode_length(raw: Option<f64>, category: TaskCategory) -> f64 {
        match raw {
            Some(length) if length > 0.0 && length <= MAX_EPISODE_LENGTH_S => length,
            _ => category.default_episode_length(),
        }
    }

    /// Clamps a proposed instance count into the valid range.
    #[must_use]
    pub fn clamp_instance_count(raw: Option<u32>) -> u32 {
        match raw {
            Some(0) | None => DEFAULT_INSTANCE_COUNT,
            Some(count) => count.min(MAX_INSTANCE_COUNT),
        }
    }
}
