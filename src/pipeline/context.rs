//! Deterministic context assembly from the embedded knowledge base.
//!
//! The example selection is a hand-curated, fixed-order map rather than any
//! kind of retrieval. The whole knowledge base fits in a generation prompt,
//! and a fixed map means you know exactly what the model saw. Extend the
//! map when a category is added; do not replace it with embedding search
//! until the knowledge base outgrows a single prompt.

use std::fmt::Write as _;

use super::task::{TaskCategory, TaskSpecification};

/// API reference documents, always included in this order.
const API_REFERENCE: [(&str, &str); 5] = [
    ("mdp_rewards.md", include_str!("../../knowledge/api_reference/mdp_rewards.md")),
    ("mdp_observations.md", include_str!("../../knowledge/api_reference/mdp_observations.md")),
    ("mdp_actions.md", include_str!("../../knowledge/api_reference/mdp_actions.md")),
    ("mdp_terminations.md", include_str!("../../knowledge/api_reference/mdp_terminations.md")),
    ("mdp_events.md", include_str!("../../knowledge/api_reference/mdp_events.md")),
];

/// Subject catalog, always included after the API reference.
const SUBJECT_CATALOG: &str = include_str!("../../knowledge/robots.json");

/// Reward-engineering guidance, always included after the catalog.
const REWARD_PATTERNS: &str = include_str!("../../knowledge/reward_patterns.md");

const CARTPOLE: (&str, &str) =
    ("cartpole_env_cfg.py", include_str!("../../knowledge/examples/cartpole_env_cfg.py"));
const REACH_BASE: (&str, &str) =
    ("reach_env_cfg_base.py", include_str!("../../knowledge/examples/reach_env_cfg_base.py"));
const FRANKA_REACH: (&str, &str) =
    ("franka_reach_env_cfg.py", include_str!("../../knowledge/examples/franka_reach_env_cfg.py"));
const FRANKA_REACH_JOINT_POS: (&str, &str) = (
    "franka_reach_joint_pos_env_cfg.py",
    include_str!("../../knowledge/examples/franka_reach_joint_pos_env_cfg.py"),
);
const VELOCITY_BASE: (&str, &str) =
    ("velocity_env_cfg_base.py", include_str!("../../knowledge/examples/velocity_env_cfg_base.py"));
const ANYMAL_FLAT: (&str, &str) =
    ("anymal_d_flat_env_cfg.py", include_str!("../../knowledge/examples/anymal_d_flat_env_cfg.py"));
const ANYMAL_ROUGH: (&str, &str) = (
    "anymal_d_rough_env_cfg.py",
    include_str!("../../knowledge/examples/anymal_d_rough_env_cfg.py"),
);

/// Worked examples per category. The first entry is the primary pattern the
/// generator should imitate; later entries are secondary references.
#[must_use]
pub fn category_examples(category: TaskCategory) -> &'static [(&'static str, &'static str)] {
    match category {
        TaskCategory::ManipulationReach => {
            &[REACH_BASE, FRANKA_REACH, FRANKA_REACH_JOINT_POS, CARTPOLE]
        }
        TaskCategory::ClassicBalance => &[CARTPOLE, REACH_BASE, FRANKA_REACH],
        TaskCategory::LocomotionFlat => &[VELOCITY_BASE, ANYMAL_FLAT, ANYMAL_ROUGH],
        TaskCategory::LocomotionRough => &[VELOCITY_BASE, ANYMAL_ROUGH, ANYMAL_FLAT],
    }
}

/// The embedded API reference documents, in inclusion order.
///
/// Also consumed by the validator to build its symbol whitelist, so the
/// prompt and the checks can never drift apart.
#[must_use]
pub fn api_reference() -> &'static [(&'static str, &'static str)] {
    &API_REFERENCE
}

/// Assembles the grounding context for a generation prompt.
///
/// Pure function of `spec.category`: a fixed reference block (API reference,
/// subject catalog, reward guidance) followed by the category's worked
/// examples in declared order. Same category, same bytes.
#[must_use]
pub fn assemble(spec: &TaskSpecification) -> String {
    let mut context = String::new();

    context.push_str("=== ISAAC LAB API REFERENCE ===\n\n");
    for (name, body) in API_REFERENCE {
        let _ = writeln!(context, "--- {name} ---");
        context.push_str(body);
        context.push('\n');
    }

    context.push_str("=== SUBJECT CATALOG ===\n\n");
    context.push_str(SUBJECT_CATALOG);
    context.push('\n');

    context.push_str("=== REWARD ENGINEERING PATTERNS ===\n\n");
    context.push_str(REWARD_PATTERNS);
    context.push('\n');

    context.push_str("=== WORKED EXAMPLE CONFIGURATIONS ===\n");
    context.push_str(
        "Follow these patterns exactly. The first example is the primary pattern for this task.\n\n",
    );
    for (name, body) in category_examples(spec.category) {
        let _ = writeln!(context, "--- {name} ---");
        context.push_str("```python\n");
        context.push_str(body);
        context.push_str("```\n\n");
    }

    context
}
