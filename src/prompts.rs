//! Prompt template rendering.
//!
//! Every backend-facing prompt is rendered here, as a named function over
//! explicit fields. The analyzer wire format and the multi-file response
//! format are both defined by these templates; keep them in sync with the
//! parser and the analyzer's record type.

use std::fmt::Write as _;

use crate::pipeline::task::{TaskCategory, TaskSpecification};

/// System instruction shared by every call.
#[must_use]
pub fn system_prompt() -> &'static str {
    "You are an expert Isaac Lab reinforcement-learning engineer. You write \
     manager-based environment configurations that run unmodified on Isaac Lab. \
     You use only documented API functions, you copy structural patterns from \
     the provided worked examples, and you never invent asset paths or reward \
     functions."
}

/// Renders the analysis prompt: closed enumerations plus the free text.
///
/// The backend is instructed to answer with a flat JSON record whose fields
/// mirror [`TaskSpecification`]'s public fields.
#[must_use]
pub fn analyze_prompt(description: &str) -> String {
    let mut prompt = String::new();

    prompt.push_str("Classify this robot-learning task request.\n\n");
    let _ = writeln!(prompt, "REQUEST: {description}\n");

    prompt.push_str("Valid categories:\n");
    for category in TaskCategory::ALL {
        let _ = writeln!(
            prompt,
            "  - {} (subject: {})",
            category.as_str(),
            category.canonical_subject().as_str()
        );
    }

    prompt.push_str(
        "\nRespond with ONLY a JSON object in exactly this shape (no markdown fences, \
         no surrounding prose):\n\
         {\n\
         \x20 \"category\": \"<one of the categories above>\",\n\
         \x20 \"subject\": \"<the category's subject>\",\n\
         \x20 \"objectives\": [\"<short phrase>\", ...],\n\
         \x20 \"constraints\": [\"<short phrase>\", ...],\n\
         \x20 \"difficulty\": \"easy|medium|hard\",\n\
         \x20 \"episode_length_s\": <seconds, omit if unsure>,\n\
         \x20 \"instance_count\": <parallel environments, omit if unsure>\n\
         }\n",
    );

    prompt
}

/// Stricter preamble prepended to the analysis prompt on its one retry.
#[must_use]
pub fn strict_record_preamble() -> &'static str {
    "Your previous response was not a valid JSON record. Respond with ONLY a \
     valid JSON object. No explanation, no markdown fences, no text before or \
     after. Just the JSON."
}

/// Renders the generation prompt from the task specification.
///
/// Asks for all three files in the `### FILE:` multi-file format the
/// response parser expects.
#[must_use]
pub fn generation_prompt(spec: &TaskSpecification, task_name: &str, approved_functions: &str) -> String {
    let mut prompt = String::new();

    prompt.push_str("Generate an Isaac Lab environment configuration for this task.\n\n");
    let _ = writeln!(prompt, "Category: {}", spec.category.as_str());
    let _ = writeln!(prompt, "Subject: {} ({})", spec.subject.as_str(), spec.subject.platform());
    let _ = writeln!(prompt, "Objectives: {}", spec.objectives.join(", "));
    if !spec.constraints.is_empty() {
        let _ = writeln!(prompt, "Constraints: {}", spec.constraints.join(", "));
    }
    let _ = writeln!(prompt, "Difficulty: {}", spec.difficulty.as_str());
    let _ = writeln!(prompt, "Episode length: {} s", spec.episode_length_s);
    let _ = writeln!(prompt, "Parallel environments: {}", spec.instance_count);

    if !approved_functions.is_empty() {
        prompt.push('\n');
        prompt.push_str(approved_functions);
        prompt.push('\n');
    }

    let _ = write!(
        prompt,
        "\nRequirements:\n\
         - The environment config class name must end in EnvCfg; include a RewardsCfg class \
           and a __post_init__ that sets decimation, episode_length_s, and sim.dt.\n\
         - Import the robot from isaaclab_assets and place it with \
           .replace(prim_path=\"{{ENV_REGEX_NS}}/Robot\"); never define the articulation inline.\n\
         - Use `import isaaclab.envs.mdp as mdp`, not a task-specific mdp module.\n\
         - Keep reward weights within the documented typical range.\n\n\
         Output each file introduced by a marker line of exactly this form:\n\
         ### FILE: {task_name}_env_cfg.py\n\
         ### FILE: __init__.py\n\
         ### FILE: train.sh\n\
         Emit the environment config first. Code only after each marker."
    );

    prompt
}

/// Renders the corrective addendum appended to the generation prompt on the
/// retry attempt.
#[must_use]
pub fn corrective_addendum(errors: &[String], whitelist_hint: Option<&str>) -> String {
    let mut addendum = String::new();

    addendum.push_str(
        "\n\nYour previous attempt failed validation. Regenerate the files and fix \
         every finding below without introducing new API calls:\n",
    );
    for error in errors {
        let _ = writeln!(addendum, "- {error}");
    }
    if let Some(hint) = whitelist_hint {
        addendum.push('\n');
        addendum.push_str(hint);
        addendum.push('\n');
    }

    addendum
}

/// Renders the explanation prompt over the final primary file.
#[must_use]
pub fn explain_prompt(description: &str, primary_file: &str) -> String {
    let mut prompt = String::new();

    let _ = write!(
        prompt,
        "A user asked for this task: {description}\n\n\
         The generated environment configuration is:\n\n\
         ```python\n{primary_file}\n```\n\n\
         Write a short markdown document explaining the reward design: what each \
         term encourages or penalizes, why the weights have their relative \
         magnitudes, and what the user might tune first. Address the user, not \
         the implementation."
    );

    prompt
}
