//! Static validation of generated environment configuration code.
//!
//! Every check inspects the syntax tree of the primary file; nothing is ever
//! executed. Errors block acceptance and feed the retry prompt; warnings
//! ride along in the report. The symbol whitelist is built from the same
//! embedded API reference the generation prompt carries, so the two cannot
//! drift apart.

use std::cell::RefCell;
use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use tree_sitter::{Node, Parser, Tree};

use crate::pipeline::context;

/// Inclusive bounds of the documented typical reward-weight range.
const WEIGHT_RANGE: (f64, f64) = (-5.0, 2.0);

/// Marker substring required in at least one class name.
const ENV_CFG_MARKER: &str = "EnvCfg";

/// Marker substring required in at least one class name.
const REWARDS_CFG_MARKER: &str = "RewardsCfg";

/// Initialization routine the target framework's configclass machinery calls.
const POST_INIT_NAME: &str = "__post_init__";

/// Symbols that live in task-specific mdp modules rather than the core API
/// reference, but are legitimate in generated configs.
const SUPPLEMENTAL_SYMBOLS: [&str; 12] = [
    "position_command_error",
    "position_command_error_tanh",
    "orientation_command_error",
    "joint_pos_target_l2",
    "feet_air_time",
    "terrain_levels_vel",
    "modify_reward_weight",
    "randomize_rigid_body_material",
    "randomize_rigid_body_mass",
    "UniformPoseCommandCfg",
    "UniformVelocityCommandCfg",
    "NullCommandCfg",
];

/// Deterministic replacements for names the backend reliably gets wrong.
/// Applied before validation so near-misses never cost a retry.
const COMMON_CORRECTIONS: [(&str, &str); 13] = [
    ("joint_pos_l2", "joint_pos_target_l2"),
    ("joint_pos_l1", "joint_deviation_l1"),
    ("joint_vel_l2_asset", "joint_vel_l2"),
    ("action_rate_l2_norm", "action_rate_l2"),
    ("action_rate_l1", "action_rate_l2"),
    ("track_lin_vel_xy", "track_lin_vel_xy_exp"),
    ("track_ang_vel_z", "track_ang_vel_z_exp"),
    ("base_lin_vel_z_l2", "lin_vel_z_l2"),
    ("base_ang_vel_xy_l2", "ang_vel_xy_l2"),
    ("position_error_tanh", "position_command_error_tanh"),
    ("position_error", "position_command_error"),
    ("joint_pos_target_l1", "joint_pos_target_l2"),
    ("feet_air_time_biped_reward", "feet_air_time"),
];

thread_local! {
    static PYTHON_PARSER: RefCell<Parser> = RefCell::new({
        let mut parser = Parser::new();
        // A grammar mismatch would surface at parse time as a None tree.
        let _ = parser.set_language(&tree_sitter_python::LANGUAGE.into());
        parser
    });
}

/// Result of statically validating a generated primary file.
///
/// Produced fresh per attempt and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Blocking findings, in check order.
    pub errors: Vec<String>,
    /// Non-blocking findings; never prevent acceptance.
    pub warnings: Vec<String>,
    /// Auto-corrections applied before this validation pass.
    pub corrections: Vec<String>,
}

impl ValidationReport {
    /// Returns `true` when no blocking finding was recorded.
    #[must_use]
    pub fn is_acceptable(&self) -> bool {
        self.errors.is_empty()
    }
}

fn parse_python(code: &str) -> Option<Tree> {
    PYTHON_PARSER.with(|parser| parser.borrow_mut().parse(code, None))
}

/// Everything the checks need, collected in a single tree walk.
#[derive(Default)]
struct SourceFacts {
    class_names: Vec<String>,
    function_names: Vec<String>,
    import_texts: Vec<String>,
    weight_literals: Vec<f64>,
    mdp_symbols: Vec<String>,
}

fn node_text(node: Node<'_>, code: &str) -> String {
    code[node.byte_range()].to_string()
}

fn visit_nodes(root: Node<'_>, mut visit: impl FnMut(Node<'_>)) {
    let mut cursor = root.walk();
    loop {
        visit(cursor.node());

        if cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return;
            }
        }
    }
}

fn collect_facts(root: Node<'_>, code: &str) -> SourceFacts {
    let mut facts = SourceFacts::default();

    visit_nodes(root, |node| match node.kind() {
        "class_definition" => {
            if let Some(name) = node.child_by_field_name("name") {
                facts.class_names.push(node_text(name, code));
            }
        }
        "function_definition" => {
            if let Some(name) = node.child_by_field_name("name") {
                facts.function_names.push(node_text(name, code));
            }
        }
        "import_statement" | "import_from_statement" => {
            facts.import_texts.push(node_text(node, code));
        }
        "keyword_argument" => {
            let is_weight = node
                .child_by_field_name("name")
                .is_some_and(|name| node_text(name, code) == "weight");
            if is_weight {
                if let Some(value) = node.child_by_field_name("value") {
                    if let Ok(weight) = node_text(value, code).parse::<f64>() {
                        facts.weight_literals.push(weight);
                    }
                }
            }
        }
        "attribute" => {
            let object_is_mdp = node.child_by_field_name("object").is_some_and(|object| {
                object.kind() == "identifier" && node_text(object, code) == "mdp"
            });
            if object_is_mdp {
                if let Some(attribute) = node.child_by_field_name("attribute") {
                    facts.mdp_symbols.push(node_text(attribute, code));
                }
            }
        }
        _ => {}
    });

    facts
}

fn first_error_position(root: Node<'_>) -> Option<(usize, usize)> {
    let mut found = None;
    visit_nodes(root, |node| {
        if found.is_none() && (node.is_error() || node.is_missing()) {
            let point = node.start_position();
            found = Some((point.row + 1, point.column + 1));
        }
    });
    found
}

/// The set of allowed `mdp.` symbol names.
///
/// Built once from the `### mdp.<name>` and `### <ClassName>` headers of
/// the embedded API reference, plus [`SUPPLEMENTAL_SYMBOLS`].
pub fn api_whitelist() -> &'static HashSet<String> {
    static WHITELIST: OnceLock<HashSet<String>> = OnceLock::new();
    WHITELIST.get_or_init(|| {
        let mut symbols = HashSet::new();
        for (_, body) in context::api_reference() {
            for line in body.lines() {
                let Some(header) = line.strip_prefix("### ") else { continue };
                let header = header.trim();
                if let Some(name) = header.strip_prefix("mdp.") {
                    symbols.insert(name.to_string());
                } else if header.chars().next().is_some_and(char::is_uppercase) {
                    symbols.insert(header.to_string());
                }
            }
        }
        for symbol in SUPPLEMENTAL_SYMBOLS {
            symbols.insert(symbol.to_string());
        }
        symbols
    })
}

/// Builds the retry-prompt hint listing every allowed symbol, when any of
/// the findings was an unknown-symbol error.
#[must_use]
pub fn whitelist_hint(errors: &[String]) -> Option<String> {
    if !errors.iter().any(|e| e.contains("Unknown MDP symbol")) {
        return None;
    }
    let mut names: Vec<&str> = api_whitelist().iter().map(String::as_str).collect();
    names.sort_unstable();
    Some(format!("AVAILABLE MDP SYMBOLS (use ONLY these):\n{}", names.join(", ")))
}

fn correction_patterns() -> &'static Vec<(Regex, &'static str, &'static str)> {
    static PATTERNS: OnceLock<Vec<(Regex, &'static str, &'static str)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        COMMON_CORRECTIONS
            .iter()
            .filter_map(|&(wrong, right)| {
                // Word boundary keeps e.g. track_lin_vel_xy from matching
                // inside track_lin_vel_xy_exp.
                Regex::new(&format!(r"mdp\.{}\b", regex::escape(wrong)))
                    .ok()
                    .map(|pattern| (pattern, wrong, right))
            })
            .collect()
    })
}

/// Applies deterministic replacements for common near-miss API names.
///
/// Returns the corrected code and a human-readable list of the replacements
/// made. Call before [`validate`] so corrected names never reach the retry
/// loop.
#[must_use]
pub fn auto_correct(code: &str) -> (String, Vec<String>) {
    let mut corrected = code.to_string();
    let mut applied = Vec::new();

    for (pattern, wrong, right) in correction_patterns() {
        if pattern.is_match(&corrected) {
            corrected = pattern.replace_all(&corrected, format!("mdp.{right}")).into_owned();
            applied.push(format!("mdp.{wrong} -> mdp.{right}"));
        }
    }

    (corrected, applied)
}

/// Name of the first class containing the environment-config marker.
///
/// Used when synthesizing the registration module for a bundle whose
/// backend response omitted it.
#[must_use]
pub fn env_cfg_class_name(code: &str) -> Option<String> {
    let tree = parse_python(code)?;
    let facts = collect_facts(tree.root_node(), code);
    facts.class_names.into_iter().find(|name| name.contains(ENV_CFG_MARKER))
}

/// Runs every static check against the primary file.
///
/// A syntax error short-circuits: no structural check can say anything
/// useful about a tree full of error nodes.
#[must_use]
pub fn validate(code: &str) -> ValidationReport {
    let mut report = ValidationReport::default();

    let Some(tree) = parse_python(code) else {
        report.errors.push("source could not be parsed".to_string());
        return report;
    };
    let root = tree.root_node();

    if root.has_error() {
        let position = first_error_position(root)
            .map_or_else(String::new, |(row, col)| format!(" at line {row}, column {col}"));
        report.errors.push(format!("syntax error{position}"));
        return report;
    }

    let facts = collect_facts(root, code);

    if !facts.class_names.iter().any(|name| name.contains(ENV_CFG_MARKER)) {
        report.errors.push(format!(
            "missing environment config: no class with '{ENV_CFG_MARKER}' in its name"
        ));
    }

    if !facts.class_names.iter().any(|name| name.contains(REWARDS_CFG_MARKER)) {
        report.errors.push(format!(
            "missing rewards config: no class with '{REWARDS_CFG_MARKER}' in its name"
        ));
    }

    if !facts.function_names.iter().any(|name| name == POST_INIT_NAME) {
        report.errors.push(format!("missing {POST_INIT_NAME} method"));
    }

    let has_framework_import = facts
        .import_texts
        .iter()
        .any(|text| text.contains("isaaclab") || text.contains("omni.isaac"));
    if !has_framework_import {
        report
            .errors
            .push("missing framework import: nothing from 'isaaclab' or 'omni.isaac'".to_string());
    }

    let whitelist = api_whitelist();
    let mut seen = HashSet::new();
    for symbol in &facts.mdp_symbols {
        if seen.insert(symbol.as_str()) && !whitelist.contains(symbol) {
            report.errors.push(format!("Unknown MDP symbol: mdp.{symbol}"));
        }
    }

    if code.contains("\"ISAACLAB_NUCLEUS_DIR/") || code.contains("'ISAACLAB_NUCLEUS_DIR/") {
        report.errors.push(
            "literal ISAACLAB_NUCLEUS_DIR asset path: use the pre-built platform config with \
             .replace(prim_path=\"{ENV_REGEX_NS}/Robot\") instead"
                .to_string(),
        );
    }

    let task_mdp_import = facts
        .import_texts
        .iter()
        .any(|text| text.contains("isaaclab_tasks") && text.contains(".mdp"));
    if task_mdp_import {
        report.warnings.push(
            "task-specific mdp import: prefer 'import isaaclab.envs.mdp as mdp' for external configs"
                .to_string(),
        );
    }

    for weight in facts.weight_literals {
        if weight < WEIGHT_RANGE.0 || weight > WEIGHT_RANGE.1 {
            report.warnings.push(format!(
                "reward weight {weight} outside the typical range [{}, {}]",
                WEIGHT_RANGE.0, WEIGHT_RANGE.1
            ));
        }
    }

    report
}
