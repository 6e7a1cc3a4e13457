//! Artifact generation: prompt assembly, task naming, and deterministic
//! synthesis of the registration module and launch script.
//!
//! The backend is asked for all three files, but only the environment config
//! actually needs a language model. When the response omits the registration
//! module or the launch script, they are rendered here from per-category
//! tables so those two files are always correct.

use std::fmt::Write as _;

use crate::backend::{GenerationRequest, Generator};
use crate::error::BackendError;
use crate::pipeline::artifact::ArtifactBundle;
use crate::pipeline::task::{TaskCategory, TaskSpecification};
use crate::pipeline::{parser, validator};
use crate::prompts;

/// Per-category training configuration for the synthesized files.
///
/// Agent-config entry points reference real Isaac Lab agent configurations;
/// an empty entry means the framework has no config for that category.
struct TrainConfig {
    framework: &'static str,
    default_max_iterations: u32,
    rl_games_entry: &'static str,
    rsl_rl_entry: &'static str,
    skrl_entry: &'static str,
}

fn train_config(category: TaskCategory) -> TrainConfig {
    match category {
        TaskCategory::ClassicBalance => TrainConfig {
            framework: "rl_games",
            default_max_iterations: 200,
            rl_games_entry: "isaaclab_tasks.manager_based.classic.cartpole.agents:rl_games_ppo_cfg.yaml",
            rsl_rl_entry: "isaaclab_tasks.manager_based.classic.cartpole.agents.rsl_rl_ppo_cfg:CartpolePPORunnerCfg",
            skrl_entry: "isaaclab_tasks.manager_based.classic.cartpole.agents:skrl_ppo_cfg.yaml",
        },
        TaskCategory::ManipulationReach => TrainConfig {
            framework: "skrl",
            default_max_iterations: 500,
            rl_games_entry: "isaaclab_tasks.manager_based.manipulation.reach.config.franka.agents:rl_games_ppo_cfg.yaml",
            rsl_rl_entry: "isaaclab_tasks.manager_based.manipulation.reach.config.franka.agents.rsl_rl_ppo_cfg:FrankaReachPPORunnerCfg",
            skrl_entry: "isaaclab_tasks.manager_based.manipulation.reach.config.franka.agents:skrl_ppo_cfg.yaml",
        },
        TaskCategory::LocomotionFlat => TrainConfig {
            framework: "rsl_rl",
            default_max_iterations: 1500,
            rl_games_entry: "",
            rsl_rl_entry: "isaaclab_tasks.manager_based.locomotion.velocity.config.anymal_d.agents.rsl_rl_ppo_cfg:AnymalDFlatPPORunnerCfg",
            skrl_entry: "isaaclab_tasks.manager_based.locomotion.velocity.config.anymal_d.agents:skrl_flat_ppo_cfg.yaml",
        },
        TaskCategory::LocomotionRough => TrainConfig {
            framework: "rsl_rl",
            default_max_iterations: 3000,
            rl_games_entry: "",
            rsl_rl_entry: "isaaclab_tasks.manager_based.locomotion.velocity.config.anymal_d.agents.rsl_rl_ppo_cfg:AnymalDRoughPPORunnerCfg",
            skrl_entry: "isaaclab_tasks.manager_based.locomotion.velocity.config.anymal_d.agents:skrl_rough_ppo_cfg.yaml",
        },
    }
}

/// Category-specific functions the generation prompt approves for use.
struct ApprovedFunctions {
    rewards: &'static [&'static str],
    observations: &'static [&'static str],
    terminations: &'static [&'static str],
    events: &'static [&'static str],
    actions: &'static [&'static str],
    commands: &'static [&'static str],
}

fn approved_functions(category: TaskCategory) -> ApprovedFunctions {
    match category {
        TaskCategory::ManipulationReach => ApprovedFunctions {
            rewards: &[
                "position_command_error",
                "position_command_error_tanh",
                "orientation_command_error",
                "action_rate_l2",
                "joint_vel_l2",
                "joint_acc_l2",
                "is_terminated",
            ],
            observations: &["joint_pos_rel", "joint_vel_rel", "generated_commands", "last_action"],
            terminations: &["time_out"],
            events: &["reset_joints_by_scale", "reset_scene_to_default"],
            actions: &["JointPositionActionCfg", "DifferentialInverseKinematicsActionCfg"],
            commands: &["UniformPoseCommandCfg"],
        },
        TaskCategory::ClassicBalance => ApprovedFunctions {
            rewards: &[
                "is_alive",
                "is_terminated",
                "joint_pos_target_l2",
                "joint_vel_l1",
                "joint_vel_l2",
                "action_l2",
            ],
            observations: &["joint_pos_rel", "joint_vel_rel"],
            terminations: &["time_out", "joint_pos_out_of_manual_limit"],
            events: &["reset_joints_by_offset"],
            actions: &["JointEffortActionCfg"],
            commands: &[],
        },
        TaskCategory::LocomotionFlat | TaskCategory::LocomotionRough => ApprovedFunctions {
            rewards: &[
                "track_lin_vel_xy_exp",
                "track_ang_vel_z_exp",
                "lin_vel_z_l2",
                "ang_vel_xy_l2",
                "flat_orientation_l2",
                "joint_torques_l2",
                "action_rate_l2",
                "joint_acc_l2",
                "feet_air_time",
                "undesired_contacts",
                "is_terminated",
                "joint_pos_limits",
            ],
            observations: &[
                "base_lin_vel",
                "base_ang_vel",
                "projected_gravity",
                "joint_pos_rel",
                "joint_vel_rel",
                "generated_commands",
                "last_action",
                "height_scan",
            ],
            terminations: &["time_out", "illegal_contact"],
            events: &[
                "reset_root_state_uniform",
                "reset_joints_by_scale",
                "push_by_setting_velocity",
                "apply_external_force_torque",
                "randomize_rigid_body_material",
                "randomize_rigid_body_mass",
                "randomize_rigid_body_com",
            ],
            actions: &["JointPositionActionCfg"],
            commands: &["UniformVelocityCommandCfg"],
        },
    }
}

/// Formats the approved-function table for the generation prompt.
#[must_use]
pub fn format_approved_functions(category: TaskCategory) -> String {
    let approved = approved_functions(category);
    let mut text = String::from("APPROVED FUNCTIONS FOR THIS TASK (use ONLY these):\n");

    let sections: [(&str, &[&str]); 6] = [
        ("Rewards", approved.rewards),
        ("Observations", approved.observations),
        ("Terminations", approved.terminations),
        ("Events", approved.events),
        ("Actions", approved.actions),
        ("Commands", approved.commands),
    ];
    for (title, names) in sections {
        if names.is_empty() {
            continue;
        }
        let list: Vec<String> = names.iter().map(|n| format!("mdp.{n}")).collect();
        let _ = writeln!(text, "  {title}: {}", list.join(", "));
    }

    text
}

/// Sanitizes a string into a valid Python module name.
#[must_use]
pub fn sanitize_module_name(name: &str) -> String {
    let mut sanitized: String = name
        .to_lowercase()
        .chars()
        .map(|c| if c == '-' || c == ' ' { '_' } else { c })
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_')
        .collect();
    if sanitized.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        sanitized.insert(0, '_');
    }
    sanitized
}

/// Module-style task name, stable for a given specification.
#[must_use]
pub fn make_task_name(spec: &TaskSpecification) -> String {
    sanitize_module_name(&format!("{}_{}", spec.subject.module_slug(), spec.category.suffix()))
}

/// Downstream gym registration id for a specification.
#[must_use]
pub fn make_task_id(spec: &TaskSpecification) -> String {
    let platform = spec.subject.platform();
    match spec.category {
        TaskCategory::ManipulationReach => format!("EnvForge-Reach-{platform}-v0"),
        TaskCategory::ClassicBalance => format!("EnvForge-Balance-{platform}-v0"),
        TaskCategory::LocomotionFlat => format!("EnvForge-Velocity-Flat-{platform}-v0"),
        TaskCategory::LocomotionRough => format!("EnvForge-Velocity-Rough-{platform}-v0"),
    }
}

/// Renders the gym registration module for the bundle.
fn render_registration(task_name: &str, task_id: &str, env_cfg_class: &str, train: &TrainConfig) -> String {
    let cfg_module = format!("{task_name}_env_cfg");

    let mut kwargs = format!(
        "        \"env_cfg_entry_point\": f\"{{__name__}}.{cfg_module}:{env_cfg_class}\",\n"
    );
    for (key, entry) in [
        ("rl_games_cfg_entry_point", train.rl_games_entry),
        ("rsl_rl_cfg_entry_point", train.rsl_rl_entry),
        ("skrl_cfg_entry_point", train.skrl_entry),
    ] {
        if !entry.is_empty() {
            let _ = writeln!(kwargs, "        \"{key}\": \"{entry}\",");
        }
    }

    format!(
        "\"\"\"Registration for {task_id}.\"\"\"\n\
         \n\
         import gymnasium as gym\n\
         \n\
         ##\n\
         # Register Gym environments.\n\
         ##\n\
         \n\
         gym.register(\n\
         \x20   id=\"{task_id}\",\n\
         \x20   entry_point=\"isaaclab.envs:ManagerBasedRLEnv\",\n\
         \x20   disable_env_checker=True,\n\
         \x20   kwargs={{\n\
         {kwargs}\
         \x20   }},\n\
         )\n"
    )
}

/// Renders the training launch script for the bundle.
fn render_launch_script(task_id: &str, instance_count: u32, train: &TrainConfig) -> String {
    format!(
        "#!/usr/bin/env bash\n\
         # Train {task_id} with {framework}.\n\
         set -euo pipefail\n\
         \n\
         ISAACLAB_DIR=\"${{ISAACLAB_DIR:-$HOME/IsaacLab}}\"\n\
         TASK_ID=\"{task_id}\"\n\
         NUM_ENVS=\"${{NUM_ENVS:-{instance_count}}}\"\n\
         MAX_ITERATIONS=\"${{MAX_ITERATIONS:-{max_iterations}}}\"\n\
         \n\
         \"$ISAACLAB_DIR/isaaclab.sh\" -p \
         \"$ISAACLAB_DIR/scripts/reinforcement_learning/{framework}/train.py\" \\\n\
         \x20   --task \"$TASK_ID\" \\\n\
         \x20   --num_envs \"$NUM_ENVS\" \\\n\
         \x20   --max_iterations \"$MAX_ITERATIONS\" \\\n\
         \x20   --headless \"$@\"\n",
        framework = train.framework,
        max_iterations = train.default_max_iterations,
    )
}

/// Fills an empty registration module or launch script deterministically.
/// Backend-provided content always wins.
fn synthesize_missing(bundle: &mut ArtifactBundle, spec: &TaskSpecification) {
    let train = train_config(spec.category);
    let env_cfg_class = validator::env_cfg_class_name(&bundle.primary_file)
        .unwrap_or_else(|| "EnvCfg".to_string());

    if bundle.registration_file.is_empty() {
        bundle.registration_file =
            render_registration(&bundle.task_name, &bundle.task_id, &env_cfg_class, &train);
    }
    if bundle.launch_script.is_empty() {
        bundle.launch_script = render_launch_script(&bundle.task_id, spec.instance_count, &train);
    }
}

/// Runs one generation attempt and parses the response into a fresh bundle.
///
/// `addendum` carries the corrective findings from a failed validation; when
/// present the attempt runs at a lower temperature.
///
/// # Errors
///
/// Propagates backend failures; they are fatal at this stage.
pub async fn generate(
    backend: &dyn Generator,
    spec: &TaskSpecification,
    context: &str,
    addendum: Option<&str>,
) -> Result<ArtifactBundle, BackendError> {
    let task_name = make_task_name(spec);
    let task_id = make_task_id(spec);

    let mut user_prompt = prompts::generation_prompt(
        spec,
        &task_name,
        &format_approved_functions(spec.category),
    );
    if let Some(addendum) = addendum {
        user_prompt.push_str(addendum);
    }

    let request = GenerationRequest {
        system_prompt: format!("{}\n\n{context}", prompts::system_prompt()),
        user_prompt,
        temperature: if addendum.is_some() { 0.1 } else { 0.2 },
        max_tokens: 8192,
    };

    let raw = backend.send(&request).await?;

    let mut bundle = parser::parse_response(&raw);
    bundle.raw_response = raw;
    bundle.task_name = task_name;
    bundle.task_id = task_id;
    synthesize_missing(&mut bundle, spec);

    Ok(bundle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::task::Difficulty;

    fn spec(category: TaskCategory) -> TaskSpecification {
        TaskSpecification {
            category,
            subject: category.canonical_subject(),
            description: "test".into(),
            objectives: vec!["objective".into()],
            constraints: vec![],
            difficulty: Difficulty::Medium,
            episode_length_s: category.default_episode_length(),
            instance_count: 2048,
        }
    }

    #[test]
    fn task_names_combine_platform_and_category() {
        assert_eq!(make_task_name(&spec(TaskCategory::ClassicBalance)), "cartpole_balance");
        assert_eq!(make_task_name(&spec(TaskCategory::ManipulationReach)), "franka_panda_reach");
        assert_eq!(make_task_name(&spec(TaskCategory::LocomotionRough)), "anymal_d_rough");
    }

    #[test]
    fn task_ids_follow_the_category_pattern() {
        assert_eq!(make_task_id(&spec(TaskCategory::ClassicBalance)), "EnvForge-Balance-Cartpole-v0");
        assert_eq!(
            make_task_id(&spec(TaskCategory::LocomotionFlat)),
            "EnvForge-Velocity-Flat-Anymal-D-v0"
        );
    }

    #[test]
    fn sanitize_module_name_strips_and_prefixes() {
        assert_eq!(sanitize_module_name("Anymal-D rough!"), "anymal_d_rough");
        assert_eq!(sanitize_module_name("2fast"), "_2fast");
    }

    #[test]
    fn registration_skips_empty_agent_entries() {
        let train = train_config(TaskCategory::LocomotionFlat);
        let module = render_registration("anymal_d_flat", "EnvForge-Velocity-Flat-Anymal-D-v0", "FlatEnvCfg", &train);
        assert!(module.contains("gym.register("));
        assert!(module.contains("anymal_d_flat_env_cfg:FlatEnvCfg"));
        assert!(module.contains("rsl_rl_cfg_entry_point"));
        assert!(!module.contains("rl_games_cfg_entry_point"));
    }

    #[test]
    fn launch_script_uses_the_category_framework() {
        let train = train_config(TaskCategory::ClassicBalance);
        let script = render_launch_script("EnvForge-Balance-Cartpole-v0", 2048, &train);
        assert!(script.starts_with("#!/usr/bin/env bash"));
        assert!(script.contains("rl_games/train.py"));
        assert!(script.contains("NUM_ENVS=\"${NUM_ENVS:-2048}\""));
        assert!(script.contains("MAX_ITERATIONS=\"${MAX_ITERATIONS:-200}\""));
    }

    #[test]
    fn approved_functions_cover_every_category() {
        for category in TaskCategory::ALL {
            let text = format_approved_functions(category);
            assert!(text.contains("Rewards:"), "{category} lacks rewards");
            assert!(text.contains("mdp."));
        }
    }

    #[test]
    fn approved_functions_are_all_whitelisted() {
        let whitelist = validator::api_whitelist();
        for category in TaskCategory::ALL {
            let approved = approved_functions(category);
            for names in [
                approved.rewards,
                approved.observations,
                approved.terminations,
                approved.events,
                approved.actions,
                approved.commands,
            ] {
                for name in names {
                    assert!(whitelist.contains(*name), "{name} missing from whitelist");
                }
            }
        }
    }

    #[test]
    fn synthesis_fills_only_empty_fields() {
        let spec = spec(TaskCategory::ClassicBalance);
        let mut bundle = ArtifactBundle {
            primary_file: "class CartpoleBalanceEnvCfg:\n    pass".into(),
            registration_file: "custom registration".into(),
            task_name: make_task_name(&spec),
            task_id: make_task_id(&spec),
            ..ArtifactBundle::default()
        };
        synthesize_missing(&mut bundle, &spec);
        assert_eq!(bundle.registration_file, "custom registration");
        assert!(bundle.launch_script.contains("EnvForge-Balance-Cartpole-v0"));
    }

    #[test]
    fn synthesized_registration_names_the_detected_class() {
        let spec = spec(TaskCategory::ClassicBalance);
        let mut bundle = ArtifactBundle {
            primary_file: "class MyBalanceEnvCfg:\n    pass".into(),
            task_name: make_task_name(&spec),
            task_id: make_task_id(&spec),
            ..ArtifactBundle::default()
        };
        synthesize_missing(&mut bundle, &spec);
        assert!(bundle.registration_file.contains(":MyBalanceEnvCfg"));
    }
}
