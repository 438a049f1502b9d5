//! Headless NPC companion.
//!
//! Walk up to an NPC in a small text scene and talk to it. The NPC answers
//! through Groq and can follow you or walk to named objects.
//!
//! ```bash
//! GROQ_API_KEY=... cargo run -p npc -- --config npc/npc.toml
//! ```

mod headless;
mod logging;

use anyhow::Context;
use clap::Parser;
use npc_core::{
    AgentController, ChatSurface, DialogueSession, NpcConfig, PersonalityProfile, Vec3, World,
    WorldObject,
};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "npc", version, about = "Talk to an NPC companion from the terminal")]
struct Args {
    /// Scene and model configuration (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Personality profile (TOML), replacing the one in the config
    #[arg(short, long)]
    personality: Option<PathBuf>,

    /// Model name, replacing the one in the config
    #[arg(short, long)]
    model: Option<String>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => NpcConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => NpcConfig::default(),
    };
    if let Some(path) = &args.personality {
        let personality = PersonalityProfile::load(path)
            .with_context(|| format!("loading personality {}", path.display()))?;
        config = config.with_personality(personality);
    }
    if let Some(model) = args.model {
        config = config.with_model(model);
    }
    if let Some(level) = args.log_level {
        config = config.with_log_level(level);
    }
    config.validate()?;

    logging::init(&config.log_level)?;
    info!(
        model = %config.model.model,
        npc = %config.personality.name,
        objects = config.world.objects.len(),
        "starting npc"
    );

    let session = DialogueSession::from_env(config.model.clone(), config.conversation.clone());
    if !session.is_enabled() {
        eprintln!("Warning: GROQ_API_KEY is not set; the NPC will not be able to talk.");
    }

    let objects = if config.world.objects.is_empty() {
        demo_objects()
    } else {
        config.world.objects.clone()
    };
    let waypoints = if config.world.waypoints.is_empty() {
        demo_waypoints()
    } else {
        config.world.waypoints.clone()
    };

    let agent = AgentController::new(
        "npc-1",
        config.personality.clone(),
        config.agent.clone(),
        World::from_objects(objects),
    )
    .at(config.world.npc_start)
    .with_waypoints(waypoints);

    let scene = headless::Scene::new(
        agent,
        ChatSurface::new(config.chat.clone()),
        config.world.player_start,
    );
    headless::run_headless(scene, session).await
}

/// A few props so the default scene has something to walk to.
fn demo_objects() -> Vec<WorldObject> {
    vec![
        WorldObject::new("Lamp01", Vec3::new(6.0, 0.0, 2.0)),
        WorldObject::new("Crate", Vec3::new(-4.0, 0.0, 8.0)),
        WorldObject::new("Bench", Vec3::new(10.0, 0.0, -6.0)),
        WorldObject::new("Well", Vec3::new(-12.0, 0.0, -3.0)),
    ]
}

fn demo_waypoints() -> Vec<Vec3> {
    vec![
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(8.0, 0.0, 0.0),
        Vec3::new(8.0, 0.0, 8.0),
        Vec3::new(0.0, 0.0, 8.0),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_config_parses() {
        let config = NpcConfig::from_toml_str(include_str!("../npc.toml")).unwrap();
        assert_eq!(config.personality.name, "Bramble");
        assert!(config.conversation.record_tool_results);
        assert_eq!(config.world.objects.len(), 4);
        assert_eq!(config.world.waypoints[1], Vec3::new(8.0, 0.0, 0.0));
    }

    #[test]
    fn test_args() {
        let args = Args::parse_from(["npc", "--config", "npc.toml", "--model", "mixtral"]);
        assert_eq!(args.config, Some(PathBuf::from("npc.toml")));
        assert_eq!(args.model.as_deref(), Some("mixtral"));
        assert!(args.personality.is_none());
    }

    #[test]
    fn test_demo_scene() {
        assert!(!demo_objects().is_empty());
        assert!(demo_waypoints().len() >= 2);
    }
}
