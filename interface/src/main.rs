mod communication;
mod config;

use brain::{CompiledPlan, JsonPlanStore, MemoryPlanStore, PlanStore, RobotBrain, ScoreReport, Waypoint};
use clap::Parser;
use communication::CommunicationLayer;
use config::AppConfig;
use log::{error, info, warn};
use motion::loader;
use nalgebra::Vector2;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};

#[derive(Parser, Debug)]
#[command(about = "Compile waypoint routes into humanoid motion clips and play them back")]
struct Args {
    /// JSON run configuration
    #[arg(short, long)]
    config: PathBuf,

    /// Run a saved plan or mission template by name instead of the configured waypoints
    #[arg(short, long)]
    plan: Option<String>,

    /// Print the saved plans and templates, then exit
    #[arg(long)]
    list_plans: bool,

    /// Wait for routes on the waypoint topic and run each one as it arrives
    #[arg(long)]
    listen: bool,
}

type AppResult<T> = Result<T, Box<dyn std::error::Error>>;

#[tokio::main]
async fn main() -> AppResult<()> {
    env_logger::init();
    let args = Args::parse();
    let config = AppConfig::load(&args.config)?;

    let mut brain = RobotBrain::new(config.motion.up_axis, config.brain.clone())?;
    for entry in &config.clips {
        let raw = std::fs::read(&entry.path).map_err(|e| format!("{}: {e}", entry.path.display()))?;
        let fps = entry.fps.unwrap_or(config.motion.default_fps);
        let clip = loader::parse_bytes(&entry.id, &raw, entry.skeleton.as_deref(), fps)?;
        info!(
            "loaded {} ({}, {} frames, {:.2}s)",
            entry.id,
            clip.skeleton_id(),
            clip.frame_count(),
            clip.duration()
        );
        if brain.load_clip(&entry.id, clip).is_none() {
            warn!("{} could not be calibrated and is unusable for routes", entry.id);
        }
    }

    if args.list_plans {
        for plan in saved_plans(&config)? {
            println!(
                "{:<20} {:>3} waypoints {:>4} commands {:>7.1}s{}",
                plan.name,
                plan.waypoints.len(),
                plan.compiled_commands.len(),
                plan.estimated_duration,
                if plan.is_template { "  (template)" } else { "" }
            );
        }
        return Ok(());
    }

    let comms = if config.publish || args.listen {
        Some(CommunicationLayer::new().await?)
    } else {
        None
    };

    if args.listen {
        let comms = comms.as_ref().ok_or("listening requires a zenoh session")?;
        let (tx, mut rx) = mpsc::unbounded_channel();
        comms
            .subscribe_waypoints(move |waypoints| {
                let _ = tx.send(waypoints);
            })
            .await?;
        info!("waiting for routes");
        while let Some(waypoints) = rx.recv().await {
            match plan_and_run(&brain, &config, Some(comms), &waypoints).await {
                Ok(report) => info!("route done: mean {:.3}, max {:.3}", report.mean, report.max),
                Err(e) => error!("route rejected: {e}"),
            }
        }
        return Ok(());
    }

    let report = match &args.plan {
        Some(name) => {
            let saved = saved_plans(&config)?
                .into_iter()
                .find(|p| &p.name == name)
                .ok_or_else(|| format!("no saved plan named {name}"))?;
            let plan = CompiledPlan {
                commands: saved.compiled_commands,
                estimated_duration: saved.estimated_duration,
                predicted: Vec::new(),
            };
            run(&brain, &config, comms.as_ref(), &plan, &saved.waypoints).await?
        }
        None => plan_and_run(&brain, &config, comms.as_ref(), &config.waypoints).await?,
    };

    for entry in &report.errors {
        println!(
            "({:>7.3}, {:>7.3})  error {:.3} m",
            entry.waypoint.x, entry.waypoint.y, entry.error
        );
    }
    println!("mean {:.3} m, max {:.3} m", report.mean, report.max);
    Ok(())
}

/// Templates first, then the JSON store when one is configured.
fn saved_plans(config: &AppConfig) -> AppResult<Vec<brain::SavedPlan>> {
    let mut plans = MemoryPlanStore::with_templates(&config.brain)?.load_plans()?;
    if let Some(path) = &config.plan_store {
        plans.extend(JsonPlanStore::new(path).load_plans()?);
    }
    Ok(plans)
}

async fn plan_and_run(
    brain: &RobotBrain,
    config: &AppConfig,
    comms: Option<&CommunicationLayer>,
    waypoints: &[Waypoint],
) -> AppResult<ScoreReport> {
    let start = Vector2::new(config.start.x, config.start.y);
    let plan = brain.plan_route(start, config.start.yaw, waypoints)?;
    if let Some(path) = &config.plan_store {
        JsonPlanStore::new(path).save_plan(&config.plan_name, waypoints, &plan.commands, plan.estimated_duration)?;
        info!("saved plan {} to {}", config.plan_name, path.display());
    }
    run(brain, config, comms, &plan, waypoints).await
}

/// Drives an execution from a wall-clock interval until it finishes or ctrl-c.
async fn run(
    brain: &RobotBrain,
    config: &AppConfig,
    comms: Option<&CommunicationLayer>,
    plan: &CompiledPlan,
    waypoints: &[Waypoint],
) -> AppResult<ScoreReport> {
    let start = Vector2::new(config.start.x, config.start.y);
    let mut execution = brain.execute(plan, waypoints, start, config.start.yaw)?;
    info!("running {} commands, about {:.1}s", plan.commands.len(), plan.estimated_duration);

    let mut interval = tokio::time::interval(Duration::from_secs_f64(1.0 / config.tick_hz));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last = Instant::now();

    while !execution.is_finished() {
        tokio::select! {
            _ = interval.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                warn!("interrupted");
                execution.stop();
                break;
            }
        }
        let now = Instant::now();
        execution.tick(now - last)?;
        last = now;

        if let Some(comms) = comms {
            let player = execution.sequencer().player();
            if let (Some(pose), Some(clip)) = (player.pose(), player.clip()) {
                if let Err(e) = comms.publish_pose(pose, clip.layout()).await {
                    warn!("publish failed: {e}");
                }
            }
        }
    }
    Ok(execution.report())
}
