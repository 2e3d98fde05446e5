use brain::{BrainConfig, RobotBrain, SequencerEvent, Waypoint};
use motion::loader;
use motion::skeleton::G1;
use motion::UpAxis;
use nalgebra::Vector2;
use std::f64::consts::FRAC_PI_4;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const FPS: f64 = 20.0;

/// G1 records: root pose, then every joint at a small constant bend.
fn csv(frames: usize, step: f64, yaw_per_frame: f64) -> String {
    let mut out = String::from("# root_x,root_y,root_z,qx,qy,qz,qw,joints...\n");
    for i in 0..frames {
        let i = i as f64;
        let half = yaw_per_frame * i / 2.0;
        let mut values = vec![i * step, 0.0, 0.79, 0.0, 0.0, half.sin(), half.cos()];
        values.extend(std::iter::repeat_n(0.1, G1.joint_count()));
        let line: Vec<String> = values.iter().map(|v| format!("{v:.9}")).collect();
        out.push_str(&line.join(","));
        out.push('\n');
    }
    out
}

fn brain() -> RobotBrain {
    let mut brain = RobotBrain::new(UpAxis::Z, BrainConfig::default()).unwrap();
    let clips = [
        ("walk_forward", csv(11, 0.05, 0.0)),
        ("turn_left", csv(11, 0.0, FRAC_PI_4 / 10.0)),
        ("turn_right", csv(11, 0.0, -FRAC_PI_4 / 10.0)),
    ];
    for (id, text) in clips {
        let clip = loader::parse(id, &text, None, FPS).unwrap();
        assert_eq!(clip.skeleton_id(), "g1");
        brain.load_clip(id, clip).unwrap();
    }
    brain
}

#[test]
fn loaded_clips_calibrate_from_their_keyframes() {
    let brain = brain();
    let library = brain.library();
    let walk = motion::CalibrationSource::calibration(library, "walk_forward").unwrap();
    assert!((walk.forward_distance - 0.5).abs() < 1e-6);
    assert!((walk.duration - 0.55).abs() < 1e-12);
    let left = motion::CalibrationSource::calibration(library, "turn_left").unwrap();
    assert!((left.yaw_change - FRAC_PI_4).abs() < 1e-6);
}

#[test]
fn square_route_is_followed_within_rounding() {
    let brain = brain();
    let waypoints = [
        Waypoint::new(1.0, 0.0),
        Waypoint::new(1.0, 1.0),
        Waypoint::new(0.0, 1.0),
        Waypoint::new(0.0, 0.0),
    ];
    let plan = brain.plan_route(Vector2::zeros(), 0.0, &waypoints).unwrap();
    assert_eq!(plan.count("walk_forward"), 8);
    assert_eq!(plan.count("turn_left"), 6);
    assert!((plan.estimated_duration - 14.0 * 0.55).abs() < 1e-9);

    let mut execution = brain.execute(&plan, &waypoints, Vector2::zeros(), 0.0).unwrap();
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = log.clone();
    execution.sequencer_mut().subscribe(move |e| sink.lock().unwrap().push(e.clone()));

    let tick = Duration::from_secs_f64(1.0 / 60.0);
    let mut ticks = 0;
    while !execution.is_finished() && ticks < 2_000 {
        execution.tick(tick).unwrap();
        ticks += 1;
    }
    assert!(execution.is_finished());

    let report = execution.report();
    assert_eq!(report.errors.len(), 4);
    assert!(report.max < 0.05, "{report:?}");

    let events = log.lock().unwrap();
    assert!(matches!(events.last(), Some(SequencerEvent::SequenceComplete { .. })));
}

#[test]
fn plans_survive_a_json_store() {
    use brain::{JsonPlanStore, PlanStore};

    let brain = brain();
    let waypoints = [Waypoint::new(2.0, 0.0)];
    let plan = brain.plan_route(Vector2::zeros(), 0.0, &waypoints).unwrap();

    let path = std::env::temp_dir().join(format!("mission-{}.json", std::process::id()));
    let mut store = JsonPlanStore::new(&path);
    store
        .save_plan("dash", &waypoints, &plan.commands, plan.estimated_duration)
        .unwrap();
    let saved = store.load_plans().unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].compiled_commands, plan.commands);
    assert_eq!(saved[0].estimated_duration, plan.estimated_duration);
}
