//! Clip playback with transform chaining.
//!
//! The player keeps an accumulated world transform that maps a clip's local root pose
//! into world space. Loading with continuity re-anchors that transform so the new clip's
//! first frame lands exactly where the previous clip's last frame left the robot.

use log::debug;
use nalgebra::{UnitQuaternion, Vector2, Vector3};
use std::sync::Arc;

use crate::clip::{Frame, MotionClip};
use crate::config::UpAxis;
use crate::events::Notifier;

pub const MIN_SPEED: f64 = 0.1;
pub const MAX_SPEED: f64 = 5.0;

/// Root pose in world space plus the frame's joint angles.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldPose {
    pub frame: usize,
    pub position: Vector3<f64>,
    pub rotation: UnitQuaternion<f64>,
    pub joints: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    FrameChanged { frame: usize, position: Vector3<f64> },
    PlayStateChanged { playing: bool },
    MotionLoaded { name: String, frame_count: usize, duration: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Anchor {
    up: UpAxis,
    position: Vector2<f64>,
    yaw: f64,
}

#[derive(Debug)]
pub struct ClipPlayer {
    clip: Option<Arc<MotionClip>>,
    play_head: f64,
    playing: bool,
    speed: f64,
    looping: bool,
    accumulated_position: Vector3<f64>,
    accumulated_rotation: UnitQuaternion<f64>,
    pose: Option<WorldPose>,
    // world root of the last frame of the most recent clip that had frames
    chain_end: Option<(Vector3<f64>, UnitQuaternion<f64>)>,
    anchor: Option<Anchor>,
    events: Notifier<PlayerEvent>,
}

impl Default for ClipPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl ClipPlayer {
    pub fn new() -> Self {
        Self {
            clip: None,
            play_head: 0.0,
            playing: false,
            speed: 1.0,
            looping: false,
            accumulated_position: Vector3::zeros(),
            accumulated_rotation: UnitQuaternion::identity(),
            pose: None,
            chain_end: None,
            anchor: None,
            events: Notifier::new(),
        }
    }

    pub fn subscribe<F>(&mut self, listener: F)
    where
        F: FnMut(&PlayerEvent) + Send + 'static,
    {
        self.events.subscribe(listener);
    }

    /// Places the next loaded clip so its first frame stands at `position` facing `yaw`
    /// on the walking plane. Height, roll and pitch still come from the clip.
    pub fn anchor_next(&mut self, up: UpAxis, position: Vector2<f64>, yaw: f64) {
        self.anchor = Some(Anchor { up, position, yaw });
    }

    /// Loads `clip` and applies its first frame.
    ///
    /// With `preserve_continuity` the first frame is placed where the last clip with frames
    /// ended. Under continuity an empty clip leaves the transform and the chain end untouched,
    /// and an empty clip never clears the current pose.
    pub fn load(&mut self, clip: Arc<MotionClip>, preserve_continuity: bool) {
        let end = match self.clip.as_ref().and_then(|c| c.last_frame()) {
            Some(last) => Some(self.world_root(last)),
            None => self.chain_end,
        };
        let first = clip.first_frame();

        if let (Some(anchor), Some(first)) = (self.anchor, first) {
            self.anchor = None;
            let up = anchor.up;
            let turn = anchor.yaw - up.yaw(&first.root_rotation);
            self.accumulated_rotation = UnitQuaternion::from_axis_angle(&up.unit(), turn);
            let start = self.accumulated_rotation * first.root_position;
            self.accumulated_position = up.lift(&(anchor.position - up.planar(&start)));
            self.chain_end = None;
        } else if !preserve_continuity {
            self.reset_transform();
        } else {
            if let (Some((end_position, end_rotation)), Some(next_first)) = (end, first) {
                self.accumulated_rotation = end_rotation * next_first.root_rotation.inverse();
                self.accumulated_position = end_position - self.accumulated_rotation * next_first.root_position;
            }
            self.chain_end = end;
        }

        debug!(
            "loaded '{}' ({} frames, continuity: {preserve_continuity})",
            clip.name(),
            clip.frame_count()
        );
        self.events.emit(PlayerEvent::MotionLoaded {
            name: clip.name().to_string(),
            frame_count: clip.frame_count(),
            duration: clip.duration(),
        });
        let has_frames = first.is_some();
        self.clip = Some(clip);
        self.play_head = 0.0;
        self.set_playing(false);
        if has_frames {
            self.pose = None;
            self.apply(0, true);
        }
    }

    pub fn play(&mut self) {
        let Some(count) = self.clip.as_ref().map(|c| c.frame_count()) else {
            return;
        };
        // replay from the start once a non-looping clip has finished
        if !self.playing && !self.looping && count > 1 && self.play_head >= (count - 1) as f64 {
            self.play_head = 0.0;
            self.apply(0, true);
        }
        self.set_playing(true);
    }

    pub fn pause(&mut self) {
        if self.clip.is_some() {
            self.set_playing(false);
        }
    }

    /// Rewinds to frame 0. The accumulated transform is kept.
    pub fn stop(&mut self) {
        if self.clip.is_none() {
            return;
        }
        self.set_playing(false);
        self.play_head = 0.0;
        self.apply(0, true);
    }

    pub fn advance(&mut self, elapsed_seconds: f64) {
        if !self.playing || elapsed_seconds <= 0.0 {
            return;
        }
        let Some((count, fps)) = self.clip.as_ref().map(|c| (c.frame_count(), c.frames_per_second())) else {
            return;
        };
        if count == 0 {
            self.set_playing(false);
            return;
        }

        self.play_head += elapsed_seconds * fps * self.speed;
        let end = count as f64;
        let mut finished = false;
        if self.play_head >= end {
            if self.looping {
                self.play_head %= end;
            } else {
                self.play_head = end - 1.0;
                finished = true;
            }
        }
        self.apply(self.play_head.floor() as usize, false);
        if finished {
            self.set_playing(false);
        }
    }

    /// Jumps to a frame regardless of play state.
    pub fn set_frame(&mut self, index: usize) {
        let Some(count) = self.clip.as_ref().map(|c| c.frame_count()) else {
            return;
        };
        if count == 0 {
            return;
        }
        let index = index.min(count - 1);
        self.play_head = index as f64;
        self.apply(index, true);
    }

    pub fn set_speed(&mut self, speed: f64) {
        if speed.is_nan() {
            return;
        }
        self.speed = speed.clamp(MIN_SPEED, MAX_SPEED);
    }

    pub fn set_loop(&mut self, looping: bool) {
        self.looping = looping;
    }

    pub fn reset_transform(&mut self) {
        self.accumulated_position = Vector3::zeros();
        self.accumulated_rotation = UnitQuaternion::identity();
        self.chain_end = None;
    }

    /// World pose of `index` under the current accumulation, without applying it.
    pub fn evaluate(&self, index: usize) -> Option<WorldPose> {
        let frame = self.clip.as_ref()?.frame(index)?;
        Some(self.to_world(index, frame))
    }

    pub fn pose(&self) -> Option<&WorldPose> {
        self.pose.as_ref()
    }

    pub fn clip(&self) -> Option<&Arc<MotionClip>> {
        self.clip.as_ref()
    }

    pub fn play_head(&self) -> f64 {
        self.play_head
    }

    pub fn current_frame(&self) -> usize {
        self.play_head.floor() as usize
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn accumulated_transform(&self) -> (Vector3<f64>, UnitQuaternion<f64>) {
        (self.accumulated_position, self.accumulated_rotation)
    }

    fn world_root(&self, frame: &Frame) -> (Vector3<f64>, UnitQuaternion<f64>) {
        (
            self.accumulated_rotation * frame.root_position + self.accumulated_position,
            self.accumulated_rotation * frame.root_rotation,
        )
    }

    fn to_world(&self, index: usize, frame: &Frame) -> WorldPose {
        let (position, rotation) = self.world_root(frame);
        WorldPose {
            frame: index,
            position,
            rotation,
            joints: frame.joints.clone(),
        }
    }

    fn apply(&mut self, index: usize, force: bool) {
        if !force && self.pose.as_ref().is_some_and(|p| p.frame == index) {
            return;
        }
        let Some(pose) = self.evaluate(index) else {
            return;
        };
        self.events.emit(PlayerEvent::FrameChanged {
            frame: index,
            position: pose.position,
        });
        self.pose = Some(pose);
    }

    fn set_playing(&mut self, playing: bool) {
        if self.playing != playing {
            self.playing = playing;
            self.events.emit(PlayerEvent::PlayStateChanged { playing });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skeleton::G1;
    use std::f64::consts::FRAC_PI_2;
    use std::sync::Mutex;

    fn line_clip(name: &str, frames: usize, step: f64, yaw_step: f64) -> Arc<MotionClip> {
        let frames = (0..frames)
            .map(|i| {
                let i = i as f64;
                let mut joints = vec![None; G1.joint_count()];
                joints[3] = Some(i);
                Frame::new(
                    Vector3::new(i * step, 0.0, 0.75),
                    UnitQuaternion::from_euler_angles(0.0, 0.0, i * yaw_step),
                    joints,
                )
            })
            .collect();
        Arc::new(MotionClip::new(name, &G1, 10.0, frames).unwrap())
    }

    fn offset_clip() -> Arc<MotionClip> {
        let frames = vec![
            Frame::root(Vector3::new(3.0, -2.0, 0.7), UnitQuaternion::from_euler_angles(0.1, 0.0, 0.9)),
            Frame::root(Vector3::new(3.5, -1.5, 0.8), UnitQuaternion::from_euler_angles(0.0, 0.2, 1.4)),
        ];
        Arc::new(MotionClip::new("offset", &G1, 10.0, frames).unwrap())
    }

    fn assert_pose_eq(a: &WorldPose, b: &WorldPose) {
        assert!((a.position - b.position).norm() < 1e-6, "{:?} vs {:?}", a.position, b.position);
        assert!(a.rotation.angle_to(&b.rotation) < 1e-6);
    }

    #[test]
    fn continuity_across_loads() {
        let mut player = ClipPlayer::new();
        player.load(line_clip("a", 10, 0.1, 0.05), true);
        player.load(offset_clip(), true);
        player.set_frame(1);
        let end_of_b = player.pose().cloned().unwrap();

        player.load(line_clip("c", 5, 0.2, -0.1), true);
        let start_of_c = player.evaluate(0).unwrap();
        assert_pose_eq(&start_of_c, &end_of_b);
        assert_pose_eq(player.pose().unwrap(), &end_of_b);
    }

    #[test]
    fn continuity_uses_previous_final_frame() {
        let mut player = ClipPlayer::new();
        player.load(line_clip("a", 10, 0.1, FRAC_PI_2 / 9.0), false);
        let last_of_a = player.evaluate(9).unwrap();
        player.load(line_clip("b", 4, 0.1, 0.0), true);
        assert_pose_eq(&player.evaluate(0).unwrap(), &last_of_a);

        // heading is now +90 degrees, so the walk continues along +y
        let end = player.evaluate(3).unwrap();
        assert!((end.position - last_of_a.position - Vector3::new(0.0, 0.3, 0.0)).norm() < 1e-9);
    }

    #[test]
    fn empty_clip_does_not_break_the_chain() {
        let mut player = ClipPlayer::new();
        player.load(line_clip("a", 10, 0.1, 0.0), false);
        let last_of_a = player.evaluate(9).unwrap();
        player.set_frame(9);

        player.load(line_clip("empty", 0, 0.1, 0.0), true);
        assert_pose_eq(player.pose().unwrap(), &last_of_a);
        player.play();
        player.advance(0.5);
        assert_pose_eq(player.pose().unwrap(), &last_of_a);

        player.load(line_clip("b", 4, 0.1, 0.0), true);
        assert_pose_eq(&player.evaluate(0).unwrap(), &last_of_a);
        assert!((player.evaluate(3).unwrap().position - Vector3::new(1.2, 0.0, 0.75)).norm() < 1e-9);
    }

    #[test]
    fn load_without_continuity_resets() {
        let mut player = ClipPlayer::new();
        player.load(line_clip("a", 10, 0.1, 0.1), false);
        player.load(line_clip("b", 3, 0.1, 0.0), true);
        assert!(player.accumulated_transform().0.norm() > 0.0);
        player.load(line_clip("b", 3, 0.1, 0.0), false);
        let (pos, rot) = player.accumulated_transform();
        assert_eq!(pos, Vector3::zeros());
        assert_eq!(rot, UnitQuaternion::identity());
    }

    #[test]
    fn anchor_places_first_frame_on_plane() {
        let mut player = ClipPlayer::new();
        player.anchor_next(UpAxis::Z, Vector2::new(2.0, -1.0), FRAC_PI_2);
        player.load(offset_clip(), true);
        let start = player.pose().cloned().unwrap();
        assert!((start.position - Vector3::new(2.0, -1.0, 0.7)).norm() < 1e-9);
        assert!((UpAxis::Z.yaw(&start.rotation) - FRAC_PI_2).abs() < 1e-9);

        // anchoring applies to one load only
        let end_of_offset = player.evaluate(1).unwrap();
        player.load(line_clip("b", 3, 0.1, 0.0), true);
        assert_pose_eq(&player.evaluate(0).unwrap(), &end_of_offset);
    }

    #[test]
    fn advance_clamps_and_stops() {
        let mut player = ClipPlayer::new();
        player.load(line_clip("a", 10, 0.1, 0.0), false);
        player.play();
        player.advance(0.25);
        assert_eq!(player.current_frame(), 2);
        assert!(player.is_playing());
        player.advance(5.0);
        assert_eq!(player.current_frame(), 9);
        assert!(!player.is_playing());
    }

    #[test]
    fn advance_wraps_when_looping() {
        let mut player = ClipPlayer::new();
        player.load(line_clip("a", 10, 0.1, 0.0), false);
        player.set_loop(true);
        player.play();
        player.advance(1.25);
        assert!(player.is_playing());
        assert_eq!(player.current_frame(), 2);
    }

    #[test]
    fn playback_depends_only_on_total_elapsed() {
        let mut coarse = ClipPlayer::new();
        let mut fine = ClipPlayer::new();
        for p in [&mut coarse, &mut fine] {
            p.load(line_clip("a", 30, 0.1, 0.0), false);
            p.play();
        }
        coarse.advance(0.75);
        for _ in 0..6 {
            fine.advance(0.125);
        }
        assert_eq!(coarse.current_frame(), fine.current_frame());
    }

    #[test]
    fn speed_is_clamped() {
        let mut player = ClipPlayer::new();
        player.set_speed(10.0);
        assert_eq!(player.speed(), MAX_SPEED);
        player.set_speed(0.0);
        assert_eq!(player.speed(), MIN_SPEED);
        player.set_speed(2.0);
        assert_eq!(player.speed(), 2.0);
    }

    #[test]
    fn set_frame_is_idempotent_and_clamped() {
        let mut player = ClipPlayer::new();
        player.load(line_clip("a", 10, 0.1, 0.2), false);
        player.set_frame(4);
        let first = player.pose().cloned().unwrap();
        player.set_frame(4);
        assert_eq!(player.pose().unwrap(), &first);
        player.set_frame(100);
        assert_eq!(player.pose().unwrap().frame, 9);
        assert_eq!(player.pose().unwrap().joints[3], Some(9.0));
    }

    #[test]
    fn stop_rewinds_but_keeps_accumulation() {
        let mut player = ClipPlayer::new();
        player.load(line_clip("a", 10, 0.1, 0.3), false);
        player.load(line_clip("b", 10, 0.1, 0.0), true);
        let before = player.accumulated_transform();
        player.play();
        player.advance(0.5);
        player.stop();
        assert_eq!(player.current_frame(), 0);
        assert!(!player.is_playing());
        assert_eq!(player.accumulated_transform(), before);
    }

    #[test]
    fn empty_player_ignores_everything() {
        let mut player = ClipPlayer::new();
        player.play();
        player.advance(1.0);
        player.set_frame(3);
        player.stop();
        assert!(!player.is_playing());
        assert!(player.pose().is_none());
    }

    #[test]
    fn emits_playback_notifications() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut player = ClipPlayer::new();
        let sink = seen.clone();
        player.subscribe(move |e| sink.lock().unwrap().push(e.clone()));

        player.load(line_clip("a", 3, 0.1, 0.0), false);
        player.play();
        player.advance(0.1);
        player.advance(1.0);

        let events = seen.lock().unwrap();
        assert!(matches!(events[0], PlayerEvent::MotionLoaded { ref name, frame_count: 3, .. } if name == "a"));
        assert!(events.contains(&PlayerEvent::PlayStateChanged { playing: true }));
        assert_eq!(events.last(), Some(&PlayerEvent::PlayStateChanged { playing: false }));
        let frames: Vec<usize> = events
            .iter()
            .filter_map(|e| match e {
                PlayerEvent::FrameChanged { frame, .. } => Some(*frame),
                _ => None,
            })
            .collect();
        assert_eq!(frames, vec![0, 1, 2]);
    }
}
