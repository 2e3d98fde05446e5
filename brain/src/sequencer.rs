//! Command sequencing on top of the clip player.
//!
//! The sequencer is a small state machine driven by the host's tick. Progress checks,
//! transition delays and loop restarts are deferred tasks in a single [`Deferred`] slot,
//! so stopping, pausing or entering a new command always cancels what was pending.

use log::{debug, info, warn};
use motion::events::Notifier;
use motion::{ClipPlayer, ClipSource, PlayerEvent};
use std::time::Duration;

use crate::command::{self, MotionCommand};
use crate::config::BrainConfig;
use crate::error::{BrainError, BrainResult};
use crate::schedule::Deferred;

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencerState {
    Idle,
    RunningCommand(usize),
    AwaitingTransition(usize),
    Stopped,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SequencerEvent {
    CommandChanged {
        run: u64,
        index: usize,
        command: MotionCommand,
    },
    CommandProgress {
        run: u64,
        index: usize,
        elapsed: Duration,
        target: Duration,
        progress: f64,
    },
    SequenceComplete {
        run: u64,
    },
    SequenceAborted {
        run: u64,
        index: usize,
        reason: String,
    },
}

impl SequencerEvent {
    pub fn run(&self) -> u64 {
        match self {
            SequencerEvent::CommandChanged { run, .. }
            | SequencerEvent::CommandProgress { run, .. }
            | SequencerEvent::SequenceComplete { run }
            | SequencerEvent::SequenceAborted { run, .. } => *run,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Task {
    Poll,
    Advance,
    Restart,
}

#[derive(Debug)]
struct Suspension {
    pending: Option<(Duration, Task)>,
    resume_player: bool,
}

pub struct Sequencer<S> {
    clips: S,
    player: ClipPlayer,
    poll_interval: Duration,
    settle_delay: Duration,
    commands: Vec<MotionCommand>,
    looping: bool,
    state: SequencerState,
    index: usize,
    run: u64,
    // carry the accumulated transform into the next run
    chain: bool,
    now: Duration,
    elapsed: Duration,
    target: Duration,
    suspension: Option<Suspension>,
    timer: Deferred<Task>,
    events: Notifier<SequencerEvent>,
}

impl<S: ClipSource> Sequencer<S> {
    pub fn new(clips: S, config: &BrainConfig) -> Self {
        Self {
            clips,
            player: ClipPlayer::new(),
            poll_interval: config.poll_interval().max(MIN_POLL_INTERVAL),
            settle_delay: config.settle_delay(),
            commands: Vec::new(),
            looping: false,
            state: SequencerState::Idle,
            index: 0,
            run: 0,
            chain: false,
            now: Duration::ZERO,
            elapsed: Duration::ZERO,
            target: Duration::ZERO,
            suspension: None,
            timer: Deferred::new(),
            events: Notifier::new(),
        }
    }

    pub fn subscribe<F>(&mut self, listener: F)
    where
        F: FnMut(&SequencerEvent) + Send + 'static,
    {
        self.events.subscribe(listener);
    }

    pub fn subscribe_player<F>(&mut self, listener: F)
    where
        F: FnMut(&PlayerEvent) + Send + 'static,
    {
        self.player.subscribe(listener);
    }

    /// Validates `sequence` against the loaded clips, then starts it from the first command.
    ///
    /// A rejected sequence leaves the sequencer exactly as it was.
    pub fn play(&mut self, sequence: &[MotionCommand], looping: bool) -> BrainResult<()> {
        if sequence.is_empty() {
            return Err(BrainError::Validation(vec!["sequence has no commands".to_string()]));
        }
        command::validate(sequence, &self.clips)?;

        self.timer.cancel();
        self.suspension = None;
        self.commands = command::flatten(sequence);
        self.looping = looping;
        self.index = 0;
        self.run += 1;
        info!(
            "run {}: starting {} commands ({} after expansion), loop: {looping}",
            self.run,
            sequence.len(),
            self.commands.len()
        );
        self.enter(0)
    }

    /// Halts from any state. Nothing scheduled survives and no continuity is carried forward.
    pub fn stop(&mut self) {
        self.timer.cancel();
        self.suspension = None;
        if self.is_active() {
            info!("run {}: stopped at command {}", self.run, self.index);
        }
        self.state = SequencerState::Stopped;
        self.index = 0;
        self.chain = false;
        self.player.reset_transform();
        self.player.stop();
    }

    pub fn pause(&mut self) {
        if !self.is_active() || self.suspension.is_some() {
            return;
        }
        let resume_player = self.player.is_playing();
        self.player.pause();
        self.suspension = Some(Suspension {
            pending: self.timer.suspend(self.now),
            resume_player,
        });
        debug!("run {}: paused at command {}", self.run, self.index);
    }

    pub fn resume(&mut self) {
        let Some(suspension) = self.suspension.take() else {
            return;
        };
        if let Some((remaining, task)) = suspension.pending {
            self.timer.schedule(self.now + remaining, task);
        }
        if suspension.resume_player {
            self.player.play();
        }
        debug!("run {}: resumed at command {}", self.run, self.index);
    }

    /// Advances playback by one host tick and fires whatever became due.
    pub fn tick(&mut self, dt: Duration) -> BrainResult<()> {
        self.now += dt;
        if self.suspension.is_some() || !self.is_active() {
            return Ok(());
        }
        if matches!(self.state, SequencerState::RunningCommand(_)) {
            self.elapsed += dt;
        }
        self.player.advance(dt.as_secs_f64());

        while let Some(task) = self.timer.take_due(self.now) {
            self.fire(task)?;
        }
        Ok(())
    }

    fn fire(&mut self, task: Task) -> BrainResult<()> {
        match task {
            Task::Poll => {
                let SequencerState::RunningCommand(index) = self.state else {
                    return Ok(());
                };
                let progress = if self.target.is_zero() {
                    1.0
                } else {
                    self.elapsed.as_secs_f64() / self.target.as_secs_f64()
                };
                self.events.emit(SequencerEvent::CommandProgress {
                    run: self.run,
                    index,
                    elapsed: self.elapsed,
                    target: self.target,
                    progress,
                });
                if self.elapsed >= self.target {
                    self.complete(index)
                } else {
                    self.timer.schedule(self.now + self.poll_interval, Task::Poll);
                    Ok(())
                }
            }
            Task::Advance => self.advance(),
            Task::Restart => {
                debug!("run {}: looping back to the first command", self.run);
                self.index = 0;
                self.enter(0)
            }
        }
    }

    fn enter(&mut self, index: usize) -> BrainResult<()> {
        self.state = SequencerState::RunningCommand(index);
        let command = self.commands[index].clone();
        let Some(clip) = self.clips.clip(&command.motion_id) else {
            return Err(self.abort(index, &command.motion_id));
        };

        let natural = clip.duration();
        let seconds = command.duration.unwrap_or(natural).min(natural).max(0.0);
        self.target = Duration::try_from_secs_f64(seconds).unwrap_or(Duration::ZERO);
        self.elapsed = Duration::ZERO;

        debug!(
            "run {}: command {index} '{}' plays '{}' for {:.3}s",
            self.run, command.id, command.motion_id, seconds
        );
        self.player.load(clip, self.chain);
        self.chain = true;
        self.player.set_loop(false);
        self.player.play();
        self.events.emit(SequencerEvent::CommandChanged {
            run: self.run,
            index,
            command,
        });
        self.timer.schedule(self.now + self.poll_interval, Task::Poll);
        Ok(())
    }

    fn complete(&mut self, index: usize) -> BrainResult<()> {
        self.player.pause();
        let delay = self.commands[index].transition_delay;
        if delay > 0.0 {
            self.state = SequencerState::AwaitingTransition(index);
            let wait = Duration::try_from_secs_f64(delay).unwrap_or(Duration::ZERO);
            self.timer.schedule(self.now + wait, Task::Advance);
            Ok(())
        } else {
            self.advance()
        }
    }

    fn advance(&mut self) -> BrainResult<()> {
        self.index += 1;
        if self.index < self.commands.len() {
            return self.enter(self.index);
        }
        if self.looping {
            let last = self.commands.len() - 1;
            self.state = SequencerState::AwaitingTransition(last);
            self.timer.schedule(self.now + self.settle_delay, Task::Restart);
        } else {
            info!("run {}: sequence complete", self.run);
            self.state = SequencerState::Stopped;
            self.index = 0;
            self.events.emit(SequencerEvent::SequenceComplete { run: self.run });
        }
        Ok(())
    }

    fn abort(&mut self, index: usize, motion_id: &str) -> BrainError {
        let error = BrainError::MissingClip {
            index,
            motion_id: motion_id.to_string(),
        };
        warn!("run {}: aborting, {error}", self.run);
        self.timer.cancel();
        self.player.pause();
        self.state = SequencerState::Stopped;
        self.chain = false;
        self.events.emit(SequencerEvent::SequenceAborted {
            run: self.run,
            index,
            reason: error.to_string(),
        });
        error
    }
}

impl<S> Sequencer<S> {
    pub fn state(&self) -> SequencerState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        matches!(
            self.state,
            SequencerState::RunningCommand(_) | SequencerState::AwaitingTransition(_)
        )
    }

    pub fn is_paused(&self) -> bool {
        self.suspension.is_some()
    }

    pub fn current_index(&self) -> usize {
        self.index
    }

    /// Number of the most recently started run.
    pub fn run(&self) -> u64 {
        self.run
    }

    pub fn commands(&self) -> &[MotionCommand] {
        &self.commands
    }

    /// Time fed to the sequencer so far.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Playing time of the current command and its target.
    pub fn progress(&self) -> (Duration, Duration) {
        (self.elapsed, self.target)
    }

    pub fn player(&self) -> &ClipPlayer {
        &self.player
    }

    /// Manual transport access, refused while a sequence owns the player.
    pub fn manual_player(&mut self) -> Option<&mut ClipPlayer> {
        if self.is_active() { None } else { Some(&mut self.player) }
    }

    pub fn clips(&self) -> &S {
        &self.clips
    }

    pub fn clips_mut(&mut self) -> &mut S {
        &mut self.clips
    }
}
