//! Per-frame dispatch
//!
//! Each tick decides which detection streams are due, polls their sources
//! and runs every mapping bound to a due stream. Mappings whose value moved
//! produce one [`ControlMessage`] each, in table order.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info};

use crate::mapping::MappingTable;
use crate::pose::{normalize, BodyPart, HandPair, HandSelection, KeypointSet, Landmark, Reading, Stream};
use crate::sources::Sources;

/// A control value addressed to the external sink
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlMessage {
    pub channel: u8,
    pub controller: u8,
    pub value: f64,
}

/// Scheduling and confidence settings for one detection stream
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamSettings {
    /// Detection runs on one tick out of every `skip_size`
    pub skip_size: u32,
    /// Keypoints scoring at or below this are ignored
    pub min_confidence: f64,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            skip_size: 1,
            min_confidence: 0.5,
        }
    }
}

/// Video frame dimensions in pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameSize {
    pub width: f64,
    pub height: f64,
}

impl Default for FrameSize {
    fn default() -> Self {
        Self {
            width: 640.0,
            height: 480.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DispatchSettings {
    pub frame: FrameSize,
    pub body: StreamSettings,
    /// Shared by both hand streams
    pub hands: StreamSettings,
    pub hand_selection: HandSelection,
}

impl DispatchSettings {
    pub fn stream(&self, stream: Stream) -> &StreamSettings {
        match stream {
            Stream::Body => &self.body,
            Stream::LeftHand | Stream::RightHand => &self.hands,
        }
    }
}

/// Shared flag used to stop a dispatch loop from another thread or task
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    requested: Arc<AtomicBool>,
}

impl StopHandle {
    /// Request a stop; takes effect before the next tick does any work
    pub fn stop(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.requested.store(false, Ordering::SeqCst);
    }
}

/// Frame counter gating one stream's detections
#[derive(Debug)]
struct StreamTracker {
    skip_size: u64,
    counter: u64,
}

impl StreamTracker {
    fn new(skip_size: u32) -> Self {
        Self {
            skip_size: u64::from(skip_size.max(1)),
            counter: 0,
        }
    }

    /// Count one tick; true when this tick is due for detection
    fn advance(&mut self) -> bool {
        let due = self.counter % self.skip_size == 0;
        self.counter += 1;
        due
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct DueStreams {
    body: bool,
    left: bool,
    right: bool,
}

impl DueStreams {
    fn contains(&self, stream: Stream) -> bool {
        match stream {
            Stream::Body => self.body,
            Stream::LeftHand => self.left,
            Stream::RightHand => self.right,
        }
    }

    fn any(&self) -> bool {
        self.body || self.left || self.right
    }
}

struct Session {
    sources: Sources,
    body: StreamTracker,
    left: StreamTracker,
    right: StreamTracker,
}

impl Session {
    fn new(sources: Sources, settings: &DispatchSettings) -> Self {
        Self {
            sources,
            body: StreamTracker::new(settings.body.skip_size),
            left: StreamTracker::new(settings.hands.skip_size),
            right: StreamTracker::new(settings.hands.skip_size),
        }
    }

    fn advance(&mut self) -> DueStreams {
        DueStreams {
            body: self.body.advance(),
            left: self.left.advance(),
            right: self.right.advance(),
        }
    }
}

enum State {
    Idle,
    Running(Session),
}

/// Whether a dispatch loop is consuming sources
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
}

/// Detections gathered for one tick
struct TickInput {
    due: DueStreams,
    body: KeypointSet<BodyPart>,
    hands: HandPair,
}

impl TickInput {
    fn reading(&self, landmark: Landmark) -> Reading {
        match landmark {
            Landmark::Body(part) => self.body.reading(part),
            Landmark::Hand(side, part) => self.hands.side(side).reading(part),
        }
    }
}

/// The per-frame orchestrator
pub struct DispatchLoop {
    settings: DispatchSettings,
    state: State,
    stop: StopHandle,
}

impl DispatchLoop {
    pub fn new(settings: DispatchSettings) -> Self {
        Self {
            settings,
            state: State::Idle,
            stop: StopHandle::default(),
        }
    }

    pub fn settings(&self) -> &DispatchSettings {
        &self.settings
    }

    pub fn state(&self) -> LoopState {
        match self.state {
            State::Idle => LoopState::Idle,
            State::Running(_) => LoopState::Running,
        }
    }

    pub fn is_running(&self) -> bool {
        self.state() == LoopState::Running
    }

    /// Handle for stopping this loop from elsewhere
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Begin consuming `sources`. When already running the new sources
    /// replace the old ones and the frame counters carry on.
    pub fn start(&mut self, sources: Sources) {
        if let State::Running(session) = &mut self.state {
            session.sources = sources;
            info!("dispatch loop switched sources");
            return;
        }

        self.stop.reset();
        self.state = State::Running(Session::new(sources, &self.settings));
        info!(
            body_skip = self.settings.body.skip_size,
            hand_skip = self.settings.hands.skip_size,
            "dispatch loop started"
        );
    }

    /// Go idle, dropping the sources and frame counters
    pub fn stop(&mut self) {
        if let State::Running(_) = self.state {
            self.state = State::Idle;
            info!("dispatch loop stopped");
        }
    }

    /// Run one frame. `emit` receives every changed mapping's value in
    /// table order. Returns the number of messages emitted.
    pub fn tick<F>(&mut self, table: &mut MappingTable, mut emit: F) -> usize
    where
        F: FnMut(ControlMessage),
    {
        if self.stop.is_requested() {
            self.stop();
            return 0;
        }

        let Some(input) = self.detect() else {
            return 0;
        };

        // A stop requested while detection was in flight discards its result
        if self.stop.is_requested() {
            self.stop();
            return 0;
        }

        let frame = self.settings.frame;
        let mut emitted = 0;

        for mapping in table.iter_mut() {
            let stream = mapping.landmark().stream();
            if !input.due.contains(stream) {
                continue;
            }

            let min_confidence = self.settings.stream(stream).min_confidence;
            let reading = input.reading(mapping.landmark());
            let position = normalize(&reading, min_confidence, frame.height, frame.width);

            if let Some(value) = mapping.advance(&position) {
                let message = ControlMessage {
                    channel: mapping.channel(),
                    controller: mapping.controller(),
                    value,
                };
                debug!(
                    landmark = %mapping.landmark(),
                    channel = message.channel,
                    controller = message.controller,
                    value,
                    "control change"
                );
                emit(message);
                emitted += 1;
            }
        }

        emitted
    }

    fn detect(&mut self) -> Option<TickInput> {
        let State::Running(session) = &mut self.state else {
            return None;
        };

        let due = session.advance();
        if !due.any() {
            return None;
        }

        let body = if due.body {
            session.sources.poll_body()
        } else {
            KeypointSet::new()
        };
        let hands = if due.left || due.right {
            session.sources.poll_hands(self.settings.hand_selection)
        } else {
            HandPair::default()
        };

        Some(TickInput { due, body, hands })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::Mapping;
    use crate::pose::{Axis, DetectedHand, HandPart, Handedness};
    use crate::sources::{HandSource, PoseSource};
    use anyhow::anyhow;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;

    /// Frame 640x480 with a confidence threshold of 0.5 on every stream
    fn settings(body_skip: u32, hand_skip: u32) -> DispatchSettings {
        DispatchSettings {
            frame: FrameSize {
                width: 640.0,
                height: 480.0,
            },
            body: StreamSettings {
                skip_size: body_skip,
                min_confidence: 0.5,
            },
            hands: StreamSettings {
                skip_size: hand_skip,
                min_confidence: 0.5,
            },
            hand_selection: HandSelection::First,
        }
    }

    /// Pixel row for a normalized height (0 = bottom)
    fn row(height: f64) -> f64 {
        (1.0 - height) * 480.0
    }

    /// Replays scripted right wrist heights; `None` is a low-confidence frame
    struct ScriptedPose {
        heights: VecDeque<Option<f64>>,
        calls: Arc<AtomicUsize>,
    }

    impl ScriptedPose {
        fn new(heights: Vec<Option<f64>>) -> Self {
            Self {
                heights: heights.into(),
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl PoseSource for ScriptedPose {
        fn name(&self) -> &str {
            "scripted"
        }

        fn estimate_pose(&mut self) -> anyhow::Result<KeypointSet<BodyPart>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.heights.pop_front().ok_or_else(|| anyhow!("script over"))?;
            Ok(match next {
                Some(h) => KeypointSet::new().with(BodyPart::RightWrist, 320.0, row(h), 0.9),
                None => KeypointSet::new().with(BodyPart::RightWrist, 320.0, row(0.5), 0.1),
            })
        }
    }

    /// Counts calls and reports a fresh height each time
    struct Sweep {
        calls: Arc<AtomicUsize>,
    }

    impl PoseSource for Sweep {
        fn name(&self) -> &str {
            "sweep"
        }

        fn estimate_pose(&mut self) -> anyhow::Result<KeypointSet<BodyPart>> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            let height = (n % 10) as f64 / 10.0;
            Ok(KeypointSet::new().with(BodyPart::RightWrist, 320.0, row(height), 0.9))
        }
    }

    /// Requests a stop while "inferring"
    struct StopsMidDetection {
        handle: StopHandle,
    }

    impl PoseSource for StopsMidDetection {
        fn name(&self) -> &str {
            "stops"
        }

        fn estimate_pose(&mut self) -> anyhow::Result<KeypointSet<BodyPart>> {
            self.handle.stop();
            Ok(KeypointSet::new().with(BodyPart::RightWrist, 320.0, 0.0, 0.9))
        }
    }

    struct TwoRightHands;

    impl HandSource for TwoRightHands {
        fn name(&self) -> &str {
            "hands"
        }

        fn estimate_hands(&mut self) -> anyhow::Result<Vec<DetectedHand>> {
            let hand = |x: f64| DetectedHand {
                handedness: Handedness::Right,
                score: 0.9,
                keypoints: KeypointSet::new().with(HandPart::IndexFingerTip, x, 240.0, 0.9),
            };
            Ok(vec![hand(160.0), hand(480.0)])
        }
    }

    fn wrist_table() -> MappingTable {
        let mut table = MappingTable::new();
        table
            .add(
                Mapping::builder(Landmark::Body(BodyPart::RightWrist), Axis::Y)
                    .with_address(1, 40)
                    .build()
                    .unwrap(),
            )
            .unwrap();
        table
    }

    fn run_ticks(dispatch: &mut DispatchLoop, table: &mut MappingTable, ticks: usize) -> Vec<ControlMessage> {
        let mut out = Vec::new();
        for _ in 0..ticks {
            dispatch.tick(table, |m| out.push(m));
        }
        out
    }

    #[test]
    fn test_idle_loop_does_nothing() {
        let mut dispatch = DispatchLoop::new(settings(1, 1));
        let mut table = wrist_table();

        assert_eq!(dispatch.state(), LoopState::Idle);
        assert_eq!(dispatch.tick(&mut table, |_| panic!("emitted while idle")), 0);
    }

    #[test]
    fn test_round_trip_full_range() {
        let mut dispatch = DispatchLoop::new(settings(1, 1));
        let mut table = wrist_table();
        let source = ScriptedPose::new(vec![Some(0.0), Some(0.0), Some(1.0), Some(1.0), Some(0.0)]);
        dispatch.start(Sources::new().with_body(source));

        let values: Vec<f64> = run_ticks(&mut dispatch, &mut table, 5)
            .iter()
            .map(|m| m.value)
            .collect();

        assert_eq!(values, vec![0.0, 127.0, 0.0]);
    }

    #[test]
    fn test_messages_carry_address() {
        let mut dispatch = DispatchLoop::new(settings(1, 1));
        let mut table = wrist_table();
        dispatch.start(Sources::new().with_body(ScriptedPose::new(vec![Some(0.5)])));

        let out = run_ticks(&mut dispatch, &mut table, 1);
        assert_eq!(
            out,
            vec![ControlMessage {
                channel: 1,
                controller: 40,
                value: 63.5
            }]
        );
    }

    #[test]
    fn test_skip_size_gates_detection() {
        let mut dispatch = DispatchLoop::new(settings(5, 5));
        let mut table = wrist_table();
        let calls = Arc::new(AtomicUsize::new(0));
        dispatch.start(Sources::new().with_body(Sweep {
            calls: Arc::clone(&calls),
        }));

        let mut emitted_on = Vec::new();
        for tick in 0..12 {
            if dispatch.tick(&mut table, |_| {}) > 0 {
                emitted_on.push(tick);
            }
        }

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(emitted_on, vec![0, 5, 10]);
    }

    #[test]
    fn test_dropout_holds_last_value() {
        let mut dispatch = DispatchLoop::new(settings(1, 1));
        let mut table = wrist_table();
        let source = ScriptedPose::new(vec![Some(0.5), None, None, None, Some(0.5), Some(1.0)]);
        dispatch.start(Sources::new().with_body(source));

        let out = run_ticks(&mut dispatch, &mut table, 1);
        assert_eq!(out.len(), 1);
        let held = table.all()[0].previous_value();
        assert_eq!(held, 63.5);

        // Low confidence: nothing emitted, nothing reset
        for _ in 0..3 {
            assert_eq!(dispatch.tick(&mut table, |_| {}), 0);
            assert_eq!(table.all()[0].previous_value(), held);
        }

        // Recovers at the same position: still no change to report
        assert_eq!(dispatch.tick(&mut table, |_| {}), 0);
        assert_eq!(table.all()[0].previous_value(), held);

        let out = run_ticks(&mut dispatch, &mut table, 1);
        assert_eq!(out[0].value, 127.0);
    }

    #[test]
    fn test_source_failure_is_empty_tick() {
        let mut dispatch = DispatchLoop::new(settings(1, 1));
        let mut table = wrist_table();
        // Script runs out after one frame, later calls fail
        dispatch.start(Sources::new().with_body(ScriptedPose::new(vec![Some(1.0)])));

        assert_eq!(run_ticks(&mut dispatch, &mut table, 4).len(), 1);
        assert!(dispatch.is_running());
        assert_eq!(table.all()[0].previous_value(), 127.0);
    }

    #[test]
    fn test_glide_limits_per_tick() {
        let mut dispatch = DispatchLoop::new(settings(1, 1));
        let mut table = MappingTable::new();
        table
            .add(
                Mapping::builder(Landmark::Body(BodyPart::RightWrist), Axis::Y)
                    .with_glide_step(40.0)
                    .build()
                    .unwrap(),
            )
            .unwrap();
        let source = ScriptedPose::new(vec![Some(1.0); 6]);
        dispatch.start(Sources::new().with_body(source));

        let values: Vec<f64> = run_ticks(&mut dispatch, &mut table, 6)
            .iter()
            .map(|m| m.value)
            .collect();

        assert_eq!(values, vec![40.0, 80.0, 120.0, 127.0]);
    }

    #[test]
    fn test_emission_follows_table_order() {
        let mut dispatch = DispatchLoop::new(settings(1, 1));
        let mut table = MappingTable::new();
        for controller in [30, 10, 20] {
            table
                .add(
                    Mapping::builder(Landmark::Body(BodyPart::RightWrist), Axis::Y)
                        .with_address(1, controller)
                        .build()
                        .unwrap(),
                )
                .unwrap();
        }
        dispatch.start(Sources::new().with_body(ScriptedPose::new(vec![Some(0.25)])));

        let controllers: Vec<u8> = run_ticks(&mut dispatch, &mut table, 1)
            .iter()
            .map(|m| m.controller)
            .collect();
        assert_eq!(controllers, vec![30, 10, 20]);
    }

    #[test]
    fn test_stop_takes_effect_before_next_tick() {
        let mut dispatch = DispatchLoop::new(settings(1, 1));
        let mut table = wrist_table();
        let calls = Arc::new(AtomicUsize::new(0));
        dispatch.start(Sources::new().with_body(Sweep {
            calls: Arc::clone(&calls),
        }));

        dispatch.stop_handle().stop();
        assert_eq!(dispatch.tick(&mut table, |_| {}), 0);
        assert_eq!(dispatch.state(), LoopState::Idle);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_stop_during_detection_discards_result() {
        let mut dispatch = DispatchLoop::new(settings(1, 1));
        let mut table = wrist_table();
        let handle = dispatch.stop_handle();
        dispatch.start(Sources::new().with_body(StopsMidDetection { handle }));

        assert_eq!(dispatch.tick(&mut table, |_| {}), 0);
        assert_eq!(dispatch.state(), LoopState::Idle);
        assert_eq!(table.all()[0].previous_value(), 0.0);
    }

    #[test]
    fn test_restart_resets_counters() {
        let mut dispatch = DispatchLoop::new(settings(3, 3));
        let mut table = wrist_table();
        let calls = Arc::new(AtomicUsize::new(0));
        let sweep = || Sweep {
            calls: Arc::clone(&calls),
        };

        dispatch.start(Sources::new().with_body(sweep()));
        run_ticks(&mut dispatch, &mut table, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        dispatch.stop();
        dispatch.start(Sources::new().with_body(sweep()));
        // Fresh tracker: the first tick after a restart is due
        run_ticks(&mut dispatch, &mut table, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_start_while_running_keeps_counters() {
        let mut dispatch = DispatchLoop::new(settings(3, 3));
        let mut table = wrist_table();
        let calls = Arc::new(AtomicUsize::new(0));
        let sweep = || Sweep {
            calls: Arc::clone(&calls),
        };

        dispatch.start(Sources::new().with_body(sweep()));
        run_ticks(&mut dispatch, &mut table, 1);
        dispatch.start(Sources::new().with_body(sweep()));
        run_ticks(&mut dispatch, &mut table, 2);

        // Ticks 1 and 2 are still skipped after switching sources
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(dispatch.is_running());
    }

    #[test]
    fn test_loops_do_not_share_counters() {
        let calls_a = Arc::new(AtomicUsize::new(0));
        let calls_b = Arc::new(AtomicUsize::new(0));
        let mut a = DispatchLoop::new(settings(2, 2));
        let mut b = DispatchLoop::new(settings(2, 2));
        let mut table_a = wrist_table();
        let mut table_b = wrist_table();

        a.start(Sources::new().with_body(Sweep { calls: Arc::clone(&calls_a) }));
        run_ticks(&mut a, &mut table_a, 1);
        b.start(Sources::new().with_body(Sweep { calls: Arc::clone(&calls_b) }));
        run_ticks(&mut b, &mut table_b, 1);

        assert_eq!(calls_a.load(Ordering::SeqCst), 1);
        assert_eq!(calls_b.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_hand_mapping_uses_first_right_hand() {
        let mut dispatch = DispatchLoop::new(settings(1, 1));
        let mut table = MappingTable::new();
        table
            .add(
                Mapping::builder(Landmark::Hand(Handedness::Right, HandPart::IndexFingerTip), Axis::X)
                    .build()
                    .unwrap(),
            )
            .unwrap();
        dispatch.start(Sources::new().with_hands(TwoRightHands));

        let out = run_ticks(&mut dispatch, &mut table, 1);
        // 160 / 640 of the way across
        assert_eq!(out[0].value, 31.75);
    }

    #[test]
    fn test_body_mapping_ignores_hand_ticks() {
        // Body detection every 4th tick, hands every tick
        let mut dispatch = DispatchLoop::new(settings(4, 1));
        let mut table = wrist_table();
        let calls = Arc::new(AtomicUsize::new(0));
        dispatch.start(
            Sources::new()
                .with_body(Sweep { calls: Arc::clone(&calls) })
                .with_hands(TwoRightHands),
        );

        let out = run_ticks(&mut dispatch, &mut table, 4);
        assert_eq!(out.len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
