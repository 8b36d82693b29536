//! Audio session access for the foreground application
//!
//! `SessionBackend` is the seam between volume policy and the OS: the
//! production implementation talks to Windows Core Audio (`wasapi`), tests
//! substitute a fake. `SessionBridge` layers the policy on top: target
//! caching keyed by the foreground pid, clamping to [0.0, 1.0], fixed-size
//! stepping, and safe defaults when the backend fails (reads report the
//! neutral midpoint, writes become no-ops).

use anyhow::Result;
use log::{debug, warn};

use crate::constants::{VOLUME_STEP, VOLUME_UNKNOWN};

#[cfg(windows)]
pub mod wasapi;

/// OS-facing audio operations, resolved against an opaque per-backend target.
pub trait SessionBackend {
    /// Handle to whatever the backend controls for one application
    /// (an audio session, the default endpoint, or nothing).
    type Target;

    /// Pid of the application currently in the foreground, if any.
    fn foreground_pid(&mut self) -> Option<u32>;

    /// Resolve `pid` to a controllable target. Infallible by contract:
    /// backends degrade internally (e.g. to a device-wide control) rather
    /// than refusing to resolve.
    fn resolve(&mut self, pid: Option<u32>) -> Self::Target;

    fn volume(&mut self, target: &Self::Target) -> Result<f32>;
    fn set_volume(&mut self, target: &Self::Target, level: f32) -> Result<()>;
    fn is_muted(&mut self, target: &Self::Target) -> Result<bool>;
    fn set_muted(&mut self, target: &Self::Target, muted: bool) -> Result<()>;
}

/// One volume step, clamped and rounded to two decimals so repeated
/// up/down presses land on stable values.
pub fn step_volume(current: f32, delta: f32) -> f32 {
    ((current + delta).clamp(0.0, 1.0) * 100.0).round() / 100.0
}

/// Caches the resolved target and applies the volume policy.
pub struct SessionBridge<B: SessionBackend> {
    backend: B,
    cached: Option<(Option<u32>, B::Target)>,
}

impl<B: SessionBackend> SessionBridge<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            cached: None,
        }
    }

    /// Re-resolve only when the foreground pid changes; hotkey bursts against
    /// the same application reuse the cached target.
    fn ensure_target(&mut self, pid: Option<u32>) {
        let stale = match &self.cached {
            Some((cached_pid, _)) => *cached_pid != pid,
            None => true,
        };
        if stale {
            debug!("Resolving audio target for pid {:?}", pid);
            let target = self.backend.resolve(pid);
            self.cached = Some((pid, target));
        }
    }

    /// Current level for `pid`, or `None` when the backend cannot read it.
    pub fn try_volume_of(&mut self, pid: Option<u32>) -> Option<f32> {
        self.ensure_target(pid);
        let Some((_, target)) = &self.cached else {
            return None;
        };
        match self.backend.volume(target) {
            Ok(level) => Some(level.clamp(0.0, 1.0)),
            Err(e) => {
                warn!("Failed to read volume for pid {:?}: {:#}", pid, e);
                None
            }
        }
    }

    /// Current level for `pid`, reporting the neutral midpoint on failure.
    pub fn volume_of(&mut self, pid: Option<u32>) -> f32 {
        self.try_volume_of(pid).unwrap_or(VOLUME_UNKNOWN)
    }

    /// Set the level for `pid`, clamped. Backend failure is a logged no-op.
    pub fn set_volume_of(&mut self, pid: Option<u32>, level: f32) {
        self.ensure_target(pid);
        let Some((_, target)) = &self.cached else {
            return;
        };
        let level = level.clamp(0.0, 1.0);
        if let Err(e) = self.backend.set_volume(target, level) {
            warn!("Failed to set volume for pid {:?}: {:#}", pid, e);
        }
    }

    /// Flip the mute state for `pid`. Backend failure is a logged no-op.
    pub fn toggle_mute_of(&mut self, pid: Option<u32>) {
        self.ensure_target(pid);
        let Some((_, target)) = &self.cached else {
            return;
        };
        let muted = match self.backend.is_muted(target) {
            Ok(muted) => muted,
            Err(e) => {
                warn!("Failed to read mute state for pid {:?}: {:#}", pid, e);
                return;
            }
        };
        if let Err(e) = self.backend.set_muted(target, !muted) {
            warn!("Failed to set mute state for pid {:?}: {:#}", pid, e);
        }
    }

    pub fn foreground_pid(&mut self) -> Option<u32> {
        self.backend.foreground_pid()
    }

    /// Level of the foreground application (0.5 when unknown).
    pub fn current_volume(&mut self) -> f32 {
        let pid = self.backend.foreground_pid();
        self.volume_of(pid)
    }

    /// Level of the foreground application, `None` when unreadable.
    pub fn try_current_volume(&mut self) -> Option<f32> {
        let pid = self.backend.foreground_pid();
        self.try_volume_of(pid)
    }

    /// Step the foreground application's level by `delta` and return the
    /// resulting value.
    pub fn step_current(&mut self, delta: f32) -> f32 {
        let pid = self.backend.foreground_pid();
        let next = step_volume(self.volume_of(pid), delta);
        self.set_volume_of(pid, next);
        next
    }

    pub fn toggle_current_mute(&mut self) {
        let pid = self.backend.foreground_pid();
        self.toggle_mute_of(pid);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Backend where the target is the pid itself and levels live in a map.
    struct FakeBackend {
        foreground: Option<u32>,
        resolve_calls: Vec<Option<u32>>,
        levels: HashMap<Option<u32>, (f32, bool)>,
        fail_reads: bool,
    }

    impl FakeBackend {
        fn new(foreground: Option<u32>) -> Self {
            let mut levels = HashMap::new();
            levels.insert(foreground, (0.5, false));
            Self {
                foreground,
                resolve_calls: Vec::new(),
                levels,
                fail_reads: false,
            }
        }
    }

    impl SessionBackend for FakeBackend {
        type Target = Option<u32>;

        fn foreground_pid(&mut self) -> Option<u32> {
            self.foreground
        }

        fn resolve(&mut self, pid: Option<u32>) -> Self::Target {
            self.resolve_calls.push(pid);
            pid
        }

        fn volume(&mut self, target: &Self::Target) -> Result<f32> {
            if self.fail_reads {
                anyhow::bail!("simulated read failure");
            }
            Ok(self.levels.get(target).map(|(v, _)| *v).unwrap_or(0.0))
        }

        fn set_volume(&mut self, target: &Self::Target, level: f32) -> Result<()> {
            self.levels.entry(*target).or_insert((0.0, false)).0 = level;
            Ok(())
        }

        fn is_muted(&mut self, target: &Self::Target) -> Result<bool> {
            if self.fail_reads {
                anyhow::bail!("simulated read failure");
            }
            Ok(self.levels.get(target).map(|(_, m)| *m).unwrap_or(false))
        }

        fn set_muted(&mut self, target: &Self::Target, muted: bool) -> Result<()> {
            self.levels.entry(*target).or_insert((0.0, false)).1 = muted;
            Ok(())
        }
    }

    #[test]
    fn step_volume_saturates_at_both_ends() {
        assert_eq!(step_volume(0.98, VOLUME_STEP), 1.0);
        assert_eq!(step_volume(0.02, -VOLUME_STEP), 0.0);
        assert_eq!(step_volume(1.0, VOLUME_STEP), 1.0);
        assert_eq!(step_volume(0.0, -VOLUME_STEP), 0.0);
    }

    #[test]
    fn step_volume_rounds_to_two_decimals() {
        assert_eq!(step_volume(0.333, VOLUME_STEP), 0.38);
        assert_eq!(step_volume(0.5, VOLUME_STEP), 0.55);
    }

    #[test]
    fn set_volume_is_clamped() {
        let mut bridge = SessionBridge::new(FakeBackend::new(Some(7)));
        bridge.set_volume_of(Some(7), 1.8);
        assert_eq!(bridge.volume_of(Some(7)), 1.0);
        bridge.set_volume_of(Some(7), -0.4);
        assert_eq!(bridge.volume_of(Some(7)), 0.0);
    }

    #[test]
    fn repeated_steps_reach_the_ceiling() {
        let mut bridge = SessionBridge::new(FakeBackend::new(Some(7)));
        for _ in 0..30 {
            bridge.step_current(VOLUME_STEP);
        }
        assert_eq!(bridge.current_volume(), 1.0);
    }

    #[test]
    fn double_toggle_restores_mute_state() {
        let mut bridge = SessionBridge::new(FakeBackend::new(Some(7)));
        bridge.toggle_current_mute();
        assert!(bridge.backend.levels[&Some(7)].1);
        bridge.toggle_current_mute();
        assert!(!bridge.backend.levels[&Some(7)].1);
    }

    #[test]
    fn target_is_cached_until_the_pid_changes() {
        let mut bridge = SessionBridge::new(FakeBackend::new(Some(1)));
        bridge.volume_of(Some(1));
        bridge.volume_of(Some(1));
        bridge.set_volume_of(Some(1), 0.3);
        assert_eq!(bridge.backend.resolve_calls, vec![Some(1)]);

        bridge.volume_of(Some(2));
        assert_eq!(bridge.backend.resolve_calls, vec![Some(1), Some(2)]);
    }

    #[test]
    fn read_failure_reports_the_neutral_midpoint() {
        let mut backend = FakeBackend::new(Some(7));
        backend.fail_reads = true;
        let mut bridge = SessionBridge::new(backend);
        assert_eq!(bridge.current_volume(), VOLUME_UNKNOWN);
        assert_eq!(bridge.try_current_volume(), None);
    }

    #[test]
    fn mute_toggle_is_a_noop_when_state_is_unreadable() {
        let mut backend = FakeBackend::new(Some(7));
        backend.fail_reads = true;
        let mut bridge = SessionBridge::new(backend);
        bridge.toggle_current_mute();
        assert!(!bridge.backend.levels[&Some(7)].1);
    }
}
