//! Transient volume overlay
//!
//! Split in two layers: `OverlayTimers` and the label helpers are pure
//! policy (auto-hide deadline that restarts rather than stacks, a 500 ms
//! refresh tick that runs regardless of visibility) and carry the tests;
//! `OverlayPresenter` is the Windows-only tao window with GDI painting.

use std::time::{Duration, Instant};

use crate::constants::{APP_NAME_MAX_CHARS, OVERLAY_REFRESH_MS};

/// Deadlines driving the overlay. `hide_at` is the auto-hide deadline
/// (present only while visible); `next_refresh` always advances.
pub struct OverlayTimers {
    next_refresh: Instant,
    hide_at: Option<Instant>,
}

impl OverlayTimers {
    pub fn new(now: Instant) -> Self {
        Self {
            next_refresh: now + Duration::from_millis(OVERLAY_REFRESH_MS),
            hide_at: None,
        }
    }

    /// Arm (or re-arm) the auto-hide deadline. Showing the overlay while it
    /// is already visible replaces the deadline, it never stacks.
    pub fn arm_hide(&mut self, now: Instant, timeout: Duration) {
        self.hide_at = Some(now + timeout);
    }

    pub fn cancel_hide(&mut self) {
        self.hide_at = None;
    }

    /// True once the auto-hide deadline passes; consuming, so one arm yields
    /// exactly one hide.
    pub fn hide_due(&mut self, now: Instant) -> bool {
        match self.hide_at {
            Some(at) if now >= at => {
                self.hide_at = None;
                true
            }
            _ => false,
        }
    }

    /// True when a refresh tick has elapsed. Catches up after a stall
    /// instead of firing once per missed period.
    pub fn refresh_due(&mut self, now: Instant) -> bool {
        if now < self.next_refresh {
            return false;
        }
        while self.next_refresh <= now {
            self.next_refresh += Duration::from_millis(OVERLAY_REFRESH_MS);
        }
        true
    }

    /// Earliest pending deadline, for the event loop's wait.
    pub fn next_deadline(&self) -> Instant {
        match self.hide_at {
            Some(at) => at.min(self.next_refresh),
            None => self.next_refresh,
        }
    }
}

/// Pick the displayed name: window title, then process name, then "System".
pub fn overlay_label(title: Option<&str>, process: Option<&str>) -> String {
    let name = title
        .filter(|t| !t.trim().is_empty())
        .or(process)
        .unwrap_or("System");
    truncate_label(name)
}

fn truncate_label(name: &str) -> String {
    if name.chars().count() <= APP_NAME_MAX_CHARS {
        return name.to_string();
    }
    let head: String = name.chars().take(APP_NAME_MAX_CHARS - 3).collect();
    format!("{}...", head)
}

#[cfg(windows)]
pub use platform::OverlayPresenter;

#[cfg(windows)]
mod platform {
    use super::{overlay_label, OverlayTimers};
    use crate::audio::{SessionBackend, SessionBridge};
    use crate::constants::{
        OVERLAY_HEIGHT, OVERLAY_SCREEN_MARGIN, OVERLAY_WIDTH,
    };
    use crate::foreground;
    use anyhow::{Context, Result};
    use log::warn;
    use std::time::{Duration, Instant};
    use tao::dpi::{PhysicalPosition, PhysicalSize};
    use tao::event_loop::EventLoopWindowTarget;
    use tao::platform::windows::WindowExtWindows;
    use tao::window::{Window, WindowBuilder};
    use windows::Win32::Foundation::{COLORREF, HWND, RECT};
    use windows::Win32::Graphics::Gdi::{
        CreateSolidBrush, DeleteObject, DrawTextW, FillRect, GetDC, ReleaseDC, SetBkMode,
        SetTextColor, DT_CENTER, DT_SINGLELINE, DT_VCENTER, TRANSPARENT,
    };
    use windows::Win32::UI::WindowsAndMessaging::{
        GetClientRect, GetWindowLongPtrW, SetLayeredWindowAttributes, SetWindowLongPtrW,
        GWL_EXSTYLE, LWA_ALPHA, WS_EX_LAYERED, WS_EX_NOACTIVATE, WS_EX_TOOLWINDOW,
    };

    // COLORREF layout is 0x00BBGGRR.
    const COLOR_BACKGROUND: COLORREF = COLORREF(0x00281E1E);
    const COLOR_BAR_TRACK: COLORREF = COLORREF(0x00504646);
    const COLOR_BAR_FILL: COLORREF = COLORREF(0x0078C850);
    const COLOR_TEXT: COLORREF = COLORREF(0x00FFFFFF);

    /// The borderless always-on-top panel in the screen's top-right corner.
    pub struct OverlayPresenter {
        window: Window,
        timers: OverlayTimers,
        visible: bool,
        label: String,
        volume_text: String,
        volume_frac: Option<f32>,
        default_timeout: Duration,
    }

    impl OverlayPresenter {
        pub fn new<T>(
            target: &EventLoopWindowTarget<T>,
            opacity: f64,
            default_timeout_ms: u64,
        ) -> Result<Self> {
            let window = WindowBuilder::new()
                .with_title("AppVol")
                .with_decorations(false)
                .with_always_on_top(true)
                .with_resizable(false)
                .with_visible(false)
                .with_inner_size(PhysicalSize::new(OVERLAY_WIDTH, OVERLAY_HEIGHT))
                .build(target)
                .context("Failed to create overlay window")?;

            if let Some(monitor) = window.primary_monitor() {
                let screen = monitor.size();
                let x = screen.width as i32 - OVERLAY_WIDTH as i32 - OVERLAY_SCREEN_MARGIN;
                window.set_outer_position(PhysicalPosition::new(x, OVERLAY_SCREEN_MARGIN));
            }

            let presenter = Self {
                window,
                timers: OverlayTimers::new(Instant::now()),
                visible: false,
                label: String::from("System"),
                volume_text: String::new(),
                volume_frac: None,
                default_timeout: Duration::from_millis(default_timeout_ms),
            };
            presenter.apply_layered_style(opacity);
            Ok(presenter)
        }

        fn hwnd(&self) -> HWND {
            HWND(self.window.hwnd() as _)
        }

        /// Layered + no-activate + hidden-from-alt-tab, with a whole-window
        /// alpha from the configured opacity.
        fn apply_layered_style(&self, opacity: f64) {
            let hwnd = self.hwnd();
            // SAFETY: window handle is live for the presenter's lifetime.
            unsafe {
                let ex_style = GetWindowLongPtrW(hwnd, GWL_EXSTYLE);
                SetWindowLongPtrW(
                    hwnd,
                    GWL_EXSTYLE,
                    ex_style
                        | WS_EX_LAYERED.0 as isize
                        | WS_EX_NOACTIVATE.0 as isize
                        | WS_EX_TOOLWINDOW.0 as isize,
                );
                let alpha = (opacity.clamp(0.0, 1.0) * 255.0) as u8;
                if let Err(e) =
                    SetLayeredWindowAttributes(hwnd, COLORREF(0), alpha, LWA_ALPHA)
                {
                    warn!("Failed to set overlay opacity: {}", e);
                }
            }
        }

        pub fn matches(&self, id: tao::window::WindowId) -> bool {
            self.window.id() == id
        }

        /// Show the overlay (re-arming the hide deadline if already visible).
        /// `timeout` overrides the configured default when given.
        pub fn show(&mut self, now: Instant, timeout: Option<Duration>) {
            self.timers
                .arm_hide(now, timeout.unwrap_or(self.default_timeout));
            if !self.visible {
                self.visible = true;
                self.window.set_visible(true);
            }
            self.window.request_redraw();
        }

        pub fn hide(&mut self) {
            if self.visible {
                self.visible = false;
                self.window.set_visible(false);
            }
            self.timers.cancel_hide();
        }

        /// Re-query the foreground app and its volume, updating what the
        /// next paint shows. Runs on every refresh tick, visible or not.
        pub fn refresh<B: SessionBackend>(&mut self, bridge: &mut SessionBridge<B>) {
            let pid = bridge.foreground_pid();
            let title = foreground::foreground_title();
            let process = pid.and_then(foreground::process_name);
            self.label = overlay_label(title.as_deref(), process.as_deref());

            match bridge.try_volume_of(pid) {
                Some(level) => {
                    self.volume_frac = Some(level);
                    self.volume_text = format!("{:.0}%", level * 100.0);
                }
                None => {
                    self.volume_frac = None;
                    self.volume_text = String::from("Volume: error");
                }
            }
            if self.visible {
                self.window.request_redraw();
            }
        }

        /// Drive the timers. Returns deadlines for the event loop's wait.
        pub fn tick<B: SessionBackend>(
            &mut self,
            now: Instant,
            bridge: &mut SessionBridge<B>,
        ) -> Instant {
            if self.timers.refresh_due(now) {
                self.refresh(bridge);
            }
            if self.timers.hide_due(now) {
                self.hide();
            }
            self.timers.next_deadline()
        }

        /// GDI paint: app name on top, percent text, then the level bar.
        pub fn paint(&self) {
            let hwnd = self.hwnd();
            // SAFETY: DC acquired and released in this scope; GDI objects
            // deleted after use.
            unsafe {
                let hdc = GetDC(hwnd);
                if hdc.is_invalid() {
                    return;
                }
                let mut client = RECT::default();
                let _ = GetClientRect(hwnd, &mut client);

                let background = CreateSolidBrush(COLOR_BACKGROUND);
                FillRect(hdc, &client, background);
                let _ = DeleteObject(background);

                SetBkMode(hdc, TRANSPARENT);
                SetTextColor(hdc, COLOR_TEXT);

                let mut name_rect = RECT {
                    left: client.left + 10,
                    top: client.top + 15,
                    right: client.right - 10,
                    bottom: client.top + 55,
                };
                let mut name: Vec<u16> = self.label.encode_utf16().collect();
                DrawTextW(
                    hdc,
                    &mut name,
                    &mut name_rect,
                    DT_CENTER | DT_SINGLELINE | DT_VCENTER,
                );

                let mut level_rect = RECT {
                    left: client.left + 10,
                    top: client.top + 55,
                    right: client.right - 10,
                    bottom: client.top + 90,
                };
                let mut level: Vec<u16> = self.volume_text.encode_utf16().collect();
                DrawTextW(
                    hdc,
                    &mut level,
                    &mut level_rect,
                    DT_CENTER | DT_SINGLELINE | DT_VCENTER,
                );

                let track = RECT {
                    left: client.left + 20,
                    top: client.bottom - 45,
                    right: client.right - 20,
                    bottom: client.bottom - 25,
                };
                let track_brush = CreateSolidBrush(COLOR_BAR_TRACK);
                FillRect(hdc, &track, track_brush);
                let _ = DeleteObject(track_brush);

                if let Some(frac) = self.volume_frac {
                    let width = (track.right - track.left) as f32 * frac.clamp(0.0, 1.0);
                    let fill = RECT {
                        right: track.left + width as i32,
                        ..track
                    };
                    let fill_brush = CreateSolidBrush(COLOR_BAR_FILL);
                    FillRect(hdc, &fill, fill_brush);
                    let _ = DeleteObject(fill_brush);
                }

                ReleaseDC(hwnd, hdc);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(base: Instant, ms: u64) -> Instant {
        base + Duration::from_millis(ms)
    }

    #[test]
    fn hide_fires_once_after_the_deadline() {
        let base = Instant::now();
        let mut timers = OverlayTimers::new(base);
        timers.arm_hide(base, Duration::from_millis(2000));

        assert!(!timers.hide_due(at(base, 1999)));
        assert!(timers.hide_due(at(base, 2000)));
        assert!(!timers.hide_due(at(base, 5000)));
    }

    #[test]
    fn rearming_replaces_the_deadline() {
        let base = Instant::now();
        let mut timers = OverlayTimers::new(base);
        timers.arm_hide(base, Duration::from_millis(2000));
        timers.arm_hide(at(base, 1500), Duration::from_millis(2000));

        assert!(!timers.hide_due(at(base, 2500)));
        assert!(timers.hide_due(at(base, 3500)));
    }

    #[test]
    fn cancel_disarms_the_deadline() {
        let base = Instant::now();
        let mut timers = OverlayTimers::new(base);
        timers.arm_hide(base, Duration::from_millis(100));
        timers.cancel_hide();
        assert!(!timers.hide_due(at(base, 1000)));
    }

    #[test]
    fn refresh_ticks_every_period_and_catches_up() {
        let base = Instant::now();
        let mut timers = OverlayTimers::new(base);

        assert!(!timers.refresh_due(at(base, 499)));
        assert!(timers.refresh_due(at(base, 500)));
        assert!(!timers.refresh_due(at(base, 700)));
        // A long stall yields one tick, not a burst.
        assert!(timers.refresh_due(at(base, 3000)));
        assert!(!timers.refresh_due(at(base, 3100)));
    }

    #[test]
    fn next_deadline_prefers_the_sooner_event() {
        let base = Instant::now();
        let mut timers = OverlayTimers::new(base);
        assert_eq!(timers.next_deadline(), at(base, 500));

        timers.arm_hide(base, Duration::from_millis(200));
        assert_eq!(timers.next_deadline(), at(base, 200));
    }

    #[test]
    fn label_prefers_title_then_process_then_system() {
        assert_eq!(overlay_label(Some("Firefox"), Some("firefox.exe")), "Firefox");
        assert_eq!(overlay_label(Some("   "), Some("firefox.exe")), "firefox.exe");
        assert_eq!(overlay_label(None, None), "System");
    }

    #[test]
    fn long_labels_are_truncated_with_ellipsis() {
        let long = "x".repeat(60);
        let label = overlay_label(Some(&long), None);
        assert_eq!(label.chars().count(), APP_NAME_MAX_CHARS);
        assert!(label.ends_with("..."));
    }
}
