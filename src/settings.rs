//! Hotkey settings dialog
//!
//! The dialog is keyboard driven: arrows pick an action, Enter arms
//! recording, the next non-repeated key press (with whatever modifiers are
//! held) becomes the staged binding, Ctrl+S confirms everything to disk,
//! Esc discards. Modifier-only presses keep the recording open: a combo is
//! only staged once a non-modifier key arrives, since a binding without one
//! cannot be registered as a hotkey. The recording and staging rules live
//! in pure types here; the tao/GDI window is Windows-only.

use std::collections::HashMap;

use crate::config::{Action, ConfigStore};
use crate::hotkeys::combo_label;

/// Modifier keys held during a capture.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ModifierFlags {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
}

impl ModifierFlags {
    fn tokens(self) -> Vec<String> {
        let mut tokens = Vec::new();
        if self.ctrl {
            tokens.push("ctrl".to_string());
        }
        if self.alt {
            tokens.push("alt".to_string());
        }
        if self.shift {
            tokens.push("shift".to_string());
        }
        tokens
    }
}

/// Ordered token list for a captured press: modifiers first, then the key.
pub fn compose_combo(mods: ModifierFlags, key: Option<&str>) -> Option<Vec<String>> {
    let key = key?;
    let mut tokens = mods.tokens();
    tokens.push(key.to_string());
    Some(tokens)
}

/// What a key press did to the open dialog.
#[derive(Debug, PartialEq, Eq)]
pub enum SettingsOutcome {
    /// Dialog stays open.
    Continue,
    /// Esc: discard staged changes and close.
    Cancelled,
    /// Ctrl+S with staged changes: persisted, caller restarts.
    Saved,
}

/// Selection, recording and staging state of the dialog.
pub struct SettingsState {
    selected: usize,
    recording: bool,
    staged: HashMap<Action, Vec<String>>,
    message: Option<String>,
}

impl SettingsState {
    pub fn new() -> Self {
        Self {
            selected: 0,
            recording: false,
            staged: HashMap::new(),
            message: None,
        }
    }

    pub fn selected_action(&self) -> Action {
        Action::ALL[self.selected]
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Binding shown for `action`: staged if present, else the stored one.
    pub fn displayed_binding(&self, action: Action, store: &ConfigStore) -> Vec<String> {
        self.staged
            .get(&action)
            .cloned()
            .unwrap_or_else(|| store.binding(action))
    }

    pub fn select_next(&mut self) {
        if !self.recording {
            self.selected = (self.selected + 1) % Action::ALL.len();
        }
    }

    pub fn select_prev(&mut self) {
        if !self.recording {
            self.selected = (self.selected + Action::ALL.len() - 1) % Action::ALL.len();
        }
    }

    pub fn begin_recording(&mut self) {
        self.recording = true;
        self.message = None;
    }

    /// Feed one key press while recording. Auto-repeats and modifier-only
    /// presses keep recording; the first real key (plus held modifiers)
    /// becomes the staged binding. Returns true when a combo was staged.
    pub fn capture(&mut self, mods: ModifierFlags, key: Option<&str>, repeat: bool) -> bool {
        if !self.recording || repeat {
            return false;
        }
        let Some(tokens) = compose_combo(mods, key) else {
            return false;
        };
        let action = self.selected_action();
        self.message = Some(format!(
            "{}: {}",
            action.label(),
            combo_label(&tokens)
        ));
        self.staged.insert(action, tokens);
        self.recording = false;
        true
    }

    /// Persist every staged binding. With nothing staged the dialog shows a
    /// validation message and stays open.
    pub fn confirm(&mut self, store: &mut ConfigStore) -> bool {
        if self.staged.is_empty() {
            self.message = Some("No new key combination recorded".to_string());
            return false;
        }
        for (action, tokens) in self.staged.drain() {
            store.set_binding(action, tokens);
        }
        true
    }
}

impl Default for SettingsState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(windows)]
pub use platform::SettingsWindow;

#[cfg(windows)]
mod platform {
    use super::{ModifierFlags, SettingsOutcome, SettingsState};
    use crate::config::{Action, ConfigStore};
    use crate::constants::{SETTINGS_HEIGHT, SETTINGS_WIDTH};
    use crate::hotkeys::combo_label;
    use anyhow::{Context, Result};
    use tao::dpi::PhysicalSize;
    use tao::event::{ElementState, KeyEvent};
    use tao::event_loop::EventLoopWindowTarget;
    use tao::keyboard::{KeyCode, ModifiersState};
    use tao::platform::windows::WindowExtWindows;
    use tao::window::{Window, WindowBuilder, WindowId};
    use windows::Win32::Foundation::{COLORREF, HWND, RECT};
    use windows::Win32::Graphics::Gdi::{
        CreateSolidBrush, DeleteObject, DrawTextW, FillRect, GetDC, ReleaseDC, SetBkMode,
        SetTextColor, DT_SINGLELINE, DT_VCENTER, TRANSPARENT,
    };
    use windows::Win32::UI::WindowsAndMessaging::GetClientRect;

    const COLOR_BACKGROUND: COLORREF = COLORREF(0x00281E1E);
    const COLOR_TEXT: COLORREF = COLORREF(0x00FFFFFF);
    const COLOR_DIM: COLORREF = COLORREF(0x00A0A0A0);
    const ROW_HEIGHT: i32 = 32;

    /// Modal-ish settings window (one at a time, owned by the shell).
    pub struct SettingsWindow {
        window: Window,
        state: SettingsState,
    }

    impl SettingsWindow {
        pub fn new<T>(target: &EventLoopWindowTarget<T>) -> Result<Self> {
            let window = WindowBuilder::new()
                .with_title("AppVol Hotkey Settings")
                .with_resizable(false)
                .with_inner_size(PhysicalSize::new(SETTINGS_WIDTH, SETTINGS_HEIGHT))
                .build(target)
                .context("Failed to create settings window")?;
            window.set_focus();
            Ok(Self {
                window,
                state: SettingsState::new(),
            })
        }

        pub fn matches(&self, id: WindowId) -> bool {
            self.window.id() == id
        }

        /// Route one keyboard event. `mods` is the loop's tracked modifier
        /// state at the time of the event.
        pub fn handle_key(
            &mut self,
            event: &KeyEvent,
            mods: ModifiersState,
            store: &mut ConfigStore,
        ) -> SettingsOutcome {
            if event.state != ElementState::Pressed {
                return SettingsOutcome::Continue;
            }

            if self.state.is_recording() {
                let flags = ModifierFlags {
                    ctrl: mods.control_key(),
                    alt: mods.alt_key(),
                    shift: mods.shift_key(),
                };
                self.state
                    .capture(flags, key_token(event.physical_key), event.repeat);
                self.window.request_redraw();
                return SettingsOutcome::Continue;
            }

            let outcome = match event.physical_key {
                KeyCode::ArrowDown => {
                    self.state.select_next();
                    SettingsOutcome::Continue
                }
                KeyCode::ArrowUp => {
                    self.state.select_prev();
                    SettingsOutcome::Continue
                }
                KeyCode::Enter => {
                    self.state.begin_recording();
                    SettingsOutcome::Continue
                }
                KeyCode::KeyS if mods.control_key() => {
                    if self.state.confirm(store) {
                        SettingsOutcome::Saved
                    } else {
                        SettingsOutcome::Continue
                    }
                }
                KeyCode::Escape => SettingsOutcome::Cancelled,
                _ => SettingsOutcome::Continue,
            };
            self.window.request_redraw();
            outcome
        }

        /// One row per action plus a status/hint footer.
        pub fn paint(&self, store: &ConfigStore) {
            let hwnd = HWND(self.window.hwnd() as _);
            // SAFETY: DC and brushes are scoped to this call.
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

                for (i, action) in Action::ALL.into_iter().enumerate() {
                    let selected = action == self.state.selected_action();
                    let marker = if selected { ">" } else { " " };
                    let binding = if selected && self.state.is_recording() {
                        "press a key combination...".to_string()
                    } else {
                        combo_label(&self.state.displayed_binding(action, store))
                    };
                    let line = format!("{} {:<20} {}", marker, action.label(), binding);
                    SetTextColor(hdc, if selected { COLOR_TEXT } else { COLOR_DIM });
                    draw_line(hdc, &client, 15 + i as i32 * ROW_HEIGHT, &line);
                }

                SetTextColor(hdc, COLOR_DIM);
                if let Some(message) = self.state.message() {
                    draw_line(hdc, &client, client.bottom - 70, message);
                }
                draw_line(
                    hdc,
                    &client,
                    client.bottom - 40,
                    "Up/Down select  Enter record  Ctrl+S save  Esc cancel",
                );

                ReleaseDC(hwnd, hdc);
            }
        }

        pub fn request_redraw(&self) {
            self.window.request_redraw();
        }
    }

    unsafe fn draw_line(
        hdc: windows::Win32::Graphics::Gdi::HDC,
        client: &RECT,
        top: i32,
        text: &str,
    ) {
        let mut rect = RECT {
            left: client.left + 15,
            top,
            right: client.right - 15,
            bottom: top + ROW_HEIGHT,
        };
        let mut wide: Vec<u16> = text.encode_utf16().collect();
        DrawTextW(hdc, &mut wide, &mut rect, DT_SINGLELINE | DT_VCENTER);
    }

    /// Token for a captured key, `None` for modifier keys (those keep the
    /// recording open) and anything unmapped.
    fn key_token(code: KeyCode) -> Option<&'static str> {
        let token = match code {
            KeyCode::KeyA => "a",
            KeyCode::KeyB => "b",
            KeyCode::KeyC => "c",
            KeyCode::KeyD => "d",
            KeyCode::KeyE => "e",
            KeyCode::KeyF => "f",
            KeyCode::KeyG => "g",
            KeyCode::KeyH => "h",
            KeyCode::KeyI => "i",
            KeyCode::KeyJ => "j",
            KeyCode::KeyK => "k",
            KeyCode::KeyL => "l",
            KeyCode::KeyM => "m",
            KeyCode::KeyN => "n",
            KeyCode::KeyO => "o",
            KeyCode::KeyP => "p",
            KeyCode::KeyQ => "q",
            KeyCode::KeyR => "r",
            KeyCode::KeyS => "s",
            KeyCode::KeyT => "t",
            KeyCode::KeyU => "u",
            KeyCode::KeyV => "v",
            KeyCode::KeyW => "w",
            KeyCode::KeyX => "x",
            KeyCode::KeyY => "y",
            KeyCode::KeyZ => "z",
            KeyCode::Digit0 => "0",
            KeyCode::Digit1 => "1",
            KeyCode::Digit2 => "2",
            KeyCode::Digit3 => "3",
            KeyCode::Digit4 => "4",
            KeyCode::Digit5 => "5",
            KeyCode::Digit6 => "6",
            KeyCode::Digit7 => "7",
            KeyCode::Digit8 => "8",
            KeyCode::Digit9 => "9",
            KeyCode::ArrowUp => "up",
            KeyCode::ArrowDown => "down",
            KeyCode::ArrowLeft => "left",
            KeyCode::ArrowRight => "right",
            KeyCode::Tab => "tab",
            KeyCode::Space => "space",
            KeyCode::Enter => "enter",
            KeyCode::Escape => "esc",
            KeyCode::Home => "home",
            KeyCode::End => "end",
            KeyCode::PageUp => "pageup",
            KeyCode::PageDown => "pagedown",
            KeyCode::F1 => "f1",
            KeyCode::F2 => "f2",
            KeyCode::F3 => "f3",
            KeyCode::F4 => "f4",
            KeyCode::F5 => "f5",
            KeyCode::F6 => "f6",
            KeyCode::F7 => "f7",
            KeyCode::F8 => "f8",
            KeyCode::F9 => "f9",
            KeyCode::F10 => "f10",
            KeyCode::F11 => "f11",
            KeyCode::F12 => "f12",
            _ => return None,
        };
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, ConfigStore) {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::load(dir.path().join("config.json"));
        (dir, store)
    }

    fn mods(ctrl: bool, alt: bool, shift: bool) -> ModifierFlags {
        ModifierFlags { ctrl, alt, shift }
    }

    #[test]
    fn compose_orders_modifiers_before_the_key() {
        let combo = compose_combo(mods(true, true, false), Some("m")).unwrap();
        assert_eq!(combo, vec!["ctrl", "alt", "m"]);
    }

    #[test]
    fn compose_requires_a_non_modifier_key() {
        assert_eq!(compose_combo(mods(true, false, false), None), None);
    }

    #[test]
    fn capture_ignores_auto_repeat_and_modifier_only_presses() {
        let mut state = SettingsState::new();
        state.begin_recording();
        assert!(!state.capture(mods(true, false, false), Some("m"), true));
        assert!(!state.capture(mods(true, false, false), None, false));
        assert!(state.is_recording());
    }

    #[test]
    fn capture_stages_a_combo_and_stops_recording() {
        let mut state = SettingsState::new();
        state.begin_recording();
        assert!(state.capture(mods(true, false, true), Some("p"), false));
        assert!(!state.is_recording());

        let (_dir, store) = store();
        assert_eq!(
            state.displayed_binding(state.selected_action(), &store),
            vec!["ctrl", "shift", "p"]
        );
    }

    #[test]
    fn selection_wraps_both_ways() {
        let mut state = SettingsState::new();
        state.select_prev();
        assert_eq!(state.selected_action(), *Action::ALL.last().unwrap());
        state.select_next();
        assert_eq!(state.selected_action(), Action::ALL[0]);
    }

    #[test]
    fn confirm_with_nothing_staged_keeps_the_dialog_open() {
        let mut state = SettingsState::new();
        let (_dir, mut store) = store();
        assert!(!state.confirm(&mut store));
        assert_eq!(state.message(), Some("No new key combination recorded"));
    }

    #[test]
    fn confirm_drains_staged_changes() {
        let mut state = SettingsState::new();
        let (_dir, mut store) = store();

        state.begin_recording();
        state.capture(mods(true, false, false), Some("k"), false);
        assert!(state.confirm(&mut store));

        // A second confirm has nothing staged and must not save again.
        assert!(!state.confirm(&mut store));
        assert_eq!(state.message(), Some("No new key combination recorded"));
    }

    #[test]
    fn confirm_persists_staged_bindings() {
        let mut state = SettingsState::new();
        let (_dir, mut store) = store();

        state.begin_recording();
        state.capture(mods(true, true, false), Some("j"), false);
        assert!(state.confirm(&mut store));

        let action = state.selected_action();
        assert_eq!(store.binding(action), vec!["ctrl", "alt", "j"]);

        let reloaded = ConfigStore::load(store.path().to_path_buf());
        assert_eq!(reloaded.binding(action), vec!["ctrl", "alt", "j"]);
    }
}
