//! Global hotkey registration and dispatch
//!
//! Bindings are stored as ordered lowercase token lists (`["ctrl", "alt",
//! "up"]`) and parsed into `global_hotkey` registrations. One listener
//! thread drains the event receiver and invokes the callback registered for
//! the matching action; callbacks are expected to be cheap (post an event to
//! the UI loop) and never touch audio or windows directly.

use anyhow::{bail, Context, Result};
use global_hotkey::{
    hotkey::{Code, HotKey, Modifiers},
    GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState,
};
use log::{error, info, warn};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::config::{Action, Config};

/// Parse one token list into a registrable hotkey. Requires exactly one
/// non-modifier key; modifiers may appear in any order.
pub fn parse_binding(tokens: &[String]) -> Result<HotKey> {
    let mut modifiers = Modifiers::empty();
    let mut code: Option<Code> = None;

    for token in tokens {
        match token.to_lowercase().as_str() {
            "ctrl" | "control" => modifiers |= Modifiers::CONTROL,
            "alt" => modifiers |= Modifiers::ALT,
            "shift" => modifiers |= Modifiers::SHIFT,
            "win" | "super" | "cmd" => modifiers |= Modifiers::SUPER,
            key => {
                let parsed = parse_code(key)
                    .with_context(|| format!("Unrecognized key token: {}", key))?;
                if code.replace(parsed).is_some() {
                    bail!("Binding has more than one non-modifier key");
                }
            }
        }
    }

    let Some(code) = code else {
        bail!("Binding has no non-modifier key");
    };
    let modifiers = if modifiers.is_empty() {
        None
    } else {
        Some(modifiers)
    };
    Ok(HotKey::new(modifiers, code))
}

fn parse_code(key: &str) -> Option<Code> {
    let code = match key {
        "a" => Code::KeyA,
        "b" => Code::KeyB,
        "c" => Code::KeyC,
        "d" => Code::KeyD,
        "e" => Code::KeyE,
        "f" => Code::KeyF,
        "g" => Code::KeyG,
        "h" => Code::KeyH,
        "i" => Code::KeyI,
        "j" => Code::KeyJ,
        "k" => Code::KeyK,
        "l" => Code::KeyL,
        "m" => Code::KeyM,
        "n" => Code::KeyN,
        "o" => Code::KeyO,
        "p" => Code::KeyP,
        "q" => Code::KeyQ,
        "r" => Code::KeyR,
        "s" => Code::KeyS,
        "t" => Code::KeyT,
        "u" => Code::KeyU,
        "v" => Code::KeyV,
        "w" => Code::KeyW,
        "x" => Code::KeyX,
        "y" => Code::KeyY,
        "z" => Code::KeyZ,
        "0" => Code::Digit0,
        "1" => Code::Digit1,
        "2" => Code::Digit2,
        "3" => Code::Digit3,
        "4" => Code::Digit4,
        "5" => Code::Digit5,
        "6" => Code::Digit6,
        "7" => Code::Digit7,
        "8" => Code::Digit8,
        "9" => Code::Digit9,
        "up" => Code::ArrowUp,
        "down" => Code::ArrowDown,
        "left" => Code::ArrowLeft,
        "right" => Code::ArrowRight,
        "tab" => Code::Tab,
        "space" => Code::Space,
        "enter" | "return" => Code::Enter,
        "esc" | "escape" => Code::Escape,
        "home" => Code::Home,
        "end" => Code::End,
        "pageup" => Code::PageUp,
        "pagedown" => Code::PageDown,
        "f1" => Code::F1,
        "f2" => Code::F2,
        "f3" => Code::F3,
        "f4" => Code::F4,
        "f5" => Code::F5,
        "f6" => Code::F6,
        "f7" => Code::F7,
        "f8" => Code::F8,
        "f9" => Code::F9,
        "f10" => Code::F10,
        "f11" => Code::F11,
        "f12" => Code::F12,
        _ => return None,
    };
    Some(code)
}

/// Display form of a binding, e.g. `ctrl+alt+up`.
pub fn combo_label(tokens: &[String]) -> String {
    tokens.join("+")
}

type Callback = Box<dyn Fn() + Send + Sync>;

/// Owns the OS hotkey registrations and the listener thread.
pub struct HotkeyDispatcher {
    manager: GlobalHotKeyManager,
    registered: Vec<HotKey>,
    table: Arc<Mutex<HashMap<u32, Action>>>,
    callbacks: Arc<Mutex<HashMap<Action, Callback>>>,
    active: Arc<AtomicBool>,
    listener_started: bool,
}

impl HotkeyDispatcher {
    pub fn new() -> Result<Self> {
        let manager =
            GlobalHotKeyManager::new().context("Failed to create global hotkey manager")?;
        Ok(Self {
            manager,
            registered: Vec::new(),
            table: Arc::new(Mutex::new(HashMap::new())),
            callbacks: Arc::new(Mutex::new(HashMap::new())),
            active: Arc::new(AtomicBool::new(true)),
            listener_started: false,
        })
    }

    /// Register every action's binding from `config`. A binding that fails
    /// to parse or register is logged and skipped; the rest stay live.
    pub fn register_all(&mut self, config: &Config) {
        let mut table = self.table.lock();
        for action in Action::ALL {
            let tokens = config.binding(action);
            let hotkey = match parse_binding(&tokens) {
                Ok(hotkey) => hotkey,
                Err(e) => {
                    error!(
                        "Invalid binding {} for {}: {:#}",
                        combo_label(&tokens),
                        action.name(),
                        e
                    );
                    continue;
                }
            };
            if let Err(e) = self.manager.register(hotkey) {
                error!(
                    "Failed to register {} for {}: {}",
                    combo_label(&tokens),
                    action.name(),
                    e
                );
                continue;
            }
            info!("Registered {} for {}", combo_label(&tokens), action.name());
            table.insert(hotkey.id(), action);
            self.registered.push(hotkey);
        }
    }

    fn unregister_all(&mut self) {
        for hotkey in self.registered.drain(..) {
            if let Err(e) = self.manager.unregister(hotkey) {
                warn!("Failed to unregister hotkey: {}", e);
            }
        }
        self.table.lock().clear();
    }

    /// Drop every registration and re-register from `config`.
    pub fn reload_all(&mut self, config: &Config) {
        self.unregister_all();
        self.register_all(config);
    }

    /// Install the callback for `action`, then re-register all bindings so
    /// the id table and the callback table stay in step.
    pub fn set_callback<F>(&mut self, action: Action, callback: F, config: &Config)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.callbacks.lock().insert(action, Box::new(callback));
        self.reload_all(config);
    }

    /// Start the listener thread. Idempotent.
    pub fn start(&mut self) {
        if self.listener_started {
            return;
        }
        self.listener_started = true;
        self.active.store(true, Ordering::SeqCst);

        let table = Arc::clone(&self.table);
        let callbacks = Arc::clone(&self.callbacks);
        let active = Arc::clone(&self.active);

        thread::Builder::new()
            .name("hotkey-listener".into())
            .spawn(move || {
                let receiver = GlobalHotKeyEvent::receiver();
                while active.load(Ordering::SeqCst) {
                    let event = match receiver.recv_timeout(Duration::from_millis(200)) {
                        Ok(event) => event,
                        Err(_) => continue,
                    };
                    if event.state != HotKeyState::Pressed {
                        continue;
                    }
                    let action = table.lock().get(&event.id).copied();
                    if let Some(action) = action {
                        if let Some(callback) = callbacks.lock().get(&action) {
                            callback();
                        }
                    }
                }
                info!("Hotkey listener stopped");
            })
            .map(|_| ())
            .unwrap_or_else(|e| error!("Failed to spawn hotkey listener: {}", e));
    }

    /// Unregister everything and wind down the listener thread.
    pub fn stop(&mut self) {
        self.active.store(false, Ordering::SeqCst);
        self.unregister_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn parses_modifiers_and_key() {
        let hotkey = parse_binding(&tokens(&["ctrl", "alt", "up"])).unwrap();
        let expected = HotKey::new(
            Some(Modifiers::CONTROL | Modifiers::ALT),
            Code::ArrowUp,
        );
        assert_eq!(hotkey.id(), expected.id());
    }

    #[test]
    fn modifier_order_does_not_matter() {
        let a = parse_binding(&tokens(&["ctrl", "alt", "m"])).unwrap();
        let b = parse_binding(&tokens(&["alt", "ctrl", "m"])).unwrap();
        assert_eq!(a.id(), b.id());
    }

    #[test]
    fn bare_key_binding_is_allowed() {
        let hotkey = parse_binding(&tokens(&["f5"])).unwrap();
        assert_eq!(hotkey.id(), HotKey::new(None, Code::F5).id());
    }

    #[test]
    fn rejects_modifier_only_bindings() {
        assert!(parse_binding(&tokens(&["ctrl", "shift"])).is_err());
        assert!(parse_binding(&[]).is_err());
    }

    #[test]
    fn rejects_two_non_modifier_keys() {
        assert!(parse_binding(&tokens(&["ctrl", "a", "b"])).is_err());
    }

    #[test]
    fn rejects_unknown_tokens() {
        assert!(parse_binding(&tokens(&["ctrl", "volume_knob"])).is_err());
    }

    #[test]
    fn combo_label_joins_tokens() {
        assert_eq!(combo_label(&tokens(&["ctrl", "alt", "m"])), "ctrl+alt+m");
    }
}
