//! Application shell: tray icon, event loop, and action wiring
//!
//! Hotkey callbacks run on the listener thread and only post an `AppEvent`
//! through the event loop proxy; everything that touches audio or windows
//! happens in the loop handler on this thread. The loop exits with
//! `EXIT_CODE_RESTART` after the settings dialog saves, and `main` re-runs
//! the whole shell so new bindings take effect from a clean slate.

use anyhow::{Context, Result};
use log::{error, info, warn};
use std::path::PathBuf;
use std::time::Instant;
use tao::event::{Event, WindowEvent};
use tao::event_loop::{ControlFlow, EventLoopBuilder, EventLoopWindowTarget};
use tao::keyboard::ModifiersState;
use tao::platform::run_return::EventLoopExtRunReturn;
use tray_icon::menu::{Menu, MenuEvent, MenuItem, PredefinedMenuItem};
use tray_icon::{TrayIconBuilder, TrayIconEvent};

use crate::audio::wasapi::{self, WasapiBackend};
use crate::audio::SessionBridge;
use crate::config::{Action, ConfigStore};
use crate::constants::{EXIT_CODE_RESTART, NOTIFICATION_TIMEOUT_MS, VOLUME_STEP};
use crate::dialogs;
use crate::foreground;
use crate::hotkeys::{combo_label, HotkeyDispatcher};
use crate::overlay::OverlayPresenter;
use crate::settings::{SettingsOutcome, SettingsWindow};

/// Events marshaled onto the UI thread.
#[derive(Debug, Clone, Copy)]
pub enum AppEvent {
    Hotkey(Action),
}

/// Run the shell until quit (returns the process exit code; 199 means
/// "settings changed, run me again").
pub fn run(config_path: PathBuf) -> Result<i32> {
    wasapi::init_com();

    let mut store = ConfigStore::load(config_path);
    for action in Action::ALL {
        info!(
            "{} bound to {}",
            action.name(),
            combo_label(&store.binding(action))
        );
    }

    let mut bridge = SessionBridge::new(WasapiBackend::new());

    let mut event_loop = EventLoopBuilder::<AppEvent>::with_user_event().build();
    let proxy = event_loop.create_proxy();

    // Tray menu
    let show_item = MenuItem::new("Show Volume", true, None);
    let settings_item = MenuItem::new("Hotkey Settings...", true, None);
    let quit_item = MenuItem::new("Quit", true, None);
    let menu = Menu::new();
    menu.append(&show_item).context("Failed to add show menu item")?;
    menu.append(&settings_item)
        .context("Failed to add settings menu item")?;
    menu.append(&PredefinedMenuItem::separator())
        .context("Failed to add separator")?;
    menu.append(&quit_item).context("Failed to add quit menu item")?;

    // Without the tray the app is unreachable, so this failure is fatal.
    let _tray = match TrayIconBuilder::new()
        .with_menu(Box::new(menu))
        .with_tooltip("AppVol - Application Volume")
        .with_icon(tray_icon_image()?)
        .build()
    {
        Ok(tray) => tray,
        Err(e) => {
            error!("Failed to create tray icon: {}", e);
            dialogs::fatal(
                "AppVol",
                &format!("Failed to create the tray icon:\n{}", e),
            );
            return Err(e).context("Failed to create tray icon");
        }
    };
    info!("Tray icon created");

    let mut overlay = OverlayPresenter::new(
        &event_loop,
        store.config().overlay_opacity(),
        store.config().overlay_timeout_ms(),
    )?;
    let mut settings: Option<SettingsWindow> = None;

    let mut dispatcher = HotkeyDispatcher::new()?;
    for action in Action::ALL {
        let proxy = proxy.clone();
        dispatcher.set_callback(
            action,
            move || {
                let _ = proxy.send_event(AppEvent::Hotkey(action));
            },
            store.config(),
        );
    }
    dispatcher.start();

    if let Err(e) = notify_rust::Notification::new()
        .summary("AppVol")
        .body("AppVol is running. Use the tray icon to configure hotkeys.")
        .timeout(notify_rust::Timeout::Milliseconds(NOTIFICATION_TIMEOUT_MS))
        .show()
    {
        warn!("Failed to show startup notification: {}", e);
    }

    let show_id = show_item.id().clone();
    let settings_id = settings_item.id().clone();
    let quit_id = quit_item.id().clone();

    let mut modifiers = ModifiersState::default();

    let code = event_loop.run_return(move |event, target, control_flow| {
        match event {
            Event::UserEvent(AppEvent::Hotkey(action)) => {
                handle_action(action, &mut bridge, &mut overlay);
            }
            Event::WindowEvent {
                window_id, event, ..
            } => match event {
                WindowEvent::ModifiersChanged(state) => modifiers = state,
                WindowEvent::KeyboardInput {
                    event: key_event, ..
                } => {
                    let outcome = settings.as_mut().and_then(|window| {
                        window
                            .matches(window_id)
                            .then(|| window.handle_key(&key_event, modifiers, &mut store))
                    });
                    match outcome {
                        Some(SettingsOutcome::Cancelled) => {
                            info!("Settings cancelled");
                            settings = None;
                        }
                        Some(SettingsOutcome::Saved) => {
                            info!("Hotkey settings saved, restarting");
                            settings = None;
                            dialogs::info(
                                "AppVol",
                                "Settings saved. The application will now restart.",
                            );
                            *control_flow = ControlFlow::ExitWithCode(EXIT_CODE_RESTART);
                        }
                        Some(SettingsOutcome::Continue) | None => {}
                    }
                }
                WindowEvent::CloseRequested => {
                    if settings.as_ref().is_some_and(|w| w.matches(window_id)) {
                        settings = None;
                    }
                }
                _ => {}
            },
            Event::RedrawRequested(window_id) => {
                if overlay.matches(window_id) {
                    overlay.paint();
                } else if let Some(window) = settings.as_ref() {
                    if window.matches(window_id) {
                        window.paint(&store);
                    }
                }
            }
            Event::LoopDestroyed => {
                dispatcher.stop();
            }
            _ => {}
        }

        while let Ok(menu_event) = MenuEvent::receiver().try_recv() {
            if menu_event.id == show_id {
                overlay.refresh(&mut bridge);
                overlay.show(Instant::now(), None);
            } else if menu_event.id == settings_id {
                open_settings(&mut settings, target);
            } else if menu_event.id == quit_id {
                info!("Quit selected, exiting");
                *control_flow = ControlFlow::Exit;
            }
        }

        while let Ok(tray_event) = TrayIconEvent::receiver().try_recv() {
            if let TrayIconEvent::DoubleClick { .. } = tray_event {
                overlay.refresh(&mut bridge);
                overlay.show(Instant::now(), None);
            }
        }

        let deadline = overlay.tick(Instant::now(), &mut bridge);
        if !matches!(
            *control_flow,
            ControlFlow::Exit | ControlFlow::ExitWithCode(_)
        ) {
            *control_flow = ControlFlow::WaitUntil(deadline);
        }
    });

    Ok(code)
}

fn handle_action(
    action: Action,
    bridge: &mut SessionBridge<WasapiBackend>,
    overlay: &mut OverlayPresenter,
) {
    match action {
        Action::VolumeUp => {
            let level = bridge.step_current(VOLUME_STEP);
            info!("Volume up -> {:.2}", level);
        }
        Action::VolumeDown => {
            let level = bridge.step_current(-VOLUME_STEP);
            info!("Volume down -> {:.2}", level);
        }
        Action::Mute => {
            bridge.toggle_current_mute();
            info!("Mute toggled");
        }
        Action::SwitchApp => {
            let combo = ["alt".to_string(), "tab".to_string()];
            if let Err(e) = foreground::send_key_combo(&combo) {
                warn!("Failed to send app switch keys: {:#}", e);
            }
        }
    }
    overlay.refresh(bridge);
    overlay.show(Instant::now(), None);
}

fn open_settings(
    settings: &mut Option<SettingsWindow>,
    target: &EventLoopWindowTarget<AppEvent>,
) {
    if settings.is_some() {
        return;
    }
    match SettingsWindow::new(target) {
        Ok(window) => *settings = Some(window),
        Err(e) => error!("Failed to open settings window: {:#}", e),
    }
}

/// Speaker-ish 32x32 RGBA square. Generated instead of shipped as an asset.
fn tray_icon_image() -> Result<tray_icon::Icon> {
    let size = 32u32;
    let mut rgba = vec![0u8; (size * size * 4) as usize];
    for y in 0..size {
        for x in 0..size {
            let i = ((y * size + x) * 4) as usize;
            // Blue rounded-square body with a lighter wedge on the right.
            let body = (2..30).contains(&x) && (2..30).contains(&y);
            let wedge = x >= 18 && (8..24).contains(&y) && x.saturating_sub(18) < (y.min(31 - y));
            if body {
                let (r, g, b) = if wedge { (120, 200, 255) } else { (30, 90, 180) };
                rgba[i] = r;
                rgba[i + 1] = g;
                rgba[i + 2] = b;
                rgba[i + 3] = 255;
            }
        }
    }
    tray_icon::Icon::from_rgba(rgba, size, size).context("Failed to build tray icon image")
}
