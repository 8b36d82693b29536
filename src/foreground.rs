//! Foreground window queries and key injection
//!
//! Thin Win32 wrappers: which window has focus, what it is called, and
//! synthesizing a key chord (used to forward the switch-app hotkey as a
//! real Alt+Tab). Everything degrades to `None`/`Err` instead of panicking.

use anyhow::{bail, Context, Result};
use std::mem;
use windows::Win32::Foundation::{CloseHandle, HWND};
use windows::Win32::System::ProcessStatus::GetModuleBaseNameW;
use windows::Win32::System::Threading::{
    OpenProcess, PROCESS_QUERY_INFORMATION, PROCESS_VM_READ,
};
use windows::Win32::UI::Input::KeyboardAndMouse::{
    SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, KEYBDINPUT, KEYBD_EVENT_FLAGS, KEYEVENTF_KEYUP,
    VIRTUAL_KEY, VK_CONTROL, VK_DOWN, VK_ESCAPE, VK_LEFT, VK_LWIN, VK_MENU, VK_RETURN, VK_RIGHT,
    VK_SHIFT, VK_SPACE, VK_TAB, VK_UP,
};
use windows::Win32::UI::WindowsAndMessaging::{
    GetForegroundWindow, GetWindowTextW, GetWindowThreadProcessId,
};

fn foreground_window() -> Option<HWND> {
    // SAFETY: plain query, no ownership transferred.
    let hwnd = unsafe { GetForegroundWindow() };
    if hwnd.is_invalid() {
        None
    } else {
        Some(hwnd)
    }
}

/// Pid of the process owning the focused window.
pub fn foreground_pid() -> Option<u32> {
    let hwnd = foreground_window()?;
    let mut pid: u32 = 0;
    // SAFETY: hwnd was non-null a moment ago; a stale handle yields pid 0.
    unsafe {
        GetWindowThreadProcessId(hwnd, Some(&mut pid));
    }
    if pid == 0 {
        None
    } else {
        Some(pid)
    }
}

/// Title of the focused window, `None` when absent or empty.
pub fn foreground_title() -> Option<String> {
    let hwnd = foreground_window()?;
    let mut buf = [0u16; 512];
    // SAFETY: buffer is stack-owned and sized; the call truncates.
    let len = unsafe { GetWindowTextW(hwnd, &mut buf) };
    if len <= 0 {
        return None;
    }
    let title = String::from_utf16_lossy(&buf[..len as usize])
        .trim()
        .to_string();
    if title.is_empty() {
        None
    } else {
        Some(title)
    }
}

/// Executable base name (e.g. `firefox.exe`) for `pid`.
pub fn process_name(pid: u32) -> Option<String> {
    // SAFETY: handle is closed on every path out of the block.
    unsafe {
        let handle = OpenProcess(PROCESS_QUERY_INFORMATION | PROCESS_VM_READ, false, pid).ok()?;
        let mut buf = [0u16; 260];
        let len = GetModuleBaseNameW(handle, None, &mut buf);
        let _ = CloseHandle(handle);
        if len == 0 {
            return None;
        }
        Some(String::from_utf16_lossy(&buf[..len as usize]))
    }
}

fn virtual_key(token: &str) -> Result<VIRTUAL_KEY> {
    let key = match token {
        "ctrl" | "control" => VK_CONTROL,
        "alt" => VK_MENU,
        "shift" => VK_SHIFT,
        "win" | "super" | "cmd" => VK_LWIN,
        "tab" => VK_TAB,
        "up" => VK_UP,
        "down" => VK_DOWN,
        "left" => VK_LEFT,
        "right" => VK_RIGHT,
        "space" => VK_SPACE,
        "enter" | "return" => VK_RETURN,
        "esc" | "escape" => VK_ESCAPE,
        other => {
            let mut chars = other.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii_alphanumeric() => {
                    VIRTUAL_KEY(c.to_ascii_uppercase() as u16)
                }
                _ => bail!("Unrecognized key token: {}", other),
            }
        }
    };
    Ok(key)
}

fn key_input(key: VIRTUAL_KEY, up: bool) -> INPUT {
    INPUT {
        r#type: INPUT_KEYBOARD,
        Anonymous: INPUT_0 {
            ki: KEYBDINPUT {
                wVk: key,
                wScan: 0,
                dwFlags: if up {
                    KEYEVENTF_KEYUP
                } else {
                    KEYBD_EVENT_FLAGS(0)
                },
                time: 0,
                dwExtraInfo: 0,
            },
        },
    }
}

/// Synthesize pressing `tokens` in order and releasing them in reverse,
/// as one `SendInput` batch.
pub fn send_key_combo(tokens: &[String]) -> Result<()> {
    let keys = tokens
        .iter()
        .map(|t| virtual_key(t))
        .collect::<Result<Vec<_>>>()?;
    if keys.is_empty() {
        bail!("Empty key combination");
    }

    let mut inputs: Vec<INPUT> = keys.iter().map(|&k| key_input(k, false)).collect();
    inputs.extend(keys.iter().rev().map(|&k| key_input(k, true)));

    // SAFETY: inputs is a well-formed INPUT array for the duration of the call.
    let sent = unsafe { SendInput(&inputs, mem::size_of::<INPUT>() as i32) };
    if sent as usize != inputs.len() {
        bail!("SendInput injected {} of {} events", sent, inputs.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modifier_and_named_tokens_resolve() {
        assert_eq!(virtual_key("ctrl").unwrap(), VK_CONTROL);
        assert_eq!(virtual_key("alt").unwrap(), VK_MENU);
        assert_eq!(virtual_key("tab").unwrap(), VK_TAB);
    }

    #[test]
    fn alphanumeric_tokens_map_to_their_code() {
        assert_eq!(virtual_key("m").unwrap(), VIRTUAL_KEY(b'M' as u16));
        assert_eq!(virtual_key("3").unwrap(), VIRTUAL_KEY(b'3' as u16));
    }

    #[test]
    fn unknown_tokens_are_rejected() {
        assert!(virtual_key("f99").is_err());
        assert!(virtual_key("").is_err());
        assert!(virtual_key("médiá").is_err());
    }
}
