//! Native blocking message boxes

use windows::core::PCWSTR;
use windows::Win32::Foundation::HWND;
use windows::Win32::UI::WindowsAndMessaging::{
    MessageBoxW, MB_ICONERROR, MB_ICONINFORMATION, MB_OK,
};

fn wide(text: &str) -> Vec<u16> {
    text.encode_utf16().chain(std::iter::once(0)).collect()
}

/// Blocking error alert, used for failures the tray cannot surface.
pub fn fatal(title: &str, message: &str) {
    let title = wide(title);
    let message = wide(message);
    // SAFETY: both buffers are nul-terminated and outlive the call.
    unsafe {
        MessageBoxW(
            HWND::default(),
            PCWSTR(message.as_ptr()),
            PCWSTR(title.as_ptr()),
            MB_OK | MB_ICONERROR,
        );
    }
}

/// Blocking informational alert.
pub fn info(title: &str, message: &str) {
    let title = wide(title);
    let message = wide(message);
    // SAFETY: both buffers are nul-terminated and outlive the call.
    unsafe {
        MessageBoxW(
            HWND::default(),
            PCWSTR(message.as_ptr()),
            PCWSTR(title.as_ptr()),
            MB_OK | MB_ICONINFORMATION,
        );
    }
}
