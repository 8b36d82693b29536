//! Centralized constants for AppVol
//!
//! This module contains all configurable numerical values used throughout
//! the application. Each constant includes documentation on its purpose,
//! unit, and recommended value range.

// ============================================================================
// VOLUME CONTROL
// ============================================================================

/// Amount a single volume-up/volume-down hotkey press moves the level.
/// Unit: linear scalar in [0.0, 1.0]
/// Recommended range: 0.01-0.10
pub const VOLUME_STEP: f32 = 0.05;

/// Level reported when the current volume cannot be determined.
/// Unit: linear scalar in [0.0, 1.0]
/// Range: Fixed at the neutral midpoint, callers treat it as "unknown"
pub const VOLUME_UNKNOWN: f32 = 0.5;

// ============================================================================
// OVERLAY
// ============================================================================

/// Period of the overlay refresh tick (app name + volume re-query).
/// Unit: milliseconds
/// Range: Fixed at 500; the tick runs regardless of visibility
pub const OVERLAY_REFRESH_MS: u64 = 500;

/// Default overlay auto-hide timeout when no config exists.
/// Unit: milliseconds
/// Recommended range: 1000-5000
pub const OVERLAY_TIMEOUT_DEFAULT_MS: u64 = 2000;

/// Minimum accepted auto-hide timeout; smaller configured values are clamped.
/// Unit: milliseconds
pub const OVERLAY_TIMEOUT_MIN_MS: u64 = 100;

/// Default overlay window opacity when no config exists.
/// Unit: fraction in [0.0, 1.0]
pub const OVERLAY_OPACITY_DEFAULT: f64 = 0.85;

/// Maximum characters of the displayed application name before truncation.
/// Unit: characters
pub const APP_NAME_MAX_CHARS: usize = 40;

/// Overlay panel dimensions.
/// Unit: logical pixels
pub const OVERLAY_WIDTH: u32 = 300;
pub const OVERLAY_HEIGHT: u32 = 150;

/// Gap between the overlay and the screen's top/right edges.
/// Unit: logical pixels
pub const OVERLAY_SCREEN_MARGIN: i32 = 20;

// ============================================================================
// SETTINGS WINDOW
// ============================================================================

/// Settings dialog dimensions.
/// Unit: logical pixels
pub const SETTINGS_WIDTH: u32 = 420;
pub const SETTINGS_HEIGHT: u32 = 280;

// ============================================================================
// PROCESS LIFECYCLE
// ============================================================================

/// Exit code meaning "settings changed, please restart".
/// Range: Fixed, observed by the supervisor loop in main()
pub const EXIT_CODE_RESTART: i32 = 199;

// ============================================================================
// NOTIFICATIONS
// ============================================================================

/// Startup notification display duration.
/// Unit: milliseconds
/// Recommended range: 2000-5000
pub const NOTIFICATION_TIMEOUT_MS: u32 = 3000;
