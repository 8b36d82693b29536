//! Windows Core Audio backend
//!
//! Resolution order for a pid: enumerate the default render endpoint's audio
//! sessions and take the one owned by that process (`ISimpleAudioVolume`);
//! when the process has no session, degrade to the endpoint's master control
//! (`IAudioEndpointVolume`) so the hotkeys still do something useful. Only
//! when even the endpoint is unreachable does the target become inert.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::ptr;
use windows::core::Interface;
use windows::Win32::Media::Audio::Endpoints::IAudioEndpointVolume;
use windows::Win32::Media::Audio::{
    eMultimedia, eRender, IAudioSessionControl2, IAudioSessionManager2, IMMDevice,
    IMMDeviceEnumerator, ISimpleAudioVolume, MMDeviceEnumerator,
};
use windows::Win32::System::Com::{
    CoCreateInstance, CoInitializeEx, CLSCTX_ALL, COINIT_APARTMENTTHREADED,
};

use super::SessionBackend;
use crate::foreground;

/// Initialize COM for the calling thread. `S_FALSE` (already initialized)
/// is fine; real failures are logged and the process continues, since every
/// later COM call reports its own error through the bridge's safe defaults.
pub fn init_com() {
    // SAFETY: standard single-call apartment initialization for this thread.
    let hr = unsafe { CoInitializeEx(None, COINIT_APARTMENTTHREADED) };
    if hr.is_err() {
        warn!("COM initialization failed: {:?}", hr);
    }
}

/// What a pid resolved to.
pub enum WasapiTarget {
    /// The process owns an audio session on the default endpoint.
    PerProcessSession(ISimpleAudioVolume),
    /// No per-process session; control the endpoint master instead.
    DefaultEndpoint(IAudioEndpointVolume),
    /// Audio subsystem unreachable. All operations fail.
    Unavailable,
}

pub struct WasapiBackend;

impl WasapiBackend {
    pub fn new() -> Self {
        Self
    }

    fn default_device() -> Result<IMMDevice> {
        // SAFETY: COM calls against the default multimedia render endpoint.
        unsafe {
            let enumerator: IMMDeviceEnumerator =
                CoCreateInstance(&MMDeviceEnumerator, None, CLSCTX_ALL)
                    .context("Failed to create device enumerator")?;
            enumerator
                .GetDefaultAudioEndpoint(eRender, eMultimedia)
                .context("No default render endpoint")
        }
    }

    fn endpoint_volume() -> Result<IAudioEndpointVolume> {
        let device = Self::default_device()?;
        // SAFETY: activating a documented endpoint interface.
        unsafe {
            device
                .Activate::<IAudioEndpointVolume>(CLSCTX_ALL, None)
                .context("Failed to activate endpoint volume control")
        }
    }

    /// Scan the endpoint's sessions for one owned by `pid`.
    fn session_for_pid(pid: u32) -> Result<Option<ISimpleAudioVolume>> {
        let device = Self::default_device()?;
        // SAFETY: session enumeration over COM interfaces held for the
        // duration of the loop.
        unsafe {
            let manager: IAudioSessionManager2 = device
                .Activate(CLSCTX_ALL, None)
                .context("Failed to activate session manager")?;
            let sessions = manager
                .GetSessionEnumerator()
                .context("Failed to enumerate audio sessions")?;
            let count = sessions.GetCount().context("Failed to count sessions")?;
            for i in 0..count {
                let Ok(session) = sessions.GetSession(i) else {
                    continue;
                };
                let Ok(control) = Interface::cast::<IAudioSessionControl2>(&session) else {
                    continue;
                };
                if control.GetProcessId().ok() != Some(pid) {
                    continue;
                }
                let volume = Interface::cast::<ISimpleAudioVolume>(&session)
                    .context("Session has no volume control")?;
                return Ok(Some(volume));
            }
            Ok(None)
        }
    }
}

impl Default for WasapiBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionBackend for WasapiBackend {
    type Target = WasapiTarget;

    fn foreground_pid(&mut self) -> Option<u32> {
        foreground::foreground_pid()
    }

    fn resolve(&mut self, pid: Option<u32>) -> WasapiTarget {
        if let Some(pid) = pid {
            match Self::session_for_pid(pid) {
                Ok(Some(session)) => {
                    debug!("Using per-process audio session for pid {}", pid);
                    return WasapiTarget::PerProcessSession(session);
                }
                Ok(None) => {
                    info!("Pid {} has no audio session, using default endpoint", pid);
                }
                Err(e) => {
                    warn!("Session lookup failed for pid {}: {:#}", pid, e);
                }
            }
        }
        match Self::endpoint_volume() {
            Ok(endpoint) => WasapiTarget::DefaultEndpoint(endpoint),
            Err(e) => {
                warn!("Default endpoint unavailable: {:#}", e);
                WasapiTarget::Unavailable
            }
        }
    }

    fn volume(&mut self, target: &WasapiTarget) -> Result<f32> {
        // SAFETY: reads on live COM interfaces owned by the target.
        unsafe {
            match target {
                WasapiTarget::PerProcessSession(session) => session
                    .GetMasterVolume()
                    .context("Failed to read session volume"),
                WasapiTarget::DefaultEndpoint(endpoint) => endpoint
                    .GetMasterVolumeLevelScalar()
                    .context("Failed to read endpoint volume"),
                WasapiTarget::Unavailable => anyhow::bail!("Audio subsystem unavailable"),
            }
        }
    }

    fn set_volume(&mut self, target: &WasapiTarget, level: f32) -> Result<()> {
        // SAFETY: writes on live COM interfaces; a null event context GUID
        // means "no originator" and is accepted by both interfaces.
        unsafe {
            match target {
                WasapiTarget::PerProcessSession(session) => session
                    .SetMasterVolume(level, ptr::null())
                    .context("Failed to set session volume"),
                WasapiTarget::DefaultEndpoint(endpoint) => endpoint
                    .SetMasterVolumeLevelScalar(level, ptr::null())
                    .context("Failed to set endpoint volume"),
                WasapiTarget::Unavailable => anyhow::bail!("Audio subsystem unavailable"),
            }
        }
    }

    fn is_muted(&mut self, target: &WasapiTarget) -> Result<bool> {
        // SAFETY: reads on live COM interfaces owned by the target.
        unsafe {
            match target {
                WasapiTarget::PerProcessSession(session) => Ok(session
                    .GetMute()
                    .context("Failed to read session mute state")?
                    .as_bool()),
                WasapiTarget::DefaultEndpoint(endpoint) => Ok(endpoint
                    .GetMute()
                    .context("Failed to read endpoint mute state")?
                    .as_bool()),
                WasapiTarget::Unavailable => anyhow::bail!("Audio subsystem unavailable"),
            }
        }
    }

    fn set_muted(&mut self, target: &WasapiTarget, muted: bool) -> Result<()> {
        // SAFETY: writes on live COM interfaces, null event context as above.
        unsafe {
            match target {
                WasapiTarget::PerProcessSession(session) => session
                    .SetMute(muted, ptr::null())
                    .context("Failed to set session mute state"),
                WasapiTarget::DefaultEndpoint(endpoint) => endpoint
                    .SetMute(muted, ptr::null())
                    .context("Failed to set endpoint mute state"),
                WasapiTarget::Unavailable => anyhow::bail!("Audio subsystem unavailable"),
            }
        }
    }
}
