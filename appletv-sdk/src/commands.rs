//! Capability writes from the platform, translated into channel calls

use std::time::Duration;

use appletv_api::{Button, ControlMessage, MediaCommand, PressMode};
use appletv_session::Session;
use appletv_state::capability::*;
use appletv_state::CapabilityValue;
use tracing::debug;

use crate::error::{Result, SdkError};
use crate::kind::DeviceKind;

/// How long Siri is held for a `remote_siri` press
pub const SIRI_HOLD: Duration = Duration::from_millis(1000);

/// One call on one channel
#[derive(Debug, Clone, PartialEq)]
pub enum Invocation {
    /// Remote/input channel button press
    Press(Button, PressMode),
    /// Remote/input channel media command
    Media(MediaCommand),
    /// Realtime control channel message
    Control(ControlMessage),
}

/// Whether writes to `capability` are acted on at all
pub fn is_command(capability: &str) -> bool {
    matches!(
        capability,
        ONOFF | SPEAKER_PLAYING | SPEAKER_NEXT | SPEAKER_PREV | VOLUME_SET | VOLUME_UP | VOLUME_DOWN | VOLUME_MUTE
    ) || remote_button(capability).is_some()
}

/// Capabilities of `kind` that get a write listener
pub fn command_capabilities(kind: DeviceKind) -> impl Iterator<Item = &'static str> {
    kind.capabilities().iter().copied().filter(|name| is_command(name))
}

/// Translate a capability write into the call it triggers.
///
/// `Ok(None)` means the write is accepted but does nothing, which is how
/// remote buttons treat being set back to `false`.
pub fn translate(kind: DeviceKind, capability: &str, value: &CapabilityValue) -> Result<Option<Invocation>> {
    if let Some((button, mode)) = remote_button(capability) {
        return Ok((value.as_bool() == Some(true)).then_some(Invocation::Press(button, mode)));
    }

    let invocation = match capability {
        ONOFF => {
            let button = if require_bool(capability, value)? {
                Button::Wake
            } else {
                Button::Sleep
            };
            Invocation::Press(button, PressMode::Tap)
        }
        SPEAKER_PLAYING => {
            let command = if require_bool(capability, value)? {
                MediaCommand::Play
            } else {
                MediaCommand::Pause
            };
            media(kind, command)
        }
        SPEAKER_NEXT => media(kind, MediaCommand::NextTrack),
        SPEAKER_PREV => media(kind, MediaCommand::PreviousTrack),
        VOLUME_UP => Invocation::Press(Button::VolumeUp, PressMode::Tap),
        VOLUME_DOWN => Invocation::Press(Button::VolumeDown, PressMode::Tap),
        VOLUME_MUTE => Invocation::Press(Button::PageUp, PressMode::Tap),
        VOLUME_SET => {
            let volume = value
                .as_f64()
                .filter(|v| (0.0..=1.0).contains(v))
                .ok_or_else(|| invalid(capability, value))?;
            Invocation::Control(ControlMessage::SetVolume { volume: volume as f32 })
        }
        other => return Err(SdkError::UnknownCapability(other.to_string())),
    };

    Ok(Some(invocation))
}

/// Run an invocation on the session's channels
pub async fn dispatch(session: &Session, invocation: Invocation) -> Result<()> {
    debug!(?invocation, "Dispatching capability command");

    match invocation {
        Invocation::Press(button, mode) => {
            let remote = session.remote().ok_or(SdkError::NotConnected)?;
            remote.press_button(button, mode).await?;
        }
        Invocation::Media(command) => {
            let remote = session.remote().ok_or(SdkError::NotConnected)?;
            remote.media_control_command(command).await?;
        }
        Invocation::Control(message) => {
            let control = session.control().ok_or(SdkError::NotConnected)?;
            control.send(message).await?;
        }
    }
    Ok(())
}

/// Media commands go over the remote channel when the kind has one
fn media(kind: DeviceKind, command: MediaCommand) -> Invocation {
    if kind.has_remote() {
        Invocation::Media(command)
    } else {
        Invocation::Control(ControlMessage::SendCommand(command))
    }
}

fn remote_button(capability: &str) -> Option<(Button, PressMode)> {
    let button = match capability {
        REMOTE_UP => Button::Up,
        REMOTE_DOWN => Button::Down,
        REMOTE_LEFT => Button::Left,
        REMOTE_RIGHT => Button::Right,
        REMOTE_SELECT => Button::Select,
        REMOTE_HOME => Button::Home,
        REMOTE_BACK => Button::Menu,
        REMOTE_PLAYPAUSE => Button::PlayPause,
        REMOTE_SIRI => return Some((Button::Siri, PressMode::Hold(SIRI_HOLD))),
        _ => return None,
    };
    Some((button, PressMode::Tap))
}

fn require_bool(capability: &str, value: &CapabilityValue) -> Result<bool> {
    value.as_bool().ok_or_else(|| invalid(capability, value))
}

fn invalid(capability: &str, value: &CapabilityValue) -> SdkError {
    SdkError::InvalidValue {
        capability: capability.to_string(),
        value: value.to_string(),
    }
}
