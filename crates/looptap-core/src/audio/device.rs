//! Audio device enumeration and lookup
//!
//! Enumerates devices from ALL available audio hosts (JACK, ALSA,
//! PulseAudio, etc.) in both directions. The looper needs an input to record
//! from and an output to play to; on Linux these are often different ALSA
//! devices, or both the JACK server.

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Host, HostId};

use super::config::DeviceId;
use super::error::{AudioError, AudioResult};

/// Sample rates reported for a device when they fall inside its range
const COMMON_SAMPLE_RATES: [u32; 6] = [44100, 48000, 88200, 96000, 176400, 192000];

/// Stream direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

/// Get a human-readable name for a host ID
fn host_name(host_id: HostId) -> String {
    let name = format!("{:?}", host_id);
    match name.as_str() {
        "Alsa" => "ALSA".to_string(),
        "Jack" => "JACK".to_string(),
        "Wasapi" => "WASAPI".to_string(),
        _ => name,
    }
}

/// Get a host by its name string
fn get_host_by_name(name: &str) -> Option<Host> {
    cpal::available_hosts()
        .into_iter()
        .find(|&host_id| host_name(host_id) == name)
        .and_then(|host_id| cpal::host_from_id(host_id).ok())
}

fn host_devices(host: &Host, direction: Direction) -> Option<Vec<cpal::Device>> {
    let devices: Result<Vec<cpal::Device>, _> = match direction {
        Direction::Input => host.input_devices().map(|d| d.collect()),
        Direction::Output => host.output_devices().map(|d| d.collect()),
    };
    match devices {
        Ok(devices) => Some(devices),
        Err(e) => {
            log::debug!("Could not enumerate {:?} devices: {}", direction, e);
            None
        }
    }
}

/// Information about an audio device
#[derive(Debug, Clone)]
pub struct AudioDevice {
    /// Device identifier for configuration (includes host info)
    pub id: DeviceId,
    /// Human-readable device name
    pub name: String,
    /// Host backend name (e.g., "ALSA", "JACK")
    pub host: String,
    pub direction: Direction,
    /// Whether this is the system default device for its host
    pub is_default: bool,
    /// Supported sample rates (common ones)
    pub sample_rates: Vec<u32>,
    /// Maximum channels in this direction
    pub max_channels: u16,
}

impl std::fmt::Display for AudioDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.host, self.name)
    }
}

fn describe(
    device: &cpal::Device,
    host_name_str: &str,
    direction: Direction,
    default_name: Option<&String>,
) -> Option<AudioDevice> {
    let name = device.name().ok()?;
    let configs: Vec<_> = match direction {
        Direction::Input => device.supported_input_configs().ok()?.collect(),
        Direction::Output => device.supported_output_configs().ok()?.collect(),
    };
    if configs.is_empty() {
        return None;
    }

    let mut sample_rates: Vec<u32> = Vec::new();
    let mut max_channels: u16 = 0;
    for config in &configs {
        max_channels = max_channels.max(config.channels());
        for rate in COMMON_SAMPLE_RATES {
            if rate >= config.min_sample_rate().0
                && rate <= config.max_sample_rate().0
                && !sample_rates.contains(&rate)
            {
                sample_rates.push(rate);
            }
        }
    }
    sample_rates.sort();

    Some(AudioDevice {
        id: DeviceId::with_host(&name, host_name_str),
        is_default: default_name == Some(&name),
        name,
        host: host_name_str.to_string(),
        direction,
        sample_rates,
        max_channels,
    })
}

/// Get all devices in one direction from ALL hosts
///
/// Default devices come first, then sorted by host and name.
pub fn get_devices(direction: Direction) -> AudioResult<Vec<AudioDevice>> {
    let mut all_devices: Vec<AudioDevice> = Vec::new();

    for host_id in cpal::available_hosts() {
        let host = match cpal::host_from_id(host_id) {
            Ok(h) => h,
            Err(e) => {
                log::debug!("Could not initialize host {:?}: {}", host_id, e);
                continue;
            }
        };

        let host_name_str = host_name(host_id);
        let default_name = match direction {
            Direction::Input => host.default_input_device(),
            Direction::Output => host.default_output_device(),
        }
        .and_then(|d| d.name().ok());

        let Some(devices) = host_devices(&host, direction) else {
            continue;
        };
        all_devices.extend(
            devices
                .iter()
                .filter_map(|d| describe(d, &host_name_str, direction, default_name.as_ref())),
        );
    }

    if all_devices.is_empty() {
        return Err(AudioError::NoDevices);
    }

    all_devices.sort_by(|a, b| {
        b.is_default
            .cmp(&a.is_default)
            .then_with(|| a.host.cmp(&b.host))
            .then_with(|| a.name.cmp(&b.name))
    });

    log::info!(
        "Enumerated {} {:?} devices from {} hosts",
        all_devices.len(),
        direction,
        cpal::available_hosts().len()
    );

    Ok(all_devices)
}

pub fn get_input_devices() -> AudioResult<Vec<AudioDevice>> {
    get_devices(Direction::Input)
}

pub fn get_output_devices() -> AudioResult<Vec<AudioDevice>> {
    get_devices(Direction::Output)
}

/// Find a device by its ID
///
/// Uses the host specified in the DeviceId if available, otherwise
/// searches all available hosts.
pub fn find_device_by_id(id: &DeviceId, direction: Direction) -> AudioResult<cpal::Device> {
    let matches = |d: &cpal::Device| d.name().ok().as_ref() == Some(&id.name);

    if let Some(host) = id.host.as_deref().and_then(get_host_by_name) {
        return host_devices(&host, direction)
            .ok_or_else(|| AudioError::ConfigError(format!("Cannot list devices on {:?}", id.host)))?
            .into_iter()
            .find(matches)
            .ok_or_else(|| AudioError::DeviceNotFound(id.display_label()));
    }

    cpal::available_hosts()
        .into_iter()
        .filter_map(|host_id| cpal::host_from_id(host_id).ok())
        .filter_map(|host| host_devices(&host, direction))
        .flatten()
        .find(matches)
        .ok_or_else(|| AudioError::DeviceNotFound(id.display_label()))
}

/// Get the default device of the default host
pub fn get_cpal_default_device(direction: Direction) -> AudioResult<cpal::Device> {
    let host = cpal::default_host();
    match direction {
        Direction::Input => host
            .default_input_device()
            .ok_or_else(|| AudioError::NoInputDevice("No default input device".to_string())),
        Direction::Output => host
            .default_output_device()
            .ok_or_else(|| AudioError::NoDefaultDevice("No default output device".to_string())),
    }
}

/// Resolve a configured device, falling back to the system default
pub fn resolve_device(id: Option<&DeviceId>, direction: Direction) -> AudioResult<cpal::Device> {
    match id {
        Some(id) => find_device_by_id(id, direction),
        None => get_cpal_default_device(direction),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_enumeration() {
        // Depends on the machine; CI usually has no devices
        for direction in [Direction::Input, Direction::Output] {
            match get_devices(direction) {
                Ok(devices) => {
                    println!("Found {} {:?} devices:", devices.len(), direction);
                    for device in &devices {
                        assert_eq!(device.direction, direction);
                        println!(
                            "  - {} (default: {}, channels: {}, rates: {:?})",
                            device, device.is_default, device.max_channels, device.sample_rates
                        );
                    }
                }
                Err(AudioError::NoDevices) => {
                    println!("No {:?} devices available (expected in CI)", direction);
                }
                Err(e) => {
                    println!("Error enumerating devices: {}", e);
                }
            }
        }
    }

    #[test]
    fn test_unknown_device_is_not_found() {
        let id = DeviceId::new("looptap-test-device-that-does-not-exist");
        assert!(find_device_by_id(&id, Direction::Output).is_err());
    }
}
