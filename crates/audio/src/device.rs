use cpal::traits::{DeviceTrait, HostTrait};
use cpal::Device;

#[derive(Debug, Clone, serde::Serialize)]
pub struct AudioDevice {
    pub name: String,
    pub is_default: bool,
}

pub fn list_input_devices() -> crate::Result<Vec<AudioDevice>> {
    let host = cpal::default_host();
    let default_name = host.default_input_device().and_then(|d| d.name().ok());

    let mut devices = Vec::new();
    for device in host.input_devices()? {
        let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        let is_default = default_name.as_ref() == Some(&name);
        devices.push(AudioDevice { name, is_default });
    }

    Ok(devices)
}

/// Resolve an input device by name, or the host default when no name is given.
pub(crate) fn input_device(host: &cpal::Host, name: Option<&str>) -> crate::Result<Device> {
    match name {
        Some(id) => host
            .input_devices()?
            .find(|d| d.name().ok().as_deref() == Some(id))
            .ok_or_else(|| crate::AudioError::DeviceNotFound(id.to_string())),
        None => host
            .default_input_device()
            .ok_or_else(|| crate::AudioError::DeviceNotFound("default".to_string())),
    }
}
