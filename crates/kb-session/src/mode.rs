use kb_core::engine::{DeviceConfig, RequestUpdate};
use kb_core::spec::KeyboardSpecification;

/// Current keyboard specification and whether the engine still has to be told
/// about it before the next key.
#[derive(Debug, Clone)]
pub struct KeyboardModeState {
    current: KeyboardSpecification,
    device: DeviceConfig,
    request_dirty: bool,
}

impl KeyboardModeState {
    pub fn new(spec: KeyboardSpecification) -> Self {
        Self {
            current: spec,
            device: DeviceConfig::default(),
            request_dirty: true,
        }
    }

    pub fn current(&self) -> KeyboardSpecification {
        self.current
    }

    pub fn device(&self) -> DeviceConfig {
        self.device
    }

    /// Switch to `spec`. The caller sends the matching request update.
    pub fn set(&mut self, spec: KeyboardSpecification) {
        self.current = spec;
        self.request_dirty = false;
    }

    pub fn set_device(&mut self, device: DeviceConfig) {
        self.device = device;
    }

    pub fn mark_dirty(&mut self) {
        self.request_dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.request_dirty
    }

    /// Request update for the current specification, if one is owed.
    pub fn take_pending_request(&mut self) -> Option<RequestUpdate> {
        if !self.request_dirty {
            return None;
        }
        self.request_dirty = false;
        Some(self.request_for(self.current))
    }

    pub fn request_for(&self, spec: KeyboardSpecification) -> RequestUpdate {
        RequestUpdate {
            spec,
            device: self.device,
        }
    }
}

impl Default for KeyboardModeState {
    fn default() -> Self {
        Self::new(KeyboardSpecification::default())
    }
}
