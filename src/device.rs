//! Device profiles used as the pixel ↔ normalized conversion basis

use serde::{Deserialize, Serialize};

use crate::layout::{ContainerPosition, Orientation, PerOrientation, Size};

/// A named screen size in portrait pixels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceProfile {
    pub id: String,
    pub name: String,
    pub width: f64,
    pub height: f64,
}

/// Container geometry as fractions of the device frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl DeviceProfile {
    pub fn new(id: impl Into<String>, name: impl Into<String>, width: f64, height: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            width,
            height,
        }
    }

    /// Screen size in the given orientation; landscape is the rotated device
    pub fn frame(&self, orientation: Orientation) -> Size {
        match orientation {
            Orientation::Portrait => Size::new(self.width, self.height),
            Orientation::Landscape => Size::new(self.height, self.width),
        }
    }

    pub fn frames(&self) -> PerOrientation<Size> {
        PerOrientation::new(
            self.frame(Orientation::Portrait),
            self.frame(Orientation::Landscape),
        )
    }

    pub fn normalize(&self, position: &ContainerPosition, orientation: Orientation) -> NormalizedRect {
        let frame = self.frame(orientation);
        NormalizedRect {
            x: position.x / frame.width,
            y: position.y / frame.height,
            width: position.width / frame.width,
            height: position.height / frame.height,
        }
    }

    pub fn denormalize(&self, rect: &NormalizedRect, orientation: Orientation) -> ContainerPosition {
        let frame = self.frame(orientation);
        ContainerPosition {
            x: rect.x * frame.width,
            y: rect.y * frame.height,
            width: rect.width * frame.width,
            height: rect.height * frame.height,
        }
    }
}

/// The table of known device profiles
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceRegistry {
    profiles: Vec<DeviceProfile>,
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl DeviceRegistry {
    /// Built-in phone and tablet profiles
    pub fn builtin() -> Self {
        Self {
            profiles: vec![
                DeviceProfile::new("iphone-14", "iPhone 14", 390.0, 844.0),
                DeviceProfile::new("iphone-14-pro-max", "iPhone 14 Pro Max", 430.0, 932.0),
                DeviceProfile::new("iphone-se", "iPhone SE", 375.0, 667.0),
                DeviceProfile::new("pixel-7", "Pixel 7", 412.0, 915.0),
                DeviceProfile::new("galaxy-s21", "Galaxy S21", 360.0, 800.0),
                DeviceProfile::new("ipad-air", "iPad Air", 820.0, 1180.0),
            ],
        }
    }

    pub fn get(&self, id: &str) -> Option<&DeviceProfile> {
        self.profiles.iter().find(|p| p.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeviceProfile> {
        self.profiles.iter()
    }

    pub fn ids(&self) -> Vec<String> {
        self.profiles.iter().map(|p| p.id.clone()).collect()
    }

    /// Add profiles, replacing any existing profile with the same id
    pub fn extend(&mut self, profiles: impl IntoIterator<Item = DeviceProfile>) {
        for profile in profiles {
            match self.profiles.iter_mut().find(|p| p.id == profile.id) {
                Some(existing) => *existing = profile,
                None => self.profiles.push(profile),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_landscape_swaps_axes() {
        let device = DeviceProfile::new("test", "Test", 400.0, 800.0);
        assert_eq!(device.frame(Orientation::Portrait), Size::new(400.0, 800.0));
        assert_eq!(device.frame(Orientation::Landscape), Size::new(800.0, 400.0));
    }

    #[test]
    fn test_normalize_uses_rotated_basis() {
        let device = DeviceProfile::new("test", "Test", 400.0, 800.0);
        let pos = ContainerPosition::new(200.0, 100.0, 80.0, 40.0);

        let portrait = device.normalize(&pos, Orientation::Portrait);
        assert_eq!(portrait, NormalizedRect { x: 0.5, y: 0.125, width: 0.2, height: 0.05 });

        let landscape = device.normalize(&pos, Orientation::Landscape);
        assert_eq!(landscape, NormalizedRect { x: 0.25, y: 0.25, width: 0.1, height: 0.1 });
        assert_eq!(device.denormalize(&landscape, Orientation::Landscape), pos);
    }

    #[test]
    fn test_registry_extend_replaces_by_id() {
        let mut registry = DeviceRegistry::builtin();
        let count = registry.iter().count();
        registry.extend([
            DeviceProfile::new("iphone-se", "iPhone SE (custom)", 320.0, 568.0),
            DeviceProfile::new("kiosk", "Kiosk", 1080.0, 1920.0),
        ]);

        assert_eq!(registry.iter().count(), count + 1);
        assert_eq!(registry.get("iphone-se").unwrap().width, 320.0);
        assert!(registry.get("kiosk").is_some());
    }
}
