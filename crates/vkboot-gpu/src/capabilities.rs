//! Adapter capability detection.
//!
//! Everything here is a read-only query of driver state and may be re-run at
//! any time, including after a window resize.

use std::collections::HashSet;
use std::fmt;

use ash::vk;

use crate::driver::Driver;
use crate::error::{Result, VkResultExt};

/// GPU vendor identification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GpuVendor {
    Nvidia,
    Amd,
    Intel,
    Apple,
    Other(u32),
}

impl GpuVendor {
    /// Identify vendor from PCI vendor ID.
    pub fn from_vendor_id(id: u32) -> Self {
        match id {
            0x10DE => Self::Nvidia,
            0x1002 => Self::Amd,
            0x8086 => Self::Intel,
            0x106B => Self::Apple,
            other => Self::Other(other),
        }
    }
}

/// One queue family of an adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFamilyInfo {
    pub index: u32,
    pub flags: vk::QueueFlags,
    pub queue_count: u32,
}

impl QueueFamilyInfo {
    /// Whether the family has at least one queue with all of `flags`.
    pub fn supports(&self, flags: vk::QueueFlags) -> bool {
        self.queue_count > 0 && self.flags.contains(flags)
    }
}

fn queue_family_info<D: Driver + ?Sized>(
    driver: &D,
    adapter: vk::PhysicalDevice,
) -> Vec<QueueFamilyInfo> {
    driver
        .queue_family_properties(adapter)
        .iter()
        .zip(0u32..)
        .map(|(family, index)| QueueFamilyInfo {
            index,
            flags: family.queue_flags,
            queue_count: family.queue_count,
        })
        .collect()
}

/// A physical GPU as enumerated by the driver.
///
/// The handle refers to driver-owned memory; nothing here needs destroying.
#[derive(Debug, Clone)]
pub struct AdapterInfo {
    pub handle: vk::PhysicalDevice,
    pub name: String,
    pub vendor: GpuVendor,
    pub device_type: vk::PhysicalDeviceType,
    pub api_version: u32,
    pub queue_families: Vec<QueueFamilyInfo>,
    pub extensions: HashSet<String>,
}

impl AdapterInfo {
    /// Query one adapter.
    pub fn query<D: Driver + ?Sized>(driver: &D, handle: vk::PhysicalDevice) -> Result<Self> {
        let properties = driver.adapter_properties(handle);
        let queue_families = queue_family_info(driver, handle);
        let extensions = driver
            .device_extensions(handle)
            .call("vkEnumerateDeviceExtensionProperties")?
            .into_iter()
            .collect();

        Ok(Self {
            handle,
            name: properties.name,
            vendor: GpuVendor::from_vendor_id(properties.vendor_id),
            device_type: properties.device_type,
            api_version: properties.api_version,
            queue_families,
            extensions,
        })
    }

    /// Whether every name in `required` is in the extension list.
    pub fn supports_extensions<S: AsRef<str>>(&self, required: &[S]) -> bool {
        self.missing_extension(required).is_none()
    }

    /// The first required extension the adapter lacks.
    pub fn missing_extension<'a, S: AsRef<str>>(&self, required: &'a [S]) -> Option<&'a str> {
        required
            .iter()
            .map(AsRef::as_ref)
            .find(|name| !self.extensions.contains(*name))
    }

    /// Get a human-readable summary.
    pub fn summary(&self) -> String {
        format!(
            "{} ({:?}, {:?}) - Vulkan {}.{}.{}",
            self.name,
            self.vendor,
            self.device_type,
            vk::api_version_major(self.api_version),
            vk::api_version_minor(self.api_version),
            vk::api_version_patch(self.api_version),
        )
    }
}

/// Enumerate adapters, preserving driver order.
pub fn list_adapters<D: Driver + ?Sized>(driver: &D) -> Result<Vec<AdapterInfo>> {
    driver
        .enumerate_adapters()
        .call("vkEnumeratePhysicalDevices")?
        .into_iter()
        .map(|handle| AdapterInfo::query(driver, handle))
        .collect()
}

/// The three roles a context needs a queue for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueRole {
    Graphics,
    Compute,
    Present,
}

impl fmt::Display for QueueRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Graphics => "graphics",
            Self::Compute => "compute",
            Self::Present => "present",
        };
        f.write_str(name)
    }
}

/// Queue family indices found on one adapter; unresolved roles are `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueFamilySelection {
    pub graphics: Option<u32>,
    pub compute: Option<u32>,
    pub present: Option<u32>,
}

impl QueueFamilySelection {
    /// The first role left unresolved, if any.
    pub fn missing_role(&self) -> Option<QueueRole> {
        if self.graphics.is_none() {
            Some(QueueRole::Graphics)
        } else if self.compute.is_none() {
            Some(QueueRole::Compute)
        } else if self.present.is_none() {
            Some(QueueRole::Present)
        } else {
            None
        }
    }

    /// Whether all three roles resolved.
    pub fn is_complete(&self) -> bool {
        self.missing_role().is_none()
    }

    /// The resolved indices, if all three roles resolved.
    pub fn resolve(&self) -> Option<QueueFamilies> {
        Some(QueueFamilies {
            graphics: self.graphics?,
            compute: self.compute?,
            present: self.present?,
        })
    }
}

/// Fully resolved queue family indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFamilies {
    pub graphics: u32,
    pub compute: u32,
    pub present: u32,
}

impl QueueFamilies {
    /// Distinct family indices in ascending order.
    pub fn unique(&self) -> Vec<u32> {
        let mut families = vec![self.graphics, self.compute, self.present];
        families.sort_unstable();
        families.dedup();
        families
    }
}

/// Resolve queue families from already-queried family info.
///
/// Each role takes the first family with a queue supporting it. Presentation
/// prefers the graphics family when that family can present, so the common
/// single-family case never splits.
pub fn resolve_queue_families(
    families: &[QueueFamilyInfo],
    mut can_present: impl FnMut(u32) -> Result<bool>,
) -> Result<QueueFamilySelection> {
    let find = |flags| {
        families
            .iter()
            .find(|family| family.supports(flags))
            .map(|family| family.index)
    };

    let graphics = find(vk::QueueFlags::GRAPHICS);
    let compute = find(vk::QueueFlags::COMPUTE);

    let mut present = None;
    if let Some(graphics) = graphics {
        if can_present(graphics)? {
            present = Some(graphics);
        }
    }
    if present.is_none() {
        for family in families.iter().filter(|family| family.queue_count > 0) {
            if can_present(family.index)? {
                present = Some(family.index);
                break;
            }
        }
    }

    Ok(QueueFamilySelection {
        graphics,
        compute,
        present,
    })
}

/// Probe an adapter's queue families against `surface`.
pub fn query_queue_families<D: Driver + ?Sized>(
    driver: &D,
    adapter: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
) -> Result<QueueFamilySelection> {
    let families = queue_family_info(driver, adapter);

    resolve_queue_families(&families, |index| {
        driver
            .surface_support(adapter, index, surface)
            .call("vkGetPhysicalDeviceSurfaceSupportKHR")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn family(index: u32, flags: vk::QueueFlags) -> QueueFamilyInfo {
        QueueFamilyInfo {
            index,
            flags,
            queue_count: 1,
        }
    }

    #[test]
    fn vendor_identification() {
        assert_eq!(GpuVendor::from_vendor_id(0x10DE), GpuVendor::Nvidia);
        assert_eq!(GpuVendor::from_vendor_id(0x1002), GpuVendor::Amd);
        assert_eq!(GpuVendor::from_vendor_id(0x8086), GpuVendor::Intel);
        assert_eq!(GpuVendor::from_vendor_id(0x1234), GpuVendor::Other(0x1234));
    }

    #[test]
    fn resolves_split_compute_family() {
        let families = [
            family(0, vk::QueueFlags::GRAPHICS | vk::QueueFlags::TRANSFER),
            family(1, vk::QueueFlags::COMPUTE),
        ];
        let selection = resolve_queue_families(&families, |index| Ok(index == 0)).unwrap();

        assert_eq!(
            selection.resolve(),
            Some(QueueFamilies {
                graphics: 0,
                compute: 1,
                present: 0
            })
        );
    }

    #[test]
    fn present_prefers_graphics_family() {
        let families = [
            family(0, vk::QueueFlags::COMPUTE),
            family(1, vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE),
        ];
        // Both families can present; the graphics one wins.
        let selection = resolve_queue_families(&families, |_| Ok(true)).unwrap();

        assert_eq!(selection.graphics, Some(1));
        assert_eq!(selection.compute, Some(0));
        assert_eq!(selection.present, Some(1));
    }

    #[test]
    fn empty_families_are_skipped() {
        let families = [
            QueueFamilyInfo {
                index: 0,
                flags: vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE,
                queue_count: 0,
            },
            family(1, vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE),
        ];
        let selection = resolve_queue_families(&families, |_| Ok(true)).unwrap();

        assert_eq!(selection.graphics, Some(1));
        assert_eq!(selection.compute, Some(1));
        assert_eq!(selection.present, Some(1));
    }

    #[test]
    fn missing_roles_stay_unresolved() {
        let families = [family(0, vk::QueueFlags::GRAPHICS)];
        let selection = resolve_queue_families(&families, |_| Ok(false)).unwrap();

        assert_eq!(selection.graphics, Some(0));
        assert_eq!(selection.compute, None);
        assert_eq!(selection.present, None);
        assert_eq!(selection.missing_role(), Some(QueueRole::Compute));
        assert!(!selection.is_complete());
        assert_eq!(selection.resolve(), None);
    }

    #[test]
    fn unique_families_are_deduplicated() {
        let families = QueueFamilies {
            graphics: 2,
            compute: 0,
            present: 2,
        };
        assert_eq!(families.unique(), vec![0, 2]);
    }
}
