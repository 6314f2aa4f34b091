//! Adapter selection and logical device creation.

use std::ffi::CString;
use std::fmt;

use ash::vk;

use crate::capabilities::{
    list_adapters, query_queue_families, AdapterInfo, QueueFamilies, QueueRole,
};
use crate::driver::Driver;
use crate::error::{GpuError, Result};
use crate::surface::{query_surface_capabilities, SurfaceCapabilities};

/// Why an adapter was passed over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// No family offers this role.
    MissingQueueRole(QueueRole),
    /// Graphics and present resolved to different families. The chain is
    /// created with exclusive sharing, which needs them to coincide.
    SplitPresentFamily { graphics: u32, present: u32 },
    /// A required device extension is absent.
    MissingExtension(String),
    /// The surface reports no formats or no present modes.
    InadequateSurface,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingQueueRole(role) => write!(f, "no {role} queue family"),
            Self::SplitPresentFamily { graphics, present } => write!(
                f,
                "graphics family {graphics} differs from present family {present}"
            ),
            Self::MissingExtension(name) => write!(f, "missing extension {name}"),
            Self::InadequateSurface => f.write_str("surface offers no formats or present modes"),
        }
    }
}

/// An adapter that passed every check.
#[derive(Debug, Clone)]
pub struct SelectedAdapter {
    pub info: AdapterInfo,
    pub families: QueueFamilies,
    pub surface: SurfaceCapabilities,
}

/// Run every suitability check against one adapter.
pub fn evaluate_adapter<D: Driver + ?Sized, S: AsRef<str>>(
    driver: &D,
    adapter: &AdapterInfo,
    surface: vk::SurfaceKHR,
    required_extensions: &[S],
) -> Result<std::result::Result<SelectedAdapter, Rejection>> {
    let selection = query_queue_families(driver, adapter.handle, surface)?;
    let Some(families) = selection.resolve() else {
        let role = selection.missing_role().unwrap_or(QueueRole::Graphics);
        return Ok(Err(Rejection::MissingQueueRole(role)));
    };
    if families.graphics != families.present {
        return Ok(Err(Rejection::SplitPresentFamily {
            graphics: families.graphics,
            present: families.present,
        }));
    }

    if let Some(missing) = adapter.missing_extension(required_extensions) {
        return Ok(Err(Rejection::MissingExtension(missing.to_string())));
    }

    let capabilities = query_surface_capabilities(driver, adapter.handle, surface)?;
    if !capabilities.is_adequate() {
        return Ok(Err(Rejection::InadequateSurface));
    }

    Ok(Ok(SelectedAdapter {
        info: adapter.clone(),
        families,
        surface: capabilities,
    }))
}

/// Pick the first adapter, in enumeration order, that passes every check.
///
/// There is no ranking: a suitable integrated GPU listed first wins over a
/// discrete one listed later.
pub fn select_adapter<D: Driver + ?Sized, S: AsRef<str>>(
    driver: &D,
    surface: vk::SurfaceKHR,
    required_extensions: &[S],
) -> Result<SelectedAdapter> {
    let adapters = list_adapters(driver)?;
    if adapters.is_empty() {
        tracing::warn!("Driver reports no adapters");
    }

    for adapter in &adapters {
        match evaluate_adapter(driver, adapter, surface, required_extensions)? {
            Ok(selected) => {
                tracing::info!("Selected GPU: {}", selected.info.summary());
                return Ok(selected);
            }
            Err(reason) => tracing::debug!("Rejected GPU {}: {reason}", adapter.name),
        }
    }

    Err(GpuError::NoSuitableAdapter)
}

/// The logical device's queues.
///
/// Roles sharing a family share the same queue handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogicalDevice {
    pub adapter: vk::PhysicalDevice,
    pub families: QueueFamilies,
    pub graphics_queue: vk::Queue,
    pub compute_queue: vk::Queue,
    pub present_queue: vk::Queue,
}

/// Create the logical device with one queue per unique family.
pub fn create_logical_device<D: Driver + ?Sized, S: AsRef<str>>(
    driver: &mut D,
    adapter: vk::PhysicalDevice,
    families: QueueFamilies,
    extensions: &[S],
) -> Result<LogicalDevice> {
    let queue_priority = [1.0_f32];
    let queue_create_infos: Vec<vk::DeviceQueueCreateInfo> = families
        .unique()
        .into_iter()
        .map(|family| {
            vk::DeviceQueueCreateInfo::default()
                .queue_family_index(family)
                .queue_priorities(&queue_priority)
        })
        .collect();

    let extension_names = extensions
        .iter()
        .map(|name| CString::new(name.as_ref()))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| GpuError::InvalidState(format!("Extension name contains NUL: {e}")))?;
    let extension_refs: Vec<&std::ffi::CStr> =
        extension_names.iter().map(CString::as_c_str).collect();

    driver
        .create_device(adapter, &queue_create_infos, &extension_refs)
        .map_err(GpuError::DeviceCreation)?;

    let graphics_queue = driver.device_queue(families.graphics);
    let compute_queue = driver.device_queue(families.compute);
    let present_queue = driver.device_queue(families.present);

    Ok(LogicalDevice {
        adapter,
        families,
        graphics_queue,
        compute_queue,
        present_queue,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_messages() {
        assert_eq!(
            Rejection::MissingQueueRole(QueueRole::Present).to_string(),
            "no present queue family"
        );
        assert_eq!(
            Rejection::MissingExtension("VK_KHR_swapchain".into()).to_string(),
            "missing extension VK_KHR_swapchain"
        );
        assert_eq!(
            Rejection::SplitPresentFamily {
                graphics: 0,
                present: 1
            }
            .to_string(),
            "graphics family 0 differs from present family 1"
        );
    }
}
