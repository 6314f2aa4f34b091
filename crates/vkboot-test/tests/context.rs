//! Context construction against the mock driver.

use ash::vk::{self, Handle};
use vkboot_gpu::{ContextConfig, GpuError, Resource};
use vkboot_test::{build_context, Event, MockAdapter, MockDriver, MockQueueFamily, ObjectKind};

fn config() -> ContextConfig {
    ContextConfig::new("context-tests").with_validation(false)
}

#[test]
fn default_adapter_builds_full_context() {
    let (ctx, handle) = build_context(vec![MockAdapter::default()], config());
    let ctx = ctx.unwrap();

    assert_eq!(ctx.chain().len(), 3);
    assert_eq!(ctx.chain().extent, vk::Extent2D { width: 1600, height: 1200 });
    assert_eq!(ctx.render_targets().framebuffers.len(), 3);
    assert_eq!(ctx.debug_messenger(), None);

    let journal = handle.journal();
    assert!(journal.messages().is_empty(), "{:?}", journal.messages());
    assert_eq!(journal.live_count(ObjectKind::Swapchain), 1);
    assert_eq!(journal.live_count(ObjectKind::CommandPool), 2);
    assert_eq!(journal.live_count(ObjectKind::Semaphore), 2);
    assert_eq!(journal.live_count(ObjectKind::RenderPass), 1);
    assert_eq!(journal.live_count(ObjectKind::Framebuffer), 3);
    // One-shot buffers are freed once the depth transition completes.
    assert_eq!(journal.live_count(ObjectKind::CommandBuffer), 0);
}

#[test]
fn three_image_chain_gets_three_color_views_and_one_depth_view() {
    let (ctx, handle) = build_context(vec![MockAdapter::default()], config());
    let ctx = ctx.unwrap();

    let journal = handle.journal();
    let (color, depth): (Vec<_>, Vec<_>) = journal
        .events()
        .iter()
        .filter_map(|event| match event {
            Event::ViewCreated { aspect, .. } => Some(*aspect),
            _ => None,
        })
        .partition(|aspect| *aspect == vk::ImageAspectFlags::COLOR);

    assert_eq!(color.len(), 3);
    assert_eq!(
        depth,
        vec![vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL]
    );
    assert_eq!(ctx.chain().image_views.len(), 3);
}

#[test]
fn swapchain_uses_negotiated_parameters() {
    let (ctx, handle) = build_context(vec![MockAdapter::default()], config());
    let _ctx = ctx.unwrap();

    let journal = handle.journal();
    let info = journal
        .events()
        .iter()
        .find_map(|event| match event {
            Event::SwapchainCreated(info) => Some(*info),
            _ => None,
        })
        .unwrap();

    assert_eq!(info.min_image_count, 3);
    assert_eq!(info.format, vk::Format::B8G8R8A8_UNORM);
    assert_eq!(info.color_space, vk::ColorSpaceKHR::SRGB_NONLINEAR);
    assert_eq!(info.present_mode, vk::PresentModeKHR::MAILBOX);
    assert_eq!(info.sharing_mode, vk::SharingMode::EXCLUSIVE);
    assert_eq!(info.usage, vk::ImageUsageFlags::COLOR_ATTACHMENT);
    assert_eq!(info.composite_alpha, vk::CompositeAlphaFlagsKHR::OPAQUE);
    assert_eq!(info.pre_transform, vk::SurfaceTransformFlagsKHR::IDENTITY);
    assert!(info.clipped);
}

#[test]
fn validation_installs_debug_messenger() {
    let (ctx, handle) = build_context(
        vec![MockAdapter::default()],
        config().with_validation(true),
    );
    let ctx = ctx.unwrap();

    assert!(ctx.debug_messenger().is_some());
    assert_eq!(handle.journal().live_count(ObjectKind::DebugMessenger), 1);
}

#[test]
fn adapter_without_present_support_is_skipped() {
    let headless = MockAdapter::new("Headless")
        .with_queue_families(vec![MockQueueFamily::new(
            vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE,
            false,
        )]);
    let (ctx, handle) = build_context(vec![headless, MockAdapter::new("Display")], config());
    let ctx = ctx.unwrap();

    assert_eq!(ctx.adapter().name, "Display");
    assert_eq!(ctx.physical_device(), MockDriver::adapter_handle(1));

    let journal = handle.journal();
    let created = journal
        .events()
        .iter()
        .find_map(|event| match event {
            Event::DeviceCreated { adapter, .. } => Some(*adapter),
            _ => None,
        })
        .unwrap();
    assert_eq!(created, MockDriver::adapter_handle(1).as_raw());
}

#[test]
fn first_suitable_adapter_wins_without_ranking() {
    let integrated = MockAdapter::new("Integrated")
        .with_device_type(vk::PhysicalDeviceType::INTEGRATED_GPU);
    let discrete = MockAdapter::new("Discrete");
    let (ctx, _handle) = build_context(vec![integrated, discrete], config());

    assert_eq!(ctx.unwrap().adapter().name, "Integrated");
}

#[test]
fn every_queue_role_is_required() {
    let no_compute = MockAdapter::new("No compute").with_queue_families(vec![
        MockQueueFamily::new(vk::QueueFlags::GRAPHICS | vk::QueueFlags::TRANSFER, true),
    ]);
    let (ctx, handle) = build_context(vec![no_compute], config());

    assert!(matches!(ctx, Err(GpuError::NoSuitableAdapter)));
    let journal = handle.journal();
    assert!(!journal.device_alive());
    assert!(journal.leaks().is_empty(), "{:?}", journal.leaks());
    assert!(journal.messages().is_empty(), "{:?}", journal.messages());
}

#[test]
fn split_graphics_and_present_families_are_rejected() {
    let split = MockAdapter::new("Split").with_queue_families(vec![
        MockQueueFamily::new(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE, false),
        MockQueueFamily::new(vk::QueueFlags::TRANSFER, true),
    ]);
    let (ctx, _handle) = build_context(vec![split], config());

    assert!(matches!(ctx, Err(GpuError::NoSuitableAdapter)));
}

#[test]
fn missing_device_extension_rejects_adapter() {
    let bare = MockAdapter::new("No swapchain").with_extensions(Vec::<String>::new());
    let (ctx, _handle) = build_context(vec![bare], config());

    assert!(matches!(ctx, Err(GpuError::NoSuitableAdapter)));
}

#[test]
fn shared_families_get_one_queue_request() {
    let (ctx, handle) = build_context(vec![MockAdapter::default()], config());
    let ctx = ctx.unwrap();

    let families = ctx.queue_families();
    assert_eq!((families.graphics, families.compute, families.present), (0, 0, 0));
    assert_eq!(ctx.graphics_queue(), ctx.present_queue());

    let journal = handle.journal();
    let requested = journal
        .events()
        .iter()
        .find_map(|event| match event {
            Event::DeviceCreated { queue_families, .. } => Some(queue_families.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(requested, vec![0]);
}

#[test]
fn distinct_compute_family_gets_its_own_queue() {
    let adapter = MockAdapter::default().with_queue_families(vec![
        MockQueueFamily::new(vk::QueueFlags::GRAPHICS, true),
        MockQueueFamily::new(vk::QueueFlags::COMPUTE, false),
    ]);
    let (ctx, handle) = build_context(vec![adapter], config());
    let ctx = ctx.unwrap();

    assert_eq!(ctx.compute_queue(), MockDriver::queue_handle(1));
    assert_eq!(ctx.compute_command_pool().queue_family(), 1);

    let journal = handle.journal();
    assert!(journal.events().iter().any(|event| matches!(
        event,
        Event::DeviceCreated { queue_families, .. } if queue_families == &[0, 1]
    )));
    assert!(journal.messages().is_empty(), "{:?}", journal.messages());
}

fn graphics_compute_split_adapter() -> MockAdapter {
    MockAdapter::default()
        .with_queue_families(vec![
            MockQueueFamily::new(vk::QueueFlags::GRAPHICS | vk::QueueFlags::TRANSFER, true),
            MockQueueFamily::new(vk::QueueFlags::COMPUTE, false),
        ])
        .with_image_count_range(2, 4)
        .with_extent_range((640, 480), (1920, 1080))
}

#[test]
fn request_taller_than_surface_maximum_is_rejected() {
    let (ctx, handle) = build_context(
        vec![graphics_compute_split_adapter()],
        config().with_extent(1600, 1200).with_image_count(3),
    );
    assert!(matches!(
        ctx,
        Err(GpuError::ExtentOutOfRange {
            requested: vk::Extent2D {
                width: 1600,
                height: 1200
            },
            max: vk::Extent2D {
                width: 1920,
                height: 1080
            },
            ..
        })
    ));

    let journal = handle.journal();
    assert!(journal.messages().is_empty(), "{:?}", journal.messages());
    assert!(journal.leaks().is_empty(), "{:?}", journal.leaks());
}

#[test]
fn split_compute_adapter_builds_within_surface_range() {
    let (ctx, handle) = build_context(
        vec![graphics_compute_split_adapter()],
        config().with_extent(1600, 1080).with_image_count(3),
    );
    let ctx = ctx.unwrap();

    let families = ctx.queue_families();
    assert_eq!((families.graphics, families.compute, families.present), (0, 1, 0));
    assert_eq!(ctx.chain().image_views.len(), 3);
    assert_eq!(ctx.chain().extent, vk::Extent2D { width: 1600, height: 1080 });
    assert_ne!(ctx.depth().view, vk::ImageView::null());

    {
        let journal = handle.journal();
        assert_eq!(journal.live_count(ObjectKind::ImageView), 4);
        assert!(journal.messages().is_empty(), "{:?}", journal.messages());
    }

    drop(ctx);
    let journal = handle.journal();
    assert!(journal.messages().is_empty(), "{:?}", journal.messages());
    assert!(journal.leaks().is_empty(), "{:?}", journal.leaks());
}

#[test]
fn image_count_at_either_bound_is_rejected() {
    for count in [2, 8] {
        let (ctx, handle) = build_context(
            vec![MockAdapter::default()],
            config().with_image_count(count),
        );
        assert!(
            matches!(
                ctx,
                Err(GpuError::ImageCountOutOfRange {
                    requested,
                    min: 2,
                    max: 8
                }) if requested == count
            ),
            "count {count}"
        );
        assert!(handle.journal().leaks().is_empty());
    }
}

#[test]
fn narrow_image_range_rejects_three_images() {
    let adapter = MockAdapter::default().with_image_count_range(2, 3);
    let (ctx, handle) = build_context(vec![adapter], config().with_image_count(3));

    assert!(matches!(
        ctx,
        Err(GpuError::ImageCountOutOfRange { requested: 3, min: 2, max: 3 })
    ));
    let journal = handle.journal();
    assert_eq!(journal.created_count(ObjectKind::Swapchain), 0);
    assert!(journal.leaks().is_empty());
    assert!(journal.messages().is_empty(), "{:?}", journal.messages());
}

#[test]
fn extent_at_range_boundary_is_accepted() {
    let adapter = MockAdapter::default().with_extent_range((640, 480), (1600, 1200));
    let (ctx, _handle) = build_context(vec![adapter.clone()], config().with_extent(1600, 1200));
    assert_eq!(
        ctx.unwrap().chain().extent,
        vk::Extent2D { width: 1600, height: 1200 }
    );

    let (ctx, _handle) = build_context(vec![adapter], config().with_extent(1601, 1200));
    assert!(matches!(ctx, Err(GpuError::ExtentOutOfRange { .. })));
}

#[test]
fn unsupported_present_mode_has_no_fallback() {
    let fifo_only = MockAdapter::default().with_present_modes(vec![vk::PresentModeKHR::FIFO]);
    let (ctx, _handle) = build_context(vec![fifo_only], config());

    assert!(matches!(
        ctx,
        Err(GpuError::PresentModeUnsupported(vk::PresentModeKHR::MAILBOX))
    ));
}

#[test]
fn color_space_must_match_as_well_as_format() {
    let hdr = MockAdapter::default().with_formats(vec![vk::SurfaceFormatKHR {
        format: vk::Format::B8G8R8A8_UNORM,
        color_space: vk::ColorSpaceKHR::EXTENDED_SRGB_LINEAR_EXT,
    }]);
    let (ctx, _handle) = build_context(vec![hdr], config());

    assert!(matches!(ctx, Err(GpuError::SurfaceFormatUnsupported { .. })));
}

#[test]
fn missing_device_local_memory_is_reported() {
    let host_only = MockAdapter::default()
        .with_memory_types(vec![vk::MemoryPropertyFlags::HOST_VISIBLE]);
    let (ctx, handle) = build_context(vec![host_only], config());

    assert!(matches!(
        ctx,
        Err(GpuError::NoSuitableMemoryType { required, .. })
            if required == vk::MemoryPropertyFlags::DEVICE_LOCAL
    ));
    let journal = handle.journal();
    assert!(journal.leaks().is_empty(), "{:?}", journal.leaks());
    assert!(journal.messages().is_empty(), "{:?}", journal.messages());
}

#[test]
fn depth_memory_comes_from_device_local_type() {
    let (ctx, handle) = build_context(vec![MockAdapter::default()], config());
    let ctx = ctx.unwrap();

    let journal = handle.journal();
    let bound = journal
        .events()
        .iter()
        .find_map(|event| match event {
            Event::MemoryBound { image, memory_type, .. } => Some((*image, *memory_type)),
            _ => None,
        })
        .unwrap();
    assert_eq!(bound, (ctx.depth().image.as_raw(), 1));
}

#[test]
fn driver_returning_extra_images_is_an_error() {
    let driver = MockDriver::new(vec![MockAdapter::default()]);
    let handle = driver.handle();
    handle.set_extra_images(1);

    let ctx = vkboot_gpu::GpuContextBuilder::new().config(config()).build(driver);

    assert!(matches!(
        ctx,
        Err(GpuError::ImageCountMismatch { expected: 3, actual: 4 })
    ));
    let journal = handle.journal();
    assert!(journal.leaks().is_empty(), "{:?}", journal.leaks());
    assert!(journal.messages().is_empty(), "{:?}", journal.messages());
}

#[test]
fn depth_transition_completes_before_depth_view() {
    let (ctx, handle) = build_context(vec![MockAdapter::default()], config());
    let ctx = ctx.unwrap();
    let depth_image = ctx.depth().image.as_raw();
    let graphics = ctx.graphics_queue().as_raw();

    let journal = handle.journal();
    let barrier = journal
        .position(|event| {
            matches!(
                event,
                Event::BarrierRecorded { image, old_layout, new_layout, src_stage, dst_stage, .. }
                    if *image == depth_image
                        && *old_layout == vk::ImageLayout::UNDEFINED
                        && *new_layout == vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL
                        && *src_stage == vk::PipelineStageFlags::TOP_OF_PIPE
                        && *dst_stage == vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS
            )
        })
        .unwrap();
    let submit = journal
        .position(|event| matches!(event, Event::Submitted { queue, .. } if *queue == graphics))
        .unwrap();
    let idle = journal
        .position(|event| matches!(event, Event::QueueIdle { queue } if *queue == graphics))
        .unwrap();
    let view = journal
        .position(|event| {
            matches!(event, Event::ViewCreated { image, .. } if *image == depth_image)
        })
        .unwrap();

    assert!(barrier < submit, "barrier {barrier} after submit {submit}");
    assert!(submit < idle, "submit {submit} after idle {idle}");
    assert!(idle < view, "idle {idle} after view {view}");
}

#[test]
fn render_pass_describes_color_and_depth() {
    let (ctx, handle) = build_context(vec![MockAdapter::default()], config());
    let ctx = ctx.unwrap();

    let journal = handle.journal();
    let (attachments, subpasses, dependencies) = journal
        .events()
        .iter()
        .find_map(|event| match event {
            Event::RenderPassCreated { attachments, subpasses, dependencies, .. } => {
                Some((attachments.clone(), *subpasses, *dependencies))
            }
            _ => None,
        })
        .unwrap();

    assert_eq!((subpasses, dependencies), (1, 1));
    assert_eq!(attachments.len(), 2);
    assert_eq!(attachments[0].format, vk::Format::B8G8R8A8_UNORM);
    assert_eq!(attachments[0].final_layout, vk::ImageLayout::PRESENT_SRC_KHR);
    assert_eq!(attachments[1].format, vk::Format::D32_SFLOAT_S8_UINT);
    assert_eq!(attachments[1].store_op, vk::AttachmentStoreOp::DONT_CARE);

    let framebuffers: Vec<_> = journal
        .events()
        .iter()
        .filter_map(|event| match event {
            Event::FramebufferCreated { attachments, extent, layers, .. } => {
                Some((attachments.clone(), *extent, *layers))
            }
            _ => None,
        })
        .collect();
    assert_eq!(framebuffers.len(), 3);
    let chain_views = &ctx.chain().image_views;
    for ((attachments, extent, layers), color) in framebuffers.iter().zip(chain_views) {
        assert_eq!(attachments, &vec![color.as_raw(), ctx.depth().view.as_raw()]);
        assert_eq!(*extent, ctx.chain().extent);
        assert_eq!(*layers, 1);
    }
}

#[test]
fn capability_query_is_repeatable() {
    let (ctx, _handle) = build_context(vec![MockAdapter::default()], config());
    let ctx = ctx.unwrap();

    let first = vkboot_gpu::surface::query_surface_capabilities(
        ctx.driver(),
        ctx.physical_device(),
        ctx.surface(),
    )
    .unwrap();
    let second = vkboot_gpu::surface::query_surface_capabilities(
        ctx.driver(),
        ctx.physical_device(),
        ctx.surface(),
    )
    .unwrap();
    assert_eq!(first, second);

    let adapters = vkboot_gpu::capabilities::list_adapters(ctx.driver()).unwrap();
    let again = vkboot_gpu::capabilities::list_adapters(ctx.driver()).unwrap();
    assert_eq!(adapters.len(), 1);
    assert_eq!(adapters[0].name, again[0].name);
    assert_eq!(adapters[0].extensions, again[0].extensions);
}

#[test]
fn teardown_tracks_every_created_object() {
    let (ctx, _handle) = build_context(vec![MockAdapter::default()], config());
    let ctx = ctx.unwrap();

    let teardown = ctx.teardown();
    assert!(teardown.contains(&Resource::Instance));
    assert!(teardown.contains(&Resource::Window));
    assert!(teardown.contains(&Resource::Device));
    assert!(teardown.contains(&Resource::Surface(ctx.surface())));
    assert!(teardown.contains(&Resource::DepthView(ctx.depth().view)));
    // instance, window, surface, device, swapchain, 3 colour views, 2 pools,
    // depth image, memory and view, 2 semaphores, render pass, 3 framebuffers
    assert_eq!(teardown.len(), 19);
}
