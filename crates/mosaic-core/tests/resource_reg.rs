//! Resource limit configuration regression test
//!
//! Kept as the only test in its binary because it edits the process
//! environment.

use mosaic_core::{Context, ResourceLimits, ResourceType};
use mosaic_test::RegParams;

#[test_log::test]
fn resource_reg() {
    let mut rp = RegParams::new("resource");

    // SAFETY: no other thread in this test binary reads the environment.
    unsafe {
        std::env::set_var("MOSAIC_MEMORY_LIMIT", "4K");
        std::env::set_var("MOSAIC_DISK_LIMIT", "unlimited");
        std::env::set_var("MOSAIC_FILE_LIMIT", "three");
    }
    let limits = ResourceLimits::from_env();
    rp.compare_values(4096.0, limits.memory.unwrap() as f64, 0.0);
    assert_eq!(limits.disk, None);
    // Unparsable value keeps the default
    assert_eq!(limits.file, ResourceLimits::default().file);

    let ctx = Context::from_env();
    assert!(ctx.acquire_resource(ResourceType::Memory, 4096));
    assert!(!ctx.acquire_resource(ResourceType::Memory, 1));
    ctx.relinquish_resource(ResourceType::Memory, 4096);
    rp.compare_values(0.0, ctx.resource_usage(ResourceType::Memory) as f64, 0.0);

    // Shared handles see the same counters
    let other = ctx.clone();
    assert!(other.ptr_eq(&ctx));
    assert!(other.acquire_resource(ResourceType::Area, 10));
    rp.compare_values(10.0, ctx.resource_usage(ResourceType::Area) as f64, 0.0);

    assert!(rp.cleanup());
}
