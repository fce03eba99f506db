use fuzzie_governor::{
    classify_device, AnimationPreset, Capabilities, FeatureGate, ManualHost, MemoryUsage,
    MonitorOptions, PerformanceMonitor, PolicyThresholds,
};

fn monitor_with(host: ManualHost, memory: bool) -> PerformanceMonitor<ManualHost> {
    let options = MonitorOptions {
        enable_memory_monitoring: memory,
        ..MonitorOptions::default()
    };
    PerformanceMonitor::new(host, options, PolicyThresholds::default())
}

#[test]
fn test_device_classification_boundaries() {
    assert!(classify_device(Some(2)).low_end);
    assert!(classify_device(Some(4)).low_end);
    assert!(!classify_device(Some(8)).low_end);
    assert_eq!(classify_device(None).logical_cores, 4);
    assert!(classify_device(None).low_end);
}

#[test]
fn test_low_end_session_baseline() {
    let monitor = monitor_with(ManualHost::new(Capabilities::default()), false);
    let policy = monitor.policy();

    assert_eq!(policy.particle_budget, 30);
    assert!(policy.optimize_images);
    assert!(policy.disable_parallax);
    assert!(policy.enable_animations);

    let settings = policy.animation_settings(&monitor.device_class());
    assert!(settings.use_simple_animations);
    assert_eq!(settings.particle_size, 1.0);
}

#[test]
fn test_fps_window_eviction_through_monitor() {
    let mut monitor = monitor_with(ManualHost::with_cores(8), false);
    monitor.start();
    for fps in [60.0, 60.0, 60.0, 60.0, 60.0, 30.0] {
        monitor.record_fps_sample(fps);
    }

    assert_eq!(
        monitor.fps_window().values(),
        vec![60.0, 60.0, 60.0, 60.0, 30.0]
    );
    assert!((monitor.fps() - 54.0).abs() < 1e-9);

    // 54 FPS is healthy: nothing degrades
    let update = monitor.tick().unwrap();
    assert_eq!(update.policy.particle_budget, 100);
}

#[test]
fn test_memory_pressure_applies_per_tick() {
    let mut host = ManualHost::with_cores(8);
    host.set_memory(MemoryUsage::new(75, 80, 100));
    let mut monitor = monitor_with(host, true);
    monitor.start();

    assert_eq!(monitor.tick().unwrap().policy.particle_budget, 80);

    monitor.host_mut().set_memory(MemoryUsage::new(50, 80, 100));
    let relieved = monitor.tick().unwrap();
    assert_eq!(relieved.policy.particle_budget, 80);
    assert!(relieved.policy.optimize_images);

    monitor.host_mut().set_memory(MemoryUsage::new(90, 95, 100));
    assert_eq!(monitor.tick().unwrap().policy.particle_budget, 60);
}

#[test]
fn test_reduced_motion_disables_entrance_animations() {
    let mut monitor = monitor_with(ManualHost::with_cores(8), false);
    assert!(monitor.policy().animation_props(AnimationPreset::Scale).is_some());

    let update = monitor.set_reduced_motion(true);
    assert!(!update.policy.enable_animations);
    assert!(update.policy.animation_props(AnimationPreset::Scale).is_none());

    // Restoring motion keeps budgets already spent
    let update = monitor.set_reduced_motion(false);
    assert!(update.policy.enable_animations);
    assert_eq!(update.policy.particle_budget, 100);
}

#[test]
fn test_failed_subsystem_does_not_affect_governor() {
    let mut particles = FeatureGate::new("particle engine");
    assert!(!particles.initialize(|| Err("WebGL context lost")));

    let mut monitor = monitor_with(ManualHost::with_cores(8), false);
    monitor.start();
    assert!(monitor.tick().is_some());
    assert!(!particles.is_ready());
}
