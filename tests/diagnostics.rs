mod common;

use common::{ScriptedSampler, settings};
use gpu_burner::core::config::Settings;
use gpu_burner::daemon::diag;

#[test]
fn test_gpu_reports_each_target() {
    let sampler = ScriptedSampler::new(2);
    sampler.set(0, 3.0);

    let report = diag::test_gpu(&sampler, &[0, 1]);

    assert!(!report.all_reachable());
    assert_eq!(report.unreachable().collect::<Vec<_>>(), vec![1]);
    let info = report.checks[0].result.as_ref().unwrap();
    assert_eq!(info.name, "Scripted GPU 0");
    assert_eq!(info.reading.utilization_pct, 3.0);
}

#[test]
fn test_gpu_all_reachable() {
    let sampler = ScriptedSampler::new(2);
    sampler.set(0, 0.0);
    sampler.set(1, 99.0);

    assert!(diag::test_gpu(&sampler, &[0, 1]).all_reachable());
    assert!(!diag::test_gpu(&sampler, &[]).all_reachable());
}

#[test]
fn printed_config_loads_back() {
    let cfg = settings(vec![0, 2], 0.25);

    let yaml = diag::print_config(&cfg).unwrap();

    assert!(yaml.contains("target_gpus"));
    assert!(yaml.contains("intensity_step: 0.25"));
    assert_eq!(Settings::from_yaml(&yaml).unwrap(), cfg);
}
