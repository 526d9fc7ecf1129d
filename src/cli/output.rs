use crate::daemon::diag::GpuTestReport;
use std::path::Path;

pub fn print_config(path: &Path, yaml: &str) {
    println!("# Resolved configuration ({})", path.display());
    print!("{}", yaml);
}

pub fn print_test_header() {
    println!("Testing GPU connection...");
}

pub fn print_gpu_report(report: &GpuTestReport) {
    for check in &report.checks {
        match &check.result {
            Ok(info) => {
                println!("GPU {}: {}", check.device_id, info.name);
                println!("  Status:      available");
                println!("  Memory:      {:.0} MB", info.reading.memory_total_mb);
                println!("  Utilization: {:.0}%", info.reading.utilization_pct);
                println!("  Temperature: {:.0}°C", info.reading.temperature_c);
            }
            Err(e) => {
                println!("GPU {}: unavailable", check.device_id);
                println!("  Reason:      {}", e);
            }
        }
    }

    let unreachable: Vec<u32> = report.unreachable().collect();
    if unreachable.is_empty() {
        println!("\nAll {} target GPU(s) reachable", report.checks.len());
    } else {
        print_error(&format!("unreachable GPU(s): {:?}", unreachable));
    }
}

pub fn print_error(message: &str) {
    eprintln!(" Error: {}", message);
}
