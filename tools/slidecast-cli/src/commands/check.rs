//! Check system capabilities.

use slidecast_common::config::AppConfig;
use slidecast_pipeline::Pipeline;

pub fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("Slidecast System Check");
    println!("{}", "=".repeat(50));

    let pipeline =
        Pipeline::from_config(config).map_err(|e| anyhow::anyhow!("Invalid settings: {e}"))?;

    let report = pipeline.backend_report();
    for (name, available) in &report {
        if *available {
            println!("[OK] {name}");
        } else {
            println!("[MISSING] {name}");
        }
    }

    println!();
    println!("Config file: {}", AppConfig::config_path().display());
    println!("Working directory: {}", config.work_dir.display());
    println!("Voice: {}", config.narration.voice);

    println!();
    if report.iter().all(|(_, available)| *available) {
        println!("All required tools are available. Slidecast is ready.");
        Ok(())
    } else {
        println!("Some required tools are missing. Install them and run the check again.");
        Err(anyhow::anyhow!("required tools missing"))
    }
}
