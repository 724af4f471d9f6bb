use pfsim_core::{Config, Intrahost};
use pfsim_io::DataExporter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    println!("=== Intrahost malaria engine: cohort export ===\n");

    let cohort_size = 20u64;
    let dt = 1.0;
    let max_days = 180;

    let mut hosts: Vec<Intrahost> = (0..cohort_size)
        .map(|id| Intrahost::from_config(Config::laboratory_default(1000 + id)))
        .collect();

    for host in hosts.iter_mut() {
        host.challenge();
    }

    let mut exporter = DataExporter::new("cohort_output", "host");

    for day in 0..max_days {
        for (id, host) in hosts.iter_mut().enumerate() {
            if host.n_infections() > 0 {
                host.update(dt)?;
            }
            exporter.collect(id as u64, day, day as f64, &host.snapshot());
        }

        if day % 30 == 0 && day > 0 {
            let path = exporter.save_snapshot(day)?;
            println!("saved {}", path.display());
        }
    }

    let final_path = exporter.save_snapshot(max_days)?;
    println!("final snapshot: {}", final_path.display());

    let still_patent = hosts.iter().filter(|h| h.n_infections() > 0).count();
    println!("\n{}/{} hosts still patent after {} days", still_patent, cohort_size, max_days);

    Ok(())
}
