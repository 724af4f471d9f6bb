use pfsim_core::{Config, Intrahost};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    println!("=== Intrahost malaria engine: single host ===\n");

    let config = Config::laboratory_default(42);
    let mut host = Intrahost::from_config(config);

    println!("Challenging host with one infectious bite...");
    host.challenge();

    let dt = 1.0;
    let max_days = 365;
    let mut day = 0;

    while day < max_days && host.n_infections() > 0 {
        host.update(dt)?;
        day += 1;

        if day % 30 == 0 {
            println!(
                "day {:>3}  infections={}  parasites/uL={:.1}  gametocytes/uL={:.2}  fever={:.1}C  infectiousness={:.3}",
                day,
                host.n_infections(),
                host.parasite_density(),
                host.gametocyte_density(),
                host.fever_celsius(),
                host.infectiousness(),
            );
        }
    }

    if host.n_infections() == 0 {
        println!("\nInfection cleared after {} days.", day);
    } else {
        println!("\nInfection still patent after {} days.", day);
    }

    Ok(())
}
