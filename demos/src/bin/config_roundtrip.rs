use pfsim_config::{ConfigDocument, ConfigLoader};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Intrahost malaria engine: configuration round-trip ===\n");

    std::fs::create_dir_all("configs")?;

    println!("1. Default parameter document:");
    let default_doc = ConfigDocument::default();
    println!("   run_number: {}", default_doc.run_number);
    println!("   falciparum_pfemp1_variants: {}", default_doc.falciparum_pfemp1_variants);

    println!("\n2. Saving to configs/default.toml and configs/default.yaml...");
    ConfigLoader::save_toml(&default_doc, "configs/default.toml")?;
    ConfigLoader::save_yaml(&default_doc, "configs/default.yaml")?;

    println!("\n3. Loading back from TOML...");
    let config = ConfigLoader::from_toml("configs/default.toml")?;
    println!("   seed: {}", config.seed);
    println!("   max_individual_infections: {}", config.max_individual_infections);

    println!("\n4. Building a higher-transmission variant and saving it...");
    let mut high_eir_doc = ConfigDocument::default();
    high_eir_doc.run_number = 7;
    high_eir_doc.antigen_switch_rate *= 2.0;
    ConfigLoader::save_toml(&high_eir_doc, "configs/high_eir.toml")?;

    println!("\nDone. Parameter documents written under ./configs/");
    Ok(())
}
