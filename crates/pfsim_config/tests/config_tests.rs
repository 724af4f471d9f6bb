use pfsim_config::{ConfigDocument, ConfigLoader};
use tempfile::tempdir;

#[test]
fn default_document_roundtrips_through_toml() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("host.toml");

    let doc = ConfigDocument::default();
    ConfigLoader::save_toml(&doc, &path).unwrap();

    let config = ConfigLoader::from_toml(&path).unwrap();
    assert_eq!(config.seed, doc.run_number as u64);
    assert_eq!(config.max_individual_infections, doc.max_individual_infections as usize);
}

#[test]
fn default_document_roundtrips_through_yaml() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("host.yaml");

    let doc = ConfigDocument::default();
    ConfigLoader::save_yaml(&doc, &path).unwrap();

    let config = ConfigLoader::from_yaml(&path).unwrap();
    assert_eq!(config.seed, doc.run_number as u64);
}

#[test]
fn invalid_document_is_rejected_before_reaching_the_core() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.toml");

    let mut doc = ConfigDocument::default();
    doc.antibody_memory_level = 2.0;
    ConfigLoader::save_toml(&doc, &path).unwrap();

    assert!(ConfigLoader::from_toml(&path).is_err());
}

#[test]
fn missing_key_fails_to_parse() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("incomplete.toml");
    std::fs::write(&path, "run_number = 1\n").unwrap();

    assert!(ConfigLoader::from_toml(&path).is_err());
}
