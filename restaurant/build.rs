use common::yaml_include::{load_yaml_with_includes, render_yaml};
use std::{error::Error, fs, path::Path};

fn main() -> Result<(), Box<dyn Error>> {
    let project_name = "restaurant";
    println!("cargo:rerun-if-changed=config");
    println!("cargo:rerun-if-env-changed=RESTAURANT_ENV");

    let out_dir = std::env::var("OUT_DIR")?;
    let env = std::env::var("RESTAURANT_ENV").unwrap_or_else(|_| "dev".to_string());
    let profile = std::env::var("PROFILE").unwrap_or_else(|_| "debug".to_string());

    let target_dir = Path::new(&out_dir)
        .ancestors()
        .find(|p| p.ends_with("target"))
        .ok_or("Could not find target directory")?
        .join(&profile);

    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR")?;
    let source = Path::new(&manifest_dir)
        .join("config")
        .join(format!("{}.yaml", env));

    println!(
        "cargo:warning=Loading {} config env {:?} profile {:?}",
        project_name, env, profile
    );
    let config_yaml = load_yaml_with_includes(&source)?;
    let out_str = render_yaml(&config_yaml)?;

    let total_config_dir = target_dir.join("config");
    fs::create_dir_all(&total_config_dir)?;
    fs::write(total_config_dir.join("total_config.yaml"), out_str)?;

    Ok(())
}
