//! `petmind onboard`: First-time setup.

use petmind_config::AppConfig;

use super::CliResult;

pub async fn run() -> CliResult {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    println!("🐾 PetMind First-Time Setup");
    println!("=============================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("✅ Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    let state_dir = AppConfig::default().storage.resolved_dir();
    if !state_dir.exists() {
        std::fs::create_dir_all(&state_dir)?;
        println!("✅ Created state directory: {}", state_dir.display());
    }

    if config_path.exists() {
        println!("\n⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete and re-run onboard.\n");
    } else {
        std::fs::write(&config_path, AppConfig::default_toml())?;
        println!("✅ Created config.toml at: {}", config_path.display());
        println!("\n📝 Next steps:");
        println!("   1. Set PETMIND_API_KEY, or add api_key under [dispatcher]");
        println!("   2. Run: petmind chat\n");
    }

    println!("🎉 Setup complete!\n");
    Ok(())
}
