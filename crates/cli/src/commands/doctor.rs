//! `animus doctor` — Diagnose configuration and data files.

use animus_config::{AppConfig, Persona};
use std::path::Path;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("animus doctor — diagnostics");
    println!("===========================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        match AppConfig::load() {
            Ok(config) => {
                println!("  ✅ Config file valid");

                if config.api_key.is_some() {
                    println!("  ✅ API key configured");
                } else {
                    println!("  ⚠️  No API key — set ANIMUS_API_KEY or api_key in config.toml");
                    issues += 1;
                }

                if config.gateway.admin_key.is_some() {
                    println!("  ✅ Admin key configured");
                } else {
                    println!("  ⚠️  No admin key — the X-Admin-Key bypass is disabled");
                }

                match Persona::load_from(Path::new(&config.persona.profile_path)) {
                    Ok(persona) => println!("  ✅ Persona profile loads ({})", persona.name),
                    Err(e) => {
                        println!("  ❌ Persona profile invalid: {e}");
                        issues += 1;
                    }
                }

                match animus_retrieval::load_corpus(Path::new(&config.persona.corpus_path)) {
                    Ok(corpus) => println!("  ✅ Memory corpus loads ({} items)", corpus.len()),
                    Err(e) => {
                        println!("  ❌ Memory corpus invalid: {e}");
                        issues += 1;
                    }
                }
            }
            Err(e) => {
                println!("  ❌ Config file invalid: {e}");
                issues += 1;
            }
        }
    } else {
        println!("  ❌ No config file at {}", config_path.display());
        issues += 1;
    }

    println!();
    if issues == 0 {
        println!("  All checks passed.");
    } else {
        println!("  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
