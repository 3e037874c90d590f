//! `duneguide doctor`: Diagnose configuration and store health.

use duneguide_config::AppConfig;
use duneguide_core::provider::Provider;
use duneguide_core::store::PassageStore;
use std::path::Path;

use super::{CmdResult, backend, open_store};

pub async fn run(config_path: Option<&Path>) -> CmdResult {
    println!("🩺 DuneGuide Doctor — System Diagnostics");
    println!("========================================\n");

    let mut issues = 0;

    let config = match AppConfig::load(config_path) {
        Ok(config) => {
            println!("  ✅ Config valid");
            config
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            println!();
            println!("  ⚠️  1 issue(s) found. See above for details.");
            return Ok(());
        }
    };

    if config.has_api_key() {
        println!("  ✅ API key configured for '{}'", config.provider);
    } else {
        println!("  ⚠️  No API key — set GEMINI_API_KEY or add api_key to config.toml");
        issues += 1;
    }

    match backend(&config) {
        Ok(backend) => {
            println!("  ✅ Provider '{}' ready (model {})", config.provider, config.model);

            match open_store(&config, backend.embedder.clone()).await {
                Ok(store) => match store.count().await {
                    Ok(0) => {
                        println!(
                            "  ⚠️  Collection '{}' is empty — run `duneguide ingest <file>`",
                            store.collection()
                        );
                        issues += 1;
                    }
                    Ok(n) => println!("  ✅ Collection '{}' has {n} passages", store.collection()),
                    Err(e) => {
                        println!("  ❌ Collection unreadable: {e}");
                        issues += 1;
                    }
                },
                Err(e) => {
                    println!("  ❌ {e}");
                    issues += 1;
                }
            }

            if config.has_api_key() {
                match backend.generator.health_check().await {
                    Ok(true) => println!("  ✅ Provider reachable"),
                    Ok(false) => {
                        println!("  ⚠️  Provider rejected the health check");
                        issues += 1;
                    }
                    Err(e) => {
                        println!("  ❌ Provider unreachable: {e}");
                        issues += 1;
                    }
                }
            }
        }
        Err(e) => {
            println!("  ❌ {e}");
            issues += 1;
        }
    }

    // Summary
    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
