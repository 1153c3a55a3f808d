//! Config command handler.
//!
//! Contains the implementation of the `config` CLI command and
//! display helpers for configuration output.

use rekindle::RekindleConfig;

/// Config command: prints the effective configuration.
pub fn cmd_config(config: &RekindleConfig, toml_output: bool) -> Result<(), Box<dyn std::error::Error>> {
    if toml_output {
        print!("{}", toml::to_string_pretty(config)?);
        return Ok(());
    }

    println!("Current Configuration");
    println!("=====================");
    println!();
    println!("Data Directory: {}", config.data_dir.display());
    println!("Collection: {}", config.collection_path().display());
    println!("Ledger: {}", config.ledger_path().display());
    println!();

    println!("Discovery:");
    println!("  Default Batch Size: {}", config.discovery.default_batch_size);
    println!("  Max Batch Size: {}", config.discovery.max_batch_size);
    println!("  Assume HTTPS: {}", config.discovery.assume_https);
    println!();

    println!("Duplicates:");
    println!("  Threshold: {:.2}", config.duplicates.threshold);
    println!(
        "  Signature: {} bands x {} rows",
        config.duplicates.bands, config.duplicates.rows_per_band
    );
    println!("  Shingle Size: {}", config.duplicates.shingle_size);
    println!("  Min Title Length: {}", config.duplicates.min_title_length);
    println!();

    display_logging_config(config);

    Ok(())
}

fn display_logging_config(config: &RekindleConfig) {
    let logging = &config.logging;
    println!("Logging:");
    println!("  Level: {}", logging.level.as_deref().unwrap_or("(default)"));
    println!("  Format: {}", logging.format.as_deref().unwrap_or("pretty"));
    println!(
        "  File: {}",
        logging
            .file
            .as_ref()
            .map_or_else(|| "(stderr)".to_string(), |p| p.display().to_string())
    );
}
