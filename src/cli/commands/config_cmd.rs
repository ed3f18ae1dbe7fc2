//! Configuration display command.

use console::style;

use docsift::config::Config;

/// Print the effective configuration as TOML.
pub async fn cmd_config_show(config: &Config) -> anyhow::Result<()> {
    let source = config
        .source_path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "defaults".to_string());
    eprintln!("{} {}", style("# Source:").dim(), style(source).dim());

    let rendered = config.to_toml().map_err(|e| anyhow::anyhow!(e))?;
    println!("{}", rendered);
    Ok(())
}
