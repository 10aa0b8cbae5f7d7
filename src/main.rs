use anyhow::{Context, Result};
use clap::Parser;
use forward_proxy::cli::Cli;
use forward_proxy::config::ProxyConfig;
use forward_proxy::server::run_proxy;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.resolve_config()?;

    if cli.check {
        print_config_summary(cli.config.as_deref().unwrap_or_default(), &config);
        return Ok(());
    }

    // RUST_LOG 优先，其次使用配置中的日志级别
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_ascii_lowercase()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    info!("Forward Proxy v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Listen address: {}, CONNECT targets: {:?}",
        config.listen, config.connect_targets
    );

    run_proxy(config)
        .await
        .context("Proxy terminated with a fatal error")?;

    Ok(())
}

/// 输出配置检查结果
fn print_config_summary(path: &str, config: &ProxyConfig) {
    println!("Checking configuration file: {}\n", path);
    println!("✓ Listen address: {} (binds {})", config.listen, config.listen_addr());
    println!("✓ CONNECT targets: {:?}", config.connect_targets);
    println!("✓ Log level: {}", config.log_level);
    println!("\n✓ Proxy configuration is valid!");
}
