use anyhow::{Context, bail};
use podnorm::cli::{
    Args, ConfigDiscovery, CreateConfig, ExecutionMode, RenderConfig, VerifyConfig, load_attrs,
    load_options,
};
use podnorm::container::ContainerClient;
use podnorm::normalize::{CreateOptions, CreateRequestBuilder, NormalizerConfig};
use podnorm::verify::{VerificationReport, verify_all};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mode = match args.mode() {
        Ok(mode) => mode,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let default_filter = if mode.verbose() {
        "podnorm=debug"
    } else {
        "podnorm=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match mode {
        ExecutionMode::Render(config) => run_render(config),
        ExecutionMode::Verify(config) => run_verify(config),
        ExecutionMode::Create(config) => run_create(config).await,
        ExecutionMode::ShowConfig => {
            ConfigDiscovery::show_discovery_info();
            Ok(())
        }
    }
}

fn run_render(config: RenderConfig) -> anyhow::Result<()> {
    let settings = ConfigDiscovery::load(config.config_override.as_deref())?;
    let options = load_options(&config.options_file, config.format)?;

    let request = CreateRequestBuilder::new(config.image)
        .options(options)
        .config(settings.normalizer)
        .build()
        .with_context(|| format!("cannot normalize {}", config.options_file.display()))?;

    println!("{}", request.to_json()?);
    Ok(())
}

fn run_verify(config: VerifyConfig) -> anyhow::Result<()> {
    let settings = ConfigDiscovery::load(config.config_override.as_deref())?;
    let options = load_options(&config.options_file, config.format)?;
    let attrs = load_attrs(&config.attrs_file)?;

    let report = verify_all(&attrs, &options, &settings.normalizer);
    finish(&report)
}

async fn run_create(config: CreateConfig) -> anyhow::Result<()> {
    let settings = ConfigDiscovery::load(config.config_override.as_deref())?;
    let mut options = load_options(&config.options_file, config.format)?;
    if let Some(probe) = config.probe {
        info!("Running {} probe: {:?}", probe, probe.command());
        options.command = Some(probe.command());
    }

    let request = CreateRequestBuilder::new(config.image.clone())
        .options(options.clone())
        .config(settings.normalizer)
        .build()
        .with_context(|| format!("cannot normalize {}", config.options_file.display()))?;

    let client = ContainerClient::with_config(settings.engine.clone()).await?;
    info!("Using {} runtime", client.runtime_type().await?);

    let id = client.create_container(&request).await?;
    let outcome = check_container(&client, &id, &options, &config, &settings.normalizer).await;

    if config.keep {
        println!("Kept container {}", id);
    } else if let Err(e) = client.remove_container(&id, true).await {
        warn!("Failed to remove container {}: {}", id, e);
    }

    finish(&outcome?)
}

async fn check_container(
    client: &ContainerClient,
    id: &str,
    options: &CreateOptions,
    config: &CreateConfig,
    normalizer: &NormalizerConfig,
) -> anyhow::Result<VerificationReport> {
    let attrs = client.inspect_attrs(id).await?;
    let report = verify_all(&attrs, options, normalizer);

    let Some(probe) = config.probe else {
        return Ok(report);
    };

    let output = client.run_to_completion(id).await?;
    if output.exit_code != 0 {
        bail!(
            "{} probe exited with code {}:\n{}",
            probe,
            output.exit_code,
            output.logs
        );
    }
    if let Err(e) = probe.check(&output.logs, options) {
        error!("{} probe failed: {}", probe, e);
        bail!("{} probe failed: {}", probe, e);
    }
    info!("{} probe passed", probe);
    Ok(report)
}

fn finish(report: &VerificationReport) -> anyhow::Result<()> {
    print!("{}", report);
    if !report.is_ok() {
        error!("Verification failed");
        bail!("{} of {} checks failed", report.failures.len(), report.checks.len());
    }
    Ok(())
}
