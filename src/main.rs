use anyhow::{Context, Result, bail};
use dockhand::cli::{Args, Commands, ConfigDiscovery, DockhandConfig};
use dockhand::container::{
    self, BuildOptions, ContainerClient, Image, StartOptions, Toolkit, with_deadline,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    match args.command {
        Commands::ShowConfig => {
            ConfigDiscovery::show_discovery_info(args.config.as_deref());
            return Ok(());
        }
        Commands::InitConfig { user } => {
            println!("{}", ConfigDiscovery::create_default_config(user)?.display());
            return Ok(());
        }
        _ => {}
    }

    let config = ConfigDiscovery::discover_config(args.config.as_deref())?;
    debug!("Effective configuration: {:?}", config);

    let client = ContainerClient::with_config(config.engine.clone())
        .await
        .context("Failed to connect to container runtime")?;
    info!("Connected to {}", client.runtime_type().await?);
    let toolkit = Toolkit::with_config(Arc::new(client), config.lifecycle.clone());

    let deadline = args.timeout.map(Duration::from_secs);
    run_command(args.command, &toolkit, &config, deadline).await
}

/// Container and build output go to stdout, diagnostics to stderr.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("dockhand=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("dockhand=info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn bounded<T, F>(deadline: Option<Duration>, operation: F) -> container::Result<T>
where
    F: Future<Output = container::Result<T>>,
{
    match deadline {
        Some(deadline) => with_deadline(deadline, operation).await,
        None => operation.await,
    }
}

async fn run_command(
    command: Commands,
    toolkit: &Toolkit,
    config: &DockhandConfig,
    deadline: Option<Duration>,
) -> Result<()> {
    match command {
        Commands::Pull { reference } => {
            let image = bounded(deadline, toolkit.images.pull(&reference))
                .await
                .with_context(|| format!("Failed to pull {}", reference))?;
            println!("{}", image.name);
        }
        Commands::Build {
            name,
            context,
            dockerfile,
            platform,
        } => {
            let mut options = BuildOptions::builder();
            if let Some(dockerfile) = dockerfile {
                options = options.dockerfile(dockerfile);
            }
            if let Some(platform) = platform {
                options = options.platform(platform);
            }
            let Some(context_dir) = context.to_str() else {
                bail!("Build context path {:?} is not valid UTF-8", context);
            };

            let image = bounded(
                deadline,
                toolkit.images.build(&name, context_dir, &options.build()),
            )
            .await
            .with_context(|| format!("Failed to build {}", name))?;
            println!("{}", image.name);
        }
        Commands::Network { name } => {
            let network = bounded(deadline, toolkit.networks.create(&name))
                .await
                .with_context(|| format!("Failed to ensure network {}", name))?;
            println!("{}", network.id);
        }
        Commands::Run {
            image,
            name,
            ports,
            env,
            platform,
            cap_add,
            network,
            pull,
        } => {
            let mut options = StartOptions::builder().envs(env);
            if let Some(name) = name {
                options = options.name(name);
            }
            for port in ports {
                options = options.port_binding(port.host, port.container, port.protocol);
            }
            if let Some(platform) = platform {
                options = options.platform(platform);
            }
            for cap in cap_add {
                options = options.cap_add(cap);
            }
            let options = options.build();

            let container = bounded(deadline, async {
                let image = if pull {
                    toolkit.images.pull(&image).await?
                } else {
                    Image::new(image.as_str())
                };
                let network = match network.as_deref() {
                    Some(network) => Some(toolkit.networks.create(network).await?),
                    None => None,
                };
                toolkit
                    .containers
                    .start(&image, network.as_ref(), &options)
                    .await
            })
            .await
            .with_context(|| format!("Failed to start {}", image))?;
            println!("{}", container.id);
        }
        Commands::Stop { name, logs } => {
            let capture = logs || config.capture_logs;
            bounded(deadline, async {
                match toolkit.containers.find(&name).await? {
                    Some(container) => container.stop(capture).await,
                    None => {
                        info!("No container named {}", name);
                        Ok(())
                    }
                }
            })
            .await
            .with_context(|| format!("Failed to stop {}", name))?;
        }
        Commands::Rm { name, logs } => {
            let capture = logs || config.capture_logs;
            bounded(deadline, toolkit.containers.remove_by_name(&name, capture))
                .await
                .with_context(|| format!("Failed to remove {}", name))?;
        }
        Commands::ShowConfig => ConfigDiscovery::show_discovery_info(None),
        Commands::InitConfig { user } => {
            println!("{}", ConfigDiscovery::create_default_config(user)?.display());
        }
    }
    Ok(())
}
