use clap::{Parser, Subcommand};
use log::{error, info, warn};
use lxd_driver::configuration::Config;
use lxd_driver::container_management::{Container, DriverContext, StateOptions, WaitOptions};
use lxd_driver::error_handling::ContainerError;
use lxd_driver::mapper::MapOperation;
use lxd_driver::vm::VmTemplate;
use std::error::Error;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "lxd-driver")]
#[command(version = "0.1.0")]
#[command(about = "Drives system containers backing virtual machines")]
struct Args {
    /// Driver configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    action: Action,
}

#[derive(Subcommand)]
enum Action {
    /// Create the container if needed, map its storage and start it
    Deploy {
        #[arg(long)]
        vm: PathBuf,
    },
    /// Stop the container, unmap its storage and delete it
    Shutdown {
        #[arg(long)]
        vm: PathBuf,
        #[arg(long)]
        force: bool,
    },
    Reboot {
        #[arg(long)]
        vm: PathBuf,
    },
    /// Print the runtime state of a container
    Poll { name: String },
    /// List every container with its status
    List,
    AttachNic {
        #[arg(long)]
        vm: PathBuf,
        #[arg(long)]
        mac: String,
    },
    DetachNic {
        #[arg(long)]
        vm: PathBuf,
        #[arg(long)]
        mac: String,
    },
    /// Attach the disk flagged for hotplug
    AttachDisk {
        #[arg(long)]
        vm: PathBuf,
        /// Datastore path of the disk image
        #[arg(long)]
        source: Option<String>,
    },
    DetachDisk {
        #[arg(long)]
        vm: PathBuf,
    },
    /// Regenerate the context volume
    Reconfigure {
        #[arg(long)]
        vm: PathBuf,
    },
    /// Send a console signal (start or stop)
    Vnc {
        #[arg(long)]
        vm: PathBuf,
        signal: String,
    },
}

fn existing(path: &Path, ctx: &DriverContext) -> Result<Container, ContainerError> {
    let vm = VmTemplate::from_file(path)?;
    let name = vm.container_name();
    Container::get(&name, Some(Box::new(vm)), ctx.clone())
}

fn deploy(path: &Path, ctx: &DriverContext) -> Result<(), Box<dyn Error>> {
    let vm = VmTemplate::from_file(path)?;
    let name = vm.container_name();

    let mut container = if Container::exists(&name, ctx)? {
        info!("Container {} already exists", name);
        Container::get(&name, Some(Box::new(vm)), ctx.clone())?
    } else {
        let mut container = Container::from_vm(Box::new(vm), ctx.clone());
        container.create(WaitOptions::default())?;
        container
    };

    if !container.setup_storage(MapOperation::Map)? {
        return Err(format!("failed to map storage of {}", name).into());
    }
    container.start(StateOptions::default())?;
    container.vnc("start")?;

    println!("{}", container.name());
    Ok(())
}

fn shutdown(path: &Path, force: bool, ctx: &DriverContext) -> Result<(), Box<dyn Error>> {
    let mut container = existing(path, ctx)?;

    container.stop(StateOptions {
        force,
        ..Default::default()
    })?;
    if !container.setup_storage(MapOperation::Unmap)? {
        warn!("Storage of {} was not fully unmapped", container.name());
    }
    container.vnc("stop")?;

    if container.is_wild() {
        info!("Keeping wild container {}", container.name());
        return Ok(());
    }
    container.delete(WaitOptions::default())?;
    Ok(())
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let config = Config::load(args.config.as_deref())?;
    info!("Configuration imported successfully");
    let ctx = DriverContext::new(config)?;

    match args.action {
        Action::Deploy { vm } => deploy(&vm, &ctx)?,
        Action::Shutdown { vm, force } => shutdown(&vm, force, &ctx)?,
        Action::Reboot { vm } => {
            let mut container = existing(&vm, &ctx)?;
            container.restart(StateOptions::default())?;
        }
        Action::Poll { name } => {
            let container = Container::get(&name, None, ctx.clone())?;
            let state = container.monitor()?;
            println!("{} {} {}", container.name(), state.status, state.pid);
        }
        Action::List => {
            for container in Container::get_all(&ctx)? {
                println!(
                    "{} {}",
                    container.name(),
                    container.status().unwrap_or("Unknown")
                );
            }
        }
        Action::AttachNic { vm, mac } => existing(&vm, &ctx)?.attach_nic(&mac)?,
        Action::DetachNic { vm, mac } => {
            existing(&vm, &ctx)?.detach_nic(&mac)?;
        }
        Action::AttachDisk { vm, source } => {
            if !existing(&vm, &ctx)?.attach_disk(source.as_deref())? {
                return Err("failed to attach disk".into());
            }
        }
        Action::DetachDisk { vm } => {
            existing(&vm, &ctx)?.detach_disk()?;
        }
        Action::Reconfigure { vm } => {
            let mut container = existing(&vm, &ctx)?;
            container.detach_context()?;
            if !container.attach_context()? {
                return Err("failed to attach context".into());
            }
        }
        Action::Vnc { vm, signal } => {
            existing(&vm, &ctx)?.vnc(&signal)?;
        }
    }

    Ok(())
}

fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_target(false)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        error!("{}", e);
        std::process::exit(1);
    }
}
