use log::{debug, error, info};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::configuration::Config;
use crate::container_management::types::{ContainerAttributes, Devices, WaitOptions};
use crate::error_handling::types::ContainerError;
use crate::mapper::MapperDispatcher;
use crate::process::{CommandResult, Executor, ShellCommand, SystemExecutor};
use crate::remote::{ContainerApi, Response, SocketClient};
use crate::vm::VmDescriptor;

/// Remote collection holding every container.
pub const CONTAINERS: &str = "containers";

/// Collaborators shared by every container the driver handles.
#[derive(Clone)]
pub struct DriverContext {
    pub api: Arc<dyn ContainerApi>,
    pub executor: Arc<dyn Executor>,
    pub config: Arc<Config>,
}

impl DriverContext {
    /// Context talking to the local API socket and running commands on the host.
    pub fn new(config: Config) -> Result<Self, ContainerError> {
        let executor: Arc<dyn Executor> = Arc::new(SystemExecutor::new(&config));
        let api: Arc<dyn ContainerApi> = Arc::new(SocketClient::new(&config)?);
        Ok(Self::with_collaborators(api, executor, config))
    }

    pub fn with_collaborators(
        api: Arc<dyn ContainerApi>,
        executor: Arc<dyn Executor>,
        config: Config,
    ) -> Self {
        Self {
            api,
            executor,
            config: Arc::new(config),
        }
    }

    pub fn dispatcher(&self) -> MapperDispatcher {
        MapperDispatcher::new(self.executor.clone(), &self.config)
    }
}

/// In-memory mirror of one remote container, optionally linked to the VM it was
/// derived from.
///
/// Every mutation is local first; the full record is then pushed with
/// [`Container::update`].
pub struct Container {
    pub(crate) attributes: ContainerAttributes,
    pub(crate) vm: Option<Box<dyn VmDescriptor>>,
    pub(crate) ctx: DriverContext,
}

impl Container {
    /// Record for `vm`, not yet known to the remote. No remote call is made.
    pub fn from_vm(vm: Box<dyn VmDescriptor>, ctx: DriverContext) -> Self {
        let attributes = vm.to_container();
        debug!("Derived container {} from VM {}", attributes.name, vm.vm_id());
        Self {
            attributes,
            vm: Some(vm),
            ctx,
        }
    }

    /// Fetches the container `name` from the remote.
    pub fn get(
        name: &str,
        vm: Option<Box<dyn VmDescriptor>>,
        ctx: DriverContext,
    ) -> Result<Self, ContainerError> {
        let attributes = Self::fetch(&ctx, name)?;
        Ok(Self {
            attributes,
            vm,
            ctx,
        })
    }

    /// Every container known to the remote, none of them linked to a VM.
    pub fn get_all(ctx: &DriverContext) -> Result<Vec<Self>, ContainerError> {
        let names: Vec<String> = ctx.api.get(CONTAINERS)?.metadata_as()?;
        info!("Found {} containers", names.len());

        names
            .iter()
            .map(|url| url.rsplit('/').next().unwrap_or(url.as_str()))
            .map(|name| Self::get(name, None, ctx.clone()))
            .collect()
    }

    /// True when the remote knows `name`. Only a 404 answer means absence; any
    /// other failure is returned as an error.
    pub fn exists(name: &str, ctx: &DriverContext) -> Result<bool, ContainerError> {
        match ctx.api.get(&format!("{}/{}", CONTAINERS, name)) {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => {
                debug!("Container {} does not exist", name);
                Ok(false)
            }
            Err(e) => {
                error!("Failed to check container {}: {}", name, e);
                Err(e)
            }
        }
    }

    pub(crate) fn fetch(ctx: &DriverContext, name: &str) -> Result<ContainerAttributes, ContainerError> {
        ctx.api
            .get(&format!("{}/{}", CONTAINERS, name))?
            .metadata_as()
    }

    pub(crate) fn path(&self) -> String {
        format!("{}/{}", CONTAINERS, self.attributes.name)
    }

    /// Blocks on `response` unless the caller opted out.
    pub(crate) fn wait_for(&self, response: &Response, wait: WaitOptions) -> Result<(), ContainerError> {
        if !wait.wait {
            return Ok(());
        }
        let timeout = wait.timeout.or_else(|| self.ctx.config.operation_timeout());
        self.ctx.api.wait(response, timeout)
    }

    pub fn name(&self) -> &str {
        &self.attributes.name
    }

    pub fn status(&self) -> Option<&str> {
        self.attributes.status.as_deref()
    }

    pub fn status_code(&self) -> Option<i64> {
        self.attributes.status_code
    }

    pub fn devices(&self) -> &Devices {
        &self.attributes.devices
    }

    pub fn devices_mut(&mut self) -> &mut Devices {
        &mut self.attributes.devices
    }

    pub fn config(&self) -> &BTreeMap<String, String> {
        &self.attributes.config
    }

    pub fn config_mut(&mut self) -> &mut BTreeMap<String, String> {
        &mut self.attributes.config
    }

    pub fn profile(&self) -> &[String] {
        &self.attributes.profile
    }

    pub fn set_profile(&mut self, profile: Vec<String>) {
        self.attributes.profile = profile;
    }

    pub fn expanded_config(&self) -> &BTreeMap<String, String> {
        &self.attributes.expanded_config
    }

    pub fn expanded_devices(&self) -> &Devices {
        &self.attributes.expanded_devices
    }

    pub fn architecture(&self) -> Option<&str> {
        self.attributes.architecture.as_deref()
    }

    pub fn attributes(&self) -> &ContainerAttributes {
        &self.attributes
    }

    pub fn vm(&self) -> Option<&dyn VmDescriptor> {
        self.vm.as_deref()
    }

    /// Delegates to the VM descriptor; a container without one is not wild.
    pub fn is_wild(&self) -> bool {
        self.vm.as_ref().is_some_and(|vm| vm.is_wild())
    }

    /// Runs `command` inside the container through `lxc exec`.
    pub fn exec(&self, command: &str) -> Result<CommandResult, ContainerError> {
        let cmd = ShellCommand::from_line(&self.ctx.config.commands.lxc)
            .args(["exec", self.name(), "--", "sh", "-c", command]);
        debug!("Executing in {}: {}", self.name(), command);
        self.ctx.executor.execute(&cmd)
    }
}

/// Descriptor required by an operation, or a `MissingPrecondition` naming it.
pub(crate) fn require_vm<'a>(
    vm: &'a Option<Box<dyn VmDescriptor>>,
    operation: &str,
) -> Result<&'a dyn VmDescriptor, ContainerError> {
    vm.as_deref().ok_or_else(|| {
        error!("{} needs a VM description", operation);
        ContainerError::MissingPrecondition(format!("{} needs a VM description", operation))
    })
}
