//! Lifecycle Controller
//!
//! Creation, deletion, full-record updates and state changes of a [`Container`].
//! Every state change goes through one engine that PUTs a [`StateChange`] on the
//! `state` sub-resource and refreshes the local snapshot afterwards.

use log::{debug, info};
use serde_json::json;

use super::container::{Container, CONTAINERS};
use crate::container_management::types::{
    ContainerAttributes, ContainerState, LifecycleAction, StateChange, StateOptions, WaitOptions,
};
use crate::error_handling::types::ContainerError;

impl Container {
    /// Creates the container on the remote without a base image, then mirrors the
    /// attributes the remote computed.
    pub fn create(&mut self, wait: WaitOptions) -> Result<(), ContainerError> {
        info!("Creating container {}", self.name());
        self.attributes
            .extra
            .insert("source".to_string(), json!({"type": "none"}));

        let body = serde_json::to_value(&self.attributes)?;
        let response = self.ctx.api.post(CONTAINERS, &body)?;
        self.wait_for(&response, wait)?;

        self.get_metadata()?;
        info!("Container {} created", self.name());
        Ok(())
    }

    pub fn delete(&self, wait: WaitOptions) -> Result<(), ContainerError> {
        info!("Deleting container {}", self.name());
        let response = self.ctx.api.delete(&self.path())?;
        self.wait_for(&response, wait)
    }

    /// Pushes the complete local record.
    pub fn update(&self, wait: WaitOptions) -> Result<(), ContainerError> {
        debug!(
            "Updating container {} ({} devices)",
            self.name(),
            self.attributes.devices.len()
        );
        let body = serde_json::to_value(&self.attributes)?;
        let response = self.ctx.api.put(&self.path(), &body)?;
        self.wait_for(&response, wait)
    }

    /// Current runtime state. The local record is left untouched.
    pub fn monitor(&self) -> Result<ContainerState, ContainerError> {
        self.ctx
            .api
            .get(&format!("{}/state", self.path()))?
            .metadata_as()
    }

    /// Replaces the local snapshot with the remote one.
    pub fn get_metadata(&mut self) -> Result<&ContainerAttributes, ContainerError> {
        self.attributes = Container::fetch(&self.ctx, &self.attributes.name)?;
        Ok(&self.attributes)
    }

    pub fn start(&mut self, options: StateOptions) -> Result<Option<String>, ContainerError> {
        self.change_state(LifecycleAction::Start, options)
    }

    pub fn stop(&mut self, options: StateOptions) -> Result<Option<String>, ContainerError> {
        self.change_state(LifecycleAction::Stop, options)
    }

    pub fn restart(&mut self, options: StateOptions) -> Result<Option<String>, ContainerError> {
        self.change_state(LifecycleAction::Restart, options)
    }

    pub fn freeze(&mut self, options: StateOptions) -> Result<Option<String>, ContainerError> {
        self.change_state(LifecycleAction::Freeze, options)
    }

    pub fn unfreeze(&mut self, options: StateOptions) -> Result<Option<String>, ContainerError> {
        self.change_state(LifecycleAction::Unfreeze, options)
    }

    /// Submits `action` and returns the status reported afterwards.
    fn change_state(
        &mut self,
        action: LifecycleAction,
        options: StateOptions,
    ) -> Result<Option<String>, ContainerError> {
        info!("{} container {}", action, self.name());
        let body = serde_json::to_value(StateChange::new(action, &options))?;
        let response = self
            .ctx
            .api
            .put(&format!("{}/state", self.path()), &body)?;
        self.wait_for(&response, options.wait)?;

        self.get_metadata()?;
        debug!("Container {} is now {:?}", self.name(), self.status());
        Ok(self.attributes.status.clone())
    }
}
