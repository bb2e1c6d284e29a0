//! The sandbox handle and its builder.

use std::collections::HashMap;
use std::sync::Arc;

use sandboxai_client::HttpClient;
use sandboxai_core::{
    config::{ClientConfig, EmbeddedConfig, SandboxaiConfig},
    traits::SandboxApi,
    types::{
        CreateSandboxRequest, IPythonCellResult, RunIPythonCellRequest, RunShellCommandRequest,
        Sandbox as RemoteSandbox, SandboxSpec, ShellCommandResult,
    },
    Error, Result, DEFAULT_IMAGE, DEFAULT_SPACE,
};

use crate::scope::ScopedSandbox;

// =============================================================================
// Sandbox Handle
// =============================================================================

/// Handle to one remote sandbox.
///
/// A handle is either bound to a remote sandbox (`name()` is non-empty) or
/// unbound. Tool calls on an unbound handle create the sandbox first; `delete`
/// unbinds it again. A handle is meant to be driven from one thread at a time.
pub struct Sandbox {
    space: String,
    requested_name: Option<String>,
    name: String,
    image: String,
    spec: SandboxSpec,
    client: Arc<dyn SandboxApi>,
}

impl Sandbox {
    pub fn builder() -> SandboxBuilder {
        SandboxBuilder::new()
    }

    /// Connect to the service at `base_url` and create a sandbox with default settings.
    pub fn connect(base_url: impl Into<String>) -> Result<Self> {
        Self::builder().base_url(base_url).build()
    }

    /// Create the remote sandbox and bind this handle to it.
    ///
    /// Fails with [`Error::AlreadyBound`] if the handle is already bound.
    pub fn create(&mut self) -> Result<()> {
        if self.is_bound() {
            return Err(Error::AlreadyBound {
                space: self.space.clone(),
                name: self.name.clone(),
            });
        }

        let mut request = CreateSandboxRequest::new(self.spec.clone());
        request.name = self.requested_name.clone();

        let created = self.client.create_sandbox(&self.space, &request)?;
        tracing::info!(
            space = %created.space,
            name = %created.name,
            image = %created.spec.image,
            "Sandbox created"
        );
        self.name = created.name;
        self.image = created.spec.image;
        Ok(())
    }

    /// Delete the remote sandbox. No-op when the handle is unbound.
    pub fn delete(&mut self) -> Result<()> {
        if !self.is_bound() {
            return Ok(());
        }

        self.client.delete_sandbox(&self.space, &self.name)?;
        tracing::info!(space = %self.space, name = %self.name, "Sandbox deleted");
        self.name.clear();
        self.image.clear();
        Ok(())
    }

    /// Fetch the bound sandbox from the service. `None` when unbound.
    pub fn refresh(&mut self) -> Result<Option<RemoteSandbox>> {
        if !self.is_bound() {
            return Ok(None);
        }
        let sandbox = self.client.get_sandbox(&self.space, &self.name)?;
        self.image = sandbox.spec.image.clone();
        Ok(Some(sandbox))
    }

    /// Run an IPython cell with stdout and stderr combined.
    pub fn run_ipython_cell(&mut self, code: &str) -> Result<IPythonCellResult> {
        self.ipython_cell(RunIPythonCellRequest::new(code))
    }

    /// Run an IPython cell with stdout and stderr kept apart.
    pub fn run_ipython_cell_split(&mut self, code: &str) -> Result<IPythonCellResult> {
        self.ipython_cell(RunIPythonCellRequest::new(code).split())
    }

    /// Run a shell command with stdout and stderr combined.
    pub fn run_shell_command(&mut self, command: &str) -> Result<ShellCommandResult> {
        self.shell_command(RunShellCommandRequest::new(command))
    }

    /// Run a shell command with stdout and stderr kept apart.
    pub fn run_shell_command_split(&mut self, command: &str) -> Result<ShellCommandResult> {
        self.shell_command(RunShellCommandRequest::new(command).split())
    }

    fn ipython_cell(&mut self, request: RunIPythonCellRequest) -> Result<IPythonCellResult> {
        self.ensure_created()?;
        tracing::debug!(name = %self.name, code = %request.code, "Running IPython cell");
        let result = self
            .client
            .run_ipython_cell(&self.space, &self.name, &request)?;
        tracing::debug!(name = %self.name, output = ?result.output, "IPython cell finished");
        Ok(result)
    }

    fn shell_command(&mut self, request: RunShellCommandRequest) -> Result<ShellCommandResult> {
        self.ensure_created()?;
        tracing::debug!(name = %self.name, command = %request.command, "Running shell command");
        let result = self
            .client
            .run_shell_command(&self.space, &self.name, &request)?;
        tracing::debug!(
            name = %self.name,
            return_code = result.return_code,
            output = ?result.output,
            "Shell command finished"
        );
        Ok(result)
    }

    fn ensure_created(&mut self) -> Result<()> {
        if self.is_bound() {
            return Ok(());
        }
        self.create()
    }

    /// Run `f` with this sandbox and delete it afterwards, whatever `f` returned.
    ///
    /// If both `f` and the delete fail, [`Error::ScopeExit`] carries both errors.
    pub fn scope<T, F>(self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Sandbox) -> Result<T>,
    {
        let mut guard = self.scoped();
        let body = f(&mut *guard);
        let cleanup = guard.close();

        match (body, cleanup) {
            (Ok(value), Ok(())) => Ok(value),
            (Err(e), Ok(())) => Err(e),
            (Ok(_), Err(cleanup)) => Err(cleanup),
            (Err(body), Err(cleanup)) => Err(Error::ScopeExit {
                body: Box::new(body),
                cleanup: Box::new(cleanup),
            }),
        }
    }

    /// Wrap this sandbox in a guard that deletes it when dropped.
    pub fn scoped(self) -> ScopedSandbox {
        ScopedSandbox::new(self)
    }

    pub fn is_bound(&self) -> bool {
        !self.name.is_empty()
    }

    pub fn space(&self) -> &str {
        &self.space
    }

    /// Name of the bound sandbox, `""` when unbound.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Image reported by the service, `""` when unbound.
    pub fn image(&self) -> &str {
        &self.image
    }

    /// The spec sent on create.
    pub fn spec(&self) -> &SandboxSpec {
        &self.spec
    }

    pub fn base_url(&self) -> &str {
        self.client.base_url()
    }

    pub fn client(&self) -> &Arc<dyn SandboxApi> {
        &self.client
    }
}

impl std::fmt::Debug for Sandbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sandbox")
            .field("space", &self.space)
            .field("name", &self.name)
            .field("image", &self.image)
            .field("base_url", &self.client.base_url())
            .finish()
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builder for [`Sandbox`].
///
/// Either a base URL or embedded mode is required (or an explicit client).
/// Unless lazy creation is requested, [`build`](Self::build) creates the
/// remote sandbox.
pub struct SandboxBuilder {
    base_url: Option<String>,
    embedded: bool,
    embedded_config: EmbeddedConfig,
    client_config: ClientConfig,
    client: Option<Arc<dyn SandboxApi>>,
    lazy_create: bool,
    space: String,
    name: Option<String>,
    image: String,
    env: HashMap<String, String>,
}

impl SandboxBuilder {
    pub fn new() -> Self {
        Self {
            base_url: None,
            embedded: false,
            embedded_config: EmbeddedConfig::default(),
            client_config: ClientConfig::default(),
            client: None,
            lazy_create: false,
            space: DEFAULT_SPACE.to_string(),
            name: None,
            image: DEFAULT_IMAGE.to_string(),
            env: HashMap::new(),
        }
    }

    /// Start from loaded configuration.
    pub fn from_config(config: &SandboxaiConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            embedded_config: config.embedded.clone(),
            client_config: config.client.clone(),
            space: config.space.clone(),
            image: config.image.clone(),
            ..Self::new()
        }
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Use the process-wide embedded server, starting it if needed.
    pub fn embedded(mut self, embedded: bool) -> Self {
        self.embedded = embedded;
        self
    }

    pub fn embedded_config(mut self, config: EmbeddedConfig) -> Self {
        self.embedded_config = config;
        self
    }

    pub fn client_config(mut self, config: ClientConfig) -> Self {
        self.client_config = config;
        self
    }

    /// Talk to the service through `client` instead of building an HTTP client.
    pub fn with_client(mut self, client: Arc<dyn SandboxApi>) -> Self {
        self.client = Some(client);
        self
    }

    /// Defer creation until the first tool call or an explicit `create`.
    pub fn lazy_create(mut self, lazy: bool) -> Self {
        self.lazy_create = lazy;
        self
    }

    pub fn space(mut self, space: impl Into<String>) -> Self {
        self.space = space.into();
        self
    }

    /// Ask for a specific sandbox name instead of a server-assigned one.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into()).filter(|n: &String| !n.is_empty());
        self
    }

    pub fn image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn build(self) -> Result<Sandbox> {
        let client: Arc<dyn SandboxApi> = match self.client {
            Some(client) => client,
            None => {
                let base_url = if self.embedded {
                    sandboxai_embedded::start(&self.embedded_config)?
                } else {
                    self.base_url.ok_or_else(|| {
                        Error::configuration("either a base_url or embedded mode must be specified")
                    })?
                };
                Arc::new(HttpClient::with_config(base_url, &self.client_config)?)
            }
        };

        let spec = SandboxSpec {
            image: self.image,
            env: (!self.env.is_empty()).then_some(self.env),
        };

        let mut sandbox = Sandbox {
            space: self.space,
            requested_name: self.name,
            name: String::new(),
            image: String::new(),
            spec,
            client,
        };

        if !self.lazy_create {
            sandbox.create()?;
        }
        Ok(sandbox)
    }
}

impl Default for SandboxBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
