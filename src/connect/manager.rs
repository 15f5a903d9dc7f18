// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Tether Contributors

//! The connection cascade: "give me a live client bound to the server that
//! serves the current project directory".
//!
//! [`ConnectionManager::ensure_connected`] walks five steps, cheapest and
//! most-likely-correct first:
//!
//! 1. a pinned instance, verified live and serving the right directory;
//! 2. the existing bound client, re-checked for liveness and directory;
//! 3. discovery over running server processes;
//! 4. spawning a fresh server on a free port;
//! 5. a blind bind to the configured fallback port.
//!
//! Each step either binds and returns, or swallows its failure and falls
//! through. The common cases resolve in well under 100ms; the worst case
//! (spawn) converges in bounded time instead of hanging.
//!
//! The manager is the sole owner of the current bound client, the connected
//! port, and the last spawn error. `ensure_connected` takes `&mut self`, so
//! overlapping calls cannot race through one manager instance; coalescing
//! rapid triggers from separate handles into one in-flight attempt is left
//! to the caller.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::client::{ClientOptions, ServerClient};
use crate::config::Settings;
use crate::connect::spawn::{self, ShellLauncher, SpawnError, SpawnOptions, TerminalLauncher};
use crate::connect::sticky::DefaultInstanceTracker;
use crate::net::ports::find_available_port;
use crate::net::probe::{PortProbe, TcpProbe};
use crate::scan::{ProcessScanner, platform_scanner};
use crate::workspace::paths_match;

/// Capacity of the state-change event channel. Subscribers that lag simply
/// miss intermediate states; the latest one is what matters.
const EVENT_CHANNEL_CAPACITY: usize = 16;

/// The externally observable connection summary. The single source of truth:
/// no other component holds connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionState {
    /// Whether a server is currently bound.
    pub connected: bool,
    /// Port of the bound server, when connected.
    pub port: Option<u16>,
}

impl ConnectionState {
    const fn disconnected() -> Self {
        Self {
            connected: false,
            port: None,
        }
    }

    const fn connected(port: u16) -> Self {
        Self {
            connected: true,
            port: Some(port),
        }
    }
}

/// Timing knobs for the cascade. Tests shrink these; production uses the
/// defaults.
#[derive(Debug, Clone)]
pub struct ManagerOptions {
    /// Discovery rounds before giving up on running instances.
    pub discovery_rounds: u32,
    /// Delay between discovery rounds, tolerating a server mid-startup.
    pub discovery_retry_delay: Duration,
    /// Spawn-path timing.
    pub spawn: SpawnOptions,
}

impl Default for ManagerOptions {
    fn default() -> Self {
        Self {
            discovery_rounds: 3,
            discovery_retry_delay: Duration::from_secs(2),
            spawn: SpawnOptions::default(),
        }
    }
}

/// Owns the current bound client and drives the connection cascade.
pub struct ConnectionManager {
    settings: Settings,
    workspace: PathBuf,
    probe: Arc<dyn PortProbe>,
    scanner: Arc<dyn ProcessScanner>,
    launcher: Arc<dyn TerminalLauncher>,
    options: ManagerOptions,
    sticky: DefaultInstanceTracker,
    current: Option<ServerClient>,
    last_spawn_error: Option<SpawnError>,
    last_state: ConnectionState,
    events: broadcast::Sender<ConnectionState>,
}

impl ConnectionManager {
    /// Creates a manager with the real prober, platform scanner, and shell
    /// launcher.
    #[must_use]
    pub fn new(settings: Settings, workspace: PathBuf) -> Self {
        let scanner = platform_scanner(&settings.binary);
        Self::with_dependencies(
            settings,
            workspace,
            Arc::new(TcpProbe),
            scanner,
            Arc::new(ShellLauncher),
        )
    }

    /// Creates a manager with injected collaborators, for tests and editor
    /// glue that supplies its own terminal facility.
    #[must_use]
    pub fn with_dependencies(
        settings: Settings,
        workspace: PathBuf,
        probe: Arc<dyn PortProbe>,
        scanner: Arc<dyn ProcessScanner>,
        launcher: Arc<dyn TerminalLauncher>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            settings,
            workspace,
            probe,
            scanner,
            launcher,
            options: ManagerOptions::default(),
            sticky: DefaultInstanceTracker::new(),
            current: None,
            last_spawn_error: None,
            last_state: ConnectionState::disconnected(),
            events,
        }
    }

    /// Replaces the cascade timing knobs.
    #[must_use]
    pub fn with_options(mut self, options: ManagerOptions) -> Self {
        self.options = options;
        self
    }

    /// Subscribes to connection-state change events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionState> {
        self.events.subscribe()
    }

    /// The current connection summary.
    #[must_use]
    pub const fn state(&self) -> ConnectionState {
        self.last_state
    }

    /// Port of the bound server, when connected.
    #[must_use]
    pub fn connected_port(&self) -> Option<u16> {
        self.current.as_ref().map(ServerClient::port)
    }

    /// The bound client, when connected.
    #[must_use]
    pub fn client(&self) -> Option<&ServerClient> {
        self.current.as_ref()
    }

    /// The last failure recorded by the spawn path, for user-facing
    /// explanation when `ensure_connected` returns false.
    #[must_use]
    pub fn last_spawn_error(&self) -> Option<&SpawnError> {
        self.last_spawn_error.as_ref()
    }

    /// The project directory connections are verified against.
    #[must_use]
    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    /// Switches the project directory (workspace-folder change). Clears the
    /// pinned instance; the current binding is re-verified on the next
    /// `ensure_connected`.
    pub fn set_workspace(&mut self, workspace: PathBuf) {
        if workspace != self.workspace {
            info!(workspace = %workspace.display(), "workspace changed");
            self.workspace = workspace;
            self.sticky.clear();
        }
    }

    /// Pins a server instance to be preferred over fresh discovery.
    pub const fn pin_instance(&mut self, port: u16) {
        self.sticky.set(port);
    }

    /// The pinned instance port, if one is set and not yet invalidated.
    #[must_use]
    pub const fn pinned(&self) -> Option<u16> {
        self.sticky.get()
    }

    /// Forgets the pinned instance.
    pub const fn clear_pinned(&mut self) {
        self.sticky.clear();
    }

    /// Drops the current binding and emits a disconnected state.
    pub fn disconnect(&mut self) {
        if self.current.take().is_some() {
            info!("disconnected from server");
        }
        self.emit(ConnectionState::disconnected());
    }

    /// Returns true with a live client bound to a server serving the current
    /// project directory, or false if no such server could be obtained.
    pub async fn ensure_connected(&mut self) -> bool {
        if self.try_sticky().await {
            return true;
        }
        if self.check_current().await {
            return true;
        }
        if self.discover().await {
            return true;
        }
        if self.try_spawn().await {
            return true;
        }
        self.try_fallback().await
    }

    /// Step 1: the pinned instance, verified live and serving this project.
    /// Any failure clears the pin and falls through: a stale preference must
    /// never block discovery. Nothing is emitted here unless a bind happens,
    /// since tearing down an unrelated stale pin is not a disconnect.
    async fn try_sticky(&mut self) -> bool {
        let Some(port) = self.sticky.get() else {
            return false;
        };

        if !self.sticky.is_valid(self.probe.as_ref()).await {
            debug!(port, "pinned instance no longer listening, clearing");
            self.sticky.clear();
            return false;
        }

        if self.port_serves_workspace(port).await {
            info!(port, "using pinned instance");
            return self.bind(port);
        }

        debug!(port, "pinned instance serves a different directory, clearing");
        self.sticky.clear();
        false
    }

    /// Step 2: the existing bound client, if still alive and still serving
    /// the right directory. Directories change when the user switches
    /// workspace folders without an extension restart; a client bound to
    /// the wrong project is destroyed, never reused.
    async fn check_current(&mut self) -> bool {
        let Some(client) = self.current.as_ref() else {
            return false;
        };

        if !client.test_connection().await {
            info!(port = client.port(), "bound server stopped answering");
            self.teardown_current();
            return false;
        }

        match client.working_directory().await {
            Ok(wd) if self.matches_workspace(&wd.directory) => true,
            Ok(wd) => {
                info!(
                    port = client.port(),
                    directory = %wd.directory,
                    "bound server serves a different directory"
                );
                self.teardown_current();
                false
            }
            Err(e) => {
                warn!(port = client.port(), "working-directory check failed: {e}");
                self.teardown_current();
                false
            }
        }
    }

    /// Step 3: discovery over running server processes. A round that finds
    /// processes but no directory match stops retrying immediately, since
    /// retrying cannot change which directory an already-running process
    /// serves. A round that finds nothing at all is retried: an instance
    /// might be mid-startup.
    async fn discover(&mut self) -> bool {
        for round in 0..self.options.discovery_rounds {
            let processes = self.scanner.scan().await;

            let mut seen = HashSet::new();
            let ports: Vec<u16> = processes
                .iter()
                .map(|p| p.port)
                .filter(|port| seen.insert(*port))
                .collect();

            if ports.is_empty() {
                debug!(round, "no server processes found");
                if round + 1 < self.options.discovery_rounds {
                    tokio::time::sleep(self.options.discovery_retry_delay).await;
                }
                continue;
            }

            debug!(round, candidates = ports.len(), "probing discovered instances");
            for port in ports {
                if self.port_serves_workspace(port).await {
                    info!(port, "discovered matching instance");
                    return self.bind(port);
                }
            }

            debug!(round, "instances found, none serve this project");
            return false;
        }

        false
    }

    /// Step 4: spawn a fresh server on a free port and wait for readiness.
    /// Failures are recorded, never thrown.
    async fn try_spawn(&mut self) -> bool {
        self.last_spawn_error = None;

        let port = match find_available_port(
            self.probe.as_ref(),
            self.settings.port,
            self.settings.port_range_end,
        )
        .await
        {
            Ok(port) => port,
            Err(e) => {
                warn!("spawn aborted: {e}");
                self.last_spawn_error = Some(SpawnError::from(e));
                return false;
            }
        };

        let result = spawn::spawn_server(
            self.launcher.as_ref(),
            &self.settings.binary,
            port,
            self.settings.auto_focus_terminal,
            &self.options.spawn,
        )
        .await;

        match result {
            Ok(()) => {
                info!(port, "spawned server is ready");
                self.bind(port)
            }
            Err(e) => {
                warn!(port, "spawn failed: {e}");
                self.last_spawn_error = Some(e);
                false
            }
        }
    }

    /// Step 5: bind the configured fallback port blind. No directory check;
    /// one liveness test decides the overall result.
    async fn try_fallback(&mut self) -> bool {
        let port = self.settings.port;
        debug!(port, "falling back to configured default port");

        let Ok(client) = ServerClient::new(ClientOptions::for_port(port)) else {
            return false;
        };

        if client.test_connection().await {
            info!(port, "fallback instance answered");
            self.install(client);
            true
        } else {
            debug!(port, "fallback instance did not answer");
            false
        }
    }

    /// Fetches a candidate's working directory with a throwaway short-timeout
    /// client and tests it against the current project.
    async fn port_serves_workspace(&self, port: u16) -> bool {
        let Ok(client) = ServerClient::new(ClientOptions::quick_probe(port)) else {
            return false;
        };

        match client.working_directory().await {
            Ok(wd) => self.matches_workspace(&wd.directory),
            Err(e) => {
                debug!(port, "candidate did not report a directory: {e}");
                false
            }
        }
    }

    fn matches_workspace(&self, server_directory: &str) -> bool {
        paths_match(server_directory, &self.workspace.to_string_lossy())
    }

    /// Binds a fresh long-lived client to `port`.
    fn bind(&mut self, port: u16) -> bool {
        match ServerClient::new(ClientOptions::for_port(port)) {
            Ok(client) => {
                self.install(client);
                true
            }
            Err(e) => {
                warn!(port, "failed to construct client: {e}");
                false
            }
        }
    }

    /// Installs a client as the current binding. The previous client's
    /// transport is released before the new state is announced.
    fn install(&mut self, client: ServerClient) {
        let port = client.port();
        drop(self.current.replace(client));
        self.emit(ConnectionState::connected(port));
    }

    /// Drops the current binding and announces the disconnect.
    fn teardown_current(&mut self) {
        drop(self.current.take());
        self.emit(ConnectionState::disconnected());
    }

    /// Emits a state-change event, deduplicated against the last one.
    fn emit(&mut self, state: ConnectionState) {
        if state == self.last_state {
            return;
        }
        self.last_state = state;
        // No receivers is fine; state() still reflects the change.
        let _ = self.events.send(state);
    }
}
