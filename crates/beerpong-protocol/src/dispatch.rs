use std::collections::HashMap;

use tracing::{debug, error, info, warn};

use crate::command::Command;
use crate::error::DispatchError;
use crate::sensor::SensorState;

/// Name of the built-in sensor command.
pub const SENSOR: &str = "sensor";

/// Handles one command name.
pub trait CommandHandler: Send {
    /// Act on a decoded command.
    fn handle(&self, command: &Command) -> Result<(), DispatchError>;
}

impl<F> CommandHandler for F
where
    F: Fn(&Command) -> Result<(), DispatchError> + Send,
{
    fn handle(&self, command: &Command) -> Result<(), DispatchError> {
        self(command)
    }
}

/// Replaces the sensor reading with the command's integer arguments.
///
/// Conversion is all-or-nothing: one bad argument leaves the reading as it
/// was.
#[derive(Debug, Clone)]
pub struct SensorHandler {
    state: SensorState,
}

impl SensorHandler {
    /// Create a handler writing into `state`.
    pub fn new(state: SensorState) -> Self {
        Self { state }
    }
}

impl CommandHandler for SensorHandler {
    fn handle(&self, command: &Command) -> Result<(), DispatchError> {
        let values = command
            .args
            .iter()
            .enumerate()
            .map(|(position, arg)| {
                arg.parse::<i64>()
                    .map_err(|source| DispatchError::InvalidArgument {
                        name: command.name.clone(),
                        position,
                        value: arg.clone(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        info!(?values, "update current sensor values");
        self.state.set(values);
        Ok(())
    }
}

/// Name-keyed registry of command handlers.
#[derive(Default)]
pub struct Dispatcher {
    handlers: HashMap<String, Box<dyn CommandHandler>>,
}

impl Dispatcher {
    /// Create a dispatcher with no handlers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a dispatcher handling `sensor` into `state`.
    pub fn with_sensor(state: SensorState) -> Self {
        let mut dispatcher = Self::new();
        dispatcher.register(SENSOR, SensorHandler::new(state));
        dispatcher
    }

    /// Register `handler` for `name`, replacing any previous one.
    pub fn register(&mut self, name: impl Into<String>, handler: impl CommandHandler + 'static) {
        self.handlers.insert(name.into(), Box::new(handler));
    }

    /// Remove the handler for `name`. Returns true if one was registered.
    pub fn unregister(&mut self, name: &str) -> bool {
        self.handlers.remove(name).is_some()
    }

    /// Whether a handler is registered for `name`.
    pub fn handles(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Registered command names, in no particular order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    /// Route `command` to its handler.
    ///
    /// Failures are logged here and returned for the caller to report; they
    /// never leave partial state behind.
    pub fn dispatch(&self, command: &Command) -> Result<(), DispatchError> {
        debug!(name = %command.name, args = ?command.args, "function match");

        let Some(handler) = self.handlers.get(&command.name) else {
            warn!(command = %command, "no corresponding function");
            return Err(DispatchError::UnknownCommand {
                name: command.name.clone(),
            });
        };

        handler.handle(command).inspect_err(|err| {
            error!(error = %err, command = %command, "command handling failed");
        })
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.names().collect();
        names.sort_unstable();
        f.debug_struct("Dispatcher").field("handlers", &names).finish()
    }
}
