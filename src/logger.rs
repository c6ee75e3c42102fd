//! Centralized logging initialization.
//!
//! `LoggerManager` validates the logging configuration and installs the
//! global `tracing` subscriber with console and/or systemd journald layers.
//! It must run once, early in startup, before any tracing macros are used;
//! messages emitted before that point go through the `print_*` macros.

use std::io;

use thiserror::Error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer};
use validator::{Validate, ValidationErrors};

use crate::{
    config::logger::{ConsoleConfig, LogFormat, LoggerConfig},
    print_warn,
};

/// Errors that can occur during logger configuration or initialization.
#[derive(Error, Debug)]
pub enum LoggerError {
    /// Validation errors from the logger configuration struct.
    #[error("logger configuration validation error: {0}")]
    Validation(#[from] ValidationErrors),

    /// IO error, typically while opening the journald socket.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// No output layers were successfully configured.
    #[error("no logging layers were configured or successfully initialized")]
    NoLayersConfigured,

    /// Journald failed to initialize while console output is also enabled;
    /// the configuration should be fixed rather than silently halved.
    #[error("failed to initialize journald logging while console logging is enabled")]
    JournaldFailedWithConsoleEnabled,
}

/// Builds and installs the global tracing subscriber.
pub struct LoggerManager {
    config: LoggerConfig,
}

impl LoggerManager {
    /// Validates the provided configuration.
    pub fn new(config: LoggerConfig) -> Result<Self, LoggerError> {
        config.validate()?;
        Ok(LoggerManager { config })
    }

    /// Installs the global subscriber with the configured layers.
    pub fn init(&mut self) -> Result<(), LoggerError> {
        let mut layers = Vec::new();

        if let Some(console) = self.config.console.as_ref().filter(|c| c.enabled) {
            let filter = EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&self.config.level));
            layers.push(self.console_layer(console, filter));
        }

        if let Some(journald) = self.config.journald.as_ref().filter(|j| j.enabled) {
            let filter = EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&self.config.level));
            match self.journald_layer(&journald.identifier, filter) {
                Ok(layer) => layers.push(layer),
                Err(e) => {
                    print_warn!("Failed to initialize journald logging: {}", e);
                    if self.config.console.as_ref().is_some_and(|c| c.enabled) {
                        return Err(LoggerError::JournaldFailedWithConsoleEnabled);
                    }
                }
            }
        }

        if layers.is_empty() {
            print_warn!("No logging layers were initialized. Please check your configuration.");
            return Err(LoggerError::NoLayersConfigured);
        }

        tracing_subscriber::registry().with(layers).init();
        Ok(())
    }

    fn console_layer(
        &self,
        config: &ConsoleConfig,
        filter: EnvFilter,
    ) -> Box<dyn Layer<tracing_subscriber::Registry> + Send + Sync> {
        let writer = io::stdout;
        match config.format {
            LogFormat::Json => fmt::layer()
                .json()
                .with_target(config.show_target)
                .with_ansi(config.ansi_colors)
                .with_writer(writer)
                .with_filter(filter)
                .boxed(),
            LogFormat::Pretty => fmt::layer()
                .pretty()
                .with_target(config.show_target)
                .with_ansi(config.ansi_colors)
                .with_writer(writer)
                .with_filter(filter)
                .boxed(),
            LogFormat::Compact => fmt::layer()
                .compact()
                .with_target(config.show_target)
                .with_ansi(config.ansi_colors)
                .with_writer(writer)
                .with_filter(filter)
                .boxed(),
        }
    }

    fn journald_layer(
        &self,
        identifier: &str,
        filter: EnvFilter,
    ) -> Result<Box<dyn Layer<tracing_subscriber::Registry> + Send + Sync>, LoggerError> {
        let layer = tracing_journald::layer()?.with_syslog_identifier(identifier.to_string());
        Ok(layer.with_filter(filter).boxed())
    }
}
