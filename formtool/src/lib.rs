//! # formtool
//!
//! Command line front end for the [`formschema`] engine.
//!
//! ## Features
//!
//! - **Customize**: apply `ui:create` / `ui:update` / `ui:view` rules to a schema
//! - **Split**: partition a schema into tabs with their UI hints
//! - **Inline**: bundle remote `$ref`s into a single schema
//! - **Properties**: convert form data to and from `.properties` text
//!
//! ## Modules
//!
//! - [`commands`] - Command handlers
//! - [`config`] - `.formtool.toml` loading
//!
//! ## Example
//!
//! ```rust,no_run
//! // formtool is primarily used as a CLI tool
//! // See the binary target for usage
//! ```

/// Command handlers behind the CLI subcommands.
pub mod commands;

/// Tool configuration (`.formtool.toml`).
///
/// Controls the default edit mode and how remote schemas are fetched.
pub mod config;
