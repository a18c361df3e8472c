//! CLI command definitions and dispatch.

pub mod filter;
pub mod mask;
pub mod permissions;
pub mod resolve;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use pipehub_auth::{AuthContext, SidResolver};
use pipehub_core::config::AppConfig;
use pipehub_core::error::AppError;
use pipehub_entity::permission::Sid;

use crate::fixture::Fixture;
use crate::output::OutputFormat;

/// PipeHub ACL inspector: resolve and filter permissions over a snapshot
#[derive(Debug, Parser)]
#[command(name = "pipehub-acl", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Permission fixture (ACLs, entity tree, quotas) as JSON
    #[arg(short = 'x', long, default_value = "fixtures/demo.json")]
    pub fixture: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Effective mask of a user on one entity
    Resolve(resolve::ResolveArgs),
    /// Entity tree pruned to what a user may see
    Filter(filter::FilterArgs),
    /// Stored entries of one entity
    Permissions(permissions::PermissionsArgs),
    /// Decode a mask or encode permission names
    Mask(mask::MaskArgs),
}

/// The caller whose permissions are evaluated
#[derive(Debug, Clone, Args)]
pub struct CallerArgs {
    /// User name
    #[arg(short, long)]
    pub user: String,

    /// Authority (role or group); repeatable
    #[arg(short, long = "group")]
    pub groups: Vec<String>,
}

impl CallerArgs {
    /// Sids of the caller, principal first
    pub fn sids(&self) -> Vec<Sid> {
        SidResolver::get_sids(&AuthContext::new(self.user.clone(), self.groups.clone()))
    }
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self, config: &AppConfig) -> Result<(), AppError> {
        match &self.command {
            Commands::Resolve(args) => {
                resolve::execute(args, &self.load_fixture()?, config, self.format).await
            }
            Commands::Filter(args) => {
                filter::execute(args, &self.load_fixture()?, config, self.format).await
            }
            Commands::Permissions(args) => {
                permissions::execute(args, &self.load_fixture()?, config, self.format).await
            }
            Commands::Mask(args) => mask::execute(args, self.format),
        }
    }

    fn load_fixture(&self) -> Result<Fixture, AppError> {
        Fixture::load(&self.fixture)
    }
}
