//! Effective mask of one caller on one entity.

use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use pipehub_auth::ResolveOptions;
use pipehub_core::config::AppConfig;
use pipehub_core::error::AppError;
use pipehub_entity::permission::{AclPermission, Mask, ObjectIdentity};

use super::CallerArgs;
use crate::fixture::Fixture;
use crate::output::{self, OutputFormat};

/// Arguments for the resolve command
#[derive(Debug, Args)]
pub struct ResolveArgs {
    /// Entity as TYPE:ID, e.g. folder:3
    #[arg(short, long)]
    pub entity: ObjectIdentity,

    /// Caller
    #[command(flatten)]
    pub caller: CallerArgs,

    /// Print the extended (grant/deny) mask instead of the simple one
    #[arg(long)]
    pub extended: bool,

    /// Ignore entries inherited from parent ACLs
    #[arg(long)]
    pub no_inherit: bool,
}

/// Resolution display row
#[derive(Debug, Serialize, Tabled)]
struct ResolveRow {
    /// Entity
    entity: String,
    /// Caller sids
    sids: String,
    /// Resolved mask
    mask: Mask,
    /// Granted or denied permissions
    permissions: String,
}

/// Execute the resolve command
pub async fn execute(
    args: &ResolveArgs,
    fixture: &Fixture,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let engine = fixture.engine(config)?;
    let entity = fixture.entity(&args.entity)?;
    let sids = args.caller.sids();

    let options = if args.extended {
        ResolveOptions::extended()
    } else {
        ResolveOptions::merged()
    }
    .with_inherited(!args.no_inherit);
    let mask = engine.resolver().resolve(entity, &sids, options).await;

    let permissions = if args.extended {
        AclPermission::decode(mask)
    } else {
        AclPermission::decode_simple(mask)
    };
    let row = ResolveRow {
        entity: args.entity.to_string(),
        sids: sids
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" "),
        mask,
        permissions: output::permission_names(&permissions),
    };
    output::print_list(&[row], format);
    Ok(())
}
