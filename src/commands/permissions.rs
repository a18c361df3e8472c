//! Stored entries of one entity.

use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use pipehub_core::config::AppConfig;
use pipehub_core::error::AppError;
use pipehub_entity::permission::{Mask, ObjectIdentity};

use crate::fixture::Fixture;
use crate::output::{self, OutputFormat};

/// Arguments for the permissions command
#[derive(Debug, Args)]
pub struct PermissionsArgs {
    /// Entity as TYPE:ID, e.g. pipeline:12
    #[arg(short, long)]
    pub entity: ObjectIdentity,
}

/// Entry display row
#[derive(Debug, Serialize, Tabled)]
struct EntryRow {
    /// Position
    position: usize,
    /// Sid name
    sid: String,
    /// Principal or authority
    kind: &'static str,
    /// Extended mask
    mask: Mask,
    /// Simple mask
    simple: Mask,
    /// Permission names
    permissions: String,
}

/// Execute the permissions command
pub async fn execute(
    args: &PermissionsArgs,
    fixture: &Fixture,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let engine = fixture.engine(config)?;
    let entity = fixture.entity(&args.entity)?;
    let listed = engine.resolver().list_permissions(entity).await?;

    match format {
        OutputFormat::Json => output::print_json(&listed),
        OutputFormat::Table => {
            output::print_kv("Entity", &listed.identity.to_string());
            output::print_kv("Owner", &listed.owner.to_string());
            output::print_kv(
                "Parent",
                &listed
                    .parent
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| "-".to_string()),
            );
            output::print_kv("Inheriting", &listed.entries_inheriting.to_string());

            let rows: Vec<EntryRow> = listed
                .entries
                .iter()
                .enumerate()
                .map(|(position, entry)| EntryRow {
                    position,
                    sid: entry.sid.name().to_string(),
                    kind: if entry.sid.is_principal() {
                        "principal"
                    } else {
                        "authority"
                    },
                    mask: entry.mask,
                    simple: entry.simple_mask,
                    permissions: output::permission_names(&entry.permissions),
                })
                .collect();
            output::print_list(&rows, format);
        }
    }
    Ok(())
}
