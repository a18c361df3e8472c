//! Entity tree pruned to what one caller may see.

use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use pipehub_core::config::AppConfig;
use pipehub_core::error::AppError;
use pipehub_entity::entity::SecuredEntity;
use pipehub_entity::permission::{AclPermission, ObjectIdentity};

use super::CallerArgs;
use crate::fixture::Fixture;
use crate::output::{self, OutputFormat};

/// Arguments for the filter command
#[derive(Debug, Args)]
pub struct FilterArgs {
    /// Permission every kept leaf must grant
    #[arg(short, long, default_value = "READ")]
    pub permission: AclPermission,

    /// Filter only the subtree rooted at TYPE:ID
    #[arg(short, long)]
    pub root: Option<ObjectIdentity>,

    /// Caller
    #[command(flatten)]
    pub caller: CallerArgs,
}

/// Tree node display row
#[derive(Debug, Serialize, Tabled)]
struct NodeRow {
    /// Indented name
    name: String,
    /// Entity
    entity: String,
    /// Folder or leaf
    kind: &'static str,
    /// Simple mask
    mask: String,
    /// Granted permissions
    permissions: String,
}

/// Execute the filter command
pub async fn execute(
    args: &FilterArgs,
    fixture: &Fixture,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let engine = fixture.engine(config)?;
    let root = match &args.root {
        Some(identity) => fixture.entity(identity)?.clone(),
        None => fixture.tree.clone(),
    };

    let filtered = engine
        .filter()
        .filter_tree(&args.caller.sids(), root, args.permission)
        .await?;

    let Some(tree) = filtered else {
        output::print_warning(&format!(
            "Nothing is visible to '{}' with {}",
            args.caller.user, args.permission
        ));
        return Ok(());
    };

    match format {
        OutputFormat::Json => output::print_json(&tree),
        OutputFormat::Table => output::print_list(&flatten(&tree), format),
    }
    Ok(())
}

fn flatten(root: &SecuredEntity) -> Vec<NodeRow> {
    let mut rows = Vec::new();
    let mut stack = vec![(root, 0usize, "folder")];
    while let Some((node, depth, kind)) = stack.pop() {
        let name = if node.name.is_empty() {
            "(unnamed)"
        } else {
            node.name.as_str()
        };
        rows.push(NodeRow {
            name: format!("{}{}", "  ".repeat(depth), name),
            entity: node
                .identity()
                .map(|identity| identity.to_string())
                .unwrap_or_else(|| "-".to_string()),
            kind,
            mask: node.mask.map(|m| m.to_string()).unwrap_or_default(),
            permissions: output::permission_names(&AclPermission::decode_simple(
                node.mask.unwrap_or(0),
            )),
        });
        // Reverse so children print in their stored order.
        for leaf in node.leaves.iter().rev() {
            stack.push((leaf, depth + 1, "leaf"));
        }
        for child in node.children.iter().rev() {
            stack.push((child, depth + 1, "folder"));
        }
    }
    rows
}
