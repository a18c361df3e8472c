//! Mask decoding and encoding.

use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use pipehub_auth::PermissionMaskService;
use pipehub_core::error::AppError;
use pipehub_entity::permission::{AclPermission, Mask};

use crate::output::{self, OutputFormat};

/// Arguments for the mask command
#[derive(Debug, Args)]
pub struct MaskArgs {
    /// A numeric mask, or comma-separated permission names such as READ,NO_WRITE
    pub value: String,

    /// Treat a numeric mask as a simple mask
    #[arg(long)]
    pub simple: bool,
}

/// Mask display row
#[derive(Debug, Serialize, Tabled)]
struct MaskRow {
    /// Extended mask
    extended: String,
    /// Simple mask
    simple: Mask,
    /// Permission names
    permissions: String,
    /// Whether the extended mask is valid
    valid: bool,
}

/// Execute the mask command
pub fn execute(args: &MaskArgs, format: OutputFormat) -> Result<(), AppError> {
    let row = describe(&args.value, args.simple)?;
    output::print_list(&[row], format);
    Ok(())
}

fn describe(value: &str, simple: bool) -> Result<MaskRow, AppError> {
    let value = value.trim();
    if let Ok(mask) = value.parse::<Mask>() {
        if simple {
            return Ok(MaskRow {
                extended: "-".to_string(),
                simple: mask,
                permissions: output::permission_names(&AclPermission::decode_simple(mask)),
                valid: true,
            });
        }
        return Ok(MaskRow {
            extended: mask.to_string(),
            simple: PermissionMaskService::merge_mask(mask),
            permissions: output::permission_names(&AclPermission::decode(mask)),
            valid: PermissionMaskService::validate_mask(mask).is_ok(),
        });
    }

    let names: Vec<&str> = value.split(',').map(str::trim).collect();
    let mask = PermissionMaskService::mask_of(&names)?;
    Ok(MaskRow {
        extended: mask.to_string(),
        simple: PermissionMaskService::merge_mask(mask),
        permissions: output::permission_names(&AclPermission::decode(mask)),
        valid: true,
    })
}
