// SPDX-License-Identifier: MIT OR Apache-2.0
//! `flipscript catalog`

use super::load_registry;
use crate::settings::ToolSettings;
use anyhow::Result;
use clap::Args;
use flipscript_graph::BlockRegistry;
use std::path::PathBuf;

/// Arguments for `catalog`
#[derive(Args, Debug)]
pub struct CatalogArgs {
    /// Block catalog (JSON); the built-in catalog when omitted
    #[arg(short, long)]
    pub catalog: Option<PathBuf>,
}

/// Run `catalog`
pub fn run(args: &CatalogArgs, settings: &ToolSettings) -> Result<bool> {
    let registry = load_registry(args.catalog.as_deref(), settings)?;
    print!("{}", render_listing(&registry));
    Ok(true)
}

/// Categories and their block types, in catalog order
fn render_listing(registry: &BlockRegistry) -> String {
    let mut out = String::new();
    for (id, category) in registry.categories() {
        out.push_str(&format!("{} [{}] {}\n", category.name, id, category.color));
        for type_id in registry.types_in_category(id) {
            let Some(definition) = registry.type_info(type_id) else {
                continue;
            };
            if definition.description.is_empty() {
                out.push_str(&format!("  {type_id}\n"));
            } else {
                out.push_str(&format!("  {type_id} - {}\n", definition.description));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use flipscript_graph::create_flipper_registry;

    #[test]
    fn test_listing_follows_catalog_order() {
        let listing = render_listing(&create_flipper_registry());
        let lines: Vec<&str> = listing.lines().collect();
        assert_eq!(lines[0], "Events [events] #d65c5c");
        assert_eq!(lines[1], "  app_on_start - Runs once when the application starts");
        assert_eq!(lines[2], "Flow [flow] #e6a23c");
        assert!(lines[3].starts_with("  delay - "));
        assert!(lines[4].starts_with("  repeat - "));
    }
}
