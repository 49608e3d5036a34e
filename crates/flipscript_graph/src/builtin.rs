// SPDX-License-Identifier: MIT OR Apache-2.0
//! Built-in block catalog for Flipper Zero apps.
//!
//! Templates run inside the entry function, where `app` points at the
//! application state.

use crate::block::{BlockTypeDefinition, CategoryInfo, ENTRY_BLOCK_TYPE};
use crate::port::{PortSpec, PropertySpec, PropertyValue, FLOW_NEXT};
use crate::registry::BlockRegistry;

fn category(name: &str, color: &str, description: &str) -> CategoryInfo {
    CategoryInfo {
        name: name.to_string(),
        color: color.to_string(),
        description: description.to_string(),
    }
}

/// A statement block with flow in and flow out
fn statement(id: &str, category: &str, template: &str) -> BlockTypeDefinition {
    BlockTypeDefinition::new(id, category, template)
        .with_input(PortSpec::flow("prev").with_description("Previous"))
        .with_output(PortSpec::flow(FLOW_NEXT).with_description("Next"))
}

/// Create the built-in block registry
pub fn create_flipper_registry() -> BlockRegistry {
    let mut registry = BlockRegistry::new();

    registry.register_category("events", category("Events", "#d65c5c", "Application events"));
    registry.register_category("flow", category("Flow", "#e6a23c", "Timing and repetition"));
    registry.register_category("display", category("Display", "#5c81d6", "Screen handling"));
    registry.register_category("output", category("Output", "#5cb85c", "Logging"));
    registry.register_category("storage", category("Storage", "#9b59b6", "SD card access"));

    // Event blocks
    registry.register(
        BlockTypeDefinition::new(ENTRY_BLOCK_TYPE, "events", "FURI_LOG_I(\"${app_name}\", \"Started\");\n${next_code}")
            .with_name("On App Start")
            .with_description("Runs once when the application starts")
            .with_output(PortSpec::flow(FLOW_NEXT).with_description("Next")),
    );

    // Flow control
    registry.register(
        statement("delay", "flow", "furi_delay_ms(${ms});\n${next_code}")
            .with_name("Delay")
            .with_description("Wait for a number of milliseconds")
            .with_property(PropertySpec::new("ms", Some(PropertyValue::from(500)))),
    );

    registry.register(
        statement(
            "repeat",
            "flow",
            "for(int i = 0; i < ${times}; i++) {\n${next_code}\n}",
        )
        .with_name("Repeat")
        .with_description("Run the following blocks a number of times")
        .with_property(PropertySpec::new("times", Some(PropertyValue::from(3)))),
    );

    // Display
    registry.register(
        statement("update_screen", "display", "view_port_update(app->view_port);\n${next_code}")
            .with_name("Update Screen")
            .with_description("Request a redraw of the view port"),
    );

    // Output
    registry.register(
        statement("log_message", "output", "FURI_LOG_I(\"${app_name}\", ${message});\n${next_code}")
            .with_name("Log Message")
            .with_description("Write an info line to the debug log")
            .with_property(PropertySpec::new("message", Some(PropertyValue::from("Hello")))),
    );

    registry.register(
        statement("log_warning", "output", "FURI_LOG_W(\"${app_name}\", ${message});\n${next_code}")
            .with_name("Log Warning")
            .with_description("Write a warning line to the debug log")
            .with_property(PropertySpec::new("message", Some(PropertyValue::from("Warning")))),
    );

    // Storage, needs the storage capability
    registry.register(
        statement("make_directory", "storage", "storage_simply_mkdir(app->storage, ${path});\n${next_code}")
            .with_name("Make Directory")
            .with_description("Create a directory on the SD card")
            .with_property(PropertySpec::new("path", Some(PropertyValue::from("/ext/apps_data")))),
    );

    registry.register(
        statement("remove_file", "storage", "storage_simply_remove(app->storage, ${path});\n${next_code}")
            .with_name("Remove File")
            .with_description("Delete a file from the SD card")
            .with_property(PropertySpec::new("path", Some(PropertyValue::from("/ext/apps_data/out.txt")))),
    );

    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::{ConnectorKind, PortDirection};

    #[test]
    fn test_every_type_has_a_category() {
        let registry = create_flipper_registry();
        assert_eq!(registry.len(), 8);
        for definition in registry.types() {
            assert!(registry.categories().contains_key(&definition.category), "{}", definition.id);
        }
    }

    #[test]
    fn test_flow_ports() {
        let registry = create_flipper_registry();
        for definition in registry.types() {
            let next = definition.port(FLOW_NEXT, PortDirection::Output).unwrap();
            assert_eq!(next.kind, ConnectorKind::Flow);
            assert!(definition.template().references_continuation(), "{}", definition.id);

            let prev = definition.port("prev", PortDirection::Input);
            assert_eq!(prev.is_none(), definition.id == ENTRY_BLOCK_TYPE);
        }
    }

    #[test]
    fn test_delay_defaults() {
        let registry = create_flipper_registry();
        let block = registry.instantiate("delay", None).unwrap();
        assert_eq!(block.property("ms"), Some(&PropertyValue::from(500)));
    }
}
