// SPDX-License-Identifier: MIT OR Apache-2.0
//! Flipper Zero C code generation from graph snapshots.
//!
//! Generation runs in four steps:
//! 1. Capability seeding from the manifest's `requires`
//! 2. Entry discovery (`app_on_start` blocks)
//! 3. Flow expansion of each entry block's chain
//! 4. Assembly of `main.c`

use crate::capability::CapabilitySet;
use crate::manifest::{Manifest, FALLBACK_APPID};
use flipscript_graph::{
    BlockId, BlockRecord, BlockRegistry, BlockTypeDefinition, Endpoint, GraphSnapshot,
    PropertyValue, ENTRY_BLOCK_TYPE, FLOW_NEXT,
};
use indexmap::IndexMap;
use std::collections::{BTreeSet, HashMap, HashSet};

/// Name of the generated source file
pub const MAIN_FILE: &str = "main.c";

const DEFAULT_ENTRY_POINT: &str = "app_main";
const INDENT: &str = "    ";

/// Error during generation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerateError {
    /// The graph has no entry block
    #[error("No entry point block found - add an 'app_on_start' block")]
    NoEntryPoint,
}

/// Generated files, by relative file name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratedFiles {
    files: IndexMap<String, String>,
}

impl GeneratedFiles {
    /// Get a file's text
    pub fn get(&self, name: &str) -> Option<&str> {
        self.files.get(name).map(String::as_str)
    }

    /// Text of `main.c`
    pub fn main_source(&self) -> Option<&str> {
        self.get(MAIN_FILE)
    }

    /// Files in emission order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.files.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of files
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether no files were produced
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Take the underlying map
    pub fn into_map(self) -> IndexMap<String, String> {
        self.files
    }
}

/// One block on a flow chain, ready to render
struct Step<'a> {
    definition: &'a BlockTypeDefinition,
    properties: IndexMap<String, PropertyValue>,
}

impl Step<'_> {
    fn render(&self, app_name: &str, continuation: &str) -> String {
        self.definition
            .template()
            .render(app_name, &self.properties, continuation)
    }
}

/// Walks flow connections from one root, expanding templates.
///
/// The chain is collected first and rendered afterwards, so chain length
/// does not grow the call stack.
struct FlowExpander<'a> {
    registry: &'a BlockRegistry,
    app_name: &'a str,
    blocks: &'a HashMap<&'a BlockId, &'a BlockRecord>,
    outgoing: &'a HashMap<&'a Endpoint, &'a Endpoint>,
    visited: HashSet<BlockId>,
}

impl<'a> FlowExpander<'a> {
    fn expand(&mut self, root: &'a BlockRecord) -> String {
        let chain = self.chain(root);
        self.render(&chain)
    }

    /// Blocks reachable from `root` through `next`, in flow order
    fn chain(&mut self, root: &'a BlockRecord) -> Vec<Step<'a>> {
        let (registry, blocks, outgoing) = (self.registry, self.blocks, self.outgoing);
        let mut chain = Vec::new();
        let mut current = Some(root);

        while let Some(block) = current.take() {
            // Cycle and convergence guard
            if !self.visited.insert(block.id.clone()) {
                break;
            }

            let Some(definition) = registry.type_info(&block.block_type) else {
                tracing::warn!(block = %block.id, "Unknown block type: {}", block.block_type);
                break;
            };
            if definition.template().is_empty() {
                tracing::warn!(block = %block.id, "No code template for block type: {}", block.block_type);
                break;
            }
            chain.push(Step {
                definition,
                properties: schema_properties(definition, block),
            });

            let next = Endpoint::new(block.id.clone(), FLOW_NEXT);
            current = match outgoing.get(&next) {
                Some(target) => match blocks.get(&target.block) {
                    Some(target_block) => Some(*target_block),
                    None => {
                        tracing::warn!(
                            block = %block.id,
                            "Flow target {} does not exist",
                            target.block
                        );
                        None
                    }
                },
                None => None,
            };
        }

        chain
    }

    /// Render a chain, each block wrapping the code of the blocks after it
    fn render(&self, chain: &[Step<'_>]) -> String {
        let mut out = String::new();
        let mut closers = Vec::new();

        for (i, step) in chain.iter().enumerate() {
            let template = step.definition.template();
            if let Some((open, close)) = template.render_around(self.app_name, &step.properties) {
                out.push_str(&open);
                closers.push(close);
                continue;
            }

            // No continuation or more than one: the tail is rendered whole
            let tail = if template.references_continuation() {
                chain[i + 1..]
                    .iter()
                    .rev()
                    .fold(String::new(), |next, later| later.render(self.app_name, &next))
            } else {
                String::new()
            };
            out.push_str(&step.render(self.app_name, &tail));
            break;
        }

        for close in closers.iter().rev() {
            out.push_str(close);
        }
        out
    }
}

/// Block properties converted to the kinds their type declares
fn schema_properties(
    definition: &BlockTypeDefinition,
    block: &BlockRecord,
) -> IndexMap<String, PropertyValue> {
    block
        .properties
        .iter()
        .map(|(name, value)| {
            let value = match definition.property(name) {
                Some(spec) => spec.coerce(value.clone()),
                None => value.clone(),
            };
            (name.clone(), value)
        })
        .collect()
}

/// Code generator for Flipper Zero applications.
///
/// Accumulators are reset at the start of every [`CodeGenerator::generate`]
/// call, so one generator can be reused across graphs.
#[derive(Debug, Default)]
pub struct CodeGenerator {
    includes: BTreeSet<&'static str>,
    state_fields: Vec<&'static str>,
    init: Vec<&'static str>,
    cleanup: Vec<&'static str>,
    declarations: Vec<String>,
    definitions: Vec<String>,
    flows: Vec<(BlockId, String)>,
}

impl CodeGenerator {
    /// Create a new generator
    pub fn new() -> Self {
        Self::default()
    }

    fn reset(&mut self) {
        *self = Self::default();
    }

    /// Generate source files for a graph snapshot
    pub fn generate(
        &mut self,
        registry: &BlockRegistry,
        manifest: &Manifest,
        snapshot: &GraphSnapshot,
    ) -> Result<GeneratedFiles, GenerateError> {
        self.reset();

        let app_name = if manifest.appid.is_empty() {
            FALLBACK_APPID
        } else {
            manifest.appid.as_str()
        };
        let entry_point = if manifest.entry_point.is_empty() {
            DEFAULT_ENTRY_POINT
        } else {
            manifest.entry_point.as_str()
        };

        tracing::info!(
            "Generating {} ({} blocks, {} connections)",
            app_name,
            snapshot.blocks.len(),
            snapshot.connections.len()
        );

        // Phase 1: capabilities
        let capabilities = CapabilitySet::from_requires(&manifest.requires);
        self.includes.extend(capabilities.includes());
        self.state_fields = capabilities.state_fields();
        self.init = capabilities.init();
        self.cleanup = capabilities.cleanup();

        // Phase 2: entry discovery
        let roots: Vec<&BlockRecord> = snapshot.blocks_of_type(ENTRY_BLOCK_TYPE).collect();
        if roots.is_empty() {
            tracing::warn!("No entry point block found");
            return Err(GenerateError::NoEntryPoint);
        }

        // Phase 3: flow expansion, one visited set per root
        let blocks = snapshot.blocks_by_id();
        let outgoing = snapshot.outgoing_index();
        for root in roots {
            let mut expander = FlowExpander {
                registry,
                app_name,
                blocks: &blocks,
                outgoing: &outgoing,
                visited: HashSet::new(),
            };
            let body = expander.expand(root);
            tracing::debug!(root = %root.id, "Expanded {} blocks", expander.visited.len());
            self.flows.push((root.id.clone(), body));
        }

        // Phase 4: assembly
        self.emit_callbacks(app_name);
        let main = self.assemble(app_name, entry_point);

        let mut files = IndexMap::new();
        files.insert(MAIN_FILE.to_string(), main);
        Ok(GeneratedFiles { files })
    }

    fn emit_callbacks(&mut self, app_name: &str) {
        self.declarations.push(format!(
            "static void {app_name}_render_callback(Canvas* canvas, void* ctx);"
        ));
        self.declarations.push(format!(
            "static void {app_name}_input_callback(InputEvent* event, void* ctx);"
        ));

        self.definitions.push(format!(
            "static void {app_name}_render_callback(Canvas* canvas, void* ctx) {{
    furi_assert(ctx);
    {app_name}_state_t* app = ctx;
    UNUSED(app);

    canvas_clear(canvas);
    canvas_set_font(canvas, FontPrimary);
    canvas_draw_str(canvas, 0, 10, \"{app_name}\");
}}"
        ));

        self.definitions.push(format!(
            "static void {app_name}_input_callback(InputEvent* event, void* ctx) {{
    furi_assert(ctx);
    {app_name}_state_t* app = ctx;
    UNUSED(app);

    if(event->type == InputTypePress) {{
        // Handle button press
    }}
}}"
        ));
    }

    fn assemble(&self, app_name: &str, entry_point: &str) -> String {
        let mut out = String::new();

        out.push_str(&format!("/**\n * {app_name} application\n */\n\n"));

        for include in &self.includes {
            out.push_str(include);
            out.push('\n');
        }
        out.push('\n');

        // App state
        out.push_str("/**\n * Application state structure\n */\n");
        out.push_str("typedef struct {\n");
        for field in &self.state_fields {
            out.push_str(INDENT);
            out.push_str(field);
            out.push('\n');
        }
        out.push_str("    struct {\n        // Variables will be added here\n    } variables;\n");
        out.push_str(&format!("}} {app_name}_state_t;\n\n"));

        if !self.declarations.is_empty() {
            out.push_str(&self.declarations.join("\n"));
            out.push_str("\n\n");
        }

        for definition in &self.definitions {
            out.push_str(definition);
            out.push_str("\n\n");
        }

        // Cleanup
        out.push_str(&format!("static void {app_name}_free(void* p) {{\n"));
        out.push_str(&format!("    {app_name}_state_t* app = ({app_name}_state_t*)p;\n\n"));
        if !self.cleanup.is_empty() {
            out.push_str("    // Close capability records\n");
            for statement in &self.cleanup {
                out.push_str(INDENT);
                out.push_str(statement);
                out.push('\n');
            }
            out.push('\n');
        }
        out.push_str("    // Free view port\n");
        out.push_str("    view_port_enabled_set(app->view_port, false);\n");
        out.push_str("    gui_remove_view_port(app->gui, app->view_port);\n");
        out.push_str("    view_port_free(app->view_port);\n");
        out.push_str("    furi_record_close(RECORD_GUI);\n\n");
        out.push_str("    // Free app state\n");
        out.push_str("    free(app);\n");
        out.push_str("}\n\n");

        // Entry point
        out.push_str("/**\n * Application entry point\n */\n");
        out.push_str(&format!("int32_t {entry_point}(void* p) {{\n"));
        out.push_str("    UNUSED(p);\n\n");
        out.push_str("    // Allocate app state\n");
        out.push_str(&format!(
            "    {app_name}_state_t* app = malloc(sizeof({app_name}_state_t));\n\n"
        ));
        out.push_str("    // Initialize view port\n");
        out.push_str("    app->view_port = view_port_alloc();\n");
        out.push_str(&format!(
            "    view_port_draw_callback_set(app->view_port, {app_name}_render_callback, app);\n"
        ));
        out.push_str(&format!(
            "    view_port_input_callback_set(app->view_port, {app_name}_input_callback, app);\n\n"
        ));
        out.push_str("    // Open GUI and register view port\n");
        out.push_str("    app->gui = furi_record_open(RECORD_GUI);\n");
        out.push_str("    gui_add_view_port(app->gui, app->view_port, GuiLayerFullscreen);\n");
        for statement in &self.init {
            out.push_str(INDENT);
            out.push_str(statement);
            out.push('\n');
        }

        for (root, body) in &self.flows {
            out.push_str(&format!("\n    // flow: {root}\n"));
            for line in body.lines() {
                if !line.trim().is_empty() {
                    out.push_str(INDENT);
                    out.push_str(line);
                }
                out.push('\n');
            }
        }

        out.push_str("\n    // Main application loop\n");
        out.push_str("    view_port_enabled_set(app->view_port, true);\n\n");
        out.push_str("    // Wait until the user exits the application\n");
        out.push_str("    while(1) {\n        furi_delay_ms(100);\n    }\n\n");
        out.push_str("    // Cleanup\n");
        out.push_str(&format!("    {app_name}_free(app);\n\n"));
        out.push_str("    return 0;\n");
        out.push_str("}\n");

        out
    }
}

/// Generate source files with a fresh generator
pub fn generate(
    registry: &BlockRegistry,
    manifest: &Manifest,
    snapshot: &GraphSnapshot,
) -> Result<GeneratedFiles, GenerateError> {
    CodeGenerator::new().generate(registry, manifest, snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flipscript_graph::{BlockTypeDefinition, Connection, PortSpec};

    fn registry() -> BlockRegistry {
        let mut registry = BlockRegistry::new();
        registry.register(
            BlockTypeDefinition::new("app_on_start", "events", "START ${next_code}")
                .with_output(PortSpec::flow("next")),
        );
        registry.register(
            BlockTypeDefinition::new("step", "flow", "STEP(${n});\n${next_code}")
                .with_input(PortSpec::flow("prev"))
                .with_output(PortSpec::flow("next")),
        );
        registry.register(
            BlockTypeDefinition::new("wrap", "flow", "W{${next_code}}")
                .with_input(PortSpec::flow("prev"))
                .with_output(PortSpec::flow("next")),
        );
        registry.register(
            BlockTypeDefinition::new("twice", "flow", "T[${next_code}${next_code}]")
                .with_input(PortSpec::flow("prev"))
                .with_output(PortSpec::flow("next")),
        );
        registry
    }

    fn link(from: &str, to: &str) -> Connection {
        Connection::new(Endpoint::new(from, "next"), Endpoint::new(to, "prev"))
    }

    #[test]
    fn test_reset_between_runs() {
        let registry = registry();
        let manifest = Manifest {
            appid: "demo".to_string(),
            requires: vec!["storage".to_string()],
            ..Manifest::default()
        };
        let snapshot = GraphSnapshot {
            blocks: vec![BlockRecord::new("a", "app_on_start")],
            connections: Vec::new(),
        };

        let mut generator = CodeGenerator::new();
        let first = generator.generate(&registry, &manifest, &snapshot).unwrap();
        let second = generator.generate(&registry, &manifest, &snapshot).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            second.main_source().unwrap().matches("Storage* storage;").count(),
            1
        );
    }

    #[test]
    fn test_cycle_terminates() {
        let registry = registry();
        let snapshot = GraphSnapshot {
            blocks: vec![
                BlockRecord::new("a", "app_on_start"),
                BlockRecord::new("b", "step").with_property("n", 1),
                BlockRecord::new("c", "step").with_property("n", 2),
            ],
            connections: vec![link("a", "b"), link("b", "c"), link("c", "b")],
        };

        let files = generate(&registry, &Manifest::default(), &snapshot).unwrap();
        let main = files.main_source().unwrap();
        assert_eq!(main.matches("STEP(1);").count(), 1);
        assert_eq!(main.matches("STEP(2);").count(), 1);
    }

    #[test]
    fn test_each_root_gets_its_own_visited_set() {
        let registry = registry();
        let snapshot = GraphSnapshot {
            blocks: vec![
                BlockRecord::new("a", "app_on_start"),
                BlockRecord::new("z", "app_on_start"),
                BlockRecord::new("b", "step").with_property("n", 7),
            ],
            connections: vec![link("a", "b"), link("z", "b")],
        };

        let files = generate(&registry, &Manifest::default(), &snapshot).unwrap();
        let main = files.main_source().unwrap();
        assert_eq!(main.matches("STEP(7);").count(), 2);
        let a = main.find("// flow: a").unwrap();
        let z = main.find("// flow: z").unwrap();
        assert!(a < z);
    }

    #[test]
    fn test_unknown_type_contributes_nothing() {
        let registry = registry();
        let snapshot = GraphSnapshot {
            blocks: vec![
                BlockRecord::new("a", "app_on_start"),
                BlockRecord::new("m", "mystery"),
                BlockRecord::new("b", "step").with_property("n", 3),
            ],
            connections: vec![link("a", "m"), link("m", "b")],
        };

        let files = generate(&registry, &Manifest::default(), &snapshot).unwrap();
        let main = files.main_source().unwrap();
        assert!(main.contains("START \n") || main.contains("START\n"));
        assert!(!main.contains("STEP(3);"));
    }

    #[test]
    fn test_dangling_target_is_empty() {
        let registry = registry();
        let snapshot = GraphSnapshot {
            blocks: vec![BlockRecord::new("a", "app_on_start")],
            connections: vec![link("a", "ghost")],
        };
        assert!(generate(&registry, &Manifest::default(), &snapshot).is_ok());
    }

    #[test]
    fn test_empty_appid_uses_fallback() {
        let registry = registry();
        let manifest = Manifest {
            appid: String::new(),
            entry_point: String::new(),
            ..Manifest::default()
        };
        let snapshot = GraphSnapshot {
            blocks: vec![BlockRecord::new("a", "app_on_start")],
            connections: Vec::new(),
        };

        let files = generate(&registry, &manifest, &snapshot).unwrap();
        let main = files.main_source().unwrap();
        assert!(main.contains("} flipper_app_state_t;"));
        assert!(main.contains("int32_t app_main(void* p) {"));
    }

    #[test]
    fn test_wrapping_templates_nest() {
        let registry = registry();
        let snapshot = GraphSnapshot {
            blocks: vec![
                BlockRecord::new("a", "app_on_start"),
                BlockRecord::new("w1", "wrap"),
                BlockRecord::new("w2", "wrap"),
                BlockRecord::new("s", "step").with_property("n", 1),
            ],
            connections: vec![link("a", "w1"), link("w1", "w2"), link("w2", "s")],
        };

        let files = generate(&registry, &Manifest::default(), &snapshot).unwrap();
        let main = files.main_source().unwrap();
        assert!(main.contains("    START W{W{STEP(1);\n    }}\n"));
    }

    #[test]
    fn test_repeated_continuation_duplicates_tail() {
        let registry = registry();
        let snapshot = GraphSnapshot {
            blocks: vec![
                BlockRecord::new("a", "app_on_start"),
                BlockRecord::new("t", "twice"),
                BlockRecord::new("s", "step").with_property("n", 2),
            ],
            connections: vec![link("a", "t"), link("t", "s")],
        };

        let files = generate(&registry, &Manifest::default(), &snapshot).unwrap();
        let main = files.main_source().unwrap();
        assert!(main.contains("    START T[STEP(2);\n    STEP(2);\n    ]\n"));
    }

    #[test]
    fn test_long_chain() {
        let registry = registry();
        let count: i64 = 100_000;
        let mut blocks = vec![BlockRecord::new("a", "app_on_start")];
        let mut connections = vec![link("a", "s0")];
        for i in 0..count {
            blocks.push(BlockRecord::new(format!("s{i}"), "step").with_property("n", i));
            if i + 1 < count {
                connections.push(link(&format!("s{i}"), &format!("s{}", i + 1)));
            }
        }
        let snapshot = GraphSnapshot { blocks, connections };

        let files = generate(&registry, &Manifest::default(), &snapshot).unwrap();
        let main = files.main_source().unwrap();
        assert_eq!(main.matches("STEP(").count(), 100_000);
        let first = main.find("START STEP(0);").unwrap();
        let last = main.find("STEP(99999);").unwrap();
        assert!(first < last);
    }
}
