//! Compiler settings, loadable from a JSON settings file.

use serde::{Deserialize, Serialize};

/// Options for one compile. Missing keys in a settings file take defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    /// Reflow node positions after compiling.
    pub layout: bool,
    /// Skip the layout pass for units that created more nodes than this.
    pub layout_max_nodes: usize,
    /// Seed every unit with the runtime's `$` inputs (`$pos`, `$size`, ...).
    pub system_inputs: bool,
    pub grid: GridOptions,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            layout: true,
            layout_max_nodes: 50,
            system_inputs: true,
            grid: GridOptions::default(),
        }
    }
}

impl CompileOptions {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Placement grid used when nodes are created and when they are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridOptions {
    /// Distance between neighbouring slots.
    pub size: f32,
    /// Slots per column before node creation wraps to the next column.
    pub max_nodes_in_row: usize,
    /// Horizontal spacing between layout columns, in grid units.
    pub column_spacing: f32,
}

impl Default for GridOptions {
    fn default() -> Self {
        Self {
            size: 44.8,
            max_nodes_in_row: 20,
            column_spacing: 1.3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_settings_use_defaults() {
        let opts = CompileOptions::from_json("{}").unwrap();
        assert_eq!(opts, CompileOptions::default());
        assert!(opts.layout);
        assert_eq!(opts.layout_max_nodes, 50);
    }

    #[test]
    fn partial_grid_settings() {
        let opts =
            CompileOptions::from_json(r#"{"layout": false, "grid": {"size": 10.0}}"#).unwrap();
        assert!(!opts.layout);
        assert_eq!(opts.grid.size, 10.0);
        assert_eq!(opts.grid.max_nodes_in_row, 20);
    }
}
