//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueHint};

use crate::domain::NodeType;

/// Hierarchical shape key trees: weighted groups and weight propagation drivers
#[derive(Parser, Debug)]
#[command(name = "shapetree")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Debug output, repeat for more (-d info, -dd debug, -ddd trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub debug: u8,

    /// Project directory (default: cwd)
    #[arg(short = 'C', long, global = true, value_hint = ValueHint::DirPath)]
    pub project_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a new document with an empty key and tree
    Init {
        /// Name of the key (driver target id)
        #[arg(long, default_value = "Key")]
        key: String,
        /// Key does not support split axis interpolation
        #[arg(long)]
        no_split_axis: bool,
        /// Key does not support combination shapes
        #[arg(long)]
        no_combination: bool,
        /// Key does not support in-between shapes
        #[arg(long)]
        no_in_between: bool,
        /// Overwrite an existing document
        #[arg(short, long)]
        force: bool,
    },

    /// Manage group nodes
    Group {
        #[command(subcommand)]
        command: GroupCommands,
    },

    /// Manage shape key nodes and host shapes
    Shape {
        #[command(subcommand)]
        command: ShapeCommands,
    },

    /// Add a node of any kind backed by a host data path
    Insert {
        /// Node kind
        #[arg(value_parser = parse_node_type)]
        node_type: NodeType,
        /// Node name
        name: String,
        /// Host path of the backing data object
        #[arg(long)]
        data_path: Option<String>,
        /// Parent node (default: root level)
        #[arg(short, long)]
        parent: Option<String>,
    },

    /// Rename a node (collisions get a .NNN suffix)
    Rename {
        /// Current node name
        node: String,
        /// Requested name
        name: String,
    },

    /// Move a node with its subtree under another parent
    Move {
        /// Node to move
        node: String,
        /// New parent (default: root level)
        #[arg(short, long)]
        parent: Option<String>,
    },

    /// Swap a node with its previous sibling
    Up {
        node: String,
    },

    /// Swap a node with its next sibling
    Down {
        node: String,
    },

    /// Print the tree
    Tree,

    /// Show everything known about one node
    Show {
        node: String,
    },

    /// List the drivers installed on the key
    Drivers,

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum GroupCommands {
    /// Add a group node
    Add {
        /// Parent group (default: root level)
        #[arg(short, long)]
        parent: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ShapeCommands {
    /// Add a shape key node, creating the shape unless --shape names one
    Add {
        /// Parent group (default: root level)
        #[arg(short, long)]
        parent: Option<String>,
        /// Existing shape to attach
        #[arg(short, long)]
        shape: Option<String>,
    },

    /// Delete a shape from the key; nodes using it become invalid
    Remove {
        shape: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Create config template
    Init {
        /// Create global config
        #[arg(short, long)]
        global: bool,
    },

    /// Show config paths
    Path,
}

fn parse_node_type(s: &str) -> Result<NodeType, String> {
    s.parse()
}
