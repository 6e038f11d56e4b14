//! Non-interactive output of a synchronized settings tree.

use std::io::{self, Write};

use colored::Colorize;
use settree::{DisplayTree, Node, NodeKind};

/// Print every node of `tree` with box-drawing guides.
pub fn write_tree(tree: &DisplayTree, out: &mut impl Write) -> io::Result<()> {
    let count = tree.roots.len();
    for (idx, node) in tree.roots.iter().enumerate() {
        write_node(node, "", idx + 1 == count, out)?;
    }
    Ok(())
}

fn write_node(node: &Node, prefix: &str, last: bool, out: &mut impl Write) -> io::Result<()> {
    let branch = if last { "└── " } else { "├── " };
    match node.kind {
        NodeKind::Group if node.value_text.is_empty() => {
            writeln!(out, "{prefix}{branch}{}", node.label.bold().blue())?;
        }
        _ => {
            writeln!(
                out,
                "{prefix}{branch}{} {} {}",
                node.label.bold(),
                format!("({})", node.type_text).dimmed(),
                node.value_text.green()
            )?;
        }
    }

    let child_prefix = format!("{prefix}{}", if last { "    " } else { "│   " });
    let count = node.children.len();
    for (idx, child) in node.children.iter().enumerate() {
        write_node(child, &child_prefix, idx + 1 == count, out)?;
    }
    Ok(())
}

/// Print `tree` as a JSON array of nodes.
pub fn write_json(tree: &DisplayTree, out: &mut impl Write) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut *out, tree)?;
    writeln!(out)?;
    Ok(())
}
