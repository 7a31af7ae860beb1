//! Paths into the program storage.

use std::fmt;

use smallvec::SmallVec;

use crate::nbt::write_key;
use crate::StackKind;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PathNode {
    /// Compound member.
    Key(String),
    /// List or array element; negative indices count from the end.
    Index(i32),
}

/// A path from the storage root.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Path {
    nodes: SmallVec<[PathNode; 4]>,
}

impl Path {
    /// The stack holding values of `kind`.
    pub fn stack(kind: StackKind) -> Path {
        Path::root().key("stack").key(kind.name())
    }

    /// `index` into the stack of `kind`.
    pub fn stack_slot(kind: StackKind, index: i32) -> Path {
        Path::stack(kind).index(index)
    }

    pub fn root() -> Path {
        Path {
            nodes: SmallVec::new(),
        }
    }

    #[must_use]
    pub fn key(mut self, key: impl Into<String>) -> Path {
        self.nodes.push(PathNode::Key(key.into()));
        self
    }

    #[must_use]
    pub fn index(mut self, index: i32) -> Path {
        self.nodes.push(PathNode::Index(index));
        self
    }

    #[must_use]
    pub fn join(mut self, tail: &Path) -> Path {
        self.nodes.extend(tail.nodes.iter().cloned());
        self
    }

    pub fn nodes(&self) -> &[PathNode] {
        &self.nodes
    }

    pub fn is_root(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The path without its last node, and that node.
    pub fn split_last(&self) -> Option<(Path, &PathNode)> {
        let (last, init) = self.nodes.split_last()?;
        Some((
            Path {
                nodes: init.iter().cloned().collect(),
            },
            last,
        ))
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, node) in self.nodes.iter().enumerate() {
            match node {
                PathNode::Key(key) => {
                    if i > 0 {
                        f.write_str(".")?;
                    }
                    write_key(f, key)?;
                }
                PathNode::Index(n) => write!(f, "[{n}]")?,
            }
        }
        Ok(())
    }
}
