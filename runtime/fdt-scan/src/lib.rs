//! Device tree scan adapter
//!
//! Drives a [`ScanVisitor`] over every node of a flattened device tree.
//! Decoding is delegated to the `fdt` crate; this crate only turns its node
//! iterator into the `open` / `property` / `done` callback sequence that
//! boot-time discovery code is written against.
//!
//! For each node, in tree order:
//! 1. [`ScanVisitor::open`]
//! 2. [`ScanVisitor::property`] once per property, in blob order
//! 3. [`ScanVisitor::done`]
//!
//! Visitors keep their per-node state in `self` and reset it in `open`.
//!
//! `#address-cells` / `#size-cells` are tracked during the walk and decoded
//! with length checks, so a malformed tree yields "no address" instead of
//! a panic.

#![no_std]

#[cfg(test)]
#[macro_use]
extern crate std;

use fdt::node::FdtNode;
use fdt::{Fdt, FdtError};
use thiserror::Error;

/// Scan adapter errors
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("device tree blob rejected: {0:?}")]
    Rejected(FdtError),
}

pub type Result<T> = core::result::Result<T, ScanError>;

/// Callbacks invoked while walking the tree
pub trait ScanVisitor {
    /// A new node starts.
    fn open(&mut self, _node: &ScanNode<'_, '_>) {}

    /// One property of the node opened last.
    fn property(&mut self, _prop: &ScanProp<'_, '_>) {}

    /// All properties of the node have been visited.
    fn done(&mut self, _node: &ScanNode<'_, '_>) {}
}

/// A node as seen by a visitor
#[derive(Clone, Copy)]
pub struct ScanNode<'b, 'a> {
    inner: FdtNode<'b, 'a>,
}

impl<'b, 'a> ScanNode<'b, 'a> {
    /// Unit name of the node (`/` for the root)
    pub fn name(&self) -> &'a str {
        self.inner.name
    }
}

/// Address width a node imposes on its children
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CellSizes {
    address: usize,
}

impl CellSizes {
    /// Values a node without the properties passes to its children
    const DEFAULT: Self = Self { address: 2 };

    /// Read from `node`, validating `#size-cells` as well
    ///
    /// `None` when either property is present but not a single 32-bit cell.
    fn of(node: &FdtNode<'_, '_>) -> Option<Self> {
        let mut cells = Self::DEFAULT;
        for prop in node.properties() {
            match prop.name {
                "#address-cells" => cells.address = be_u32(prop.value)? as usize,
                "#size-cells" => {
                    be_u32(prop.value)?;
                }
                _ => {}
            }
        }
        Some(cells)
    }
}

fn be_u32(bytes: &[u8]) -> Option<u32> {
    let raw: [u8; 4] = bytes.try_into().ok()?;
    Some(u32::from_be_bytes(raw))
}

fn be_u64(bytes: &[u8]) -> Option<u64> {
    let raw: [u8; 8] = bytes.try_into().ok()?;
    Some(u64::from_be_bytes(raw))
}

/// A property as seen by a visitor
#[derive(Clone, Copy)]
pub struct ScanProp<'b, 'a> {
    node: FdtNode<'b, 'a>,
    name: &'a str,
    value: &'a [u8],
    cells: Option<CellSizes>,
}

impl<'b, 'a> ScanProp<'b, 'a> {
    pub fn name(&self) -> &'a str {
        self.name
    }

    /// Raw big-endian property value
    pub fn value(&self) -> &'a [u8] {
        self.value
    }

    /// Node owning this property
    pub fn node(&self) -> ScanNode<'b, 'a> {
        ScanNode { inner: self.node }
    }

    pub fn is(&self, name: &str) -> bool {
        self.name == name
    }

    /// Position of `needle` in a NUL-separated string list value
    ///
    /// Used for `compatible` matching. Returns `None` when the value does
    /// not contain `needle` as a whole entry.
    pub fn string_list_index(&self, needle: &str) -> Option<usize> {
        let value = self.value.strip_suffix(&[0u8]).unwrap_or(self.value);
        if value.is_empty() {
            return None;
        }
        value
            .split(|b| *b == 0)
            .position(|entry| entry == needle.as_bytes())
    }

    /// First address of a `reg` value
    ///
    /// Decoded with the parent's `#address-cells`. Returns `None` for any
    /// other property, for values shorter than one address, for malformed
    /// parent cell sizes, and for address widths other than one or two
    /// cells.
    pub fn address(&self) -> Option<u64> {
        if !self.is("reg") {
            return None;
        }
        let cells = self.cells?;
        let raw = self.value.get(..cells.address * 4)?;
        match cells.address {
            1 => be_u32(raw).map(u64::from),
            2 => be_u64(raw),
            _ => None,
        }
    }
}

/// Walk the blob in `blob`, returning the number of nodes visited
pub fn scan<V: ScanVisitor + ?Sized>(blob: &[u8], visitor: &mut V) -> Result<usize> {
    let fdt = Fdt::new(blob).map_err(ScanError::Rejected)?;
    Ok(walk(&fdt, visitor))
}

/// Walk the blob located at physical address `addr`
///
/// # Safety
/// `addr` must point to a readable device tree blob whose header
/// `totalsize` bytes stay valid for the duration of the call.
pub unsafe fn scan_raw<V: ScanVisitor + ?Sized>(addr: usize, visitor: &mut V) -> Result<usize> {
    let fdt = unsafe { Fdt::from_ptr(addr as *const u8) }.map_err(ScanError::Rejected)?;
    Ok(walk(&fdt, visitor))
}

/// Borrow the blob at physical address `addr` as a byte slice
///
/// The slice covers the header's `totalsize`.
///
/// # Safety
/// Same as [`scan_raw`], for as long as the returned slice is used.
pub unsafe fn blob_at<'a>(addr: usize) -> Result<&'a [u8]> {
    let fdt = unsafe { Fdt::from_ptr(addr as *const u8) }.map_err(ScanError::Rejected)?;
    let len = fdt.total_size();
    Ok(unsafe { core::slice::from_raw_parts(addr as *const u8, len) })
}

fn walk<V: ScanVisitor + ?Sized>(fdt: &Fdt<'_>, visitor: &mut V) -> usize {
    let visited = match fdt.all_nodes().next() {
        Some(root) => visit(root, Some(CellSizes::DEFAULT), visitor),
        None => 0,
    };
    log::trace!("fdt-scan: visited {} nodes", visited);
    visited
}

/// Visit `node`, then its children; `cells` are the parent's cell sizes
fn visit<V: ScanVisitor + ?Sized>(node: FdtNode<'_, '_>, cells: Option<CellSizes>, visitor: &mut V) -> usize {
    let scan_node = ScanNode { inner: node };
    visitor.open(&scan_node);
    for prop in node.properties() {
        visitor.property(&ScanProp {
            node,
            name: prop.name,
            value: prop.value,
            cells,
        });
    }
    visitor.done(&scan_node);

    let child_cells = CellSizes::of(&node);
    if child_cells.is_none() {
        log::warn!("fdt-scan: {} has malformed cell sizes", node.name);
    }
    let mut visited = 1;
    for child in node.children() {
        visited += visit(child, child_cells, visitor);
    }
    visited
}
