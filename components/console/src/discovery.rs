//! Device tree discovery
//!
//! Each backend scans the tree once for nodes whose `compatible` list names
//! it. Matching nodes are offered to the backend's bind callback in tree
//! order; the backend's [`BackendHandle`](crate::handle::BackendHandle)
//! accepts the first and ignores the rest, so binding does not depend on
//! how often discovery runs.

use log::{debug, warn};
use tilecon_fdt_scan::{scan, ScanError, ScanNode, ScanProp, ScanVisitor};

/// What a backend looks for in the device tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Compatible {
    /// Entry expected in the node's `compatible` list
    pub id: &'static str,
    /// Whether the node must carry a non-zero `reg` address
    pub needs_reg: bool,
}

pub const SIFIVE_UART0: Compatible = Compatible {
    id: "sifive,uart0",
    needs_reg: true,
};

pub const GEM5_UART0: Compatible = Compatible {
    id: "gem5,uart0",
    needs_reg: false,
};

/// Per-node scan state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanContext {
    pub compatible: bool,
    pub reg: u64,
}

struct Binder<F> {
    target: Compatible,
    ctx: ScanContext,
    bind: F,
    matches: usize,
}

impl<F: FnMut(u64) -> bool> ScanVisitor for Binder<F> {
    fn open(&mut self, _node: &ScanNode<'_, '_>) {
        self.ctx = ScanContext::default();
    }

    fn property(&mut self, prop: &ScanProp<'_, '_>) {
        if prop.is("compatible") && prop.string_list_index(self.target.id).is_some() {
            self.ctx.compatible = true;
        } else if prop.is("reg") {
            // unparseable addresses count as no address
            self.ctx.reg = prop.address().unwrap_or(0);
        }
    }

    fn done(&mut self, node: &ScanNode<'_, '_>) {
        if !self.ctx.compatible {
            return;
        }
        if self.target.needs_reg && self.ctx.reg == 0 {
            warn!("{}: node {} has no usable reg, skipped", self.target.id, node.name());
            return;
        }
        self.matches += 1;
        if !(self.bind)(self.ctx.reg) {
            debug!("{}: already bound, ignoring node {}", self.target.id, node.name());
        }
    }
}

/// Offer every node matching `target` to `bind`
///
/// `bind` receives the node's `reg` address (zero when the target does not
/// need one) and reports whether it took the binding. Returns the number
/// of matching nodes.
pub fn discover<F>(blob: &[u8], target: Compatible, bind: F) -> Result<usize, ScanError>
where
    F: FnMut(u64) -> bool,
{
    let mut binder = Binder {
        target,
        ctx: ScanContext::default(),
        bind,
        matches: 0,
    };
    scan(blob, &mut binder)?;
    Ok(binder.matches)
}

/// Console policy read from the device tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsoleOptions {
    /// Collect whole lines before handing them to the backend
    pub buffering: bool,
}

impl ConsoleOptions {
    pub const DEFAULT: Self = Self { buffering: true };

    /// Scan `blob` for console options
    ///
    /// A `nobuf` property on any node turns line buffering off.
    pub fn discover(blob: &[u8]) -> Result<Self, ScanError> {
        let mut nobuf = NobufScan::default();
        scan(blob, &mut nobuf)?;
        if nobuf.found {
            debug!("console: nobuf set, line buffering disabled");
        }
        Ok(Self {
            buffering: !nobuf.found,
        })
    }
}

impl Default for ConsoleOptions {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Default)]
struct NobufScan {
    found: bool,
}

impl ScanVisitor for NobufScan {
    fn property(&mut self, prop: &ScanProp<'_, '_>) {
        if prop.is("nobuf") {
            self.found = true;
        }
    }
}
