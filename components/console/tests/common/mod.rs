//! Device tree fixtures shared by the integration tests

#![allow(dead_code)]

use vm_fdt::FdtWriter;

pub const UART_BASE: u64 = 0x1001_0000;

/// One child of the root node
pub struct DtNode {
    pub name: &'static str,
    pub compatible: &'static [&'static str],
    pub reg: Option<u64>,
    pub nobuf: bool,
}

impl DtNode {
    pub const fn plain(name: &'static str) -> Self {
        Self {
            name,
            compatible: &[],
            reg: None,
            nobuf: false,
        }
    }

    pub const fn sifive(name: &'static str, base: u64) -> Self {
        Self {
            name,
            compatible: &["sifive,fu540-c000-uart", "sifive,uart0"],
            reg: Some(base),
            nobuf: false,
        }
    }

    pub const fn gem5(name: &'static str) -> Self {
        Self {
            name,
            compatible: &["gem5,uart0"],
            reg: None,
            nobuf: false,
        }
    }

    pub const fn with_nobuf(mut self) -> Self {
        self.nobuf = true;
        self
    }
}

/// Build a blob with the given children under `/`
pub fn build(nodes: &[DtNode]) -> Vec<u8> {
    let mut fdt = FdtWriter::new().unwrap();
    let root = fdt.begin_node("").unwrap();
    fdt.property_string("compatible", "tilecon,fpga").unwrap();
    fdt.property_u32("#address-cells", 2).unwrap();
    fdt.property_u32("#size-cells", 2).unwrap();

    for node in nodes {
        let child = fdt.begin_node(node.name).unwrap();
        if !node.compatible.is_empty() {
            fdt.property_string_list(
                "compatible",
                node.compatible.iter().map(|s| s.to_string()).collect(),
            )
            .unwrap();
        }
        if let Some(base) = node.reg {
            fdt.property_array_u64("reg", &[base, 0x1000]).unwrap();
        }
        if node.nobuf {
            fdt.property_null("nobuf").unwrap();
        }
        fdt.end_node(child).unwrap();
    }

    fdt.end_node(root).unwrap();
    fdt.finish().unwrap()
}
