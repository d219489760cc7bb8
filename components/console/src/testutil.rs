//! Shared unit test helpers

use std::string::{String, ToString};
use std::vec::Vec;

use vm_fdt::FdtWriter;

use crate::backend::Backend;

/// Child of the root node in a generated tree
#[derive(Clone, Copy)]
pub struct Node<'a> {
    name: &'a str,
    compatible: &'a [&'a str],
    reg: Option<u64>,
    nobuf: bool,
}

impl<'a> Node<'a> {
    pub fn new(name: &'a str) -> Self {
        Self {
            name,
            compatible: &[],
            reg: None,
            nobuf: false,
        }
    }

    pub fn uart(name: &'a str, base: u64) -> Self {
        Self::new(name).compatible(&["sifive,uart0"]).reg(base)
    }

    pub fn compatible(mut self, list: &'a [&'a str]) -> Self {
        self.compatible = list;
        self
    }

    pub fn reg(mut self, addr: u64) -> Self {
        self.reg = Some(addr);
        self
    }

    pub fn nobuf(mut self) -> Self {
        self.nobuf = true;
        self
    }
}

/// Flattened tree with two address and size cells
pub fn tree(nodes: &[Node<'_>]) -> Vec<u8> {
    let mut fdt = FdtWriter::new().unwrap();
    let root = fdt.begin_node("").unwrap();
    fdt.property_u32("#address-cells", 2).unwrap();
    fdt.property_u32("#size-cells", 2).unwrap();
    for node in nodes {
        let child = fdt.begin_node(node.name).unwrap();
        if !node.compatible.is_empty() {
            let list: Vec<String> = node.compatible.iter().map(|s| s.to_string()).collect();
            fdt.property_string_list("compatible", list).unwrap();
        }
        if let Some(addr) = node.reg {
            fdt.property_array_u64("reg", &[addr, 0x1000]).unwrap();
        }
        if node.nobuf {
            fdt.property_null("nobuf").unwrap();
        }
        fdt.end_node(child).unwrap();
    }
    fdt.end_node(root).unwrap();
    fdt.finish().unwrap()
}

/// Backend that keeps everything it is given
pub struct Recorder {
    pub bytes: Vec<u8>,
    pub blocks: Vec<usize>,
    pub max_block: usize,
    pub input: Option<u8>,
}

impl Recorder {
    pub fn new(max_block: usize) -> Self {
        Self {
            bytes: Vec::new(),
            blocks: Vec::new(),
            max_block,
            input: None,
        }
    }
}

impl Backend for Recorder {
    fn write_byte(&mut self, byte: u8) {
        self.bytes.push(byte);
    }

    fn write_block(&mut self, buf: &[u8]) {
        let len = buf.len().min(self.max_block);
        self.bytes.extend_from_slice(&buf[..len]);
        self.blocks.push(len);
    }

    fn read_byte(&mut self) -> Option<u8> {
        self.input.take()
    }

    fn max_block(&self) -> usize {
        self.max_block
    }
}
