//! Device tree blobs for tests.
//!
//! [`DtbBuilder`] lays out a version 17 blob the way `dtc` does: header,
//! memory reservation block, structure block, strings block. It can also
//! emit malformed blobs through [`DtbBuilder::raw_word`] and the header
//! overrides.

const FDT_MAGIC: u32 = 0xd00dfeed;
const HEADER_SIZE: usize = 40;

const FDT_BEGIN_NODE: u32 = 0x1;
const FDT_END_NODE: u32 = 0x2;
const FDT_PROP: u32 = 0x3;
const FDT_NOP: u32 = 0x4;
const FDT_END: u32 = 0x9;

/// Builds DTB images tag by tag.
#[derive(Clone, Debug)]
pub struct DtbBuilder {
    structure: Vec<u8>,
    strings: Vec<u8>,
    string_offsets: Vec<(String, u32)>,
    reservations: Vec<(u64, u64)>,
    magic: u32,
    version: u32,
    last_comp_version: u32,
    boot_cpuid_phys: u32,
    total_size: Option<u32>,
    with_end: bool,
}

impl Default for DtbBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DtbBuilder {
    /// An empty version 17 blob.
    pub fn new() -> Self {
        Self {
            structure: Vec::new(),
            strings: Vec::new(),
            string_offsets: Vec::new(),
            reservations: Vec::new(),
            magic: FDT_MAGIC,
            version: 17,
            last_comp_version: 16,
            boot_cpuid_phys: 0,
            total_size: None,
            with_end: true,
        }
    }

    /// Offset the next tag will have within the structure block.
    pub fn offset(&self) -> usize {
        self.structure.len()
    }

    fn push_word(&mut self, word: u32) {
        self.structure.extend_from_slice(&word.to_be_bytes());
    }

    fn push_padded(&mut self, bytes: &[u8]) {
        self.structure.extend_from_slice(bytes);
        while self.structure.len() % 4 != 0 {
            self.structure.push(0);
        }
    }

    fn string_offset(&mut self, s: &str) -> u32 {
        for (existing, offset) in &self.string_offsets {
            if existing == s {
                return *offset;
            }
        }

        let offset = self.strings.len() as u32;
        self.strings.extend_from_slice(s.as_bytes());
        self.strings.push(0);
        self.string_offsets.push((s.into(), offset));
        offset
    }

    /// Opens a node. The root node has an empty name.
    pub fn begin_node(&mut self, name: &str) -> &mut Self {
        self.push_word(FDT_BEGIN_NODE);
        let mut bytes = name.as_bytes().to_vec();
        bytes.push(0);
        self.push_padded(&bytes);
        self
    }

    /// Closes the innermost open node.
    pub fn end_node(&mut self) -> &mut Self {
        self.push_word(FDT_END_NODE);
        self
    }

    /// Emits an `FDT_NOP`.
    pub fn nop(&mut self) -> &mut Self {
        self.push_word(FDT_NOP);
        self
    }

    /// Emits a property with a raw payload.
    pub fn prop(&mut self, name: &str, value: &[u8]) -> &mut Self {
        let nameoff = self.string_offset(name);
        self.push_word(FDT_PROP);
        self.push_word(value.len() as u32);
        self.push_word(nameoff);
        self.push_padded(value);
        self
    }

    /// Emits a property whose name offset is given directly.
    pub fn prop_with_nameoff(&mut self, nameoff: u32, value: &[u8]) -> &mut Self {
        self.push_word(FDT_PROP);
        self.push_word(value.len() as u32);
        self.push_word(nameoff);
        self.push_padded(value);
        self
    }

    /// Emits a presence-only property.
    pub fn prop_empty(&mut self, name: &str) -> &mut Self {
        self.prop(name, &[])
    }

    /// Emits a list of big-endian cells.
    pub fn prop_cells(&mut self, name: &str, cells: &[u32]) -> &mut Self {
        let value: Vec<u8> = cells.iter().flat_map(|c| c.to_be_bytes()).collect();
        self.prop(name, &value)
    }

    /// Emits a single cell.
    pub fn prop_u32(&mut self, name: &str, value: u32) -> &mut Self {
        self.prop_cells(name, &[value])
    }

    /// Emits a NUL-terminated string.
    pub fn prop_str(&mut self, name: &str, value: &str) -> &mut Self {
        self.prop_strs(name, &[value])
    }

    /// Emits a string list, each entry NUL-terminated.
    pub fn prop_strs(&mut self, name: &str, values: &[&str]) -> &mut Self {
        let mut value = Vec::new();
        for s in values {
            value.extend_from_slice(s.as_bytes());
            value.push(0);
        }
        self.prop(name, &value)
    }

    /// Appends an arbitrary big-endian word to the structure block.
    pub fn raw_word(&mut self, word: u32) -> &mut Self {
        self.push_word(word);
        self
    }

    /// Adds a memory reservation entry.
    pub fn reserve(&mut self, address: u64, size: u64) -> &mut Self {
        self.reservations.push((address, size));
        self
    }

    /// Overrides the magic number.
    pub fn magic(&mut self, magic: u32) -> &mut Self {
        self.magic = magic;
        self
    }

    /// Overrides `version` and `last_comp_version`.
    pub fn version(&mut self, version: u32, last_comp_version: u32) -> &mut Self {
        self.version = version;
        self.last_comp_version = last_comp_version;
        self
    }

    /// Sets `boot_cpuid_phys`.
    pub fn boot_cpu(&mut self, id: u32) -> &mut Self {
        self.boot_cpuid_phys = id;
        self
    }

    /// Overrides the declared total size.
    pub fn total_size(&mut self, size: u32) -> &mut Self {
        self.total_size = Some(size);
        self
    }

    /// Leaves out the closing `FDT_END` token.
    pub fn without_end(&mut self) -> &mut Self {
        self.with_end = false;
        self
    }

    /// Lays out the blob.
    pub fn build(&self) -> Vec<u8> {
        let mut structure = self.structure.clone();
        if self.with_end {
            structure.extend_from_slice(&FDT_END.to_be_bytes());
        }

        let off_mem_rsvmap = HEADER_SIZE;
        let off_dt_struct = off_mem_rsvmap + (self.reservations.len() + 1) * 16;
        let off_dt_strings = off_dt_struct + structure.len();
        let totalsize = off_dt_strings + self.strings.len();

        let fields = [
            self.magic,
            self.total_size.unwrap_or(totalsize as u32),
            off_dt_struct as u32,
            off_dt_strings as u32,
            off_mem_rsvmap as u32,
            self.version,
            self.last_comp_version,
            self.boot_cpuid_phys,
            self.strings.len() as u32,
            structure.len() as u32,
        ];

        let mut data = Vec::with_capacity(totalsize);
        for field in fields {
            data.extend_from_slice(&field.to_be_bytes());
        }
        for (address, size) in self.reservations.iter().chain([(0, 0)].iter()) {
            data.extend_from_slice(&address.to_be_bytes());
            data.extend_from_slice(&size.to_be_bytes());
        }
        data.extend_from_slice(&structure);
        data.extend_from_slice(&self.strings);
        data
    }
}

/// Structure offsets of the nodes in [`fdt_virt`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VirtOffsets {
    pub root: usize,
    pub chosen: usize,
    pub aliases: usize,
    pub memory: usize,
    pub cpus: usize,
    pub cpu0: usize,
    pub soc: usize,
    pub test: usize,
    pub uart: usize,
}

/// A QEMU `virt`-style RISC-V tree and the offsets of its nodes.
///
/// ```text
/// /memreserve/ 0x80000000 0x200000;
/// / {
///     #address-cells = <2>; #size-cells = <2>;
///     compatible = "riscv-virtio"; model = "riscv-virtio,qemu";
///     chosen { bootargs = "console=ttyS0"; stdout-path = "/soc/uart@10000000"; };
///     aliases { serial0 = "/soc/uart@10000000"; test = "/soc/test@100000"; };
///     memory@80000000 { device_type = "memory"; reg = <0 0x80000000 0 0x8000000>; };
///     cpus {
///         #address-cells = <1>; #size-cells = <0>; timebase-frequency = <10000000>;
///         cpu@0 { phandle = <1>; device_type = "cpu"; reg = <0>; status = "okay";
///                 compatible = "riscv"; riscv,isa = "rv64imafdc"; };
///     };
///     soc {
///         #address-cells = <2>; #size-cells = <2>; compatible = "simple-bus"; ranges;
///         test@100000 { phandle = <4>; reg = <0 0x100000 0 0x1000>;
///                       compatible = "sifive,test1", "sifive,test0", "syscon"; };
///         uart@10000000 { interrupts = <0xa>; interrupt-parent = <3>;
///                         clock-frequency = <0x384000>; reg = <0 0x10000000 0 0x100>;
///                         compatible = "ns16550a"; };
///     };
/// };
/// ```
pub fn fdt_virt_with_offsets() -> (Vec<u8>, VirtOffsets) {
    let mut b = DtbBuilder::new();
    b.reserve(0x8000_0000, 0x20_0000);

    let root = b.offset();
    b.begin_node("")
        .prop_u32("#address-cells", 2)
        .prop_u32("#size-cells", 2)
        .prop_str("compatible", "riscv-virtio")
        .prop_str("model", "riscv-virtio,qemu");

    let chosen = b.offset();
    b.begin_node("chosen")
        .prop_str("bootargs", "console=ttyS0")
        .prop_str("stdout-path", "/soc/uart@10000000")
        .end_node();

    let aliases = b.offset();
    b.begin_node("aliases")
        .prop_str("serial0", "/soc/uart@10000000")
        .prop_str("test", "/soc/test@100000")
        .end_node();

    let memory = b.offset();
    b.begin_node("memory@80000000")
        .prop_str("device_type", "memory")
        .prop_cells("reg", &[0x0, 0x8000_0000, 0x0, 0x800_0000])
        .end_node();

    let cpus = b.offset();
    b.begin_node("cpus")
        .prop_u32("#address-cells", 1)
        .prop_u32("#size-cells", 0)
        .prop_u32("timebase-frequency", 10_000_000);
    let cpu0 = b.offset();
    b.begin_node("cpu@0")
        .prop_u32("phandle", 1)
        .prop_str("device_type", "cpu")
        .prop_u32("reg", 0)
        .prop_str("status", "okay")
        .prop_str("compatible", "riscv")
        .prop_str("riscv,isa", "rv64imafdc")
        .end_node()
        .end_node();

    let soc = b.offset();
    b.begin_node("soc")
        .prop_u32("#address-cells", 2)
        .prop_u32("#size-cells", 2)
        .prop_str("compatible", "simple-bus")
        .prop_empty("ranges");
    let test = b.offset();
    b.begin_node("test@100000")
        .prop_u32("phandle", 4)
        .prop_cells("reg", &[0x0, 0x10_0000, 0x0, 0x1000])
        .prop_strs("compatible", &["sifive,test1", "sifive,test0", "syscon"])
        .end_node();
    let uart = b.offset();
    b.begin_node("uart@10000000")
        .prop_u32("interrupts", 0xa)
        .prop_u32("interrupt-parent", 3)
        .prop_u32("clock-frequency", 0x38_4000)
        .prop_cells("reg", &[0x0, 0x1000_0000, 0x0, 0x100])
        .prop_str("compatible", "ns16550a")
        .end_node()
        .end_node();

    b.end_node();

    let offsets = VirtOffsets {
        root,
        chosen,
        aliases,
        memory,
        cpus,
        cpu0,
        soc,
        test,
        uart,
    };
    (b.build(), offsets)
}

/// The tree of [`fdt_virt_with_offsets`] on its own.
pub fn fdt_virt() -> Vec<u8> {
    fdt_virt_with_offsets().0
}
