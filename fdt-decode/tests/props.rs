#![cfg(not(target_os = "none"))]

#[macro_use]
extern crate log;

use std::sync::Once;

use dtb_file::*;
use fdt_decode::*;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = env_logger::builder()
            .is_test(true)
            .filter_level(log::LevelFilter::Trace)
            .try_init();
    });
}

fn cells(list: &[&str]) -> PropertyValue {
    PropertyValue::NumberList(list.iter().map(|s| s.to_string()).collect())
}

fn text(s: &str) -> PropertyValue {
    PropertyValue::Text(s.into())
}

#[test]
fn test_uart() {
    init_logging();
    let fdt = DeviceTree::from_bytes(fdt_virt()).unwrap();
    let props = fdt.properties_of("/soc/uart@10000000").unwrap();

    for (name, value) in props.iter() {
        info!("{} = {:?}", name, value);
    }

    assert_eq!(
        props.keys().collect::<Vec<_>>(),
        [
            "interrupts",
            "interrupt-parent",
            "clock-frequency",
            "reg",
            "compatible"
        ]
    );
    assert_eq!(props["interrupts"], cells(&["0xa"]));
    assert_eq!(props["interrupt-parent"], cells(&["0x3"]));
    assert_eq!(props["clock-frequency"], cells(&["0x384000"]));
    assert_eq!(props["reg"], cells(&["0x0", "0x10000000", "0x0", "0x100"]));
    assert_eq!(props["compatible"], text("ns16550a"));
}

#[test]
fn test_string_list_compatible() {
    init_logging();
    let fdt = DeviceTree::from_bytes(fdt_virt()).unwrap();
    let props = fdt.properties_of("/soc/test@100000").unwrap();

    assert_eq!(props["phandle"], cells(&["0x4"]));
    assert_eq!(props["reg"], cells(&["0x0", "0x100000", "0x0", "0x1000"]));
    assert_eq!(
        props["compatible"],
        text("sifive,test1\0sifive,test0\0syscon")
    );
    assert_eq!(
        props["compatible"].to_string(),
        r#""sifive,test1", "sifive,test0", "syscon""#
    );
}

#[test]
fn test_flags_and_text() {
    init_logging();
    let fdt = DeviceTree::from_bytes(fdt_virt()).unwrap();

    let soc = fdt.properties_of("/soc").unwrap();
    assert_eq!(soc["ranges"], PropertyValue::Flag(true));
    assert!(soc["ranges"].is_flag());
    assert_eq!(soc["compatible"].as_text(), Some("simple-bus"));

    let chosen = fdt.properties_of("/chosen").unwrap();
    assert_eq!(chosen["bootargs"], text("console=ttyS0"));
    assert_eq!(chosen["stdout-path"], text("/soc/uart@10000000"));

    let cpu = fdt.properties_of("/cpus/cpu@0").unwrap();
    assert_eq!(cpu["status"], text("okay"));
    assert_eq!(cpu["riscv,isa"], text("rv64imafdc"));
    // four bytes of text read as one cell
    assert_eq!(cpu["device_type"], cells(&["0x63707500"]));

    let root = fdt.properties_of("/").unwrap();
    assert_eq!(root["#address-cells"].as_cells(), Some(&["0x2".to_string()][..]));
    assert_eq!(root["model"], text("riscv-virtio,qemu"));
}

#[test]
fn test_by_offset_and_path_agree() {
    init_logging();
    let (raw, offsets) = fdt_virt_with_offsets();
    let fdt = DeviceTree::from_bytes(raw).unwrap();

    let by_offset = fdt
        .properties_of(StructureOffset::new(offsets.memory))
        .unwrap();
    let by_path = fdt.properties_of("/memory@80000000").unwrap();
    assert_eq!(by_offset, by_path);
    assert_eq!(by_path["device_type"], text("memory"));
}

#[test]
fn test_node_without_properties() {
    init_logging();
    let raw = DtbBuilder::new()
        .begin_node("")
        .begin_node("empty")
        .begin_node("child")
        .prop_u32("reg", 1)
        .end_node()
        .end_node()
        .end_node()
        .build();
    let fdt = DeviceTree::from_bytes(raw).unwrap();

    // properties of a child are not properties of its parent
    let props = fdt.properties_of("/empty").unwrap();
    assert!(props.is_empty());
}

#[test]
fn test_duplicate_last_wins() {
    init_logging();
    let raw = DtbBuilder::new()
        .begin_node("")
        .prop_u32("reg", 1)
        .prop_str("status", "disabled")
        .nop()
        .prop_u32("reg", 2)
        .end_node()
        .build();
    let fdt = DeviceTree::from_bytes(raw).unwrap();

    let props = fdt.properties_of(StructureOffset::ROOT).unwrap();
    assert_eq!(props.len(), 2);
    assert_eq!(props.keys().collect::<Vec<_>>(), ["reg", "status"]);
    assert_eq!(props["reg"], cells(&["0x2"]));

    let raw_reg = fdt.raw_property(StructureOffset::ROOT, "reg").unwrap();
    assert_eq!(raw_reg, Some(&[0, 0, 0, 2][..]));
    assert_eq!(fdt.raw_property(StructureOffset::ROOT, "missing").unwrap(), None);
}

#[test]
fn test_value_fallbacks() {
    init_logging();
    let raw = DtbBuilder::new()
        .begin_node("")
        .prop("compatible", &[])
        .prop("label", b"uart0\0")
        .prop("blob", &[0xde, 0xad, 0xbe])
        .prop("latin", &[0xff, 0xfe, 0x00])
        .end_node()
        .build();
    let fdt = DeviceTree::from_bytes(raw).unwrap();
    let props = fdt.properties_of("/").unwrap();

    assert_eq!(props["compatible"], PropertyValue::Absent);
    assert_eq!(props["label"], text("uart0"));
    assert_eq!(props["blob"], PropertyValue::Bytes(vec![0xde, 0xad, 0xbe]));
    assert_eq!(props["blob"].to_string(), "[de ad be]");
    assert_eq!(props["latin"], PropertyValue::Bytes(vec![0xff, 0xfe, 0x00]));
}

#[test]
fn test_walker_properties() {
    init_logging();
    let (raw, offsets) = fdt_virt_with_offsets();
    let fdt = DeviceTree::from_bytes(raw).unwrap();
    let strings = fdt.strings();

    let records: Vec<_> = fdt
        .walker()
        .properties_at(StructureOffset::new(offsets.soc))
        .unwrap()
        .map(|r| r.unwrap())
        .collect();
    let names: Vec<_> = records
        .iter()
        .map(|r| strings.name_at(r.name_offset()).unwrap())
        .collect();

    assert_eq!(
        names,
        ["#address-cells", "#size-cells", "compatible", "ranges"]
    );
    assert_eq!(records[2].value(), b"simple-bus\0");
    assert!(records[3].is_empty());
}

#[test]
fn test_children() {
    init_logging();
    let (raw, offsets) = fdt_virt_with_offsets();
    let fdt = DeviceTree::from_bytes(raw).unwrap();

    let children: Vec<_> = fdt
        .walker()
        .children(StructureOffset::ROOT)
        .unwrap()
        .map(|n| n.unwrap().name())
        .collect();
    assert_eq!(children, ["chosen", "aliases", "memory@80000000", "cpus", "soc"]);

    let below_soc: Vec<_> = fdt
        .walker()
        .descendants(StructureOffset::new(offsets.soc))
        .unwrap()
        .map(|n| n.unwrap().offset().as_usize())
        .collect();
    assert_eq!(below_soc, [offsets.test, offsets.uart]);
}
