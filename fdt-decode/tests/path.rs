#![cfg(not(target_os = "none"))]

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

fn virt() -> (DeviceTree, VirtOffsets) {
    init_logging();
    let (raw, offsets) = fdt_virt_with_offsets();
    (DeviceTree::from_bytes(raw).unwrap(), offsets)
}

#[test]
fn test_root() {
    let (fdt, _) = virt();
    assert_eq!(fdt.path_offset("/").unwrap(), StructureOffset::ROOT);
    assert_eq!(fdt.path_offset("//").unwrap(), StructureOffset::ROOT);
    assert_eq!(fdt.node_name(StructureOffset::ROOT).unwrap(), "");
}

#[test]
fn test_absolute_paths() {
    let (fdt, offsets) = virt();

    let cases = [
        ("/chosen", offsets.chosen),
        ("/memory@80000000", offsets.memory),
        ("/cpus/cpu@0", offsets.cpu0),
        ("/soc", offsets.soc),
        ("/soc/test@100000", offsets.test),
        ("/soc/uart@10000000", offsets.uart),
        ("/soc/uart@10000000/", offsets.uart),
    ];
    for (path, want) in cases {
        assert_eq!(fdt.path_offset(path).unwrap().as_usize(), want, "{}", path);
    }
}

#[test]
fn test_resolve_is_idempotent() {
    let (fdt, _) = virt();
    let first = fdt.path_offset("/soc/uart@10000000").unwrap();
    let second = fdt.path_offset("/soc/uart@10000000").unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_not_found() {
    let (fdt, _) = virt();

    let err = fdt.path_offset("/nonexistent/node").unwrap_err();
    assert_eq!(err, FdtError::PathNotFound("/nonexistent/node".into()));
    assert_eq!(err.kind(), ErrorKind::PathNotFound);

    // the unit address is part of the name
    assert_eq!(
        fdt.path_offset("/soc/uart").unwrap_err().kind(),
        ErrorKind::PathNotFound
    );
    // grandchildren are not children
    assert_eq!(
        fdt.path_offset("/cpu@0").unwrap_err().kind(),
        ErrorKind::PathNotFound
    );
}

#[test]
fn test_invalid_paths() {
    let (fdt, _) = virt();

    assert_eq!(
        fdt.path_offset("").unwrap_err(),
        FdtError::InvalidPath(String::new())
    );
    assert_eq!(
        fdt.path_offset("/soc\0").unwrap_err().kind(),
        ErrorKind::InvalidPath
    );
    assert_eq!(
        fdt.path_offset("serial9").unwrap_err(),
        FdtError::InvalidPath("serial9".into())
    );
}

#[test]
fn test_alias() {
    let (fdt, offsets) = virt();

    assert_eq!(fdt.alias("serial0"), Some("/soc/uart@10000000"));
    assert_eq!(fdt.alias("test"), Some("/soc/test@100000"));
    assert_eq!(fdt.alias("serial1"), None);

    let by_alias = fdt.path_offset("serial0").unwrap();
    assert_eq!(by_alias, fdt.path_offset("/soc/uart@10000000").unwrap());
    assert_eq!(by_alias.as_usize(), offsets.uart);
    assert_eq!(
        fdt.properties_of("serial0").unwrap(),
        fdt.properties_of("/soc/uart@10000000").unwrap()
    );
}

#[test]
fn test_alias_prefix() {
    init_logging();
    let raw = DtbBuilder::new()
        .begin_node("")
        .begin_node("aliases")
        .prop_str("bus", "/soc")
        .prop_str("relative", "soc")
        .end_node()
        .begin_node("soc")
        .begin_node("uart@0")
        .end_node()
        .end_node()
        .end_node()
        .build();
    let fdt = DeviceTree::from_bytes(raw).unwrap();

    assert_eq!(
        fdt.path_offset("bus/uart@0").unwrap(),
        fdt.path_offset("/soc/uart@0").unwrap()
    );
    assert_eq!(
        fdt.path_offset("bus/missing").unwrap_err(),
        FdtError::PathNotFound("bus/missing".into())
    );
    assert_eq!(
        fdt.path_offset("relative").unwrap_err().kind(),
        ErrorKind::InvalidPath
    );
}

#[test]
fn test_tree_without_aliases() {
    init_logging();
    let raw = DtbBuilder::new()
        .begin_node("")
        .begin_node("chosen")
        .end_node()
        .end_node()
        .build();
    let fdt = DeviceTree::from_bytes(raw).unwrap();

    assert_eq!(fdt.alias("serial0"), None);
    assert_eq!(
        fdt.path_offset("serial0").unwrap_err().kind(),
        ErrorKind::InvalidPath
    );
}

#[test]
fn test_node_path() {
    let (fdt, offsets) = virt();

    assert_eq!(fdt.node_path(StructureOffset::ROOT).unwrap(), "/");
    assert_eq!(
        fdt.node_path(StructureOffset::new(offsets.uart)).unwrap(),
        "/soc/uart@10000000"
    );
    assert_eq!(
        fdt.node_path(StructureOffset::new(offsets.cpu0)).unwrap(),
        "/cpus/cpu@0"
    );

    // every node's path resolves back to it
    for node in fdt.all_nodes().unwrap() {
        let node = node.unwrap();
        let path = fdt.node_path(node.offset()).unwrap();
        assert_eq!(fdt.path_offset(&path).unwrap(), node.offset());
    }
}

#[test]
fn test_node_path_deep_tree() {
    init_logging();
    const DEPTH: usize = 41;
    let mut b = DtbBuilder::new();
    b.begin_node("");
    for i in 0..DEPTH {
        b.begin_node(&format!("n{}", i));
    }
    for _ in 0..=DEPTH {
        b.end_node();
    }
    let fdt = DeviceTree::from_bytes(b.build()).unwrap();

    let mut path = String::new();
    for i in 0..DEPTH {
        path.push_str(&format!("/n{}", i));
    }
    let deepest = fdt.path_offset(&path).unwrap();

    assert_eq!(fdt.node_path(deepest).unwrap(), path);
}
