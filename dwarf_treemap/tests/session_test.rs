use dwarf_treemap::analysis::{AttrValue, DebugImage, DebugImageBuilder};
use dwarf_treemap::config::{TreemapConfig, parse_address};
use dwarf_treemap::error::TreemapError;
use dwarf_treemap::model::AddressRange;
use dwarf_treemap::session::{LoadStatus, Session};
use gimli::RunTimeEndian;

const LE: RunTimeEndian = RunTimeEndian::Little;

fn sample_image() -> DebugImage {
    let mut b = DebugImageBuilder::new(8, LE);
    let unit = b.add_unit("main.c");
    let int = b.base_type(unit, "int", 4);
    let pair = b.composite(unit, gimli::DW_TAG_structure_type, Some("pair"), None);
    b.member(pair, "left", int, Some(0));
    b.member(pair, "right", int, Some(4));
    b.variable(
        unit,
        "counter",
        Some(int),
        Some(AttrValue::address_expression(0x1000, 8, LE)),
    );
    b.variable(
        unit,
        "range",
        Some(pair),
        Some(AttrValue::address_expression(0x2000, 8, LE)),
    );
    b.build()
}

fn labels(session: &mut Session) -> Vec<String> {
    let mut labels = session
        .treemap()
        .iter()
        .map(|rect| rect.label.clone())
        .collect::<Vec<_>>();
    labels.sort_unstable();
    labels
}

#[test]
fn loading_an_image_collects_variables_and_builds_the_treemap_lazily() {
    let mut session = Session::new(TreemapConfig::default()).expect("default config is valid");
    let status = session.load_image(sample_image());

    assert_eq!(
        status,
        LoadStatus::Loaded {
            units: 1,
            variables: 2
        }
    );
    assert!(session.is_stale());
    assert_eq!(
        labels(&mut session),
        vec!["int counter", "int range.left", "int range.right"]
    );
    assert!(!session.is_stale());
}

#[test]
fn changing_depth_marks_the_treemap_stale_and_rebuilds_it() {
    let mut session = Session::new(TreemapConfig::default()).expect("default config is valid");
    session.load_image(sample_image());
    let _ = session.treemap();

    session.set_max_depth(1).expect("depth 1 is valid");
    assert!(session.is_stale());
    assert_eq!(labels(&mut session), vec!["int counter", "pair range"]);

    session.set_max_depth(1).expect("depth 1 is valid");
    assert!(!session.is_stale());
}

#[test]
fn out_of_range_depth_is_rejected_and_leaves_the_session_untouched() {
    let mut session = Session::new(TreemapConfig::default()).expect("default config is valid");
    session.load_image(sample_image());
    let _ = session.treemap();

    for depth in [0, 11] {
        let error = session.set_max_depth(depth).expect_err("depth must be rejected");
        assert!(matches!(error, TreemapError::InvalidConfig { .. }));
    }
    assert_eq!(session.config().max_depth, 10);
    assert!(!session.is_stale());
}

#[test]
fn address_range_change_recollects_variables() {
    let mut session = Session::new(TreemapConfig::default()).expect("default config is valid");
    session.load_image(sample_image());
    assert_eq!(session.variables().count(), 2);

    let config = TreemapConfig {
        address_range: Some(AddressRange {
            low: 0x2000,
            high: 0x2fff,
        }),
        ..session.config().clone()
    };
    session.set_config(config).expect("range is valid");
    let names = session
        .variables()
        .map(|variable| variable.name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["range"]);
}

#[test]
fn image_without_units_reports_no_debug_info() {
    let mut session = Session::new(TreemapConfig::default()).expect("default config is valid");
    let status = session.load_image(DebugImageBuilder::new(8, LE).build());

    assert_eq!(status, LoadStatus::NoDebugInfo);
    assert!(session.treemap().is_empty());
    assert!(session.overview().is_empty());
}

#[test]
fn garbage_bytes_are_an_object_error() {
    let mut session = Session::new(TreemapConfig::default()).expect("default config is valid");
    session.load_image(sample_image());

    let error = session
        .load_bytes(b"definitely not an object file")
        .expect_err("garbage must not parse");
    assert!(matches!(error, TreemapError::Object(_)));
    assert_eq!(session.variables().count(), 0);
}

#[test]
fn missing_file_reports_its_path() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("missing.elf");
    let mut session = Session::new(TreemapConfig::default()).expect("default config is valid");

    match session.load_path(&path) {
        Err(TreemapError::Io { path: reported, .. }) => assert_eq!(reported, path),
        other => panic!("expected io error, got {other:?}"),
    }
}

#[test]
fn config_file_overrides_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("treemap.toml");
    std::fs::write(
        &path,
        "width = 640.0\nmax-depth = 3\n\n[address-range]\nlow = 4096\nhigh = 8192\n",
    )
    .expect("write config");

    let config = TreemapConfig::load(&path).expect("config parses");
    assert_eq!(config.width, 640.0);
    assert_eq!(config.height, 800.0);
    assert_eq!(config.max_depth, 3);
    assert_eq!(config.depth_budget(), 2);
    assert_eq!(
        config.address_range,
        Some(AddressRange {
            low: 0x1000,
            high: 0x2000
        })
    );
}

#[test]
fn bad_config_files_are_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");

    let unknown = dir.path().join("unknown.toml");
    std::fs::write(&unknown, "colour = \"red\"\n").expect("write config");
    assert!(matches!(
        TreemapConfig::load(&unknown),
        Err(TreemapError::ConfigParse { .. })
    ));

    let inverted = dir.path().join("inverted.toml");
    std::fs::write(&inverted, "[address-range]\nlow = 10\nhigh = 5\n").expect("write config");
    assert!(matches!(
        TreemapConfig::load(&inverted),
        Err(TreemapError::InvalidConfig { .. })
    ));

    let negative = TreemapConfig {
        border: -1.0,
        ..TreemapConfig::default()
    };
    assert!(Session::new(negative).is_err());
}

#[test]
fn addresses_parse_as_hex_or_decimal() {
    assert_eq!(parse_address("0x1000"), Ok(0x1000));
    assert_eq!(parse_address("0XfF"), Ok(0xff));
    assert_eq!(parse_address(" 4096 "), Ok(4096));
    assert!(parse_address("0xzz").is_err());
    assert!(parse_address("-1").is_err());
}
