use chrono::NaiveDate;
use settree::{
    Color, NodeKind, SettingValue, SyncOptions, SyncStats, synchronize,
    store::{Group, MemoryStore, SettingsStore},
    tree::Node,
};

fn labels(nodes: &[Node]) -> Vec<&str> {
    nodes.iter().map(|n| n.label.as_str()).collect()
}

fn sync(store: &mut MemoryStore, roots: &mut Vec<Node>) -> SyncStats {
    synchronize(store, roots, &SyncOptions::default())
}

fn two_groups_two_keys() -> MemoryStore {
    let mut root = Group::new();
    root.insert_group("A", Group::new());
    root.insert_group("B", Group::new());
    root.insert("x", SettingValue::Int(1));
    root.insert("y", SettingValue::String("hello".into()));
    MemoryStore::from_document("scenario", root)
}

#[test]
fn groups_then_keys_with_values() {
    let mut store = two_groups_two_keys();
    let mut roots = Vec::new();
    sync(&mut store, &mut roots);

    assert_eq!(labels(&roots), ["A", "B", "x", "y"]);
    let kinds: Vec<_> = roots.iter().map(|n| n.kind).collect();
    assert_eq!(
        kinds,
        [NodeKind::Group, NodeKind::Group, NodeKind::Key, NodeKind::Key]
    );
    assert_eq!(roots[2].value_text, "1");
    assert_eq!(roots[2].type_text, "int");
    assert_eq!(roots[3].value_text, "hello");
    assert!(roots[0].type_text.is_empty());

    let snapshot = roots.clone();
    let again = sync(&mut store, &mut roots);
    assert!(again.is_unchanged(), "{again:?}");
    assert_eq!(roots, snapshot);
}

#[test]
fn idempotent_on_nested_store() {
    let mut store = MemoryStore::default()
        .with("ui/theme", "dark")
        .with("ui/font/size", 11)
        .with("ui/font/family", "mono")
        .with("net/proxy/host", "gw")
        .with("version", 3);
    let mut roots = Vec::new();
    let first = sync(&mut store, &mut roots);
    assert_eq!(first.created, 9);

    for _ in 0..3 {
        assert!(sync(&mut store, &mut roots).is_unchanged());
    }
}

#[test]
fn order_follows_the_store_after_changes() {
    let mut store = MemoryStore::default()
        .with("g1/k", 1)
        .with("g2/k", 1)
        .with("k1", 1)
        .with("k2", 2);
    let mut roots = Vec::new();
    sync(&mut store, &mut roots);

    store.remove("g1").unwrap();
    store.set_value("g3/k", 1.into()).unwrap();
    store.set_value("g1/k", 1.into()).unwrap();
    store.remove("k1").unwrap();
    store.set_value("k1", 5.into()).unwrap();
    sync(&mut store, &mut roots);

    assert_eq!(labels(&roots), ["g2", "g3", "g1", "k2", "k1"]);
    assert_eq!(
        [store.child_groups(), store.child_keys()].concat(),
        labels(&roots)
    );
    assert_eq!(roots[4].value_text, "5");
}

#[test]
fn stale_nodes_are_removed_at_every_level() {
    let mut store = MemoryStore::default()
        .with("a/b/c", 1)
        .with("a/b/d", 2)
        .with("a/e", 3)
        .with("f", 4);
    let mut roots = Vec::new();
    sync(&mut store, &mut roots);

    store.remove("a/b/d").unwrap();
    store.remove("a/e").unwrap();
    store.remove("f").unwrap();
    let stats = sync(&mut store, &mut roots);

    assert_eq!(labels(&roots), ["a"]);
    assert_eq!(labels(&roots[0].children), ["b"]);
    assert_eq!(labels(&roots[0].children[0].children), ["c"]);
    assert_eq!(stats.removed, 3);
}

#[test]
fn key_replaced_by_group_of_the_same_name() {
    let mut store = MemoryStore::default().with("z", true);
    let mut roots = Vec::new();
    sync(&mut store, &mut roots);
    assert_eq!(roots[0].kind, NodeKind::Key);
    assert_eq!(roots[0].value_text, "true");

    store.remove("z").unwrap();
    store.set_value("z/child", 1.into()).unwrap();
    let stats = sync(&mut store, &mut roots);

    let z = &roots[0];
    assert_eq!(z.label, "z");
    assert_eq!(z.kind, NodeKind::Group);
    assert!(z.type_text.is_empty());
    assert!(z.value_text.is_empty());
    assert!(z.value.is_none());
    assert_eq!(labels(&z.children), ["child"]);
    assert_eq!(stats.created, 1);
}

#[test]
fn group_replaced_by_key_drops_its_children() {
    let mut store = MemoryStore::default().with("z/a", 1).with("z/b", 2);
    let mut roots = Vec::new();
    sync(&mut store, &mut roots);
    roots[0].expanded = true;

    store.remove("z").unwrap();
    store.set_value("z", "leaf".into()).unwrap();
    let stats = sync(&mut store, &mut roots);

    assert_eq!(roots[0].kind, NodeKind::Key);
    assert!(roots[0].children.is_empty());
    assert!(!roots[0].expanded);
    assert_eq!(stats.removed, 2);
}

#[test]
fn displayed_text_matches_formatting_for_every_type() {
    let values = [
        SettingValue::Bool(false),
        SettingValue::Int(-7),
        SettingValue::UInt(7),
        SettingValue::Double(2.5),
        SettingValue::String("plain".into()),
        SettingValue::StringList(vec!["a".into(), "b".into()]),
        SettingValue::Char('q'),
        SettingValue::ByteArray(vec![0, 1, 2]),
        SettingValue::Color(Color::rgba(10, 20, 30, 40)),
        SettingValue::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()),
        SettingValue::Point { x: -1, y: 1 },
        SettingValue::Size {
            width: 3,
            height: 4,
        },
        SettingValue::Invalid,
    ];
    let mut store = MemoryStore::default();
    for (i, v) in values.iter().enumerate() {
        store.set_value(&format!("k{i}"), v.clone()).unwrap();
    }
    let mut roots = Vec::new();
    sync(&mut store, &mut roots);

    for (node, value) in roots.iter().zip(&values) {
        assert_eq!(node.type_text, value.type_name());
        assert_eq!(node.value_text, value.display_text());
    }
    assert_eq!(roots[7].value_text, "<binary>");
    assert_eq!(roots.last().unwrap().type_text, "Invalid");
    assert_eq!(roots.last().unwrap().value_text, "<Invalid>");
}
