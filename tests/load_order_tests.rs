//! End-to-end scenarios for the load order state engine.
//!
//! These drive the public surface the way a plugin manager would: replace the
//! order, move plugins around, flip activation flags, and check that every
//! failure leaves the state untouched.

mod common;

use std::collections::HashSet;

use common::{game_fixture, populate_plugins_folder, write_plugin};
use loadorder::{Error, GameId, LoadOrder, MAX_ACTIVE, UPDATE_MASTER};

#[test]
fn test_rejecting_a_partition_breaking_order_leaves_the_state_empty() {
    let (_tmp, settings) = game_fixture(GameId::Tes5);
    populate_plugins_folder(&settings);
    let mut load_order = LoadOrder::new();

    let names = ["Skyrim.esm", "Blank.esp", "Blank - Different.esm"];
    assert!(matches!(
        load_order.set_load_order(&names, &settings),
        Err(Error::NonMasterBeforeMaster)
    ));
    assert!(load_order.plugin_names().is_empty());
}

#[test]
fn test_setting_a_valid_order_activates_the_master_and_answers_queries() {
    let (_tmp, settings) = game_fixture(GameId::Tes5);
    populate_plugins_folder(&settings);
    let mut load_order = LoadOrder::new();

    let names = ["Skyrim.esm", "Blank.esm", "Blank - Different.esm"];
    load_order.set_load_order(&names, &settings).unwrap();

    assert!(load_order.is_active("Skyrim.esm"));
    assert_eq!(load_order.position("BLANK.ESM"), 1);
    // The installed Update.esm is pulled in after the listed masters and
    // activated, even though the caller's sequence omitted it.
    assert_eq!(
        load_order.plugin_names(),
        vec!["Skyrim.esm", "Blank.esm", "Blank - Different.esm", UPDATE_MASTER]
    );
    assert!(load_order.is_active(UPDATE_MASTER));
}

#[test]
fn test_the_master_anchor_binds_textfile_games_but_not_timestamp_games() {
    let (_tmp, tes5) = game_fixture(GameId::Tes5);
    populate_plugins_folder(&tes5);
    let mut load_order = LoadOrder::new();
    load_order
        .set_load_order(
            &["Skyrim.esm", "Blank.esm", "Blank - Different.esm"],
            &tes5,
        )
        .unwrap();

    assert!(matches!(
        load_order.set_position("Skyrim.esm", 1, &tes5),
        Err(Error::MasterMustLoadFirst)
    ));
    assert_eq!(load_order.position("Skyrim.esm"), 0);

    let (_tmp, tes4) = game_fixture(GameId::Tes4);
    populate_plugins_folder(&tes4);
    let mut load_order = LoadOrder::new();
    load_order
        .set_load_order(
            &["Oblivion.esm", "Blank.esm", "Blank - Different.esm"],
            &tes4,
        )
        .unwrap();

    load_order.set_position("Oblivion.esm", 1, &tes4).unwrap();
    assert_eq!(load_order.position("Oblivion.esm"), 1);
}

#[test]
fn test_activating_an_invalid_plugin_fails_without_changes() {
    let (_tmp, settings) = game_fixture(GameId::Tes5);
    populate_plugins_folder(&settings);
    let mut load_order = LoadOrder::new();
    load_order
        .set_load_order(&["Skyrim.esm", "Blank.esm"], &settings)
        .unwrap();
    let before = load_order.plugin_names();

    assert!(matches!(
        load_order.activate("NotAPlugin.esm", &settings),
        Err(Error::InvalidPlugin(_))
    ));
    assert_eq!(load_order.plugin_names(), before);
    assert!(!load_order.is_active("NotAPlugin.esm"));
}

#[test]
fn test_loading_a_malformed_active_plugins_file_repairs_the_active_set() {
    let (_tmp, settings) = game_fixture(GameId::Tes5);
    populate_plugins_folder(&settings);
    write_plugin(&settings, "Blàñk.esm", true);

    // As malformed as the games will still fix: a blank line, a comment, a
    // case-insensitive duplicate, a non-plugin, and a Windows-1252 name.
    let mut contents = Vec::new();
    contents.extend_from_slice(b"\n");
    contents.extend_from_slice(b"#Blank - Different.esm\n");
    contents.extend_from_slice(b"Blank.esm\n");
    contents.extend_from_slice(b"Blank.esp\n");
    contents.extend_from_slice(b"Bl\xe0\xf1k.esm\n");
    contents.extend_from_slice(b"Blank.esm\n");
    contents.extend_from_slice(b"NotAPlugin.esm\n");
    std::fs::write(settings.active_plugins_file(), contents).unwrap();

    let mut load_order = LoadOrder::new();
    load_order.load(&settings).unwrap();

    let active: HashSet<String> = load_order.active_plugin_names().into_iter().collect();
    let expected: HashSet<String> = [
        "Skyrim.esm",
        UPDATE_MASTER,
        "Blank.esm",
        "Blank.esp",
        "Blàñk.esm",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    assert_eq!(active, expected);
}

#[test]
fn test_invariants_hold_after_a_load() {
    let (_tmp, settings) = game_fixture(GameId::Tes5);
    populate_plugins_folder(&settings);
    common::write_load_order_file(
        &settings,
        &["Blank.esp", "Blank.esm", "Skyrim.esm", "Update.esm"],
    );
    common::write_active_plugins_file(&settings, &["Blank.esp"]);

    let mut load_order = LoadOrder::new();
    load_order.load(&settings).unwrap();

    // Master anchored and active; update active; masters before non-masters;
    // no duplicates; cap respected.
    assert_eq!(load_order.plugin_at(0).unwrap(), "Skyrim.esm");
    assert!(load_order.is_active("Skyrim.esm"));
    assert!(load_order.is_active(UPDATE_MASTER));

    let plugins = load_order.plugins();
    let first_non_master = plugins.iter().position(|p| !p.is_master());
    if let Some(i) = first_non_master {
        assert!(plugins[i..].iter().all(|p| !p.is_master()));
    }

    let mut keys = HashSet::new();
    for plugin in plugins {
        assert!(keys.insert(plugin.name().to_lowercase()));
    }
    assert!(load_order.active_plugin_names().len() <= MAX_ACTIVE);
}

#[test]
fn test_loading_truncates_an_overlong_active_list_at_the_cap() {
    let (_tmp, settings) = game_fixture(GameId::Tes4);
    std::fs::create_dir_all(settings.plugins_folder()).unwrap();

    let names: Vec<String> = (0..300).map(|i| format!("{i:03}.esp")).collect();
    for name in &names {
        write_plugin(&settings, name, false);
    }
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    common::write_active_plugins_file(&settings, &refs);

    let mut load_order = LoadOrder::new();
    load_order.load(&settings).unwrap();

    let active = load_order.active_plugin_names();
    assert_eq!(active.len(), MAX_ACTIVE);
    let active: HashSet<String> = active.into_iter().collect();
    for name in &names[..MAX_ACTIVE] {
        assert!(active.contains(name), "{name} should have stayed active");
    }
}

#[test]
fn test_loading_twice_discards_the_first_read() {
    let (_tmp, settings) = game_fixture(GameId::Tes4);
    populate_plugins_folder(&settings);
    common::set_timestamps(
        &settings,
        &[
            "Oblivion.esm",
            "Blank.esm",
            "Blank - Different.esm",
            "Blank.esp",
            "Blank - Different.esp",
        ],
    );
    common::write_active_plugins_file(&settings, &["Blank.esm"]);

    let mut load_order = LoadOrder::new();
    load_order.load(&settings).unwrap();
    let first_names = load_order.plugin_names();
    let first_active = load_order.active_plugin_names();

    load_order.load(&settings).unwrap();
    assert_eq!(load_order.plugin_names(), first_names);
    assert_eq!(load_order.active_plugin_names(), first_active);

    // Changing the persisted files changes the next load wholesale.
    common::write_active_plugins_file(&settings, &["Blank.esp"]);
    load_order.load(&settings).unwrap();
    assert_eq!(load_order.active_plugin_names(), vec!["Blank.esp"]);
}

#[test]
fn test_deactivation_is_idempotent() {
    let (_tmp, settings) = game_fixture(GameId::Tes4);
    populate_plugins_folder(&settings);
    let mut load_order = LoadOrder::new();

    load_order.activate("Blank.esp", &settings).unwrap();
    load_order.deactivate("Blank.esp", &settings).unwrap();
    load_order.deactivate("Blank.esp", &settings).unwrap();
    assert!(!load_order.is_active("Blank.esp"));
    assert_eq!(load_order.position("Blank.esp"), 0);
}

#[test]
fn test_the_256th_distinct_activation_fails_cleanly() {
    let (_tmp, settings) = game_fixture(GameId::Fnv);
    std::fs::create_dir_all(settings.plugins_folder()).unwrap();

    let mut load_order = LoadOrder::new();
    for i in 0..MAX_ACTIVE {
        let name = format!("{i:03}.esp");
        write_plugin(&settings, &name, false);
        load_order.activate(&name, &settings).unwrap();
    }
    write_plugin(&settings, "one-too-many.esp", false);

    let before = load_order.plugin_names();
    assert!(matches!(
        load_order.activate("one-too-many.esp", &settings),
        Err(Error::TooManyActivePlugins)
    ));
    assert_eq!(load_order.plugin_names(), before);
    assert_eq!(load_order.active_plugin_names().len(), MAX_ACTIVE);
}
