#![allow(missing_docs)]

use cardmark_core::order::{apply_order, assign_order};
use cardmark_core::{Config, File, extract_tasks};
use std::path::Path;

const LITERALS: &[&str] = &[
    "#TODO Plain title",
    "#TODO: Colon without order",
    "#TODO:0 Zero order",
    "#TODO:10 Integer order",
    "#DOING:1.25 Fractional order",
    "#DOING:-30 Negative order",
    "#DONE:1e-3 Exponent order",
    "- #TODO:20 List item task +tag @ctx",
    "## #TODO Heading task",
    "[Link title](#TODO)",
    "[Link title](#DOING:7)",
    "* [Link in list](#DONE:) tail text",
];

#[test]
fn every_literal_renders_back_unchanged() {
    let config = Config::default();
    for literal in LITERALS {
        let tasks = extract_tasks(Path::new("board.md"), literal, &config);
        assert_eq!(tasks.len(), 1, "literal must hold one task: {literal}");
        assert_eq!(tasks[0].render_title(), *literal);
    }
}

#[test]
fn whole_files_render_back_unchanged() {
    let config = Config::default();
    let fixtures = [
        (
            "board.md",
            "# Board\n\n#TODO:10 first\nbody\n<!-- due:2024-01-01 -->\n\n\n- [link](#DOING) item\n  nested\n",
        ),
        (
            "src/lib.rs",
            "//! crate docs\n\n/// #TODO:5 document this\n/// with detail\npub fn f() {}\n\n/* DOING: block task\n * more */\n",
        ),
        (
            "script.py",
            "import os\n# #DONE finished thing\n#   with notes\nprint('# not a task')\n",
        ),
        ("board.md", "crlf\r\n#TODO:1 windows\r\nbody\r\n"),
    ];
    for (path, content) in fixtures {
        let mut file = File::new(path, content);
        let tasks = file.extract_tasks(&config).to_vec();
        assert!(!tasks.is_empty(), "fixture must hold tasks: {path}");
        for task in &tasks {
            assert!(file.replace_task_lines(task, &task.render_lines()));
        }
        assert_eq!(file.content, content, "round trip changed {path}");
    }
}

#[test]
fn order_assignment_for_new_tasks() {
    let config = Config::default();
    assert_eq!(assign_order(&[], None, &config, false), Some(0.0));

    let top = extract_tasks(Path::new("a.md"), "#TODO:20 a\n#TODO:25 b\n", &config);
    assert_eq!(assign_order(&top, None, &config, true), Some(10.0));

    let bottom = extract_tasks(Path::new("a.md"), "#TODO:5 a\n#TODO:30 b\n", &config);
    assert_eq!(assign_order(&bottom, None, &config, false), Some(40.0));
}

#[test]
fn rewritten_order_survives_a_rescan() {
    let config = Config::default();
    let mut file = File::new("a.md", "#TODO first\nbody\n");
    let mut task = file.extract_tasks(&config)[0].clone();
    let original = task.clone();
    apply_order(&mut task, Some(30.0), &config);
    assert!(file.replace_task_lines(&original, &task.render_lines()));
    assert_eq!(file.content, "#TODO:30 first\nbody\n");
    let rescanned = file.extract_tasks(&config);
    assert_eq!(rescanned[0].order, Some(30.0));
}
