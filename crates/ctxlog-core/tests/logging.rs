use std::process::Command;

use ctxlog_core::field::{COMPONENT, FATAL, METHOD, REQUEST_ID};
use ctxlog_core::{Backend, Context, Field, Logger, LoggerConfig, Output, Preset};
use ctxlog_test_support::CaptureWriter;

fn capture_root(preset: Preset) -> (Context, CaptureWriter) {
    let capture = CaptureWriter::new();
    let logger = Logger::with_backend(Backend::new(preset).with_writer(capture.clone()));
    (Context::background().install(logger), capture)
}

#[test]
fn enrichment_never_changes_the_original_handle_output() {
    let (ctx, capture) = capture_root(Preset::Production);
    let root = ctx.current().clone();

    root.info(&ctx, "before", []);
    let _child = root
        .with([Field::str(COMPONENT, "worker")])
        .with([Field::str(METHOD, "GET")]);
    root.info(&ctx, "after", []);

    let entries = capture.entries();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].fields, entries[1].fields);
    assert!(entries[1].fields.is_empty());
}

#[test]
fn request_id_is_attached_to_every_entry_in_the_request() {
    let (root, capture) = capture_root(Preset::Production);
    let ctx = root.with_request_id("abc123");
    let nested = ctx.enrich([Field::str(COMPONENT, "handler")]);

    ctx.current().info(&ctx, "first", []);
    nested.current().error(&nested, "second", [Field::int("attempt", 2)]);
    nested.current().warn(&nested, "third", []);

    let entries = capture.entries();
    assert_eq!(entries.len(), 3);
    for entry in &entries {
        assert_eq!(entry.str_field(REQUEST_ID), Some("abc123"));
    }
    assert_eq!(entries[1].level, "error");
    assert_eq!(entries[1].str_field(COMPONENT), Some("handler"));
}

#[test]
fn missing_request_id_omits_the_field() {
    let (ctx, capture) = capture_root(Preset::Production);
    ctx.current().info(&ctx, "no id", [Field::str(METHOD, "GET")]);

    let entries = capture.entries();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].field(REQUEST_ID).is_none());
}

#[test]
fn context_request_id_wins_over_attached_field() {
    let (root, capture) = capture_root(Preset::Production);
    let ctx = root
        .enrich([Field::str(REQUEST_ID, "from-handle")])
        .with_request_id("from-context");
    ctx.current().info(&ctx, "collision", []);

    let entries = capture.entries();
    assert_eq!(entries[0].str_field(REQUEST_ID), Some("from-context"));
}

#[test]
fn development_preset_emits_debug_console_lines() {
    let (ctx, capture) = capture_root(Preset::Development);
    ctx.current().debug(&ctx, "probe", [Field::bool("ready", true)]);

    let lines = capture.lines();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains(" DEBUG probe ready=true"));
    let entries = capture.entries();
    assert_eq!(entries[0].field("ready"), Some(&serde_json::Value::Bool(true)));
}

#[test]
fn file_output_appends_json_lines() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("app.log");
    let config = LoggerConfig {
        env: "prod".into(),
        level: None,
        output: Output::File(path.clone()),
    };
    let ctx = Context::background().install(Logger::from_config(&config)?);
    ctx.current().info(&ctx, "to file", []);
    ctx.current().debug(&ctx, "filtered", []);

    let written = std::fs::read_to_string(&path)?;
    let lines: Vec<&str> = written.lines().collect();
    assert_eq!(lines.len(), 1);
    let entry: serde_json::Value = serde_json::from_str(lines[0])?;
    assert_eq!(entry["message"], "to file");
    assert_eq!(entry["level"], "INFO");
    Ok(())
}

#[test]
fn user_fields_named_like_header_keys_are_kept() {
    let (ctx, capture) = capture_root(Preset::Production);
    ctx.current().info(
        &ctx,
        "real",
        [Field::str("message", "user"), Field::str("level", "x")],
    );

    let entries = capture.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].message, "real");
    assert_eq!(entries[0].level, "info");
    assert_eq!(entries[0].str_field("fields.message"), Some("user"));
    assert_eq!(entries[0].str_field("fields.level"), Some("x"));
}

const FATAL_LOG_ENV: &str = "CTXLOG_FATAL_TEST_LOG";

#[test]
fn fatal_writes_the_entry_then_exits_with_status_one() -> anyhow::Result<()> {
    if let Ok(path) = std::env::var(FATAL_LOG_ENV) {
        let config = LoggerConfig {
            env: "prod".into(),
            level: None,
            output: Output::File(path.into()),
        };
        let ctx = Context::background().install(Logger::from_config(&config)?);
        ctx.current()
            .fatal(&ctx, "cannot bind listener", [Field::str(COMPONENT, "startup")]);
    }

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("fatal.log");
    let status = Command::new(std::env::current_exe()?)
        .args(["--exact", "fatal_writes_the_entry_then_exits_with_status_one"])
        .env(FATAL_LOG_ENV, &path)
        .status()?;
    assert_eq!(status.code(), Some(1));

    let written = std::fs::read_to_string(&path)?;
    let lines: Vec<&str> = written.lines().collect();
    assert_eq!(lines.len(), 1);
    let entry: serde_json::Value = serde_json::from_str(lines[0])?;
    assert_eq!(entry["message"], "cannot bind listener");
    assert_eq!(entry["level"], "ERROR");
    assert_eq!(entry[FATAL], true);
    assert_eq!(entry[COMPONENT], "startup");
    Ok(())
}
