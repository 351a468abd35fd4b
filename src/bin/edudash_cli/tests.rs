#![deny(clippy::all, clippy::pedantic)]

use clap::Parser;
use edudash::config::{self, ConfigOverrides};
use edudash::types::analytics::TimeRange;
use httpmock::prelude::*;
use serde_json::json;
use tempfile::NamedTempFile;

use crate::args::{Cli, Commands, CoursesCmd, RangeArgs, TimeRangeArg};
use crate::client::{CliError, Ctx};
use crate::handlers::{analytics, courses};
use crate::io::{read_body, read_json};

fn ctx(server: &MockServer) -> Ctx {
    let overrides = ConfigOverrides {
        base_url: Some(server.url("/api/")),
        ..ConfigOverrides::default()
    };
    let settings = config::load(&overrides).expect("settings");
    Ctx::new(&settings).expect("ctx")
}

fn tmp_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("tmp file");
    std::io::Write::write_all(&mut file, contents.as_bytes()).expect("write tmp");
    file
}

#[test]
fn global_config_flags_parse_after_subcommand() {
    let cli = Cli::try_parse_from([
        "edudash-cli",
        "courses",
        "get",
        "7",
        "--base-url",
        "https://admin.example/api",
        "--refetch-on-mount",
        "always",
    ])
    .expect("parse");

    assert_eq!(
        cli.config.base_url.as_deref(),
        Some("https://admin.example/api")
    );
    assert_eq!(cli.config.refetch_on_mount.as_deref(), Some("always"));
    assert!(matches!(
        cli.command,
        Commands::Courses(args) if matches!(args.action, CoursesCmd::Get { id: 7 })
    ));
}

#[test]
fn range_flags_require_each_other() {
    let err = Cli::try_parse_from(["edudash-cli", "analytics", "overview", "--from", "2024-01-01"])
        .expect_err("--from alone is rejected");
    assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
}

#[test]
fn range_args_become_analytics_range() -> Result<(), CliError> {
    let range = analytics::to_range(RangeArgs {
        range: TimeRangeArg::Week,
        from: Some("2024-03-01".into()),
        to: Some("2024-03-07".into()),
    })?;
    assert_eq!(range.range, TimeRange::Week);
    assert_eq!(range.start_date.as_deref(), Some("2024-03-01"));
    assert_eq!(range.end_date.as_deref(), Some("2024-03-07"));
    Ok(())
}

#[test]
fn inverted_range_is_invalid_input() {
    let err = analytics::to_range(RangeArgs {
        range: TimeRangeArg::Month,
        from: Some("2024-03-07".into()),
        to: Some("2024-03-01".into()),
    })
    .expect_err("inverted range");
    assert!(matches!(err, CliError::InvalidInput(_)));
}

#[test]
fn read_json_prefers_file_over_inline() -> Result<(), CliError> {
    let file = tmp_file(r#"{"page": 2}"#);
    let value = read_json(Some(r#"{"page": 1}"#.into()), Some(file.path().to_path_buf()))?;
    assert_eq!(value, json!({ "page": 2 }));
    Ok(())
}

#[test]
fn read_json_defaults_to_null() -> Result<(), CliError> {
    assert!(read_json(None, None)?.is_null());
    Ok(())
}

#[test]
fn read_body_requires_input() {
    let err = read_body::<serde_json::Value>(None, None).expect_err("missing body");
    assert!(matches!(err, CliError::InvalidInput(_)));
}

#[tokio::test]
async fn course_get_hits_backend_once() -> Result<(), CliError> {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/courses/7");
            then.status(200).json_body(json!({
                "success": true,
                "data": { "id": 7, "title": "Algebra", "status": "draft" }
            }));
        })
        .await;

    let ctx = ctx(&server);
    courses::handle(&ctx, CoursesCmd::Get { id: 7 }).await?;
    courses::handle(&ctx, CoursesCmd::Get { id: 7 }).await?;

    mock.assert_calls_async(1).await;
    Ok(())
}

#[tokio::test]
async fn backend_error_surfaces_status() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(DELETE).path("/api/courses/9");
            then.status(404)
                .json_body(json!({ "success": false, "message": "Course not found" }));
        })
        .await;

    let ctx = ctx(&server);
    let err = courses::handle(&ctx, CoursesCmd::Delete { id: 9 })
        .await
        .expect_err("404");
    match err {
        CliError::Api(api) => {
            assert_eq!(api.status(), Some(404));
            assert_eq!(api.message(), "Course not found");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
