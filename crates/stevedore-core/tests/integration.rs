//! End-to-end packaging runs against a temporary staging tree with a scripted
//! command runner standing in for the image builder.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use stevedore_core::{select_generator, PackageReport, Packager, Section};
use stevedore_runtime::{MockRunner, StepStatus};
use stevedore_schema::{Configuration, Diagnostics};

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// Staging layout with one subdirectory per component.
fn component_staging() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    write(&dir.path().join("A/usr/bin/a"), "a");
    write(&dir.path().join("B/usr/lib/libb.so"), "b");
    write(&dir.path().join("C/usr/share/doc/c.txt"), "c");
    dir
}

fn run(config: &Configuration, staging: &Path, output: &Path, runner: Arc<MockRunner>) -> PackageReport {
    let generator = select_generator("docker", runner.clone()).unwrap();
    Packager::new(generator, runner)
        .run(config, staging, output)
        .unwrap()
}

fn component_config() -> Configuration {
    Configuration::new()
        .with_option("BASE_IMAGE", "debian:bookworm")
        .with_option("CONTAINER_NAME", "app")
        .with_option("CONTAINER_VERSION", "1.0")
        .with_option("COMPONENT_INSTALL", "ON")
        .with_component("A", Some("G"))
        .with_component("B", Some("G"))
        .with_component("C", None)
}

#[test]
fn grouped_mode_produces_group_and_orphan_partitions() {
    let staging = component_staging();
    let out = tempfile::tempdir().unwrap();
    let report = run(
        &component_config(),
        staging.path(),
        out.path(),
        Arc::new(MockRunner::new()),
    );

    assert!(report.success);
    assert_eq!(report.outcomes.len(), 2);

    let c = &report.outcomes[0];
    assert_eq!(c.partition, "C");
    assert_eq!(c.files, vec![PathBuf::from("usr/share/doc/c.txt")]);
    assert_eq!(c.context, out.path().join("app-1.0-C"));

    let g = &report.outcomes[1];
    assert_eq!(g.partition, "G");
    assert_eq!(
        g.files,
        vec![PathBuf::from("usr/bin/a"), PathBuf::from("usr/lib/libb.so")]
    );
    assert!(out.path().join("app-1.0-G/Dockerfile").is_file());
    assert!(out.path().join("app-1.0-G/root/usr/bin/a").is_file());
}

#[test]
fn all_in_one_mode_produces_union() {
    let staging = component_staging();
    let out = tempfile::tempdir().unwrap();
    let config = component_config().with_option("COMPONENTS_ALL_IN_ONE_PACKAGE", "ON");
    let report = run(&config, staging.path(), out.path(), Arc::new(MockRunner::new()));

    assert!(report.success);
    assert_eq!(report.outcomes.len(), 1);
    let outcome = &report.outcomes[0];
    assert_eq!(outcome.partition, "ALL_COMPONENTS_IN_ONE");
    assert_eq!(outcome.artifact_name, "app-1.0");
    assert_eq!(outcome.files.len(), 3);
}

#[test]
fn builder_failure_fails_partition_and_leaves_log() {
    let staging = component_staging();
    let out = tempfile::tempdir().unwrap();
    let runner = Arc::new(MockRunner::new().on(
        "docker build",
        1,
        "Step 2/4 : RUN apt-get update\nE: network unreachable",
    ));
    let config = component_config()
        .with_option("COMPONENTS_ALL_IN_ONE_PACKAGE", "ON")
        .with_option("BUILD_CONTAINER", "ON");

    let report = run(&config, staging.path(), out.path(), runner.clone());

    assert!(!report.success);
    let outcome = &report.outcomes[0];
    assert!(!outcome.succeeded());
    let StepStatus::Failed { log: Some(log), .. } = &outcome.build else {
        panic!("expected a failed build with a log, got {:?}", outcome.build);
    };
    let content = fs::read_to_string(log).unwrap();
    let command_line = &runner.command_lines()[0];
    assert!(content.contains(command_line.as_str()));
    assert!(content.contains("E: network unreachable"));
    assert!(outcome.dockerfile.as_ref().unwrap().is_file());
}

#[test]
fn one_failing_partition_does_not_stop_the_others() {
    let staging = component_staging();
    let out = tempfile::tempdir().unwrap();
    let runner = Arc::new(MockRunner::new().on("app-1.0-c ", 1, "failed"));
    let config = component_config()
        .with_option("COMPONENTS_IGNORE_GROUPS", "ON")
        .with_option("BUILD_CONTAINER", "ON");

    let report = run(&config, staging.path(), out.path(), runner.clone());

    assert!(!report.success);
    let states: Vec<(String, bool)> = report
        .outcomes
        .iter()
        .map(|o| (o.partition.to_string(), o.succeeded()))
        .collect();
    assert_eq!(
        states,
        vec![
            ("A".to_owned(), true),
            ("B".to_owned(), true),
            ("C".to_owned(), false),
        ]
    );
    assert_eq!(runner.calls().len(), 3);
}

#[test]
fn section_order_ignores_option_order() {
    let options = [
        ("CMD", "/usr/bin/app"),
        ("ENTRYPOINT", "/init"),
        ("ONBUILD", "RUN make"),
        ("RUN_POSTDEPENDS", "ldconfig"),
        ("WORKDIR", "/srv"),
        ("USER", "app"),
        ("PACKAGE_DEPENDS", "b=2;a=1"),
        ("PACKAGE_MANAGER", "apt-get"),
        ("RUN_PREDEPENDS", "true"),
        ("EXPOSE", "80"),
        ("VOLUME", "/data"),
        ("ENV", "A=1"),
        ("LABEL", "x=y"),
        ("MAINTAINER", "ops"),
        ("BASE_IMAGE", "debian:bookworm"),
    ];
    let forward = options
        .iter()
        .fold(Configuration::new(), |c, (k, v)| c.with_option(k, *v));
    let backward = options
        .iter()
        .rev()
        .fold(Configuration::new(), |c, (k, v)| c.with_option(k, *v));

    let generator = select_generator("docker", Arc::new(MockRunner::new())).unwrap();
    let ctx = stevedore_core::ComposeContext::with_install_tree("root");
    let a = generator
        .compose(&forward, &ctx, &mut Diagnostics::new())
        .unwrap();
    let b = generator
        .compose(&backward, &ctx, &mut Diagnostics::new())
        .unwrap();
    assert_eq!(a.text, b.text);

    let sections: Vec<Section> = a.document.sections().collect();
    assert_eq!(sections, Section::ALL.to_vec());

    let keywords: Vec<&str> = a
        .text
        .lines()
        .filter(|l| !l.starts_with(' ') && !l.starts_with('#'))
        .filter_map(|l| l.split_whitespace().next())
        .collect();
    assert_eq!(
        keywords,
        vec![
            "FROM", "MAINTAINER", "LABEL", "ENV", "COPY", "VOLUME", "EXPOSE", "RUN", "RUN", "USER",
            "WORKDIR", "RUN", "ONBUILD", "ENTRYPOINT", "CMD"
        ]
    );
    let a_pos = a.text.find("    a=1").unwrap();
    let b_pos = a.text.find("    b=2").unwrap();
    assert!(a_pos < b_pos);
}

#[test]
fn report_serializes_to_json() {
    let staging = component_staging();
    let out = tempfile::tempdir().unwrap();
    let report = run(
        &component_config(),
        staging.path(),
        out.path(),
        Arc::new(MockRunner::new()),
    );
    let json: serde_json::Value = serde_json::to_value(&report).unwrap();
    assert_eq!(json["success"], true);
    assert_eq!(json["mode"], "grouped");
    assert_eq!(json["outcomes"][1]["partition"], "G");
    assert_eq!(json["outcomes"][1]["build"]["status"], "skipped");
}
