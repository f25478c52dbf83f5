//! Netlist compilation and validation tests

use circuitlens::netlist::{CompileOptions, NetlistExpectations, Statement};
use circuitlens::prelude::*;
use circuitlens::{CircuitDescription, CircuitPattern, NetlistCompiler, NetlistValidator, Severity};
use std::path::PathBuf;
use std::sync::Arc;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn compiler() -> NetlistCompiler {
    NetlistCompiler::new(Arc::new(PipelineConfig::default()))
}

fn component(kind: CanonicalType, name: &str, nodes: &[&str], value: Option<&str>) -> CircuitComponent {
    let component = CircuitComponent::new(name, kind, nodes.iter().map(|n| n.to_string()).collect());
    match value {
        Some(v) => component.with_value(v),
        None => component,
    }
}

fn lines_starting_with<'a>(netlist: &'a str, prefix: &str) -> Vec<&'a str> {
    netlist.lines().filter(|l| l.starts_with(prefix)).collect()
}

#[test]
fn test_divider_description() {
    let output = circuitlens::compile_description_file(
        &fixture_path("divider_description.json"),
        &PipelineOptions::default(),
    )
    .unwrap();

    assert_eq!(lines_starting_with(&output.netlist, "R").len(), 2);
    assert_eq!(lines_starting_with(&output.netlist, ".title").len(), 1);
    assert_eq!(lines_starting_with(&output.netlist, ".op").len(), 1);
    assert_eq!(lines_starting_with(&output.netlist, ".end").len(), 1);
    assert!(output.netlist.starts_with(".title Voltage divider\n"));
    assert!(output.diagnostics.is_empty(), "{:?}", output.diagnostics);
    assert!(output.is_valid());
    assert!(output.fused.is_empty());
    assert!(output.summary.is_none());
    assert_eq!(output.circuit.pattern, CircuitPattern::VoltageDivider);
}

#[test]
fn test_transformer_expands_to_coupled_inductors() {
    let compiled = compiler().compile(
        &[component(
            CanonicalType::Transformer,
            "T1",
            &["P1", "P2", "S1", "S2"],
            Some("1mH"),
        )],
        &CompileOptions::default(),
    );

    let statements = compiled.statements_for(0);
    assert_eq!(statements.len(), 3);
    let rendered: Vec<String> = statements.iter().map(|s| s.render()).collect();
    assert_eq!(rendered, vec!["L1 P1 P2 1m", "L2 S1 S2 1m", "K1 L1 L2 0.999"]);
    assert!(compiled.diagnostics.is_empty());
}

#[test]
fn test_mixed_description_is_fail_soft() {
    let output = circuitlens::compile_description_file(
        &fixture_path("mixed_description.json"),
        &PipelineOptions::default(),
    )
    .unwrap();

    let body: Vec<&str> = output
        .netlist
        .lines()
        .filter(|l| !l.is_empty() && !l.starts_with('.'))
        .collect();
    assert_eq!(
        body,
        vec![
            "VIN N1 0 DC 12",
            "L1 N1 0 1m",
            "L2 N2 N3 1m",
            "K1 L1 L2 0.999",
            "D3 N2 N4 1N4148",
            "C4 N4 N3 1u",
        ]
    );

    let errors: Vec<(&str, Option<usize>)> = output
        .diagnostics
        .errors()
        .map(|d| (d.code.as_str(), d.component_index))
        .collect();
    assert_eq!(errors, vec![("arity-mismatch", Some(4)), ("unsupported-type", Some(5))]);

    let warnings: Vec<(&str, Option<usize>)> = output
        .diagnostics
        .warnings()
        .map(|d| (d.code.as_str(), d.component_index))
        .collect();
    assert_eq!(warnings, vec![("default-value", Some(3))]);

    assert!(output.is_valid(), "{:?}", output.validation.reasons);
    assert_eq!(output.stats.errors, 2);
}

#[test]
fn test_failed_component_does_not_shift_names() {
    let components = vec![
        component(CanonicalType::Resistor, "R1", &["A", "B"], Some("1k")),
        component(CanonicalType::Resistor, "R2", &["A"], Some("1k")),
        component(CanonicalType::Resistor, "R3", &["B", "0"], Some("1k")),
    ];
    let compiled = compiler().compile(&components, &CompileOptions::default());

    let names: Vec<&str> = compiled
        .statements
        .iter()
        .filter_map(|s| s.element_name())
        .filter(|n| n.starts_with('R'))
        .collect();
    assert_eq!(names, vec!["R1", "R3"]);
    assert_eq!(compiled.diagnostics.len(), 1);
    assert_eq!(compiled.diagnostics.as_slice()[0].severity, Severity::Error);
}

#[test]
fn test_duplicate_names_are_renamed() {
    let components = vec![
        component(CanonicalType::Resistor, "R1", &["A", "B"], Some("1k")),
        component(CanonicalType::Resistor, "r1", &["B", "C"], Some("2k")),
        component(CanonicalType::Capacitor, "R1", &["C", "0"], Some("10n")),
    ];
    let compiled = compiler().compile(&components, &CompileOptions::default());
    let text = compiled.render();

    assert!(text.contains("R1 A B 1k\n"));
    assert!(text.contains("R2 B C 2k\n"));
    assert!(text.contains("C1 C 0 10n\n"));
    let report = NetlistValidator::validate_compiled(&compiled);
    assert!(report.valid, "{:?}", report.reasons);
}

#[test]
fn test_unparseable_value_gets_default() {
    let compiled = compiler().compile(
        &[component(CanonicalType::Capacitor, "C1", &["A", "0"], Some("a lot"))],
        &CompileOptions::default(),
    );
    assert!(compiled.render().contains("C1 A 0 1u\n"));
    let codes: Vec<&str> = compiled.diagnostics.iter().map(|d| d.code.as_str()).collect();
    assert_eq!(codes, vec!["default-value"]);
}

#[test]
fn test_compilation_is_idempotent() {
    let description = CircuitDescription::load_file(&fixture_path("mixed_description.json")).unwrap();
    let core = CircuitLensCore::default();
    let options = PipelineOptions::default();

    let first = core.compile_description(description.clone(), &options).unwrap();
    let second = core.compile_description(description, &options).unwrap();
    assert_eq!(first.netlist, second.netlist);
    assert_eq!(first.compiled, second.compiled);
}

#[test]
fn test_rendered_netlist_revalidates_as_text() {
    let output = circuitlens::compile_description_file(
        &fixture_path("divider_description.json"),
        &PipelineOptions::default(),
    )
    .unwrap();

    let report = circuitlens::validate_netlist(&output.netlist);
    assert!(report.valid, "{:?}", report.reasons);
    assert_eq!(report, NetlistValidator::validate_compiled(&output.compiled));
}

#[test]
fn test_validator_collects_every_reason() {
    let text = "R1 A 0 1k\nr1 B 0 2k\n.end\n.op\n";
    let report = CircuitLensCore::validate_text(text, &NetlistExpectations::default());
    assert!(!report.valid);
    assert_eq!(
        report.reasons,
        vec![
            "missing .title directive".to_string(),
            ".end is followed by 1 more statement(s)".to_string(),
            "duplicate statement name r1".to_string(),
        ]
    );
}

#[test]
fn test_analysis_and_title_options() {
    let options = PipelineOptions {
        title: Some("bench\nsetup".to_string()),
        analysis: Analysis::parse("tran:1u,1m").unwrap(),
        ..Default::default()
    };
    let output = circuitlens::compile_description_file(&fixture_path("divider_description.json"), &options)
        .unwrap();

    assert!(output.netlist.starts_with(".title bench setup\n"));
    assert!(output.netlist.ends_with(".tran 1u 1m\n.end\n"));
    assert!(matches!(
        output.compiled.statements.last(),
        Some(Statement::End)
    ));
}

#[test]
fn test_rejected_record_keeps_later_indices() {
    let json = r#"{"components": [
        {"name": "R1", "nodes": ["A", "B"]},
        {"type": "flux capacitor", "nodes": ["A", "B"]},
        {"type": "capacitor", "nodes": ["B", "0"], "value": "banana"}
    ]}"#;
    let output = CircuitLensCore::default()
        .compile_description(CircuitDescription::from_json_str(json).unwrap(), &PipelineOptions::default())
        .unwrap();

    let found: Vec<(&str, Option<usize>)> = output
        .diagnostics
        .iter()
        .map(|d| (d.code.as_str(), d.component_index))
        .collect();
    assert_eq!(
        found,
        vec![
            ("missing-type", Some(0)),
            ("unsupported-type", Some(1)),
            ("default-value", Some(2)),
        ]
    );
    assert_eq!(output.diagnostics.for_index(1).len(), 1);
}

#[test]
fn test_two_input_gate_from_description() {
    let json = r#"{"components": [
        {"type": "voltage_source", "name": "V1", "nodes": ["A", "0"], "value": 5},
        {"type": "nand", "name": "U1", "nodes": ["A", "B", "Y"]},
        {"type": "resistor", "name": "R1", "nodes": ["Y", "0"], "value": "1k"}
    ]}"#;
    let output = CircuitLensCore::default()
        .compile_description(CircuitDescription::from_json_str(json).unwrap(), &PipelineOptions::default())
        .unwrap();

    assert!(output.netlist.contains("\nE1 Y 0 A 0 1\n"));
    assert!(!output.has_errors(), "{:?}", output.diagnostics);
    let stand_in: Vec<_> = output.diagnostics.warnings().collect();
    assert_eq!(stand_in.len(), 1);
    assert_eq!(stand_in[0].code, "behavioral-stand-in");
    assert_eq!(stand_in[0].component_index, Some(1));
    assert!(output.is_valid(), "{:?}", output.validation.reasons);
}
