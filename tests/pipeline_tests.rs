mod support;

use assert_matches::assert_matches;
use cobie_graph::rdf::vocab;
use cobie_graph::workbook::read_document;
use cobie_graph::{
    ConvertOutcome, FacilityAnchor, ImportError, ImportPipeline, PipelineOptions, RdfOutputFormat,
    SheetKind, TripleSet, ViolationCategory, build, compile,
};
use oxigraph::io::RdfFormat;
use oxigraph::model::vocab::rdf;
use oxigraph::model::{Literal, NamedNode, Term, Triple};
use oxigraph::store::Store;
use support::{CobieFixture, FACILITY_URI, zip_with_garbage_parts};

fn iri(path: &str) -> NamedNode {
    NamedNode::new(format!("{FACILITY_URI}/{path}")).unwrap()
}

fn cobie(local: &str) -> NamedNode {
    vocab::term(local)
}

fn triples_for(fixture: &CobieFixture) -> TripleSet {
    let document = read_document(&fixture.to_bytes()).unwrap();
    let graph = build(FACILITY_URI, &document).unwrap();
    compile(&graph).unwrap()
}

fn pipeline() -> ImportPipeline {
    ImportPipeline::new(PipelineOptions::new(FacilityAnchor::Uri(
        FACILITY_URI.to_string(),
    )))
}

fn compiled(outcome: ConvertOutcome) -> cobie_graph::TripleDocument {
    match outcome {
        ConvertOutcome::Compiled(document) => document,
        ConvertOutcome::Rejected(outcome) => panic!("rejected: {:?}", outcome.report),
    }
}

#[test]
fn minimal_fixture_round_trips_to_expected_triples() {
    let triples = triples_for(&CobieFixture::minimal());

    for expected in [
        Triple::new(
            iri("component/c1"),
            rdf::TYPE.into_owned(),
            cobie("Component"),
        ),
        Triple::new(
            iri("component/c1"),
            cobie(vocab::SPACE),
            iri("space/101"),
        ),
        Triple::new(
            iri("component/c1"),
            cobie(vocab::TYPE_NAME),
            iri("type/t1"),
        ),
        Triple::new(
            iri("system/s1"),
            cobie(vocab::COMPONENT_NAMES),
            iri("component/c1"),
        ),
        Triple::new(
            iri("space/101"),
            cobie(vocab::FLOOR_NAME),
            iri("floor/l1"),
        ),
        Triple::new(
            iri("floor/l1"),
            cobie(vocab::ELEVATION),
            Literal::from(0_i64),
        ),
        Triple::new(
            NamedNode::new(FACILITY_URI).unwrap(),
            cobie(vocab::NAME),
            Literal::new_simple_literal("HQ"),
        ),
        Triple::new(
            iri("type/t1"),
            cobie(vocab::CATEGORY),
            NamedNode::new("https://syyclops.com/categoryProduct/office").unwrap(),
        ),
    ] {
        assert!(triples.contains(&expected), "missing {expected}");
    }
}

#[test]
fn blank_cells_produce_no_literals() {
    let triples = triples_for(&CobieFixture::minimal());
    let c1 = format!("{FACILITY_URI}/component/c1");
    let predicates: Vec<_> = triples.about(&c1).map(|t| t.predicate.clone()).collect();

    assert_eq!(
        predicates,
        vec![
            rdf::TYPE.into_owned(),
            cobie(vocab::NAME),
            cobie(vocab::TYPE_NAME),
            cobie(vocab::SPACE),
        ]
    );
}

#[test]
fn component_attaches_only_first_listed_space() {
    let fixture = CobieFixture::empty()
        .row("Facility", &[("Name", "HQ")])
        .row("Floor", &[("Name", "L1")])
        .row("Space", &[("Name", "101"), ("FloorName", "L1")])
        .row("Space", &[("Name", "102"), ("FloorName", "L1")])
        .row("Type", &[("Name", "T1"), ("Category", "Office")])
        .row(
            "Component",
            &[("Name", "C1"), ("TypeName", "T1"), ("Space", "102, 101")],
        )
        .row("System", &[("Name", "S1"), ("ComponentNames", "C1")]);

    let outcome = cobie_graph::validate(&fixture.to_bytes()).unwrap();
    assert!(!outcome.has_errors, "{:?}", outcome.report);

    let document = read_document(&fixture.to_bytes()).unwrap();
    let graph = build(FACILITY_URI, &document).unwrap();
    let component = graph.component("C1").unwrap();
    assert_eq!(component.space.as_ref().map(|s| s.name.as_str()), Some("102"));

    let triples = compile(&graph).unwrap();
    let space_links: Vec<_> = triples
        .about(&format!("{FACILITY_URI}/component/c1"))
        .filter(|t| t.predicate == cobie(vocab::SPACE))
        .collect();
    assert_eq!(space_links.len(), 1);
    assert_eq!(space_links[0].object, Term::from(iri("space/102")));
}

#[test]
fn repeated_system_rows_compile_to_one_system() {
    let fixture = CobieFixture::minimal()
        .row(
            "Component",
            &[("Name", "C2"), ("TypeName", "T1"), ("Space", "101")],
        )
        .row("System", &[("Name", "S1"), ("ComponentNames", "C2")])
        .row("System", &[("Name", "S1"), ("ComponentNames", "C1")]);
    let triples = triples_for(&fixture);
    let s1 = format!("{FACILITY_URI}/system/s1");

    let types = triples
        .about(&s1)
        .filter(|t| t.predicate == rdf::TYPE)
        .count();
    let members: Vec<_> = triples
        .about(&s1)
        .filter(|t| t.predicate == cobie(vocab::COMPONENT_NAMES))
        .map(|t| t.object.clone())
        .collect();

    assert_eq!(types, 1);
    assert_eq!(
        members,
        vec![Term::from(iri("component/c1")), Term::from(iri("component/c2"))]
    );
}

#[test]
fn attributes_hang_off_their_target() {
    let fixture = CobieFixture::minimal()
        .row(
            "Attribute",
            &[
                ("Name", "Flow Rate"),
                ("SheetName", "Component"),
                ("RowName", "C1"),
                ("Value", "12.5"),
                ("Unit", "l/s"),
            ],
        )
        .row(
            "Attribute",
            &[("Name", "Colour"), ("SheetName", "Component"), ("RowName", "C404")],
        );
    let triples = triples_for(&fixture);
    let attribute = iri("component/c1/attribute/flow%20rate");

    assert!(triples.contains(&Triple::new(
        attribute.clone(),
        cobie(vocab::ATTRIBUTE_TO),
        iri("component/c1"),
    )));
    assert!(triples.contains(&Triple::new(
        attribute,
        cobie(vocab::VALUE),
        Literal::from(12.5_f64),
    )));
    assert_eq!(
        triples
            .about(&format!("{FACILITY_URI}/component/c404/attribute/colour"))
            .count(),
        0
    );
}

#[test]
fn conversion_is_idempotent() {
    let bytes = CobieFixture::minimal().to_bytes();
    let first = compiled(pipeline().convert(&bytes).unwrap());
    let second = compiled(pipeline().convert(&bytes).unwrap());

    assert_eq!(first, second);
    assert_eq!(first.name, "hq");
    assert_eq!(first.facility_uri, FACILITY_URI);
}

#[test]
fn turtle_output_loads_into_a_store() {
    let fixture = CobieFixture::minimal();
    let expected = triples_for(&fixture).len();
    let document = compiled(pipeline().convert(&fixture.to_bytes()).unwrap());

    assert_eq!(document.format, RdfOutputFormat::Turtle);
    assert_eq!(document.triple_count, expected);

    let store = Store::new().unwrap();
    store
        .load_from_reader(RdfFormat::Turtle, document.content.as_bytes())
        .unwrap();
    assert_eq!(store.len().unwrap(), expected);
}

#[test]
fn ntriples_output_has_a_line_per_triple() {
    let mut options = PipelineOptions::new(FacilityAnchor::Uri(FACILITY_URI.into()));
    options.format = RdfOutputFormat::Ntriples;
    let document = compiled(
        ImportPipeline::new(options)
            .convert(&CobieFixture::minimal().to_bytes())
            .unwrap(),
    );

    assert_eq!(document.file_name(), "hq.nt");
    assert_eq!(
        document.content.lines().filter(|l| !l.trim().is_empty()).count(),
        document.triple_count
    );
}

#[test]
fn invalid_workbook_is_rejected_before_building() {
    let bytes = CobieFixture::minimal()
        .row(
            "Component",
            &[("Name", "C2"), ("TypeName", "Ghost"), ("Space", "101")],
        )
        .to_bytes();

    assert_matches!(
        pipeline().convert(&bytes).unwrap(),
        ConvertOutcome::Rejected(outcome)
            if !outcome.report.get(ViolationCategory::ComponentWithoutType).is_empty()
    );
}

#[test]
fn skipping_validation_surfaces_unresolved_references() {
    let bytes = CobieFixture::minimal()
        .row(
            "Component",
            &[("Name", "C2"), ("TypeName", "Ghost"), ("Space", "101")],
        )
        .to_bytes();
    let mut options = PipelineOptions::new(FacilityAnchor::Uri(FACILITY_URI.into()));
    options.skip_validation = true;

    assert_matches!(
        ImportPipeline::new(options).convert(&bytes),
        Err(ImportError::UnresolvedReference {
            sheet: SheetKind::Component,
            target: SheetKind::Type,
            row: 3,
            ..
        })
    );
}

#[test]
fn garbage_archive_fails_conversion_without_panicking() {
    assert_matches!(
        pipeline().convert(&zip_with_garbage_parts()),
        Err(ImportError::MalformedDocument(_))
    );
}

#[test]
fn portfolio_anchor_derives_facility_uri() {
    let options = PipelineOptions::new(FacilityAnchor::Portfolio(
        "https://example.com/portfolio/".into(),
    ));
    let document = compiled(
        ImportPipeline::new(options)
            .convert(&CobieFixture::minimal().to_bytes())
            .unwrap(),
    );

    assert_eq!(document.facility_uri, "https://example.com/portfolio/hq");
    assert!(
        document
            .content
            .contains("<https://example.com/portfolio/hq/component/c1>")
    );
}

#[tokio::test]
async fn independent_conversions_run_concurrently() {
    let pipeline = std::sync::Arc::new(pipeline());
    let bytes = std::sync::Arc::new(CobieFixture::minimal().to_bytes());

    let tasks: Vec<_> = (0..4)
        .map(|_| {
            let pipeline = std::sync::Arc::clone(&pipeline);
            let bytes = std::sync::Arc::clone(&bytes);
            tokio::task::spawn_blocking(move || pipeline.convert(&bytes))
        })
        .collect();

    let mut contents = Vec::new();
    for result in futures::future::join_all(tasks).await {
        contents.push(compiled(result.unwrap().unwrap()).content);
    }
    assert!(contents.windows(2).all(|pair| pair[0] == pair[1]));
}
