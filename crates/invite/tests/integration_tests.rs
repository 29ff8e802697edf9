//! End-to-end tests: mark positions, then generate invitations

use invite::{
    BatchOptions, GuestList, InviteError, PositionStore, RenderConfig, Session,
};
use pdf_core::testing::{blank_pdf, minimal_ttf};
use pdf_core::FontData;
use pretty_assertions::assert_eq;
use std::path::{Path, PathBuf};

fn write_template(dir: &Path, pages: usize) -> PathBuf {
    let path = dir.join("card.pdf");
    let bytes = blank_pdf(pages, 300.0, 200.0).expect("Failed to build template");
    std::fs::write(&path, bytes).expect("Failed to write template");
    path
}

fn write_guests(dir: &Path, names: &[&str]) -> PathBuf {
    let path = dir.join("guests.csv");
    let mut csv = String::from("name,table\n");
    for (i, name) in names.iter().enumerate() {
        csv.push_str(&format!("{name},{}\n", i + 1));
    }
    std::fs::write(&path, csv).expect("Failed to write guest list");
    path
}

fn font() -> FontData {
    FontData::from_ttf("test", &minimal_ttf()).expect("Failed to load font")
}

/// Session with a template, a font, and one marker on each of the given pages
fn prepared_session(dir: &Path, pages: usize, marked_pages: &[usize]) -> Session {
    let mut session = Session::new(RenderConfig::default().with_font(font()));
    session
        .load_template(write_template(dir, pages))
        .expect("Failed to load template");

    for &page in marked_pages {
        session.set_page(page).expect("Page out of range");
        session.click(100.0, 200.0).expect("Failed to mark");
    }
    session
}

fn output_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .expect("Failed to read output dir")
        .map(|e| e.expect("Bad dir entry").file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

fn overlay_count(path: &Path) -> usize {
    let doc = lopdf::Document::load(path).expect("Failed to load output");
    doc.get_pages()
        .values()
        .map(|id| {
            let content = doc.get_page_content(*id).expect("Missing content");
            String::from_utf8_lossy(&content).matches(" Do").count()
        })
        .sum()
}

#[test]
fn test_generates_one_file_per_guest() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let mut session = prepared_session(dir.path(), 2, &[0, 1, 1]);
    session
        .load_guest_list(write_guests(dir.path(), &["Asha Patel", "Raj Mehta", "શ્રી રાજેશભાઈ પટેલ"]))
        .expect("Failed to load guests");

    let out = dir.path().join("out");
    let report = session
        .generate(&out, BatchOptions::default(), |_| {})
        .expect("Batch failed to start");

    assert_eq!(report.success_count, 3);
    assert!(report.failures.is_empty());
    assert_eq!(
        output_names(&out),
        vec![
            "invitation_Asha Patel.pdf",
            "invitation_Raj Mehta.pdf",
            "invitation_શ્રી રાજેશભાઈ પટેલ.pdf",
        ]
    );

    // Page 1 gets one layer, page 2 one layer holding both of its markers
    for path in &report.outputs {
        assert_eq!(overlay_count(path), 2);
    }
}

#[test]
fn test_single_failure_does_not_stop_batch() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let mut session = prepared_session(dir.path(), 1, &[0]);
    session
        .load_guest_list(write_guests(dir.path(), &["Alice", "Bob", "Carol", "Dan", "Eve"]))
        .expect("Failed to load guests");

    // A directory squatting on Carol's output path makes her save fail
    let out = dir.path().join("out");
    std::fs::create_dir_all(out.join("invitation_Carol.pdf")).expect("Failed to create blocker");

    let report = session
        .generate(&out, BatchOptions::default(), |_| {})
        .expect("Batch failed to start");

    assert_eq!(report.success_count, 4);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].row, 3);
    assert_eq!(report.failures[0].name, "Carol");
    for name in ["Alice", "Bob", "Dan", "Eve"] {
        assert!(out.join(format!("invitation_{name}.pdf")).is_file());
    }
    assert!(out.join("invitation_Carol.pdf").is_dir());
}

#[test]
fn test_render_failure_isolated_to_one_guest() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let mut session = prepared_session(dir.path(), 2, &[0, 1]);
    session.set_guests(GuestList::from_names(["Alice", "Bob", "Carol", "Dan", "Eve"]));

    // Each guest reopens the template, so swapping in a one-page file while
    // Carol renders leaves her page 2 marker with nowhere to go
    let template = dir.path().join("card.pdf");
    let two_pages = std::fs::read(&template).expect("Failed to read template");
    let one_page = blank_pdf(1, 300.0, 200.0).expect("Failed to build PDF");

    let out = dir.path().join("out");
    let report = session
        .generate(&out, BatchOptions::default(), |p| {
            let swap = match p.completed {
                2 => &one_page,
                3 => &two_pages,
                _ => return,
            };
            std::fs::write(&template, swap).expect("Failed to swap template");
        })
        .expect("Batch failed to start");

    assert_eq!(report.success_count, 4);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].row, 3);
    assert_eq!(report.failures[0].name, "Carol");
    assert!(matches!(
        report.failures[0].error,
        InviteError::RenderFailure { page: 1, .. }
    ));

    assert!(!out.join("invitation_Carol.pdf").exists());
    for name in ["Alice", "Bob", "Dan", "Eve"] {
        let path = out.join(format!("invitation_{name}.pdf"));
        assert_eq!(overlay_count(&path), 2);
    }
}

#[test]
fn test_parallel_jobs_keep_input_order() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let mut session = prepared_session(dir.path(), 1, &[0]);
    let names: Vec<String> = (1..=12).map(|i| format!("Guest {i}")).collect();
    let mut with_blanks: Vec<&str> = names.iter().map(String::as_str).collect();
    with_blanks[3] = "";
    with_blanks[8] = "";
    session.set_guests(GuestList::from_names(with_blanks));

    let out = dir.path().join("out");
    let options = BatchOptions {
        jobs: 4,
        ..BatchOptions::default()
    };
    let mut completed = Vec::new();
    let report = session
        .generate(&out, options, |p| completed.push(p.completed))
        .expect("Batch failed to start");

    assert_eq!(report.success_count, 10);
    let failed_rows: Vec<usize> = report.failures.iter().map(|f| f.row).collect();
    assert_eq!(failed_rows, vec![4, 9]);
    assert_eq!(completed, (1..=12).collect::<Vec<_>>());

    let expected: Vec<PathBuf> = (1..=12)
        .filter(|i| *i != 4 && *i != 9)
        .map(|i| out.join(format!("invitation_Guest {i}.pdf")))
        .collect();
    assert_eq!(report.outputs, expected);
}

#[test]
fn test_loading_template_clears_positions() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let mut session = prepared_session(dir.path(), 2, &[0, 1]);
    assert_eq!(session.positions().len(), 2);
    assert_eq!(session.current_page(), 1);

    let other = dir.path().join("other.pdf");
    std::fs::write(&other, blank_pdf(3, 100.0, 100.0).expect("Failed to build PDF"))
        .expect("Failed to write template");

    assert_eq!(session.load_template(&other).expect("Failed to load"), 3);
    assert!(session.positions().is_empty());
    assert_eq!(session.current_page(), 0);
}

#[test]
fn test_cropped_template_uses_visible_area() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("cropped.pdf");
    let bytes = blank_pdf(1, 600.0, 800.0).expect("Failed to build PDF");
    let mut doc = lopdf::Document::load_mem(&bytes).expect("Failed to load PDF");
    let page_id = *doc.get_pages().get(&1).expect("Missing page");
    doc.get_object_mut(page_id)
        .and_then(|obj| obj.as_dict_mut())
        .expect("Page is not a dictionary")
        .set(
            "CropBox",
            [100, 100, 400, 500]
                .into_iter()
                .map(lopdf::Object::Integer)
                .collect::<Vec<_>>(),
        );
    doc.save(&path).expect("Failed to save cropped template");

    let mut session = Session::new(RenderConfig::default().with_font(font()));
    session.load_template(&path).expect("Failed to load template");

    // 300 x 400 pt visible at zoom 1.0 is 600 x 800 preview pixels
    let canvas = session.render_preview(None).expect("Failed to render preview");
    assert_eq!(canvas.dimensions(), (600, 800));

    assert!(matches!(
        session.click(700.0, 10.0),
        Err(InviteError::InvalidPosition(_))
    ));
    assert_eq!(session.click(590.0, 790.0).expect("Failed to mark"), 0);
}

#[test]
fn test_remove_then_list_for_page() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let mut session = prepared_session(dir.path(), 2, &[]);
    session.click(10.0, 10.0).expect("Failed to mark");
    session.set_page(1).expect("Page 2 exists");
    session.click(20.0, 20.0).expect("Failed to mark");
    session.set_page(0).expect("Page 1 exists");
    session.click(30.0, 30.0).expect("Failed to mark");
    let before = session.positions().len();

    let removed = session.remove_position(2).expect("Failed to remove");
    assert_eq!(removed.x, 15.0);
    assert_eq!(session.positions().len(), before - 1);
    assert!(session.positions().list_for_page(0).all(|p| p != &removed));
    assert_eq!(session.positions().list_for_page(0).count(), 1);
    assert_eq!(session.positions().list_for_page(1).count(), 1);

    assert!(matches!(
        session.remove_position(9),
        Err(InviteError::IndexOutOfRange { index: 9, len: 2 })
    ));
}

#[test]
fn test_sample_render() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let session = prepared_session(dir.path(), 1, &[0]);
    let sample = dir.path().join("sample.pdf");

    session
        .test_sample("શ્રી રાજેશભાઈ પટેલ", &sample)
        .expect("Failed to render sample");
    assert_eq!(overlay_count(&sample), 1);
}

#[test]
fn test_sample_requires_positions() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let session = prepared_session(dir.path(), 1, &[]);
    assert!(matches!(
        session.test_sample("Asha", dir.path().join("sample.pdf")),
        Err(InviteError::PreconditionFailed(_))
    ));
}

#[test]
fn test_layout_round_trip_through_session() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let session = prepared_session(dir.path(), 2, &[0, 1]);
    let layout = dir.path().join("layout.json");
    session.save_layout(&layout).expect("Failed to save layout");

    let mut restored = prepared_session(dir.path(), 2, &[]);
    assert_eq!(restored.load_layout(&layout).expect("Failed to load layout"), 2);
    assert_eq!(restored.positions(), session.positions());
}

#[test]
fn test_generator_with_standalone_store() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let template = write_template(dir.path(), 1);
    let config = RenderConfig::default().with_font(font());
    let mut positions = PositionStore::new();
    positions
        .add(&config, 0, 20.0, 150.0, 32.0)
        .expect("Failed to add position");
    let guests = GuestList::from_names(["Raj", "RAJ"]);
    let out = dir.path().join("out");

    let report = invite::BatchGenerator::new(&template, &positions, &guests, &config, &out)
        .with_options(BatchOptions {
            output_prefix: "card_".to_string(),
            jobs: 1,
        })
        .generate(|_| {})
        .expect("Batch failed to start");

    assert!(report.is_complete_success());
    assert_eq!(output_names(&out), vec!["card_RAJ_row2.pdf", "card_Raj.pdf"]);
}
