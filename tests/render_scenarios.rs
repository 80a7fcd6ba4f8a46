use chrono::NaiveDate;
use engine_report::{
    ADDITIONAL_KIND, AircraftSummary, Assessment, EXPLANATION_KIND, EnginePosition,
    FlightReportRecord, FlightSummary, RenderedReport, ReportRenderRequest, ReportRenderer,
    SINGLE_KIND, TWIN_KIND, inspect_pdf_bytes,
};
use pretty_assertions::assert_eq;

const RED: &str = "1 0.451 0.451 rg";
const GREEN: &str = "0 1 0 rg";
const GRAY: &str = "0.902 0.902 0.902 rg";

fn renderer() -> ReportRenderer {
    ReportRenderer::builder()
        .report_date(NaiveDate::from_ymd_opt(2024, 6, 2).unwrap())
        .compress_streams(false)
        .build()
        .unwrap()
}

fn flight() -> FlightSummary {
    FlightSummary {
        id: 31,
        date: NaiveDate::from_ymd_opt(2024, 5, 30).unwrap(),
        aircraft: AircraftSummary {
            owner_first_name: "Mike".into(),
            owner_last_name: "Busch".into(),
            registration: "N7GA".into(),
            aircraft_manufacturer: Some("Cessna".into()),
            aircraft_model: Some("T310R".into()),
            ..AircraftSummary::default()
        },
    }
}

fn single(id: u64) -> FlightReportRecord {
    FlightReportRecord::new(id, EnginePosition::Single, flight())
}

fn twin_pair() -> (FlightReportRecord, FlightReportRecord) {
    let mut left = FlightReportRecord::new(1, EnginePosition::Left, flight());
    let mut right = FlightReportRecord::new(2, EnginePosition::Right, flight());
    left.sister_report = Some(2);
    right.sister_report = Some(1);
    (left, right)
}

fn page_contents(report: &RenderedReport) -> Vec<String> {
    let document = lopdf::Document::load_mem(&report.bytes).unwrap();
    document
        .get_pages()
        .values()
        .map(|page_id| {
            let content = document.get_page_content(*page_id).unwrap();
            String::from_utf8_lossy(&content).into_owned()
        })
        .collect()
}

fn kinds(report: &RenderedReport) -> Vec<&str> {
    report
        .metrics
        .pages
        .iter()
        .map(|page| page.kind.as_deref().unwrap_or(""))
        .collect()
}

#[test]
fn findings_only_record_renders_two_pages() {
    let mut record = single(1);
    record.findings = "Engine runs well".into();
    let report = renderer()
        .render(&ReportRenderRequest::new(vec![record]))
        .unwrap();

    assert_eq!(report.content_type(), "application/pdf");
    assert!(!report.bytes.is_empty());
    assert_eq!(report.page_count, 2);
    assert_eq!(inspect_pdf_bytes(&report.bytes).unwrap().page_count, 2);
    assert_eq!(kinds(&report), vec![SINGLE_KIND, EXPLANATION_KIND]);

    let pages = page_contents(&report);
    assert!(pages[0].contains("(Engine runs well) Tj"));
    assert!(pages[1].contains("(Glossary of Abbreviations) Tj"));
}

#[test]
fn twin_pair_shares_one_page_with_both_chips() {
    let (mut left, mut right) = twin_pair();
    left.gami = Assessment::new("Alert");
    right.gami = Assessment::new("Satisfactory");
    let report = renderer()
        .render(&ReportRenderRequest::new(vec![left, right]))
        .unwrap();

    assert_eq!(kinds(&report), vec![TWIN_KIND, EXPLANATION_KIND]);
    assert_eq!(report.metrics.pages[0].record_ids, vec!["1", "2"]);
    let pages = page_contents(&report);
    assert!(pages[0].contains(RED));
    assert!(pages[0].contains(GREEN));
    assert!(pages[0].contains("(Left Engine) Tj"));
    assert!(pages[0].contains("(Right Engine) Tj"));
}

#[test]
fn additional_remarks_follow_their_record() {
    let mut first = single(1);
    first.findings = "Healthy engine.".into();
    first.additional = "Consider an oil analysis at the next change.".into();
    let mut second = single(2);
    second.recommendations = "Fly more.".into();
    let report = renderer()
        .render(&ReportRenderRequest::new(vec![first, second]))
        .unwrap();

    assert_eq!(
        kinds(&report),
        vec![SINGLE_KIND, ADDITIONAL_KIND, SINGLE_KIND, EXPLANATION_KIND]
    );
    let pages = page_contents(&report);
    assert!(pages[1].contains("(Additional Remarks) Tj"));
    assert!(pages[1].contains("oil analysis"));
    assert_eq!(report.metrics.pages[1].record_ids, vec!["1"]);
}

#[test]
fn empty_records_are_skipped() {
    let mut blank = single(1);
    blank.gami = Assessment::new("0");
    blank.findings = "  ".into();
    let mut kept = single(2);
    kept.recommendations = "Replace the spark plugs.".into();
    let report = renderer()
        .render(&ReportRenderRequest::new(vec![blank, kept]))
        .unwrap();
    assert_eq!(report.page_count, 2);
    assert_eq!(report.metrics.pages[0].record_ids, vec!["2"]);
}

#[test]
fn empty_request_yields_only_the_explanation_page() {
    let report = renderer()
        .render(&ReportRenderRequest::default())
        .unwrap();
    assert_eq!(report.page_count, 1);
    assert_eq!(kinds(&report), vec![EXPLANATION_KIND]);
}

#[test]
fn unset_statuses_render_not_applicable_in_gray() {
    let mut record = single(1);
    record.findings = "See boxes.".into();
    record.ignition = Assessment::new("0");
    record.power = Assessment::new("N/A");
    let report = renderer()
        .render(&ReportRenderRequest::new(vec![record]))
        .unwrap();
    let pages = page_contents(&report);
    assert!(pages[0].contains(GRAY));
    assert!(pages[0].contains("(Not Applicable) Tj"));
    assert!(!pages[0].contains("(0) Tj"));
}

#[test]
fn attachment_carries_a_sanitized_filename() {
    let mut record = single(1);
    record.findings = "ok".into();
    record.flight.aircraft.owner_first_name = "Jos\u{e9} \"Pepe\"".into();
    let report = renderer()
        .render(&ReportRenderRequest::new(vec![record]).as_attachment())
        .unwrap();
    assert_eq!(
        report.content_disposition().as_deref(),
        Some("attachment; filename=\"2024-06-02 JosX Pepe Busch N7GA.pdf\"")
    );

    let inline = renderer()
        .render(&ReportRenderRequest::default())
        .unwrap();
    assert_eq!(inline.content_disposition(), None);
}

#[test]
fn ticket_body_overrides_client_comments() {
    let mut record = single(1);
    record.findings = "ok".into();
    record.client_comments = Some("record comment".into());
    let report = renderer()
        .render(&ReportRenderRequest::new(vec![record]).with_ticket_body("ticket comment"))
        .unwrap();
    let pages = page_contents(&report);
    assert!(pages[0].contains("(ticket comment) Tj"));
    assert!(!pages[0].contains("record comment"));
}

#[test]
fn json_requests_render_like_typed_ones() {
    let json = r#"{
        "records": [{
            "id": 5,
            "engine": 0,
            "flight": {
                "date": "2024-05-30",
                "aircraft": {
                    "owner_first_name": "Mike",
                    "owner_last_name": "Busch",
                    "registration": "N7GA"
                }
            },
            "findings": "Engine runs well"
        }],
        "attachment": true
    }"#;
    let report = renderer().render_json(json).unwrap();
    assert_eq!(report.page_count, 2);
    assert_eq!(
        report.filename.as_deref(),
        Some("2024-06-02 Mike Busch N7GA.pdf")
    );
}

#[test]
fn compressed_output_is_still_a_valid_pdf() {
    let mut record = single(1);
    record.findings = "Engine runs well".into();
    let renderer = ReportRenderer::builder()
        .report_date(NaiveDate::from_ymd_opt(2024, 6, 2).unwrap())
        .build()
        .unwrap();
    let compressed = renderer
        .render(&ReportRenderRequest::new(vec![record]))
        .unwrap();
    let info = inspect_pdf_bytes(&compressed.bytes).unwrap();
    assert_eq!(info.page_count, 2);
    assert_eq!(
        info.title.as_deref(),
        Some("Engine Monitor Data Analysis Report")
    );
    assert!(!String::from_utf8_lossy(&compressed.bytes).contains("Engine runs well"));
}

#[test]
fn registered_truetype_fonts_keep_text_outside_latin1() {
    let font_path = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fonts/DejaVuSansCondensed.ttf");
    let renderer = ReportRenderer::builder()
        .report_date(NaiveDate::from_ymd_opt(2024, 6, 2).unwrap())
        .compress_streams(false)
        .regular_font_file(font_path)
        .bold_font_file(font_path)
        .build()
        .unwrap();
    let mut record = single(1);
    record.flight.aircraft.owner_first_name = "\u{141}ukasz".into();
    record.flight.aircraft.owner_last_name = "\u{41f}\u{435}\u{442}\u{440}\u{43e}\u{432}".into();
    record.findings = "Cylinder \u{2116}3 \u{2248} 400\u{b0}F".into();
    let report = renderer
        .render(&ReportRenderRequest::new(vec![record.clone()]))
        .unwrap();

    let data = std::fs::read(font_path).unwrap();
    let face = ttf_parser::Face::parse(&data, 0).unwrap();
    let hex = |text: &str| {
        text.chars()
            .map(|ch| format!("{:04X}", face.glyph_index(ch).unwrap().0))
            .collect::<String>()
    };
    let pages = page_contents(&report);
    assert!(pages[0].contains(&format!("<{}> Tj", hex(&record.findings))));
    assert!(pages[0].contains(&format!(
        "<{}> Tj",
        hex(&record.flight.aircraft.owner_name())
    )));
    assert!(!pages[0].contains("?ukasz"));

    let raw = String::from_utf8_lossy(&report.bytes);
    assert!(raw.contains("/Encoding /Identity-H"));
    assert!(raw.contains("/ToUnicode"));
}
