//! Integration tests for pdf-core
//!
//! These tests verify end-to-end functionality with real PDF operations.

use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use pdf_core::{
    Align, BuiltinFont, Color, Corners, ImageOptions, Layer, PageSize, PdfDocument, PdfError,
    ShapeStyle,
};
use pretty_assertions::assert_eq;

/// Create a minimal valid PDF with multiple pages for testing
///
/// Every page draws a short text run so background/foreground ordering can
/// be checked against existing content.
fn create_test_pdf_with_pages(page_count: usize) -> Vec<u8> {
    let mut doc = Document::new();

    let pages_id = doc.add_object(dictionary! {
        "Type" => "Pages",
        "Count" => page_count as i64,
        "Kids" => vec![],
    });

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    // Shared, indirect resources as many real-world producers write them
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut page_ids = Vec::new();
    for _ in 0..page_count {
        let contents_id = doc.add_object(lopdf::Stream::new(
            dictionary! {},
            b"BT /F1 12 Tf 72 720 Td (Question 1) Tj ET".to_vec(),
        ));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.28.into(), 841.89.into()],
            "Resources" => resources_id,
            "Contents" => contents_id,
        });
        page_ids.push(page_id);
    }

    let mut pages_dict = doc.get_object(pages_id).unwrap().as_dict().unwrap().clone();
    pages_dict.set(
        "Kids",
        Object::Array(page_ids.into_iter().map(|id| id.into()).collect()),
    );
    doc.objects.insert(pages_id, pages_dict.into());

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

/// Create a 16x16 logo PNG with a transparent border
fn create_test_png() -> Vec<u8> {
    use image::{ImageBuffer, Rgba, RgbaImage};

    let mut img: RgbaImage = ImageBuffer::new(16, 16);
    for x in 4..12 {
        for y in 4..12 {
            img.put_pixel(x, y, Rgba([224, 141, 60, 255]));
        }
    }
    let mut buffer = Vec::new();
    img.write_to(
        &mut std::io::Cursor::new(&mut buffer),
        image::ImageFormat::Png,
    )
    .expect("Failed to create PNG");
    buffer
}

/// Load a generated PDF, change it and serialize it again
fn modify_pdf(data: Vec<u8>, change: impl FnOnce(&mut Document)) -> Vec<u8> {
    let mut doc = Document::load_mem(&data).unwrap();
    change(&mut doc);
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

fn page_dict(doc: &Document, page: u32) -> lopdf::Dictionary {
    let page_id = doc.get_pages()[&page];
    doc.get_object(page_id).unwrap().as_dict().unwrap().clone()
}

fn page_content(doc: &Document, page: u32) -> String {
    let page_id = doc.get_pages()[&page];
    String::from_utf8_lossy(&doc.get_page_content(page_id).unwrap()).into_owned()
}

fn page_resources(doc: &Document, page: u32) -> lopdf::Dictionary {
    let page_id = doc.get_pages()[&page];
    let page_dict = doc.get_object(page_id).unwrap().as_dict().unwrap();
    page_dict
        .get(b"Resources")
        .unwrap()
        .as_dict()
        .unwrap()
        .clone()
}

#[test]
fn test_open_save_roundtrip() {
    let pdf_data = create_test_pdf_with_pages(1);

    let mut doc = PdfDocument::open_from_bytes(&pdf_data).expect("Failed to open PDF");
    assert_eq!(doc.page_count(), 1);

    let saved_data = doc.to_bytes().expect("Failed to save PDF");
    let doc2 = PdfDocument::open_from_bytes(&saved_data).expect("Failed to re-open PDF");
    assert_eq!(doc2.page_count(), 1);
}

#[test]
fn test_insert_text_keeps_existing_resources() {
    let pdf_data = create_test_pdf_with_pages(1);
    let mut doc = PdfDocument::open_from_bytes(&pdf_data).unwrap();

    doc.set_font(BuiltinFont::Helvetica, 9.0);
    doc.insert_text("Page 1 of 1", 1, 30.0, 811.89, Align::Left)
        .unwrap();

    let saved = Document::load_mem(&doc.to_bytes().unwrap()).unwrap();
    let fonts = page_resources(&saved, 1)
        .get(b"Font")
        .unwrap()
        .as_dict()
        .unwrap()
        .clone();
    assert!(fonts.get(b"F1").is_ok(), "original font resource lost");
    assert!(fonts.get(b"XpF1").is_ok());

    let content = page_content(&saved, 1);
    assert!(content.contains("(Question 1) Tj"));
    assert!(content.contains("/XpF1 9 Tf"));
    assert!(content.contains("30 30 Td"));
    assert!(content.contains("(Page 1 of 1) Tj"));
}

#[test]
fn test_insert_text_alignment() {
    let mut doc = PdfDocument::create(1, PageSize::A4).unwrap();
    doc.set_font(BuiltinFont::Helvetica, 10.0);
    doc.set_text_color(Color::blue());

    // "Page" is 23.35pt wide at 10pt
    assert!((doc.get_text_width("Page") - 23.35).abs() < 1e-9);
    doc.insert_text("Page", 1, 100.0, 100.0, Align::Right).unwrap();

    let saved = Document::load_mem(&doc.to_bytes().unwrap()).unwrap();
    let content = page_content(&saved, 1);
    assert!(content.contains("76.65 741.89 Td"));
    assert!(content.contains("0 0 1 rg"));
}

#[test]
fn test_empty_text_is_noop() {
    let mut doc = PdfDocument::create(1, PageSize::A4).unwrap();
    doc.insert_text("", 1, 100.0, 100.0, Align::Left).unwrap();

    let saved = Document::load_mem(&doc.to_bytes().unwrap()).unwrap();
    assert_eq!(page_content(&saved, 1), "");
}

#[test]
fn test_invalid_page_number() {
    let mut doc = PdfDocument::create(2, PageSize::A4).unwrap();

    let result = doc.insert_text("Hello", 3, 100.0, 100.0, Align::Left);
    assert!(matches!(result, Err(PdfError::InvalidPage(3, 2))));

    let result = doc.draw_rect(0, 0.0, 0.0, 10.0, 10.0, &ShapeStyle::default());
    assert!(matches!(result, Err(PdfError::InvalidPage(0, 2))));
}

#[test]
fn test_shapes_in_call_order() {
    let mut doc = PdfDocument::create(1, PageSize::A4).unwrap();
    let header = ShapeStyle::filled(Color::from_rgb(0xf4, 0xf6, 0xf9));
    doc.draw_rect(1, 0.0, 0.0, 595.28, 110.0, &header).unwrap();
    doc.draw_line(1, 0.0, 110.0, 595.28, 110.0, Color::black(), 3.0)
        .unwrap();
    doc.draw_rounded_rect(
        1,
        20.0,
        200.0,
        260.0,
        120.0,
        8.0,
        Corners::All,
        &ShapeStyle::filled(Color::white()).with_stroke(Color::gray(0.8), 1.0),
    )
    .unwrap();
    doc.draw_circle(1, 30.0, 815.89, 12.0, &ShapeStyle::filled(Color::black()))
        .unwrap();

    let saved = Document::load_mem(&doc.to_bytes().unwrap()).unwrap();
    let content = page_content(&saved, 1);

    let rect = content.find("0 731.89 595.28 110 re").unwrap();
    let line = content.find("0 731.89 m").unwrap();
    let rounded = content.find("28 521.89 m").unwrap();
    let circle = content.find("42 26 m").unwrap();
    assert!(rect < line && line < rounded && rounded < circle);
}

#[test]
fn test_insert_image_png_with_soft_mask() {
    let mut doc = PdfDocument::create(1, PageSize::A4).unwrap();
    doc.insert_image(&create_test_png(), 1, 20.0, 10.0, 65.0, 65.0)
        .unwrap();

    let saved = Document::load_mem(&doc.to_bytes().unwrap()).unwrap();
    let xobjects = page_resources(&saved, 1)
        .get(b"XObject")
        .unwrap()
        .as_dict()
        .unwrap()
        .clone();
    let image_id = xobjects.get(b"XpIm1").unwrap().as_reference().unwrap();
    let image = saved.get_object(image_id).unwrap().as_stream().unwrap();
    assert!(image.dict.get(b"SMask").is_ok());

    let content = page_content(&saved, 1);
    assert!(content.contains("65 0 0 65 20 766.89 cm"));
}

#[test]
fn test_image_fit_box_is_centered() {
    use image::{ImageBuffer, Rgba, RgbaImage};

    // 2:1 image into a square box
    let wide: RgbaImage = ImageBuffer::from_pixel(20, 10, Rgba([0, 0, 0, 255]));
    let mut doc = PdfDocument::create(1, PageSize::A4).unwrap();
    doc.insert_rgba_image(&wide, 1, 100.0, 100.0, 300.0, 300.0, &ImageOptions::fit_box())
        .unwrap();

    let saved = Document::load_mem(&doc.to_bytes().unwrap()).unwrap();
    let content = page_content(&saved, 1);
    // 300x150, pushed 75pt down inside the box: bottom edge at 841.89 - 325
    assert!(content.contains("300 0 0 150 100 516.89 cm"));
}

#[test]
fn test_image_deduplication() {
    let png = create_test_png();
    let mut doc = PdfDocument::create(2, PageSize::A4).unwrap();
    doc.insert_image(&png, 1, 0.0, 0.0, 10.0, 10.0).unwrap();
    doc.insert_image(&png, 2, 0.0, 0.0, 10.0, 10.0).unwrap();
    doc.insert_image(&png, 2, 50.0, 0.0, 10.0, 10.0).unwrap();

    let saved = Document::load_mem(&doc.to_bytes().unwrap()).unwrap();
    let images: Vec<_> = saved
        .objects
        .values()
        .filter_map(|obj| obj.as_stream().ok())
        .filter(|s| {
            s.dict.get(b"Subtype").and_then(Object::as_name).ok() == Some(b"Image".as_slice())
                && s.dict.get(b"SMask").is_ok()
        })
        .collect();
    assert_eq!(images.len(), 1);
}

#[test]
fn test_background_layer_goes_under_existing_content() {
    let pdf_data = create_test_pdf_with_pages(1);
    let mut doc = PdfDocument::open_from_bytes(&pdf_data).unwrap();

    let options = ImageOptions::fit_box()
        .with_opacity(0.15)
        .with_layer(Layer::Background);
    doc.insert_image_with(&create_test_png(), 1, 147.64, 270.945, 300.0, 300.0, &options)
        .unwrap();
    doc.draw_line(1, 20.0, 796.89, 575.28, 796.89, Color::black(), 0.5)
        .unwrap();

    let saved = Document::load_mem(&doc.to_bytes().unwrap()).unwrap();
    let content = page_content(&saved, 1);

    let watermark = content.find("/XpIm").unwrap();
    let original = content.find("(Question 1) Tj").unwrap();
    let separator = content.find("20 45 m").unwrap();
    assert!(watermark < original && original < separator);
    assert!(content.contains("gs\n"));

    let gstates = page_resources(&saved, 1)
        .get(b"ExtGState")
        .unwrap()
        .as_dict()
        .unwrap()
        .clone();
    let (_, gs_ref) = gstates.iter().next().unwrap();
    let gs = saved
        .get_object(gs_ref.as_reference().unwrap())
        .unwrap()
        .as_dict()
        .unwrap();
    let ca = gs.get(b"ca").unwrap().as_f32().unwrap();
    assert!((ca - 0.15).abs() < 1e-6);
}

#[test]
fn test_save_refuses_to_overwrite_source() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("paper.pdf");
    std::fs::write(&source, create_test_pdf_with_pages(1)).unwrap();
    let original = std::fs::read(&source).unwrap();

    let mut doc = PdfDocument::open(&source).unwrap();
    doc.insert_text("Page 1 of 1", 1, 30.0, 30.0, Align::Left)
        .unwrap();

    let result = doc.save(&source);
    assert!(matches!(result, Err(PdfError::SourceOverwrite(_))));
    assert_eq!(std::fs::read(&source).unwrap(), original);

    let target = dir.path().join("BRANDED_paper.pdf");
    doc.save(&target).unwrap();
    assert_eq!(PdfDocument::open(&target).unwrap().page_count(), 1);
}

#[test]
fn test_open_missing_file() {
    let result = PdfDocument::open("/nonexistent/paper.pdf");
    assert!(matches!(result, Err(PdfError::OpenError(_))));
}

#[test]
fn test_original_content_streams_are_not_reencoded() {
    let opaque = b"\x80\x81 not a decodable stream \xfe".to_vec();
    let mut original_id: Option<ObjectId> = None;
    let pdf_data = modify_pdf(create_test_pdf_with_pages(1), |doc| {
        let contents = page_dict(doc, 1).get(b"Contents").unwrap().as_reference().unwrap();
        let stream = Stream::new(dictionary! { "Filter" => "JBIG2Decode" }, opaque.clone());
        doc.objects.insert(contents, Object::Stream(stream));
        original_id = Some(contents);
    });
    let original_id = original_id.unwrap();

    let mut doc = PdfDocument::open_from_bytes(&pdf_data).unwrap();
    let background = ImageOptions::default().with_layer(Layer::Background);
    doc.insert_image_with(&create_test_png(), 1, 100.0, 100.0, 50.0, 50.0, &background)
        .unwrap();
    doc.draw_line(1, 20.0, 796.89, 575.28, 796.89, Color::black(), 0.5)
        .unwrap();

    let saved = Document::load_mem(&doc.to_bytes().unwrap()).unwrap();
    let contents = page_dict(&saved, 1)
        .get(b"Contents")
        .unwrap()
        .as_array()
        .unwrap()
        .clone();
    // background, q, original, Q + foreground
    assert_eq!(contents.len(), 4);
    assert_eq!(contents[2].as_reference().unwrap(), original_id);

    let kept = saved.get_object(original_id).unwrap().as_stream().unwrap();
    assert_eq!(kept.content, opaque);
    assert_eq!(
        kept.dict.get(b"Filter").unwrap().as_name().unwrap(),
        b"JBIG2Decode".as_slice()
    );
}

#[test]
fn test_contents_array_parts_are_all_kept() {
    let pdf_data = modify_pdf(create_test_pdf_with_pages(1), |doc| {
        let page_id = doc.get_pages()[&1];
        let first = page_dict(doc, 1).get(b"Contents").unwrap().clone();
        let second = doc.add_object(Stream::new(
            dictionary! {},
            b"BT /F1 12 Tf 72 700 Td (Question 2) Tj ET".to_vec(),
        ));
        let mut dict = page_dict(doc, 1);
        dict.set("Contents", vec![first, second.into()]);
        doc.objects.insert(page_id, dict.into());
    });

    let mut doc = PdfDocument::open_from_bytes(&pdf_data).unwrap();
    doc.insert_text("Page 1 of 1", 1, 30.0, 811.89, Align::Left)
        .unwrap();

    let saved = Document::load_mem(&doc.to_bytes().unwrap()).unwrap();
    let content = page_content(&saved, 1);
    let first = content.find("(Question 1) Tj").unwrap();
    let second = content.find("(Question 2) Tj").unwrap();
    let footer = content.find("(Page 1 of 1) Tj").unwrap();
    assert!(first < second && second < footer);
}

#[test]
fn test_rotated_page_draws_in_visible_orientation() {
    let pdf_data = modify_pdf(create_test_pdf_with_pages(1), |doc| {
        let page_id = doc.get_pages()[&1];
        let mut dict = page_dict(doc, 1);
        dict.set("Rotate", 90i64);
        doc.objects.insert(page_id, dict.into());
    });

    let mut doc = PdfDocument::open_from_bytes(&pdf_data).unwrap();
    let size = doc.page_size(1).unwrap();
    assert!((size.width - 841.89).abs() < 0.01);
    assert!((size.height - 595.28).abs() < 0.01);

    // Footer 30pt above the visible bottom edge
    doc.insert_text("Page 1 of 1", 1, 30.0, size.height - 30.0, Align::Left)
        .unwrap();

    let saved = Document::load_mem(&doc.to_bytes().unwrap()).unwrap();
    let content = page_content(&saved, 1);
    assert!(content.contains("0 1 -1 0 595.28 0 cm"));
    assert!(content.contains("30 30 Td"));
}

#[test]
fn test_rotation_inherited_from_page_tree() {
    let pdf_data = modify_pdf(create_test_pdf_with_pages(2), |doc| {
        let pages_id = doc.catalog().unwrap().get(b"Pages").unwrap().as_reference().unwrap();
        let mut pages = doc.get_object(pages_id).unwrap().as_dict().unwrap().clone();
        pages.set("Rotate", 270i64);
        doc.objects.insert(pages_id, pages.into());
    });

    let doc = PdfDocument::open_from_bytes(&pdf_data).unwrap();
    for page in 1..=2 {
        let size = doc.page_size(page).unwrap();
        assert!(size.width > size.height, "page {page} not landscape");
    }
}

#[test]
fn test_failed_save_leaves_nothing_behind() {
    let dir = tempfile::tempdir().unwrap();
    let mut doc = PdfDocument::create(1, PageSize::A4).unwrap();

    let missing_dir = dir.path().join("not_created").join("paper.pdf");
    assert!(matches!(doc.save(&missing_dir), Err(PdfError::SaveError(_))));
    assert!(!missing_dir.exists());

    let target = dir.path().join("paper.pdf");
    doc.save(&target).unwrap();
    let entries: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name())
        .collect();
    assert_eq!(entries, vec![std::ffi::OsString::from("paper.pdf")]);
}
