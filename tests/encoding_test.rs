use page_digest::encoding::{decode_html, detect_encoding};
use page_digest::{extract_bytes, Options};

/// Enough plain words to clear the default quality checks.
const FILLER: &str = "The valley road winds past orchards and small farms before \
    reaching the old stone bridge over the river, where travellers often stop to rest \
    and watch the water move slowly toward the distant harbour town below.";

fn options() -> Options {
    Options::lenient()
}

#[test]
fn utf8_content_handled_correctly() {
    let html = "\
        <html>\
        <head><meta charset=\"utf-8\"></head>\
        <body>\
            <article>\
                <h1>Test Article</h1>\
                <p>This is UTF-8 content with special characters: é, ñ, ü, 中文</p>\
            </article>\
        </body>\
        </html>\
    "
    .as_bytes();

    let content = extract_bytes(html, None, &options()).expect("extraction failed");

    assert!(content.contains("Test Article"));
    assert!(content.contains("é"));
    assert!(content.contains("中文"));
}

#[test]
fn iso88591_converted_to_utf8() {
    // é = 0xE9, ñ = 0xF1, ü = 0xFC in ISO-8859-1
    let html = b"<html>\
        <head><meta charset=\"ISO-8859-1\"></head>\
        <body><article>\
            <h1>Caf\xE9 espa\xF1ol</h1>\
            <p>M\xFCnchen</p>\
        </article></body></html>";

    let content = extract_bytes(html, None, &options()).expect("extraction failed");

    assert!(content.contains("Café"));
    assert!(content.contains("español"));
    assert!(content.contains("München"));
}

#[test]
fn header_charset_overrides_meta() {
    let html = b"<html><head><meta charset=\"utf-8\"></head><body><p>Caf\xE9</p></body></html>";

    let content = extract_bytes(html, Some("text/html; charset=windows-1252"), &options())
        .expect("extraction failed");
    assert_eq!(content, "Café");
}

#[test]
fn windows1252_smart_quotes() {
    let html = b"<html>\
        <head><meta http-equiv=\"Content-Type\" content=\"text/html; charset=windows-1252\"></head>\
        <body><article><p>\x93Smart quotes\x94</p></article></body></html>";

    let content = extract_bytes(html, None, &options()).expect("extraction failed");
    assert_eq!(content, "\u{201c}Smart quotes\u{201d}");
}

#[test]
fn utf8_assumed_when_no_charset() {
    let html = b"<html><body><p>No charset specified</p></body></html>";
    assert_eq!(detect_encoding(html, None).name(), "UTF-8");
    assert_eq!(detect_encoding(html, Some("text/html")).name(), "UTF-8");
}

#[test]
fn invalid_utf8_replaced_not_rejected() {
    let html = b"<html><body><p>Valid \xFF\xFE text</p></body></html>";
    let decoded = decode_html(html, None);
    assert!(decoded.contains('\u{FFFD}'));
    assert!(decoded.contains("text"));
}

#[test]
fn default_options_apply_after_decoding() {
    let html = format!(
        "<html><head><meta charset=\"windows-1252\"></head><body><article><p>{FILLER}</p><p>{FILLER}</p></article></body></html>"
    );
    let (bytes, _, _) = encoding_rs::WINDOWS_1252.encode(&html);

    let content = extract_bytes(&bytes, None, &Options::default()).expect("extraction failed");
    assert!(content.starts_with("The valley road"));
}
