use preview_check::files::{extension, file_class, file_name, is_audio, is_image, is_video};

#[test]
fn extension_ignores_query_and_case() {
    assert_eq!(extension("report.DOCX"), "docx");
    assert_eq!(extension("/file/data/2018-10-21/238639489453391872.docx"), "docx");
    assert_eq!(extension("https://cdn.local/a/b.PNG?x=1.jpg#top"), "png");
    assert_eq!(extension("archive.tar.gz"), "gz");
    assert_eq!(extension("README"), "");
    assert_eq!(extension("/dir.v2/README"), "");
}

#[test]
fn maps_extensions_to_css_classes() {
    assert_eq!(file_class("a.jpeg"), "file-type-jpg");
    assert_eq!(file_class("slides.pptx"), "file-type-ppt");
    assert_eq!(file_class("data.xls"), "file-type-excel");
    assert_eq!(file_class("bundle.7z"), "file-type-zip");
    assert_eq!(file_class("notes.txt"), "file-type-other");
    assert_eq!(file_class("noext"), "file-type-other");
}

#[test]
fn media_predicates() {
    assert!(is_image("photo.GIF"));
    assert!(!is_image("photo.svg"));
    assert!(is_audio("song.mp3"));
    assert!(is_video("http://x.local/clip.mp4?t=3"));
    assert!(!is_video("clip.mp3"));
}

#[test]
fn file_name_is_last_segment() {
    assert_eq!(file_name("http://x.local/file/download/a.pdf?v=2").as_deref(), Some("a.pdf"));
    assert_eq!(file_name("http://x.local/").as_deref(), None);
}
