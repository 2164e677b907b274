//! Tests for idiom validation, segmentation and scene extraction.

use parable_core::{
    MediaType, SceneExtractor, SentenceSceneExtractor, SentenceSegmenter, TextSegmenter,
    validate_idiom,
};
use parable_error::InputErrorKind;

#[test]
fn test_validate_idiom_rejects_empty() {
    let err = validate_idiom("   ").unwrap_err();
    assert_eq!(err.kind, InputErrorKind::EmptyIdiom);
}

#[test]
fn test_validate_idiom_rejects_path_escape() {
    for idiom in ["a/b", "a\\b", "..", "守株..待兔"] {
        let err = validate_idiom(idiom).unwrap_err();
        assert!(matches!(err.kind, InputErrorKind::InvalidIdiom { .. }), "{idiom}");
    }
}

#[test]
fn test_segmenter_respects_bound_and_order() {
    let segmenter = SentenceSegmenter::new(10);
    let text = "宋国有个农夫。他每天在田里劳作！有一天，一只兔子撞死在树桩上。农夫很高兴？";
    let segments = segmenter.segment(text);

    assert!(!segments.is_empty());
    for (i, segment) in segments.iter().enumerate() {
        assert_eq!(*segment.index(), i);
        assert!(segment.char_count() <= 10, "segment {} too long", i);
    }
    let rejoined: String = segments.iter().map(|s| s.text().as_str()).collect();
    assert_eq!(rejoined, text.replace(' ', ""));
}

#[test]
fn test_segmenter_keeps_unterminated_tail() {
    let segmenter = SentenceSegmenter::new(100);
    let segments = segmenter.segment("First sentence. trailing words");
    assert_eq!(segments.len(), 1);
    assert_eq!(segments[0].text(), "First sentence.trailing words");
}

#[test]
fn test_segmenter_empty_text() {
    let segmenter = SentenceSegmenter::new(100);
    assert!(segmenter.segment("").is_empty());
}

#[tokio::test]
async fn test_scene_extractor_caps_scene_count() {
    let extractor = SentenceSceneExtractor;
    let text = "一。二。三。四。五。";

    let scenes = extractor.extract(text, 3).await.unwrap();
    assert_eq!(scenes, vec!["一。二。", "三。四。", "五。"]);

    let scenes = extractor.extract(text, 15).await.unwrap();
    assert_eq!(scenes.len(), 5);
}

#[test]
fn test_media_file_names() {
    assert_eq!(MediaType::Image.file_name("守株待兔", 3), "守株待兔_03.jpg");
    assert_eq!(MediaType::Audio.file_name("守株待兔", 0), "守株待兔_01.mp3");
    assert_eq!(MediaType::Video.file_name("守株待兔", 0), "守株待兔_story.mp4");
    assert_eq!(MediaType::Video.directory(), "videos");
}
