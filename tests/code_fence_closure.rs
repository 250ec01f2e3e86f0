mod support;

use streamark::{BlockKind, BlockMeta, Options, ParseEvent};

fn parse(text: &str) -> Vec<ParseEvent> {
    support::run_chunks(support::chunk_whole(text), Options::default())
}

fn fence_meta(events: &[ParseEvent]) -> (Option<String>, Vec<(String, String)>) {
    events
        .iter()
        .find_map(|e| match e {
            ParseEvent::Begin {
                meta: Some(BlockMeta::CodeFence { language, attrs }),
                ..
            } => Some((language.clone(), attrs.clone())),
            _ => None,
        })
        .unwrap()
}

#[test]
fn fence_language_and_attributes_arrive_with_begin() {
    let events = parse("```python title=demo lines=3\nprint(1)\n```\n");
    let (language, attrs) = fence_meta(&events);
    assert_eq!(language.as_deref(), Some("python"));
    assert_eq!(
        attrs,
        vec![
            ("title".to_string(), "demo".to_string()),
            ("lines".to_string(), "3".to_string())
        ]
    );
    assert_eq!(
        support::final_blocks(&events),
        vec![(BlockKind::CodeFence, "print(1)\n".to_string())]
    );
}

#[test]
fn malformed_attribute_tokens_are_dropped_not_fatal() {
    let events = parse("```rust title=ok bad==x =v\nfn main() {}\n```\n");
    let (language, attrs) = fence_meta(&events);
    assert_eq!(language.as_deref(), Some("rust"));
    assert_eq!(attrs, vec![("title".to_string(), "ok".to_string())]);
}

#[test]
fn fence_content_is_verbatim_markers_excluded() {
    let blocks = support::final_blocks(&parse("```\n# not a heading\n> not a quote\n```\n"));
    assert_eq!(
        blocks,
        vec![(
            BlockKind::CodeFence,
            "# not a heading\n> not a quote\n".to_string()
        )]
    );
}

#[test]
fn closing_fence_must_be_at_least_as_long() {
    let blocks = support::final_blocks(&parse("````\ncode with ``` inside\n````\n"));
    assert_eq!(
        blocks,
        vec![(BlockKind::CodeFence, "code with ``` inside\n".to_string())]
    );
}

#[test]
fn tilde_fences_close_on_tildes_only() {
    let blocks = support::final_blocks(&parse("~~~\nsome ``` text\n~~~\n"));
    assert_eq!(
        blocks,
        vec![(BlockKind::CodeFence, "some ``` text\n".to_string())]
    );
}

#[test]
fn indented_fence_strips_its_indentation_from_content() {
    let blocks = support::final_blocks(&parse("  ```\n  indented\n    deeper\n  ```\n"));
    assert_eq!(
        blocks,
        vec![(BlockKind::CodeFence, "indented\n  deeper\n".to_string())]
    );
}

#[test]
fn unterminated_fence_closes_gracefully_at_finalize() {
    let blocks = support::final_blocks(&parse("```js\nconsole.log(1)\n"));
    assert_eq!(
        blocks,
        vec![(BlockKind::CodeFence, "console.log(1)\n".to_string())]
    );
}

#[test]
fn fence_info_string_split_across_chunks_is_intact() {
    let events = support::run_chunks(
        vec![
            "```py".to_string(),
            "thon title=de".to_string(),
            "mo\nx = 1\n```\n".to_string(),
        ],
        Options::default(),
    );
    let (language, attrs) = fence_meta(&events);
    assert_eq!(language.as_deref(), Some("python"));
    assert_eq!(attrs, vec![("title".to_string(), "demo".to_string())]);
    assert_eq!(
        support::final_blocks(&events),
        vec![(BlockKind::CodeFence, "x = 1\n".to_string())]
    );
}

#[test]
fn blank_lines_inside_a_fence_are_content() {
    let blocks = support::final_blocks(&parse("```\na\n\nb\n```\n"));
    assert_eq!(blocks, vec![(BlockKind::CodeFence, "a\n\nb\n".to_string())]);
}
