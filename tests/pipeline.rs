use mdcomment::*;
use pretty_assertions::assert_eq;

const DOCUMENT: &str = "# This <!-- inline -->document

<!-- has a comment -->

<!--
has a multi-line comment 
-->

<!-- another 
multi-line 
comment -->

and a paragraph
";

fn processor(options: CommentOptions) -> Processor {
    Processor::with_comments(options)
}

#[test]
fn comments_are_dropped_by_default() {
    let out = processor(CommentOptions::default()).process(DOCUMENT).unwrap();
    assert_eq!(out, "# This document\n\nand a paragraph\n");
}

#[test]
fn comments_round_trip_with_ast() {
    let out = processor(CommentOptions::default().ast(true))
        .process(DOCUMENT)
        .unwrap();
    assert_eq!(out, DOCUMENT);
}

#[test]
fn tree_with_ast() {
    let tree = processor(CommentOptions::default().ast(true))
        .parse(DOCUMENT)
        .without_positions();
    let values: Vec<&str> = tree
        .children()
        .unwrap_or_default()
        .iter()
        .filter_map(|node| match node {
            Node::Comment(comment) => Some(comment.value.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(
        values,
        [
            "has a comment",
            "has a multi-line comment",
            "another \nmulti-line \ncomment"
        ]
    );

    let Some(Node::Heading(heading)) = tree.children().and_then(<[Node]>::first) else {
        panic!("expected a heading, got {tree:?}");
    };
    assert_eq!(heading.children.len(), 3);
    assert!(matches!(&heading.children[1], Node::Comment(c) if c.value == "inline"));
}

#[test]
fn html_without_comments() {
    let html = processor(CommentOptions::default())
        .render_html(DOCUMENT)
        .unwrap();
    assert_eq!(html, "<h1>This document</h1>\n<p>and a paragraph</p>");
}

#[test]
fn html_with_ast_keeps_separators() {
    let html = processor(CommentOptions::default().ast(true))
        .render_html(DOCUMENT)
        .unwrap();
    assert_eq!(html, "<h1>This document</h1>\n\n\n\n<p>and a paragraph</p>");
}

#[test]
fn comments_inside_inline_html() {
    let source = "# This <b><!-- inline --></b>document

<b><!-- has a comment --></b>

and a paragraph
";
    let html = processor(CommentOptions::default())
        .with_html_options(HtmlOptions::default().allow_dangerous_html(true))
        .render_html(source)
        .unwrap();
    assert_eq!(
        html,
        "<h1>This <b></b>document</h1>\n<p><b></b></p>\n<p>and a paragraph</p>"
    );
}

#[test]
fn hand_built_comment_is_escaped() {
    let processor = processor(CommentOptions::default());
    let node = Node::comment("No arrows like this: --> are allowed in a comment");
    assert_eq!(
        processor.stringify(&node).unwrap(),
        "<!--No arrows like this: --\\> are allowed in a comment-->\n"
    );
}

#[test]
fn flow_comment_between_blocks() {
    let processor = processor(CommentOptions::default());
    assert_eq!(
        processor.process("# H\n\n<!-- c -->\n\npara\n").unwrap(),
        "# H\n\npara\n"
    );
    assert_eq!(
        processor.parse("# H\n\n<!-- c -->\n\npara\n").without_positions(),
        Node::root(vec![
            Node::heading(1, vec![Node::text("H")]),
            Node::paragraph(vec![Node::text("para")]),
        ])
    );
}

#[test]
fn inline_comment_leaves_no_trace() {
    let processor = processor(CommentOptions::default());
    assert_eq!(
        processor.process("This <!-- x -->document").unwrap(),
        "This document\n"
    );
}

#[test]
fn inline_comment_spanning_lines() {
    let source = "a <!-- one\n\ntwo --> b\n";
    let processor = processor(CommentOptions::default().ast(true));
    let tree = processor.parse(source).without_positions();
    assert_eq!(
        tree,
        Node::root(vec![Node::paragraph(vec![
            Node::text("a "),
            Node::Comment(Comment {
                value: "one\n\ntwo".into(),
                raw: Some("<!-- one\n\ntwo -->".into()),
                position: None,
            }),
            Node::text(" b"),
        ])])
    );
    assert_eq!(processor.process(source).unwrap(), source);
}

#[test]
fn unclosed_comment_is_text() {
    let processor = processor(CommentOptions::default().ast(true));
    assert_eq!(
        processor.parse("a <!-- b").without_positions(),
        Node::root(vec![Node::paragraph(vec![Node::text("a <!-- b")])])
    );
    assert_eq!(processor.process("a <!-- b").unwrap(), "a &lt;!-- b\n");
}

#[test]
fn preserved_in_html_only() {
    let processor = processor(CommentOptions::default().preserve_html(true));
    assert_eq!(
        processor.render_html("a <!--x--> b").unwrap(),
        "<p>a <!--x--> b</p>"
    );
    assert_eq!(processor.process("a <!--x--> b").unwrap(), "a  b\n");
}

#[test]
fn preserved_comment_is_escaped_in_html() {
    let processor = processor(CommentOptions::default().preserve_html(true));
    let tree = Node::root(vec![Node::comment("a --> b")]);
    assert_eq!(
        to_html(&processor.project(&tree)).unwrap(),
        "<!--a --\\> b-->"
    );

    let tree = Node::root(vec![Node::comment("a--!>b")]);
    assert_eq!(
        to_html(&processor.project(&tree)).unwrap(),
        "<!--a--!\\>b-->"
    );
}

#[test]
fn dropped_from_html_by_default() {
    let processor = processor(CommentOptions::default());
    assert_eq!(processor.render_html("text<!-- x -->").unwrap(), "<p>text</p>");
}

#[test]
fn edited_comment_is_reserialized() {
    let processor = processor(CommentOptions::default().ast(true));
    let mut tree = processor.parse("<!--  spaced  -->\n");
    if let Some(Node::Comment(comment)) = tree.children_mut().and_then(|c| c.first_mut()) {
        comment.value = "edited".into();
    }
    assert_eq!(processor.stringify(&tree).unwrap(), "<!--edited-->\n");
}

#[test]
fn unclosed_openers_stay_linear() {
    let processor = processor(CommentOptions::default().ast(true));

    let source = "a <!-- ".repeat(20_000);
    let tree = processor.parse(&source).without_positions();
    assert_eq!(
        tree,
        Node::root(vec![Node::paragraph(vec![Node::text(source.trim_end())])])
    );

    let source = "<!--\n".repeat(20_000);
    let html = processor.render_html(&source).unwrap();
    assert_eq!(html.matches("&lt;!--").count(), 20_000);
}

#[test]
fn parse_from_reader() {
    let processor = processor(CommentOptions::default());
    let tree = processor
        .parse_reader(std::io::Cursor::new("para <!-- x -->\n"))
        .unwrap()
        .without_positions();
    assert_eq!(
        tree,
        Node::root(vec![Node::paragraph(vec![Node::text("para")])])
    );
}
