#![cfg(unix)]

mod common;

use common::{create_fixture, plain_options, render_plain};
use std::fs;
use std::os::unix::fs::symlink;

#[test]
fn test_terminal_control_chars_are_sanitized_in_rendered_output() {
    let tmp = create_fixture(&[]);
    fs::write(tmp.path().join("evil\u{001B}[31mname\twith\ncontrols"), "").unwrap();
    symlink(
        "target\r\u{001B}[2J",
        tmp.path().join("link\u{001B}]0;title\u{0007}"),
    )
    .unwrap();

    let lines = render_plain(tmp.path(), &plain_options());
    assert_eq!(lines.len(), 2);

    for rendered in &lines {
        // No raw ESC/control chars should remain in rendered lines.
        assert!(!rendered.contains('\u{001B}'), "{rendered:?}");
        assert!(!rendered.contains('\u{0007}'), "{rendered:?}");
        assert!(!rendered.contains('\n'), "{rendered:?}");
        assert!(!rendered.contains('\r'), "{rendered:?}");
        assert!(!rendered.contains('\t'), "{rendered:?}");
        assert!(rendered.contains("\\x1B"), "{rendered:?}");
    }

    // Escaped forms should be visible for debugging/auditing.
    let all = lines.join("|");
    assert!(all.contains("\\n"));
    assert!(all.contains("\\r"));
    assert!(all.contains("\\t"));
    assert!(all.contains("\\x07"));
}
