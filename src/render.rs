//! Documents handed to the prompt-assembly layer.

use std::fmt::Write as _;
use std::io::Cursor;

use anyhow::{Context, Result};
use quick_xml::escape::partial_escape;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::resolver::ResolutionResult;
use crate::signature::SignatureView;
use crate::tree::SourceTree;

/// `<code_map>` document listing each file's signature view.
pub fn render_code_map(views: &[SignatureView]) -> Result<String> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    writer.write_event(Event::Start(BytesStart::new("code_map")))?;
    for view in views {
        writer.write_event(Event::Start(BytesStart::new("file")))?;
        write_text_element(&mut writer, "path", &view.path)?;
        write_text_element(&mut writer, "file_map", &view.content)?;
        writer.write_event(Event::End(BytesEnd::new("file")))?;
    }
    writer.write_event(Event::End(BytesEnd::new("code_map")))?;

    let bytes = writer.into_inner().into_inner();
    String::from_utf8(bytes).context("code map is not valid UTF-8")
}

fn write_text_element(writer: &mut Writer<Cursor<Vec<u8>>>, name: &str, text: &str) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::from_escaped(partial_escape(text))))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

/// Plain-text blocks, one per file, sorted by path. Each block is
/// `File: <path>`, then `Content:`, then the content wrapped in triple
/// backticks, then a blank line.
pub fn render_file_blocks(files: &[(String, String)]) -> String {
    let mut sorted: Vec<&(String, String)> = files.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));

    let mut out = String::new();
    for (path, content) in sorted {
        let _ = write!(out, "File: {path}\nContent:\n```{content}```\n\n");
    }
    out
}

/// Full, unreduced contents of every resolved path.
pub fn read_full_contents<T>(tree: &T, resolved: &ResolutionResult) -> Result<Vec<(String, String)>>
where
    T: SourceTree + ?Sized,
{
    resolved
        .paths()
        .map(|path| -> Result<(String, String)> {
            let bytes = tree
                .read(std::path::Path::new(path))
                .with_context(|| format!("Failed to read {path}"))?;
            Ok((path.to_string(), String::from_utf8_lossy(&bytes).into_owned()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_map_escapes_markup() {
        let views = vec![SignatureView {
            path: "a.go".to_string(),
            content: "func Less(a, b int) bool // a < b && \"ok\"".to_string(),
        }];
        let xml = render_code_map(&views).unwrap();
        assert_eq!(
            xml,
            "<code_map><file><path>a.go</path><file_map>func Less(a, b int) bool // a &lt; b &amp;&amp; \"ok\"</file_map></file></code_map>"
        );
    }

    #[test]
    fn file_blocks_are_sorted() {
        let files = vec![
            ("b.py".to_string(), "x = 1\n".to_string()),
            ("a.py".to_string(), "y = 2\n".to_string()),
        ];
        assert_eq!(
            render_file_blocks(&files),
            "File: a.py\nContent:\n```y = 2\n```\n\nFile: b.py\nContent:\n```x = 1\n```\n\n"
        );
    }
}
