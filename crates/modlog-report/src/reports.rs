//! HTML rendering of a [`Report`].

use crate::aggregations::{Entry, Report};
use modlog_core::types::ActionType;

/// Render the report as HTML-flavored markup.
///
/// Messengers appear in report order. Within a messenger, notes always come
/// after the counters, which otherwise keep their order. Unscoped notes close
/// the report under "Weiteres".
pub fn render_html(report: &Report) -> String {
    let mut out = String::new();

    for (messenger, summary) in report.messengers() {
        out.push_str(&format!("<b>{}:</b><br />\n", messenger.label()));

        let mut entries: Vec<&(ActionType, Entry)> = summary.entries().iter().collect();
        entries.sort_by_key(|(kind, _)| *kind == ActionType::Note);

        for (kind, entry) in entries {
            match entry {
                Entry::Count(n) => {
                    out.push_str(&format!("{}: {}<br />\n", kind.label(), n));
                }
                Entry::Notes(notes) => {
                    out.push_str(&format!("{}:<br /><ul>", kind.label()));
                    push_items(&mut out, notes);
                    out.push_str("</ul>\n");
                }
            }
        }
    }

    if let Some(global) = report.global() {
        out.push_str("<br/>\n<b>Weiteres: </b><ul>\n");
        push_items(&mut out, global);
        out.push_str("</ul>");
    }

    out
}

fn push_items(out: &mut String, items: &[String]) {
    for item in items {
        out.push_str("<li>");
        out.push_str(&escape_html(item));
        out.push_str("</li>\n");
    }
}

fn escape_html(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
