use comrak::plugins::syntect::SyntectAdapter;
use comrak::{ComrakOptions, ComrakPlugins, markdown_to_html_with_plugins};
use once_cell::sync::Lazy;

static MARKDOWN_OPTIONS: Lazy<ComrakOptions> = Lazy::new(|| {
    let mut options = ComrakOptions::default();
    options.extension.table = true;
    options.extension.strikethrough = true;
    options.extension.tasklist = true;
    options.extension.autolink = true;
    // Bot output is untrusted: raw HTML is shown as text, single newlines break lines.
    options.render.escape = true;
    options.render.hardbreaks = true;
    options
});

thread_local! {
    // Loading the syntax sets is slow and this runs on every typing frame.
    static SYNTAX_ADAPTER: SyntectAdapter = SyntectAdapter::new(Some("base16-ocean.dark"));
}

/// Renders a bot answer (or a partial one mid-animation) to HTML.
pub fn render_markdown(md: &str) -> String {
    SYNTAX_ADAPTER.with(|adapter| {
        let mut plugins = ComrakPlugins::default();
        plugins.render.codefence_syntax_highlighter = Some(adapter);
        markdown_to_html_with_plugins(md, &MARKDOWN_OPTIONS, &plugins)
            .trim_end()
            .to_string()
    })
}

/// User text is shown verbatim: escaped, with line breaks preserved.
pub fn render_user_text(text: &str) -> String {
    escape_html(text).replace('\n', "<br>")
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Text content of an HTML fragment, used for copy-to-clipboard.
pub fn plain_text(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;
    let mut tag = String::new();
    for ch in html.chars() {
        match ch {
            '<' => {
                in_tag = true;
                tag.clear();
            }
            '>' if in_tag => {
                in_tag = false;
                let closing = tag.starts_with('/');
                let name = tag
                    .trim_start_matches('/')
                    .split(|c: char| c.is_whitespace() || c == '/')
                    .next()
                    .unwrap_or_default()
                    .to_ascii_lowercase();
                let breaks = name == "br"
                    || (closing && matches!(name.as_str(), "p" | "li" | "pre" | "h1" | "h2" | "h3"));
                if breaks && !text.is_empty() && !text.ends_with('\n') {
                    text.push('\n');
                }
            }
            _ if in_tag => tag.push(ch),
            _ => text.push(ch),
        }
    }
    decode_entities(text.trim())
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}
