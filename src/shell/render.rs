//! HTML for the single page.

use crate::search::SearchResultItem;
use crate::session::{AnalysisOutcome, Session};
use crate::upload::UploadFormat;
use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd, html};
use std::fmt::Write as _;

const TITLE: &str = "Medical Imaging Diagnosis Agent";

const STYLE: &str = "body{font-family:sans-serif;margin:0;display:flex;color:#222}\
aside{width:300px;min-height:100vh;padding:1.5rem;background:#f0f2f6;box-sizing:border-box}\
main{flex:1;padding:2rem 3rem;max-width:900px}\
.box{padding:.75rem 1rem;border-radius:.4rem;margin:.75rem 0}\
.success{background:#e3f5e8}.error{background:#fde8e8}.info{background:#e7f0fb}.warning{background:#fdf6dd}\
figure{text-align:center;margin:1.5rem 0}figcaption{color:#666;font-size:.9rem}\
button.primary{background:#ff4b4b;color:#fff;border:0;padding:.6rem 1.5rem;border-radius:.4rem;cursor:pointer}\
.caption{color:#666;font-size:.85rem}.literature article{border-bottom:1px solid #ddd;padding:.5rem 0}";

/// Full page for a session that is not currently busy.
#[must_use]
pub fn page(session: &Session) -> String {
    let mut body = String::new();
    render_sidebar(&mut body, session);

    body.push_str("<main>");
    let _ = write!(
        body,
        "<h1>{TITLE}</h1><p>Upload a medical image for professional analysis</p>"
    );

    if !session.has_agent() {
        body.push_str(
            "<div class=\"box warning\">Please configure both the Gemini and search API keys to continue.</div>",
        );
    }

    let _ = write!(
        body,
        "<form method=\"post\" action=\"/upload\" enctype=\"multipart/form-data\">\
<label for=\"image\">Upload Medical Image</label> \
<input type=\"file\" id=\"image\" name=\"image\" accept=\"{}\" required> \
<button type=\"submit\">Upload</button>\
<p class=\"caption\">Supported formats: JPG, JPEG, PNG, DICOM</p></form>",
        escape_html(&UploadFormat::accept_attribute())
    );

    if let Some(notice) = session.notice() {
        let _ = write!(
            body,
            "<div class=\"box error\">{}</div>",
            escape_html(&notice.message)
        );
    }

    match session.image() {
        Some(image) => {
            let (width, height) = image.preview_dimensions();
            let _ = write!(
                body,
                "<figure><img src=\"{}\" width=\"{width}\" height=\"{height}\" alt=\"{}\">\
<figcaption>Uploaded Medical Image</figcaption></figure>",
                image.preview_data_uri(),
                escape_html(image.file_name())
            );
            body.push_str(
                "<form method=\"post\" action=\"/analyze\" \
onsubmit=\"document.getElementById('progress').hidden=false\">\
<button type=\"submit\" class=\"primary\">Analyze Image</button></form>\
<form method=\"post\" action=\"/image/remove\"><button type=\"submit\">Remove image</button></form>\
<div id=\"progress\" class=\"box info\" hidden>Analyzing image... Please wait.</div>",
            );

            match session.outcome() {
                Some(AnalysisOutcome::Complete(report)) => {
                    body.push_str("<section class=\"results\"><h2>Analysis Results</h2><hr>");
                    body.push_str(&render_markdown(&report.markdown));
                    body.push_str(
                        "<hr><p class=\"caption\">Note: This analysis is generated by AI and \
should be reviewed by a qualified healthcare professional.</p></section>",
                    );
                    body.push_str(&render_literature(&report.literature));
                }
                Some(AnalysisOutcome::Failed(notice)) => {
                    let _ = write!(
                        body,
                        "<div class=\"box error\">Analysis error: {}</div>",
                        escape_html(&notice.message)
                    );
                }
                None => {}
            }
        }
        None => body.push_str(
            "<div class=\"box info\">Please upload a medical image to begin analysis.</div>",
        ),
    }
    body.push_str("</main>");

    document(&body, None)
}

/// Placeholder served while the session's analysis holds its lock.
#[must_use]
pub fn busy_page() -> String {
    document(
        "<main><h1>Medical Imaging Diagnosis Agent</h1>\
<div class=\"box info\">Analyzing image... Please wait.</div></main>",
        Some(2),
    )
}

fn document(body: &str, refresh_secs: Option<u32>) -> String {
    let refresh = refresh_secs
        .map(|secs| format!("<meta http-equiv=\"refresh\" content=\"{secs}\">"))
        .unwrap_or_default();
    format!(
        "<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"utf-8\">\
<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">{refresh}\
<title>{TITLE}</title><style>{STYLE}</style></head><body>{body}</body></html>"
    )
}

fn render_sidebar(out: &mut String, session: &Session) {
    let credentials = session.credentials();
    out.push_str("<aside><h2>Configuration</h2>");

    if credentials.has_model_key() {
        out.push_str(
            "<div class=\"box success\">Gemini API Key is configured</div>\
<form method=\"post\" action=\"/credentials/reset\">\
<button type=\"submit\">Reset Gemini API Key</button></form>",
        );
    } else {
        out.push_str(
            "<form method=\"post\" action=\"/credentials\">\
<label for=\"model_api_key\">Enter your Gemini API Key:</label>\
<input type=\"password\" id=\"model_api_key\" name=\"model_api_key\" autocomplete=\"off\"> \
<button type=\"submit\">Save</button></form>\
<p class=\"caption\">Get your API key from \
<a href=\"https://aistudio.google.com/apikey\" target=\"_blank\" rel=\"noopener noreferrer\">Google AI Studio</a></p>",
        );
    }

    if !credentials.has_search_key() {
        out.push_str(
            "<div class=\"box error\">Please add your search API key (SEARCH_API_KEY) to the \
deployment secrets.</div>",
        );
    }

    out.push_str(
        "<div class=\"box info\">This tool provides AI-powered analysis of medical imaging data \
using advanced computer vision and radiological expertise.</div>\
<div class=\"box warning\">DISCLAIMER: This tool is for educational and informational purposes \
only. All analyses should be reviewed by qualified healthcare professionals. Do not make medical \
decisions based solely on this analysis.</div></aside>",
    );
}

/// Renders model markdown to HTML.
///
/// Raw HTML is emitted as escaped text, images are reduced to their alt text,
/// and links keep their anchor only for `http`/`https` destinations.
#[must_use]
pub fn render_markdown(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let mut dropped_link = false;
    let events = Parser::new_ext(markdown, options).filter_map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Some(Event::Text(raw)),
        Event::Start(Tag::Link { ref dest_url, .. }) if !is_web_url(dest_url) => {
            dropped_link = true;
            None
        }
        Event::End(TagEnd::Link) if dropped_link => {
            dropped_link = false;
            None
        }
        Event::Start(Tag::Image { .. }) | Event::End(TagEnd::Image) => None,
        other => Some(other),
    });

    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, events);
    out
}

/// Renders search results in the order given.
#[must_use]
pub fn render_literature(items: &[SearchResultItem]) -> String {
    let mut out = String::from("<section class=\"literature\"><h2>Relevant Medical Literature</h2>");
    if items.is_empty() {
        out.push_str("<p>No related literature was found.</p>");
    }
    for item in items {
        let title = escape_html(&item.title);
        out.push_str("<article><p><strong>");
        if is_web_url(&item.link) {
            let _ = write!(
                out,
                "<a href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\">{title}</a>",
                escape_html(&item.link)
            );
        } else {
            out.push_str(&title);
        }
        let _ = write!(out, "</strong></p><p>{}</p></article>", escape_html(&item.snippet));
    }
    out.push_str("</section>");
    out
}

fn is_web_url(url: &str) -> bool {
    let url = url.trim_start().to_ascii_lowercase();
    url.starts_with("http://") || url.starts_with("https://")
}

/// Escapes text for use in element content and quoted attribute values.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
