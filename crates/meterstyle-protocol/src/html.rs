//! HTML rendering of the configuration page.
//!
//! The page is a single GET form posting back to its own URI, so picking
//! a style and pressing the submit element reloads the page with the
//! selector's name and the chosen option in the query string.

use std::fmt::Write;

use meterstyle_core::{Arrange, Element, ElementTree, Posterior, Radio, Submit, Text};

/// Render the page for `tree`.
pub fn render_page(title: &str, uri: &str, tree: &ElementTree) -> String {
    let mut html = String::with_capacity(1024);
    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"UTF-8\">\n");
    html.push_str(
        "<meta name=\"viewport\" content=\"width=device-width,initial-scale=1\">\n",
    );
    let _ = writeln!(html, "<title>{}</title>", escape(title));
    html.push_str("</head>\n<body>\n");
    let _ = writeln!(html, "<form method=\"get\" action=\"{}\">", escape(uri));

    for element in tree.iter() {
        let body = match element {
            Element::Text(text) => render_text(text),
            Element::Radio(radio) => render_radio(radio),
            Element::Submit(submit) => render_submit(submit),
        };
        html.push_str(&with_posterior(body, posterior_of(element)));
        html.push('\n');
    }

    html.push_str("</form>\n</body>\n</html>\n");
    html
}

fn render_text(text: &Text) -> String {
    // The format template is markup; only the value is escaped.
    let value = if text.format.is_empty() {
        escape(&text.value)
    } else {
        text.format.replacen("%s", &escape(&text.value), 1)
    };
    if text.style.is_empty() {
        format!("<div id=\"{}\">{}</div>", escape(&text.name), value)
    } else {
        format!(
            "<div id=\"{}\" style=\"{}\">{}</div>",
            escape(&text.name),
            escape(&text.style),
            value
        )
    }
}

fn render_radio(radio: &Radio) -> String {
    let mut html = String::new();
    if !radio.label.is_empty() {
        let _ = write!(html, "<label>{}</label>", escape(&radio.label));
        if radio.arrange == Arrange::Vertical {
            html.push_str("<br>");
        }
    }
    let name = escape(&radio.name);
    for (i, option) in radio.options().iter().enumerate() {
        let index = i + 1;
        let checked = if radio.checked() == index { " checked" } else { "" };
        let option = escape(option);
        let _ = write!(
            html,
            "<input type=\"radio\" name=\"{name}\" id=\"{name}_{index}\" value=\"{option}\"{checked}>\
             <label for=\"{name}_{index}\">{option}</label>"
        );
        if radio.arrange == Arrange::Vertical {
            html.push_str("<br>");
        }
    }
    html
}

fn render_submit(submit: &Submit) -> String {
    format!(
        "<input type=\"submit\" name=\"{}\" value=\"{}\" formaction=\"{}\">",
        escape(&submit.name),
        escape(&submit.value),
        escape(&submit.uri)
    )
}

fn posterior_of(element: &Element) -> Posterior {
    match element {
        Element::Text(e) => e.posterior,
        Element::Radio(e) => e.posterior,
        Element::Submit(e) => e.posterior,
    }
}

fn with_posterior(body: String, posterior: Posterior) -> String {
    match posterior {
        Posterior::None => body,
        Posterior::Br => body + "<br>",
        Posterior::Par => format!("<p>{}</p>", body),
        Posterior::Div => format!("<div>{}</div>", body),
    }
}

/// Escape text for use in element content and quoted attribute values.
fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
