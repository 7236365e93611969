// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Notification rendering.
//!
//! Pure functions from a validated [`Submission`] to one or two
//! [`ComposedMessage`] values: the admin notification, and an optional
//! acknowledgment back to the submitter. Submitter-controlled values are
//! HTML-escaped at the single interpolation point, so no raw markup from
//! the form can reach the rendered body. The plain-text alternative is
//! derived from the HTML body by stripping markup.

use crate::config::MailConfig;
use crate::validator::Submission;

const NOTIFICATION_TEMPLATE: &str = include_str!("../templates/notification.html");
const ACKNOWLEDGMENT_TEMPLATE: &str = include_str!("../templates/acknowledgment.html");

/// A fully rendered outbound message, consumed once by the dispatcher.
#[derive(Debug, Clone)]
pub struct ComposedMessage {
    pub recipient_address: String,
    pub recipient_name: String,
    pub reply_to_address: String,
    pub reply_to_name: String,
    pub subject_line: String,
    pub html_body: String,
    pub text_body: String,
}

/// The messages produced for one accepted submission.
#[derive(Debug, Clone)]
pub struct ComposedMail {
    pub notification: ComposedMessage,
    pub acknowledgment: Option<ComposedMessage>,
}

/// Named values handed to the template renderer. An explicit parameter
/// object; the renderer sees nothing else.
#[derive(Debug)]
pub struct TemplateValues<'a> {
    pub subject: &'a str,
    pub date: &'a str,
    pub name: &'a str,
    pub email: &'a str,
    pub message: &'a str,
    pub ip: &'a str,
}

/// Render the admin notification and, if configured, the acknowledgment.
pub fn compose(submission: &Submission, mail: &MailConfig) -> ComposedMail {
    let subject_line = submission
        .subject
        .clone()
        .unwrap_or_else(|| mail.subject.clone());
    let date = submission.received_at.format("%d %b %Y, %H:%M UTC").to_string();
    let ip = submission.caller_ip.to_string();

    let notification_html = render(
        NOTIFICATION_TEMPLATE,
        &TemplateValues {
            subject: &subject_line,
            date: &date,
            name: &submission.name,
            email: &submission.email,
            message: &submission.message,
            ip: &ip,
        },
    );
    let notification = ComposedMessage {
        recipient_address: mail.operator_address.clone(),
        recipient_name: mail.operator_name.clone(),
        reply_to_address: submission.email.clone(),
        reply_to_name: submission.name.clone(),
        subject_line,
        text_body: derive_text(&notification_html),
        html_body: notification_html,
    };

    let acknowledgment = mail.acknowledge.then(|| {
        let ack_html = render(
            ACKNOWLEDGMENT_TEMPLATE,
            &TemplateValues {
                subject: &mail.ack_subject,
                date: &date,
                name: &submission.name,
                email: &submission.email,
                message: &submission.message,
                ip: &ip,
            },
        );
        ComposedMessage {
            recipient_address: submission.email.clone(),
            recipient_name: submission.name.clone(),
            reply_to_address: mail.operator_address.clone(),
            reply_to_name: mail.operator_name.clone(),
            subject_line: mail.ack_subject.clone(),
            text_body: derive_text(&ack_html),
            html_body: ack_html,
        }
    });

    ComposedMail {
        notification,
        acknowledgment,
    }
}

/// Substitute `{{key}}` placeholders, escaping every value. Message
/// newlines become `<br>` while the `\n` is kept, so stripping the markup
/// back out preserves the line structure.
///
/// Single pass over the template: substituted values are never re-scanned,
/// so placeholder syntax typed into a field stays literal.
fn render(template: &str, values: &TemplateValues<'_>) -> String {
    let message = escape_html(values.message).replace('\n', "<br>\n");
    let mut out = String::with_capacity(template.len() + message.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            rest = "";
            break;
        };
        let key = &after[..end];
        match key {
            "subject" => out.push_str(&escape_html(values.subject)),
            "date" => out.push_str(&escape_html(values.date)),
            "name" => out.push_str(&escape_html(values.name)),
            "email" => out.push_str(&escape_html(values.email)),
            "message" => out.push_str(&message),
            "ip" => out.push_str(&escape_html(values.ip)),
            // Unknown placeholders pass through untouched.
            _ => {
                out.push_str("{{");
                out.push_str(key);
                out.push_str("}}");
            }
        }
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    out
}

/// Escape the characters significant to HTML.
pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
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

/// Plain-text alternative for mail clients that reject HTML: markup
/// stripped, entities decoded, whitespace normalized.
fn derive_text(html: &str) -> String {
    let stripped = strip_tags(html);
    let decoded = decode_entities(&stripped);

    let mut lines: Vec<&str> = Vec::new();
    let mut blank_run = true; // swallow leading blanks
    for line in decoded.lines() {
        let line = line.trim();
        if line.is_empty() {
            if !blank_run {
                lines.push("");
                blank_run = true;
            }
        } else {
            lines.push(line);
            blank_run = false;
        }
    }
    while lines.last() == Some(&"") {
        lines.pop();
    }
    lines.join("\n")
}

/// Drop `<...>` spans, including the conditional comments in the mail skin.
fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

/// Reverse [`escape_html`] plus the non-breaking spaces the skin uses for
/// spacing cells.
fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
