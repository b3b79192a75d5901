//! XML response deserialization for the Storage REST API.

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::{ErrorCode, StorageError, StorageResult};
use crate::models::QueueMessage;
use crate::storage::parse_http_date;

/// One page of a List Blobs response.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BlobListPage {
    pub names: Vec<String>,
    /// Continuation marker; `None` on the last page.
    pub next_marker: Option<String>,
}

/// Walks `xml`, calling `on_end(path, text)` for every closing element with
/// the element path (outermost first) and its trimmed text content.
fn walk<F>(xml: &str, mut on_end: F) -> StorageResult<()>
where
    F: FnMut(&[&str], &str),
{
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut path: Vec<String> = Vec::new();
    let mut current_text = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                path.push(String::from_utf8_lossy(e.name().as_ref()).to_string());
                current_text.clear();
            }
            Ok(Event::Text(e)) => {
                current_text = e
                    .unescape()
                    .map_err(|_| StorageError::new(ErrorCode::InvalidResponse))?
                    .to_string();
            }
            Ok(Event::CData(e)) => {
                current_text = String::from_utf8_lossy(&e.into_inner()).to_string();
            }
            Ok(Event::End(_)) => {
                let path_str: Vec<&str> = path.iter().map(|s| s.as_str()).collect();
                on_end(&path_str, &current_text);
                path.pop();
                current_text.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.into()),
            _ => {}
        }
        buf.clear();
    }

    Ok(())
}

/// Parses a List Blobs `EnumerationResults` body.
pub fn parse_blob_list(xml: &str) -> StorageResult<BlobListPage> {
    let mut page = BlobListPage::default();

    walk(xml, |path, text| match path {
        ["EnumerationResults", "Blobs", "Blob", "Name"] => page.names.push(text.to_string()),
        ["EnumerationResults", "NextMarker"] if !text.is_empty() => {
            page.next_marker = Some(text.to_string());
        }
        _ => {}
    })?;

    Ok(page)
}

/// Extracts `<Code>` from an error body. Returns `None` for empty or
/// non-XML bodies.
pub fn parse_error_code(xml: &str) -> Option<String> {
    let mut code = None;
    walk(xml, |path, text| {
        if let ["Error", "Code"] = path {
            code = Some(text.to_string());
        }
    })
    .ok()?;
    code.filter(|c| !c.is_empty())
}

/// Parses a Get Messages `QueueMessagesList` body.
pub fn parse_queue_messages(xml: &str) -> StorageResult<Vec<QueueMessage>> {
    let mut messages = Vec::new();
    let mut current = QueueMessage::new("", "");

    walk(xml, |path, text| match path {
        ["QueueMessagesList", "QueueMessage", field] => match *field {
            "MessageId" => current.message_id = text.to_string(),
            "PopReceipt" => current.pop_receipt = text.to_string(),
            "MessageText" => current.message_text = text.to_string(),
            "DequeueCount" => current.dequeue_count = text.parse().unwrap_or(0),
            "InsertionTime" => current.insertion_time = parse_http_date(text),
            "TimeNextVisible" => current.time_next_visible = parse_http_date(text),
            _ => {}
        },
        ["QueueMessagesList", "QueueMessage"] => {
            messages.push(std::mem::replace(&mut current, QueueMessage::new("", "")));
        }
        _ => {}
    })?;

    if let Some(bad) = messages
        .iter()
        .find(|m| m.message_id.is_empty() || m.pop_receipt.is_empty())
    {
        return Err(StorageError::with_message(
            ErrorCode::InvalidResponse,
            format!("Queue message without id or pop receipt: {bad:?}"),
        ));
    }

    Ok(messages)
}
