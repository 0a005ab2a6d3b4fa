//! Encoding of JSON bodies as `multipart/form-data`

use reqwest::multipart::{Form, Part};
use serde_json::{Map, Value};

use crate::Error;

/// A file sent alongside a report or reply
#[derive(Clone, Debug)]
pub struct Attachment {
    field: String,
    mime_type: String,
    content: Vec<u8>,
}

impl Attachment {
    /// Constructs an attachment sent under the form field `field`
    ///
    /// The MIME type must have a subtype, which becomes the file extension.
    pub fn new(field: impl Into<String>, mime_type: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            field: field.into(),
            mime_type: mime_type.into(),
            content,
        }
    }

    /// The form field the attachment is sent under
    pub fn field(&self) -> &str {
        &self.field
    }

    /// The attachment's MIME type
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    fn extension(&self) -> Result<&str, Error> {
        self.mime_type
            .split_once('/')
            .map(|(_, subtype)| subtype)
            .filter(|subtype| !subtype.is_empty())
            .ok_or_else(|| {
                Error::invalid(format!(
                    "attachment type {} must be of the form type/subtype",
                    self.mime_type
                ))
            })
    }
}

/// Builds a form from an object body and its attachments
pub(crate) fn form(body: &Map<String, Value>, attachments: Vec<Attachment>) -> Result<Form, Error> {
    let mut form = Form::new();
    for (name, value) in flatten(body) {
        form = form.text(name, value);
    }

    for (index, attachment) in attachments.into_iter().enumerate() {
        let file_name = format!("document{}.{}", index + 1, attachment.extension()?);
        let part = Part::bytes(attachment.content)
            .file_name(file_name)
            .mime_str(&attachment.mime_type)
            .map_err(|_| {
                Error::invalid(format!("invalid attachment type {}", attachment.mime_type))
            })?;
        form = form.part(attachment.field, part);
    }

    Ok(form)
}

/// Flattens an object into form field names and text values
///
/// Nested members are named `parent[key]`. Nulls and empty strings are
/// omitted. Empty objects and arrays are sent as their JSON text.
pub(crate) fn flatten(body: &Map<String, Value>) -> Vec<(String, String)> {
    let mut fields = Vec::new();
    for (key, value) in body {
        push(key.clone(), value, &mut fields);
    }
    fields
}

fn push(name: String, value: &Value, fields: &mut Vec<(String, String)>) {
    match value {
        Value::Null => {}
        Value::String(s) if s.is_empty() => {}
        Value::String(s) => fields.push((name, s.clone())),
        Value::Bool(_) | Value::Number(_) => fields.push((name, value.to_string())),
        Value::Object(map) if !map.is_empty() => {
            for (key, nested) in map {
                push(format!("{}[{}]", name, key), nested, fields);
            }
        }
        Value::Array(items) if !items.is_empty() => {
            for (index, nested) in items.iter().enumerate() {
                push(format!("{}[{}]", name, index), nested, fields);
            }
        }
        Value::Object(_) | Value::Array(_) => fields.push((name, value.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn flat(value: Value) -> Vec<(String, String)> {
        flatten(value.as_object().unwrap())
    }

    fn pair(name: &str, value: &str) -> (String, String) {
        (name.to_owned(), value.to_owned())
    }

    #[test]
    fn scalars_are_sent_as_text() {
        let fields = flat(json!({
            "comment": "pothole",
            "community": 12,
            "urgent": true,
            "reviewed": false,
        }));

        assert!(fields.contains(&pair("comment", "pothole")));
        assert!(fields.contains(&pair("community", "12")));
        assert!(fields.contains(&pair("urgent", "true")));
        assert!(fields.contains(&pair("reviewed", "false")));
    }

    #[test]
    fn nested_values_use_bracketed_names() {
        let fields = flat(json!({
            "attributes": { "kind": "road", "lanes": 2 },
            "tags": ["a", "b"],
        }));

        assert!(fields.contains(&pair("attributes[kind]", "road")));
        assert!(fields.contains(&pair("attributes[lanes]", "2")));
        assert!(fields.contains(&pair("tags[0]", "a")));
        assert!(fields.contains(&pair("tags[1]", "b")));
    }

    #[test]
    fn nulls_and_empty_strings_are_skipped() {
        let fields = flat(json!({ "sketch": null, "comment": "", "status": "open" }));
        assert_eq!(fields, vec![pair("status", "open")]);
    }

    #[test]
    fn empty_containers_are_sent_as_json() {
        let fields = flat(json!({ "attributes": {}, "tags": [] }));

        assert!(fields.contains(&pair("attributes", "{}")));
        assert!(fields.contains(&pair("tags", "[]")));
    }

    #[test]
    fn attachment_extension_comes_from_the_subtype() {
        let attachment = Attachment::new("attachments[0]", "image/png", vec![1, 2, 3]);
        assert_eq!(attachment.extension().unwrap(), "png");
    }

    #[test]
    fn attachment_without_subtype_is_rejected() {
        let attachment = Attachment::new("attachments[0]", "image", vec![]);
        let err = form(&Map::new(), vec![attachment]).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }
}
