use serde_json::Value;

/// A request body which can be rebuilt for every attempt.
///
/// Multipart forms are consumed when sent, so the transport keeps this description and turns it
/// into a fresh form each time it retries.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Body {
    /// No body.
    #[default]
    Empty,
    /// A JSON body.
    Json(Value),
    /// A `multipart/form-data` body.
    Multipart(Vec<Part>),
}

/// One part of a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    name: String,
    file_name: Option<String>,
    content_type: String,
    content: Vec<u8>,
}

impl Part {
    /// Create a part without a file name.
    pub fn new(name: impl Into<String>, content: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            file_name: None,
            content_type: content_type.into(),
            content,
        }
    }

    /// Set the file name.
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    /// Form field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// File name, if any.
    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    /// Content type.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Content.
    pub fn content(&self) -> &[u8] {
        &self.content
    }
}

/// Builds the same body for both request builder flavours.
macro_rules! apply_body {
    ($body:expr, $builder:expr, $form:ty, $part:ty) => {{
        match $body {
            Body::Empty => Ok($builder),
            Body::Json(json) => Ok($builder.json(json)),
            Body::Multipart(parts) => {
                let mut form = <$form>::new();
                for part in parts {
                    let mut form_part =
                        <$part>::bytes(part.content.clone()).mime_str(&part.content_type)?;
                    if let Some(file_name) = &part.file_name {
                        form_part = form_part.file_name(file_name.clone());
                    }
                    form = form.part(part.name.clone(), form_part);
                }
                Ok($builder.multipart(form))
            }
        }
    }};
}

impl Body {
    pub(crate) fn apply(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> reqwest::Result<reqwest::RequestBuilder> {
        apply_body!(
            self,
            builder,
            reqwest::multipart::Form,
            reqwest::multipart::Part
        )
    }

    pub(crate) fn apply_blocking(
        &self,
        builder: reqwest::blocking::RequestBuilder,
    ) -> reqwest::Result<reqwest::blocking::RequestBuilder> {
        apply_body!(
            self,
            builder,
            reqwest::blocking::multipart::Form,
            reqwest::blocking::multipart::Part
        )
    }
}
