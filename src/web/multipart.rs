use std::collections::HashMap;

use futures::TryStreamExt;
use warp::{
    multipart::{FormData, Part},
    Buf,
};

use crate::{error::ApiError, uploads::UploadedFile, util::non_empty};

/// Multipart field prefix for sponsor logos correlated by key
pub const SPONSOR_LOGO_PREFIX: &str = "sponsorLogo:";

/// A fully-read multipart request
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    files: Vec<UploadedFile>,
}

async fn read_part(part: Part) -> Result<Vec<u8>, ApiError> {
    let data = part
        .stream()
        .try_fold(Vec::new(), |mut buf, mut chunk| async move {
            while chunk.has_remaining() {
                let bytes = chunk.chunk();
                let len = bytes.len();
                buf.extend_from_slice(bytes);
                chunk.advance(len);
            }
            Ok(buf)
        })
        .await?;
    Ok(data)
}

impl MultipartForm {
    /// Drain a form stream. Parts with a filename are files, the rest are text fields.
    pub async fn read(mut form: FormData) -> Result<Self, ApiError> {
        let mut parsed = MultipartForm::default();

        while let Some(part) = form.try_next().await? {
            let field = part.name().to_owned();
            let filename = part.filename().map(str::to_owned);
            let data = read_part(part).await?;

            match filename {
                Some(filename) => {
                    // Empty file inputs are submitted as a nameless, empty part.
                    if filename.is_empty() && data.is_empty() {
                        continue;
                    }
                    parsed.files.push(UploadedFile {
                        field,
                        filename: Some(filename),
                        data,
                    });
                }
                None => {
                    let value = String::from_utf8(data)
                        .map_err(|_| ApiError::invalid(&field, "field is not valid UTF-8"))?;
                    parsed.fields.insert(field, value);
                }
            }
        }

        Ok(parsed)
    }

    pub fn text(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    /// Trimmed text value, `None` when missing or blank
    pub fn optional_text(&self, field: &str) -> Option<String> {
        non_empty(self.text(field))
    }

    pub fn required_text(&self, field: &str) -> Result<String, ApiError> {
        self.optional_text(field)
            .ok_or_else(|| ApiError::invalid(field, format!("{} is required", field)))
    }

    /// All files sent under `field`, in upload order
    pub fn files(&self, field: &str) -> Vec<&UploadedFile> {
        self.files.iter().filter(|f| f.field == field).collect()
    }

    pub fn file(&self, field: &str) -> Option<&UploadedFile> {
        self.files.iter().find(|f| f.field == field)
    }

    /// Files whose field name starts with `prefix`, paired with the rest of the name
    pub fn keyed_files(&self, prefix: &str) -> Vec<(String, &UploadedFile)> {
        self.files
            .iter()
            .filter_map(|f| f.field.strip_prefix(prefix).map(|key| (key.to_owned(), f)))
            .collect()
    }

    #[cfg(test)]
    pub fn from_parts(fields: &[(&str, &str)], files: Vec<UploadedFile>) -> Self {
        MultipartForm {
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            files,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(field: &str) -> UploadedFile {
        UploadedFile {
            field: field.to_owned(),
            filename: Some(format!("{}.png", field)),
            data: vec![1, 2, 3],
        }
    }

    #[test]
    fn test_field_access() {
        let form = MultipartForm::from_parts(
            &[("name", "  Hackathon "), ("venue", "   ")],
            vec![file("gallery"), file("poster"), file("gallery")],
        );

        assert_eq!(form.required_text("name").unwrap(), "Hackathon");
        assert_eq!(form.optional_text("venue"), None);
        assert!(form.required_text("venue").is_err());
        assert_eq!(form.files("gallery").len(), 2);
        assert!(form.file("poster").is_some());
        assert!(form.file("image").is_none());
    }

    #[test]
    fn test_keyed_files() {
        let form = MultipartForm::from_parts(
            &[],
            vec![file("sponsorLogo:acme"), file("sponsorFiles"), file("sponsorLogo:globex")],
        );

        let keys: Vec<String> = form
            .keyed_files(SPONSOR_LOGO_PREFIX)
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, vec!["acme", "globex"]);
    }
}
