use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::ApiError;

/// Single schedule row on the about page
#[derive(PartialEq, Eq, Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleEntry {
    pub date: String,
    pub event: String,
    pub time: String,
}

#[derive(PartialEq, Eq, Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Sponsor {
    pub name: String,

    /// Public path of the sponsor logo, empty when none was uploaded
    pub logo: String,
}

/// A sponsor as submitted by the edit form.
///
/// `key` is a client-chosen id that ties the sponsor to a `sponsorLogo:<key>` upload.
#[derive(PartialEq, Eq, Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SponsorInput {
    pub name: String,
    pub logo: String,
    pub key: Option<String>,
}

/// The singleton about page document
#[derive(PartialEq, Eq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct About {
    pub poster: String,
    pub description: String,
    pub gallery: Vec<String>,
    pub schedule: Vec<ScheduleEntry>,
    pub sponsors: Vec<Sponsor>,
}

/// Text fields of an about update, decoded and validated
#[derive(PartialEq, Eq, Debug, Clone, Default)]
pub struct AboutUpdate {
    pub description: Option<String>,
    pub schedule: Vec<ScheduleEntry>,
    pub sponsors: Vec<SponsorInput>,
}

/// Public paths of the files stored for an about update
#[derive(PartialEq, Eq, Debug, Clone, Default)]
pub struct AboutUploads {
    pub poster: Option<String>,
    pub gallery: Vec<String>,

    /// Sponsor index and the logo path stored for it
    pub sponsor_logos: Vec<(usize, String)>,
}

/// Decodes a Json array sent inside a form field. A missing field is an empty array.
pub fn decode_json_field<T: DeserializeOwned>(
    field: &str,
    raw: Option<&str>,
) -> Result<Vec<T>, ApiError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(vec![]),
        Some(raw) => serde_json::from_str(raw).map_err(|e| ApiError::invalid(field, e)),
    }
}

impl AboutUpdate {
    pub fn decode(
        description: Option<&str>,
        schedule: Option<&str>,
        sponsors: Option<&str>,
    ) -> Result<Self, ApiError> {
        Ok(AboutUpdate {
            description: description.map(str::to_owned),
            schedule: decode_json_field("schedule", schedule)?,
            sponsors: decode_json_field("sponsors", sponsors)?,
        })
    }

    /// Resolve which sponsor each uploaded logo belongs to.
    ///
    /// Positional logos map to the sponsor at the same index, keyed logos to the
    /// sponsor carrying that key. Returned indices follow the order
    /// `positional` files first, then `keys`.
    pub fn logo_targets(&self, positional: usize, keys: &[String]) -> Result<Vec<usize>, ApiError> {
        if positional > self.sponsors.len() {
            return Err(ApiError::invalid(
                "sponsorFiles",
                format!(
                    "{} logo files were sent for {} sponsors",
                    positional,
                    self.sponsors.len()
                ),
            ));
        }

        let mut targets: Vec<usize> = (0..positional).collect();
        for key in keys {
            let idx = self
                .sponsors
                .iter()
                .position(|s| s.key.as_deref() == Some(key.as_str()))
                .ok_or_else(|| {
                    ApiError::invalid(
                        "sponsorLogo",
                        format!("no sponsor has the key '{}'", key),
                    )
                })?;
            targets.push(idx);
        }

        Ok(targets)
    }
}

impl About {
    /// Merge an update into this document.
    ///
    /// The poster is overwritten when a new one was uploaded, gallery uploads are
    /// appended, and the schedule and sponsor lists are replaced wholesale.
    pub fn apply_update(&mut self, update: AboutUpdate, uploads: AboutUploads) {
        if let Some(poster) = uploads.poster {
            self.poster = poster;
        }

        self.gallery.extend(uploads.gallery);

        let mut sponsors: Vec<Sponsor> = update
            .sponsors
            .into_iter()
            .map(|s| Sponsor {
                name: s.name,
                logo: s.logo,
            })
            .collect();
        for (idx, logo) in uploads.sponsor_logos {
            if let Some(sponsor) = sponsors.get_mut(idx) {
                sponsor.logo = logo;
            }
        }
        self.sponsors = sponsors;

        self.schedule = update.schedule;

        if let Some(description) = update.description {
            self.description = description;
        }
    }
}
